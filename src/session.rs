//! Mint session: the sync loop
//!
//! `MintSession` is the single writer of every piece of derived state (sale
//! state, balance, gate). It refreshes on wallet connection and after every
//! attempt, whatever the outcome, and produces exactly one notification per
//! attempt.
//!
//! An attempt is split in three so the caller's event loop stays responsive:
//!
//! 1. `begin_attempt` checks the gate and moves it to Submitting
//! 2. `PendingAttempt::run` submits, waits and classifies, owning everything it needs
//! 3. `finish_attempt` reconciles state and returns the notification

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::classifier::classify;
use crate::confirmation::{ConfirmationOutcome, ConfirmationWaiter};
use crate::errors::{StateFetchError, SubmissionError};
use crate::gate::{Clock, MintGate};
use crate::issuance::{IssuanceSubmitter, MintAccounts};
use crate::ledger::{Commitment, LedgerClient};
use crate::metrics::{gauge_value, metrics, Timer};
use crate::observability::{AttemptId, AttemptLogger};
use crate::sale_state::{ProgramHandle, SaleStateReader};
use crate::types::{
    lamports_to_sol, shorten_address, AttemptOutcome, FailureCategory, GateState, Notification,
    SaleState, SaleView,
};
use crate::wallet::Wallet;

pub const MSG_SUCCESS: &str = "Congratulations! Mint succeeded!";
pub const MSG_SOLD_OUT: &str = "SOLD OUT!";
pub const MSG_NOT_STARTED: &str = "Minting period hasn't started yet.";
pub const MSG_INSUFFICIENT_FUNDS: &str = "Insufficient funds to mint. Please fund your wallet.";
pub const MSG_SUBMISSION_FAILED: &str = "Minting failed! Please try again!";
pub const MSG_MINT_FAILED: &str = "Mint failed! Please try again!";

/// Static inputs of a session, resolved from configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub program_id: Pubkey,
    pub candy_machine_id: Pubkey,
    pub accounts: MintAccounts,
    /// Countdown target before the first successful fetch
    pub initial_start: Option<DateTime<Utc>>,
    pub tx_timeout: Duration,
    pub poll_interval: Duration,
    pub commitment: Commitment,
    /// How long the gate stays closed after the program reports "not live"
    pub not_live_recheck: Duration,
}

pub struct MintSession {
    settings: SessionSettings,
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn Wallet>,
    clock: Arc<dyn Clock>,
    reader: SaleStateReader,
    submitter: IssuanceSubmitter,
    waiter: ConfirmationWaiter,

    sale: Option<SaleState>,
    handle: Option<ProgramHandle>,
    balance_lamports: Option<u64>,
    gate: MintGate,
    last_fetch_error: Option<StateFetchError>,
}

impl MintSession {
    pub fn new(
        settings: SessionSettings,
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn Wallet>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader: SaleStateReader::new(settings.program_id),
            submitter: IssuanceSubmitter::new(),
            waiter: ConfirmationWaiter::new(settings.poll_interval),
            settings,
            ledger,
            wallet,
            clock,
            sale: None,
            handle: None,
            balance_lamports: None,
            gate: MintGate::new(),
            last_fetch_error: None,
        }
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn sale(&self) -> Option<&SaleState> {
        self.sale.as_ref()
    }

    pub fn balance_lamports(&self) -> Option<u64> {
        self.balance_lamports
    }

    pub fn last_fetch_error(&self) -> Option<&StateFetchError> {
        self.last_fetch_error.as_ref()
    }

    /// Initial sync after the wallet connects: balance and sale state once
    pub async fn connect(&mut self) -> GateState {
        let Some(identity) = self.wallet.current_identity() else {
            info!("No wallet connected, skipping initial sync");
            return self.tick();
        };
        info!(wallet = %identity, "Wallet connected, syncing sale state");

        self.refresh_balance(&identity).await;
        let _ = self.refresh_sale_state(&identity).await;
        self.tick()
    }

    /// Recompute the gate from the clock
    pub fn tick(&mut self) -> GateState {
        let now = self.clock.now();
        self.gate.observe(self.sale.as_ref(), now)
    }

    /// Re-read program state. On failure the previous state is kept and the
    /// gate is left as it was.
    pub async fn refresh_sale_state(&mut self, identity: &Pubkey) -> Result<(), StateFetchError> {
        match self
            .reader
            .fetch(self.ledger.as_ref(), &self.settings.candy_machine_id, identity)
            .await
        {
            Ok((sale, handle)) => {
                if let Some(prev) = &self.sale {
                    if sale.items_remaining > prev.items_remaining {
                        warn!(
                            previous = prev.items_remaining,
                            current = sale.items_remaining,
                            "items_remaining increased between refreshes"
                        );
                    }
                }
                metrics()
                    .items_remaining
                    .set(gauge_value(sale.items_remaining));
                self.sale = Some(sale);
                self.handle = Some(handle);
                self.last_fetch_error = None;
                Ok(())
            }
            Err(e) => {
                metrics().state_refresh_failures_total.inc();
                if e.is_transient() {
                    warn!(error = %e, "Sale state refresh failed, keeping previous state");
                } else {
                    error!(
                        candy_machine = %self.settings.candy_machine_id,
                        error = %e,
                        "Sale state unreadable, check the configured candy machine"
                    );
                }
                self.last_fetch_error = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn refresh_balance(&mut self, identity: &Pubkey) {
        match self.ledger.get_account_balance(identity).await {
            Ok(lamports) => {
                metrics()
                    .wallet_balance_lamports
                    .set(gauge_value(lamports));
                self.balance_lamports = Some(lamports);
            }
            Err(e) if e.is_transient() => warn!(error = %e, "Balance refresh failed"),
            Err(e) => error!(wallet = %identity, error = %e, "Balance unreadable"),
        }
    }

    /// Pass the gate and hand out the attempt. Outside Active the current
    /// gate state is returned and nothing touches the network.
    pub fn begin_attempt(&mut self) -> Result<PendingAttempt, GateState> {
        let now = self.clock.now();
        if let Err(state) = self.gate.try_begin(self.sale.as_ref(), now) {
            metrics().mint_rejected_total.inc();
            AttemptLogger::log_rejected(state);
            return Err(state);
        }

        let Some(handle) = self.handle.clone() else {
            // Active implies a fetched sale, which always comes with a handle
            self.gate.finish();
            return Err(self.tick());
        };

        metrics().mint_attempts_total.inc();
        Ok(PendingAttempt {
            logger: AttemptLogger::new(AttemptId::new()),
            handle,
            ledger: Arc::clone(&self.ledger),
            wallet: Arc::clone(&self.wallet),
            submitter: self.submitter.clone(),
            waiter: self.waiter.clone(),
            accounts: self.settings.accounts,
            tx_timeout: self.settings.tx_timeout,
            commitment: self.settings.commitment,
        })
    }

    /// Reconcile after an attempt: refresh balance and sale state, leave
    /// Submitting, and produce the attempt's notification.
    pub async fn finish_attempt(&mut self, outcome: AttemptOutcome) -> Notification {
        match outcome.category() {
            Some(FailureCategory::SoldOut) => self.gate.latch_sold_out(),
            Some(FailureCategory::NotStarted) => {
                let now = self.clock.now();
                let until = chrono::Duration::from_std(self.settings.not_live_recheck)
                    .ok()
                    .and_then(|recheck| now.checked_add_signed(recheck))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                self.gate.hold_until(until);
            }
            _ => {}
        }

        match &outcome {
            AttemptOutcome::Success { .. } => metrics().mint_success_total.inc(),
            AttemptOutcome::TimedOut { .. } => {
                metrics().confirmation_timeouts_total.inc();
                metrics().mint_failed_total.with_label_values(&["timeout"]).inc();
            }
            other => metrics()
                .mint_failed_total
                .with_label_values(&[other.label()])
                .inc(),
        }

        if let Some(identity) = self.wallet.current_identity() {
            self.refresh_balance(&identity).await;
            let _ = self.refresh_sale_state(&identity).await;
        }

        self.gate.finish();
        let gate = self.tick();

        let notification = notification_for(&outcome);
        info!(
            outcome = outcome.label(),
            gate = %gate,
            message = %notification.message,
            "Mint attempt finished"
        );
        notification
    }

    /// Begin, run and finish one attempt
    pub async fn request_mint(&mut self) -> Result<Notification, GateState> {
        let attempt = self.begin_attempt()?;
        let outcome = attempt.run().await;
        Ok(self.finish_attempt(outcome).await)
    }

    /// Plain-data snapshot for the presenter
    pub fn view(&self) -> SaleView {
        let now = self.clock.now();
        let gate = self.gate.state();
        let countdown = match &self.sale {
            Some(_) => self.gate.countdown(self.sale.as_ref(), now),
            None if gate == GateState::WaitingForStart => self
                .settings
                .initial_start
                .and_then(|start| (start - now).to_std().ok()),
            None => None,
        };

        SaleView {
            gate,
            sale: self.sale.clone(),
            balance_sol: self.balance_lamports.map(lamports_to_sol),
            wallet: self
                .wallet
                .current_identity()
                .map(|pk| shorten_address(&pk.to_string(), 4)),
            countdown,
            last_fetch_error: self.last_fetch_error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Self-contained in-flight attempt
pub struct PendingAttempt {
    logger: AttemptLogger,
    handle: ProgramHandle,
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn Wallet>,
    submitter: IssuanceSubmitter,
    waiter: ConfirmationWaiter,
    accounts: MintAccounts,
    tx_timeout: Duration,
    commitment: Commitment,
}

impl PendingAttempt {
    pub fn attempt_id(&self) -> &AttemptId {
        self.logger.attempt_id()
    }

    /// Submit, wait and classify. Never fails: every error becomes an outcome.
    pub async fn run(self) -> AttemptOutcome {
        let signature = match self
            .submitter
            .submit(&self.handle, self.wallet.as_ref(), &self.accounts, &self.logger)
            .await
        {
            Ok(signature) => signature,
            Err(err) => {
                let category = match &err {
                    SubmissionError::Rejected(reason) => FailureCategory::Unknown {
                        message: reason.clone(),
                    },
                    SubmissionError::Failed(signal) => classify(signal),
                };
                self.logger.log_submission_failure(&category, &err.to_string());
                return AttemptOutcome::SubmissionError { category };
            }
        };

        let started = Instant::now();
        let timer = Timer::with_name("confirmation_latency_seconds");
        let outcome = self
            .waiter
            .wait(self.ledger.as_ref(), &signature, self.tx_timeout, self.commitment)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            ConfirmationOutcome::Confirmed => {
                timer.finish();
                self.logger.log_confirmed(&signature, elapsed_ms);
                AttemptOutcome::Success { signature }
            }
            ConfirmationOutcome::Failed(signal) => {
                timer.finish();
                let category = classify(&signal);
                self.logger.log_on_chain_failure(&signature, &category, &signal.message);
                AttemptOutcome::OnChainFailure {
                    signature,
                    category,
                    detail: signal.message,
                }
            }
            ConfirmationOutcome::TimedOut => {
                self.logger.log_timeout(&signature, elapsed_ms);
                AttemptOutcome::TimedOut { signature }
            }
        }
    }
}

/// The one user-facing alert for an outcome
pub fn notification_for(outcome: &AttemptOutcome) -> Notification {
    match outcome {
        AttemptOutcome::Success { .. } => Notification::success(MSG_SUCCESS),
        AttemptOutcome::TimedOut { signature } => Notification::error(
            MSG_MINT_FAILED,
            Some(format!("confirmation timed out for {}", signature)),
        ),
        AttemptOutcome::OnChainFailure { category, detail, .. } => {
            category_notification(category, MSG_MINT_FAILED, Some(detail.clone()))
        }
        AttemptOutcome::SubmissionError { category } => {
            category_notification(category, MSG_SUBMISSION_FAILED, None)
        }
    }
}

fn category_notification(
    category: &FailureCategory,
    generic: &str,
    detail: Option<String>,
) -> Notification {
    match category {
        FailureCategory::SoldOut => Notification::error(MSG_SOLD_OUT, None),
        FailureCategory::NotStarted => Notification::error(MSG_NOT_STARTED, None),
        FailureCategory::InsufficientFunds => Notification::error(MSG_INSUFFICIENT_FUNDS, None),
        FailureCategory::Unknown { message } => {
            Notification::error(generic, detail.or_else(|| Some(message.clone())))
        }
    }
}
