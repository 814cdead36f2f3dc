//! Test Utilities Module
//!
//! Scripted ledger and wallet collaborators, a manual clock and program
//! account fixtures for deterministic session tests.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::candy_machine::{encode_account, CandyMachineAccount, CANDY_MACHINE_PROGRAM_ID};
use crate::errors::{LedgerError, WalletError};
use crate::gate::Clock;
use crate::issuance::MintAccounts;
use crate::ledger::{Commitment, LedgerClient, RequestStatus};
use crate::session::SessionSettings;
use crate::wallet::{IssuanceRequest, Wallet};

/// Scripted ledger
///
/// Account reads pop from a queue; the last entry stays in place so later
/// reads keep seeing it. Status polls pop from their own queue and report
/// `Pending` once it is empty.
#[derive(Default)]
pub struct MockLedger {
    accounts: Mutex<VecDeque<Result<Vec<u8>, LedgerError>>>,
    statuses: Mutex<VecDeque<Result<RequestStatus, LedgerError>>>,
    balance: Mutex<u64>,

    pub balance_calls: AtomicUsize,
    pub state_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockLedger {
    pub fn new(balance: u64) -> Self {
        Self {
            balance: Mutex::new(balance),
            ..Default::default()
        }
    }

    /// Queue program account bytes for the next read
    pub fn push_account(&self, data: Vec<u8>) {
        self.accounts.lock().unwrap().push_back(Ok(data));
    }

    /// Queue a failed program account read
    pub fn push_account_error(&self, err: LedgerError) {
        self.accounts.lock().unwrap().push_back(Err(err));
    }

    pub fn push_status(&self, status: RequestStatus) {
        self.statuses.lock().unwrap().push_back(Ok(status));
    }

    pub fn push_status_error(&self, err: LedgerError) {
        self.statuses.lock().unwrap().push_back(Err(err));
    }

    pub fn set_balance(&self, lamports: u64) {
        *self.balance.lock().unwrap() = lamports;
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_account_balance(&self, _address: &Pubkey) -> Result<u64, LedgerError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_program_account_state(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().unwrap();
        let next = if accounts.len() > 1 {
            accounts.pop_front()
        } else {
            accounts.front().cloned()
        };
        next.unwrap_or(Err(LedgerError::AccountNotFound(*address)))
    }

    async fn get_request_status(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> Result<RequestStatus, LedgerError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RequestStatus::Pending))
    }
}

/// Scripted wallet
///
/// Sends succeed with a fixed signature unless a result was queued.
pub struct MockWallet {
    identity: Mutex<Option<Pubkey>>,
    results: Mutex<VecDeque<Result<Signature, WalletError>>>,
    pub sends: AtomicUsize,
    pub last_instruction_count: AtomicUsize,
}

impl MockWallet {
    pub const SIGNATURE: [u8; 64] = [7u8; 64];

    pub fn connected(identity: Pubkey) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
            results: Mutex::new(VecDeque::new()),
            sends: AtomicUsize::new(0),
            last_instruction_count: AtomicUsize::new(0),
        }
    }

    pub fn disconnected() -> Self {
        let wallet = Self::connected(Pubkey::default());
        wallet.disconnect();
        wallet
    }

    /// Drop the identity, as when the user disconnects mid-session
    pub fn disconnect(&self) {
        *self.identity.lock().unwrap() = None;
    }

    pub fn push_result(&self, result: Result<Signature, WalletError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn signature() -> Signature {
        Signature::from(Self::SIGNATURE)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn current_identity(&self) -> Option<Pubkey> {
        *self.identity.lock().unwrap()
    }

    async fn sign_and_send(&self, request: IssuanceRequest) -> Result<Signature, WalletError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.last_instruction_count
            .store(request.instructions.len(), Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::signature()))
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Program account fixture
pub fn candy_machine(
    items_available: u64,
    items_redeemed: u64,
    go_live_date: Option<i64>,
    treasury: Pubkey,
    config: Pubkey,
) -> CandyMachineAccount {
    CandyMachineAccount {
        authority: Pubkey::new_unique(),
        wallet: treasury,
        token_mint: None,
        config,
        uuid: "A1B2C3".to_string(),
        price: 1_000_000_000,
        items_available,
        go_live_date,
        items_redeemed,
        bump: 255,
    }
}

/// Encoded program account bytes
pub fn candy_machine_bytes(
    items_available: u64,
    items_redeemed: u64,
    go_live_date: Option<i64>,
    accounts: &MintAccounts,
) -> Vec<u8> {
    encode_account(&candy_machine(
        items_available,
        items_redeemed,
        go_live_date,
        accounts.treasury,
        accounts.config,
    ))
}

/// Session settings with short budgets
pub fn settings(candy_machine_id: Pubkey, accounts: MintAccounts) -> SessionSettings {
    SessionSettings {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        candy_machine_id,
        accounts,
        initial_start: None,
        tx_timeout: Duration::from_millis(30_000),
        poll_interval: Duration::from_millis(2_000),
        commitment: Commitment::Confirmed,
        not_live_recheck: Duration::from_secs(10),
    }
}

pub fn mint_accounts() -> MintAccounts {
    MintAccounts {
        config: Pubkey::new_unique(),
        treasury: Pubkey::new_unique(),
    }
}
