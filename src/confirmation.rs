//! Confirmation waiter
//!
//! Polls the ledger at a fixed interval until the request reaches the
//! required commitment, settles with an error, or the wait budget runs out.

use solana_sdk::signature::Signature;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, warn};

use crate::classifier::FailureSignal;
use crate::ledger::{Commitment, LedgerClient, RequestStatus};

/// Terminal result of a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed,
    /// Settled with an error; the raw detail is kept for classification
    Failed(FailureSignal),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ConfirmationWaiter {
    poll_interval: Duration,
}

impl ConfirmationWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Wait for a terminal status. Always returns one of the three outcomes.
    pub async fn wait(
        &self,
        ledger: &dyn LedgerClient,
        signature: &Signature,
        max_wait: Duration,
        commitment: Commitment,
    ) -> ConfirmationOutcome {
        let started = Instant::now();
        let poll = async {
            let mut polls: u32 = 0;
            loop {
                polls += 1;
                match ledger.get_request_status(signature, commitment).await {
                    Ok(RequestStatus::Confirmed) => {
                        debug!(%signature, polls, "request confirmed");
                        return ConfirmationOutcome::Confirmed;
                    }
                    Ok(RequestStatus::Errored { code, detail }) => {
                        return ConfirmationOutcome::Failed(FailureSignal::new(code, detail));
                    }
                    Ok(RequestStatus::Pending) => {}
                    Err(e) if e.is_transient() => {
                        warn!(%signature, error = %e, "status poll failed, retrying on next tick");
                    }
                    // Still polled until the budget runs out; the node may be misconfigured
                    Err(e) => {
                        error!(%signature, error = %e, "status poll rejected by the node");
                    }
                }
                sleep(self.poll_interval).await;
            }
        };

        match timeout(max_wait, poll).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(
                    %signature,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "confirmation budget exhausted"
                );
                ConfirmationOutcome::TimedOut
            }
        }
    }
}

impl Default for ConfirmationWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(2_000))
    }
}
