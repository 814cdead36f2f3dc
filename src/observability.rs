//! Attempt correlation and structured attempt logging

use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use uuid::Uuid;

use crate::types::{FailureCategory, GateState};

/// Identifier carried by every log line of one mint attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AttemptId(String);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttemptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Structured logger for one mint attempt
#[derive(Debug, Clone)]
pub struct AttemptLogger {
    attempt_id: AttemptId,
}

impl AttemptLogger {
    pub fn new(attempt_id: AttemptId) -> Self {
        Self { attempt_id }
    }

    pub fn attempt_id(&self) -> &AttemptId {
        &self.attempt_id
    }

    pub fn log_submit(&self, candy_machine: &str, payer: &str) {
        tracing::info!(
            attempt_id = %self.attempt_id,
            candy_machine = %candy_machine,
            payer = %payer,
            "Submitting mint request"
        );
    }

    pub fn log_submitted(&self, signature: &Signature) {
        tracing::info!(
            attempt_id = %self.attempt_id,
            signature = %signature,
            "Mint request dispatched, awaiting confirmation"
        );
    }

    pub fn log_confirmed(&self, signature: &Signature, latency_ms: u64) {
        tracing::info!(
            attempt_id = %self.attempt_id,
            signature = %signature,
            latency_ms = %latency_ms,
            "Mint confirmed"
        );
    }

    pub fn log_on_chain_failure(&self, signature: &Signature, category: &FailureCategory, detail: &str) {
        tracing::warn!(
            attempt_id = %self.attempt_id,
            signature = %signature,
            category = %category.label(),
            detail = %detail,
            "Mint settled with an error"
        );
    }

    pub fn log_submission_failure(&self, category: &FailureCategory, error: &str) {
        tracing::warn!(
            attempt_id = %self.attempt_id,
            category = %category.label(),
            error = %error,
            "Mint request not accepted"
        );
    }

    pub fn log_timeout(&self, signature: &Signature, waited_ms: u64) {
        tracing::error!(
            attempt_id = %self.attempt_id,
            signature = %signature,
            waited_ms = %waited_ms,
            "Confirmation timed out with no terminal status"
        );
    }

    pub fn log_rejected(gate: GateState) {
        tracing::info!(gate = %gate, "Mint request rejected by gate");
    }
}
