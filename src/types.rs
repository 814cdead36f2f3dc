//! Common types shared by the mint core and its presenter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, signature::Signature};
use std::time::Duration;

/// Program-side sale state as last read from the ledger
///
/// Replaced wholesale on every refresh; never adjusted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleState {
    /// Total supply
    pub items_available: u64,

    /// Items already issued
    pub items_redeemed: u64,

    /// `items_available - items_redeemed`, never above `items_available`
    pub items_remaining: u64,

    /// Go-live time; `None` means the program has no public start date
    pub sale_start_time: Option<DateTime<Utc>>,

    /// Price per item in lamports
    pub price_lamports: u64,
}

impl SaleState {
    pub fn new(
        items_available: u64,
        items_redeemed: u64,
        sale_start_time: Option<DateTime<Utc>>,
        price_lamports: u64,
    ) -> Self {
        Self {
            items_available,
            items_redeemed,
            items_remaining: items_available.saturating_sub(items_redeemed),
            sale_start_time,
            price_lamports,
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.items_remaining == 0
    }

    pub fn price_sol(&self) -> f64 {
        lamports_to_sol(self.price_lamports)
    }
}

/// Permission state of the mint action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateState {
    WaitingForStart,
    Active,
    SoldOut,
    Submitting,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GateState::WaitingForStart => "waiting_for_start",
            GateState::Active => "active",
            GateState::SoldOut => "sold_out",
            GateState::Submitting => "submitting",
        };
        f.write_str(s)
    }
}

/// User-facing failure category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCategory {
    SoldOut,
    NotStarted,
    InsufficientFunds,
    /// Unmatched failure; the raw message is kept for display
    Unknown { message: String },
}

impl FailureCategory {
    /// Stable label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            FailureCategory::SoldOut => "sold_out",
            FailureCategory::NotStarted => "not_started",
            FailureCategory::InsufficientFunds => "insufficient_funds",
            FailureCategory::Unknown { .. } => "unknown",
        }
    }
}

/// Result of one mint attempt, consumed by the session and then discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Request confirmed at the required commitment
    Success { signature: Signature },

    /// Request landed but settled with an error
    OnChainFailure {
        signature: Signature,
        category: FailureCategory,
        detail: String,
    },

    /// Request never made it onto the ledger
    SubmissionError { category: FailureCategory },

    /// No terminal status within the confirmation budget
    TimedOut { signature: Signature },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }

    pub fn category(&self) -> Option<&FailureCategory> {
        match self {
            AttemptOutcome::OnChainFailure { category, .. }
            | AttemptOutcome::SubmissionError { category } => Some(category),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            AttemptOutcome::Success { signature }
            | AttemptOutcome::OnChainFailure { signature, .. }
            | AttemptOutcome::TimedOut { signature } => Some(signature),
            AttemptOutcome::SubmissionError { .. } => None,
        }
    }

    /// Metrics/log label
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::TimedOut { .. } => "timeout",
            AttemptOutcome::OnChainFailure { category, .. }
            | AttemptOutcome::SubmissionError { category } => category.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Success,
    Error,
}

/// The single alert surfaced after each attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    /// Raw failure text for unclassified failures
    pub detail: Option<String>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            detail,
        }
    }
}

/// Plain-data snapshot handed to the presenter
#[derive(Debug, Clone, PartialEq)]
pub struct SaleView {
    pub gate: GateState,
    pub sale: Option<SaleState>,
    pub balance_sol: Option<f64>,
    /// Shortened wallet address, `None` when no wallet is connected
    pub wallet: Option<String>,
    /// Time left until the sale opens, when waiting on a known start time
    pub countdown: Option<Duration>,
    pub last_fetch_error: Option<String>,
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// `abcd...wxyz` form of an address
pub fn shorten_address(address: &str, chars: usize) -> String {
    let len = address.chars().count();
    if len <= chars * 2 {
        return address.to_string();
    }
    let head: String = address.chars().take(chars).collect();
    let tail: String = address.chars().skip(len - chars).collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_is_saturating() {
        let sale = SaleState::new(10, 12, None, 0);
        assert_eq!(sale.items_remaining, 0);
        assert!(sale.is_sold_out());

        let sale = SaleState::new(100, 99, None, 0);
        assert_eq!(sale.items_remaining, 1);
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", 4),
            "9xQe...VFin"
        );
        assert_eq!(shorten_address("short", 4), "short");
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(lamports_to_sol(0), 0.0);
    }

    #[test]
    fn test_outcome_labels() {
        let sig = Signature::default();
        assert_eq!(AttemptOutcome::Success { signature: sig }.label(), "success");
        assert_eq!(AttemptOutcome::TimedOut { signature: sig }.label(), "timeout");
        assert_eq!(
            AttemptOutcome::SubmissionError { category: FailureCategory::SoldOut }.label(),
            "sold_out"
        );
    }
}
