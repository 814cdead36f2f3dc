//! Failure classification
//!
//! Maps a raw failure signal to a user-facing `FailureCategory`. Lookup runs
//! in tiers, most structured first:
//!
//! 1. the program error code carried by the signal
//! 2. a `custom program error: 0x..` code embedded in the message
//! 3. message markers for insufficient funds
//! 4. `Unknown`, keeping the raw message
//!
//! A code that does not parse or is not in the table never matches; the
//! signal falls through to the next tier instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::FailureCategory;

/// Candy Machine: payer cannot cover the price
pub const ERR_NOT_ENOUGH_SOL: u32 = 0x135;
/// Candy Machine: no items remaining
pub const ERR_SOLD_OUT: u32 = 0x137;
/// Candy Machine: go-live date not reached
pub const ERR_NOT_LIVE: u32 = 0x138;

const INSUFFICIENT_FUNDS_MARKERS: &[&str] = &["insufficient funds", "insufficient lamports"];

const UNKNOWN_PLACEHOLDER: &str = "unknown failure";

static CUSTOM_ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)custom program error:\s*0x([0-9a-f]+)").expect("static regex")
});

/// Raw failure as reported by the wallet or the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSignal {
    /// Program-level custom error code, when the transport exposed one
    pub code: Option<u32>,
    pub message: String,
}

impl FailureSignal {
    pub fn new(code: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

/// Classify a failure. Total: every input maps to exactly one category.
pub fn classify(signal: &FailureSignal) -> FailureCategory {
    if let Some(category) = signal.code.and_then(category_for_code) {
        return category;
    }

    if let Some(category) = embedded_code(&signal.message).and_then(category_for_code) {
        return category;
    }

    let lowered = signal.message.to_lowercase();
    if INSUFFICIENT_FUNDS_MARKERS.iter().any(|m| lowered.contains(m)) {
        return FailureCategory::InsufficientFunds;
    }

    let message = if signal.message.trim().is_empty() {
        UNKNOWN_PLACEHOLDER.to_string()
    } else {
        signal.message.clone()
    };
    FailureCategory::Unknown { message }
}

fn category_for_code(code: u32) -> Option<FailureCategory> {
    match code {
        ERR_SOLD_OUT => Some(FailureCategory::SoldOut),
        ERR_NOT_LIVE => Some(FailureCategory::NotStarted),
        ERR_NOT_ENOUGH_SOL => Some(FailureCategory::InsufficientFunds),
        _ => None,
    }
}

/// Extract the first custom program error code from a message.
///
/// Returns `None` for hex that overflows `u32`.
pub fn embedded_code(message: &str) -> Option<u32> {
    CUSTOM_ERROR_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
}
