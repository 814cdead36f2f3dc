//! Error types for the mint core
//!
//! The taxonomy follows the attempt lifecycle:
//! - `LedgerError` / `DecodeError`: talking to the ledger and reading program state
//! - `StateFetchError`: a refresh failed; callers keep their previous state
//! - `WalletError`: the wallet collaborator could not sign or dispatch
//! - `SubmissionError`: what the issuance submitter reports back to the session
//!
//! On-chain failures and confirmation timeouts are not errors here; they are
//! `ConfirmationOutcome` values so every attempt ends in a classified outcome.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::classifier::FailureSignal;

/// Failures of the ledger connection collaborator
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// Network-level failure (connection refused, timeout, DNS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The requested account does not exist on the ledger
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// The RPC node answered with an error
    #[error("RPC response error: {message} (code: {code:?})")]
    Rpc { code: Option<i64>, message: String },
}

impl LedgerError {
    /// Transport problems and server-side 5xx style failures may succeed on
    /// the next refresh; everything else needs a configuration change.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Transport(_) => true,
            LedgerError::AccountNotFound(_) => false,
            LedgerError::Rpc { code, .. } => {
                code.map_or(true, |c| (-32099..=-32000).contains(&c) || (500..600).contains(&c))
            }
        }
    }
}

/// Program account bytes that do not match the expected layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("account discriminator mismatch")]
    BadDiscriminator,

    #[error("account data truncated at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid utf8 in string field at offset {0}")]
    InvalidUtf8(usize),

    #[error("invalid option tag {tag} at offset {offset}")]
    InvalidOptionTag { tag: u8, offset: usize },
}

/// A sale-state refresh failed
///
/// Transient by contract: the session keeps the previous `SaleState` and
/// leaves the gate untouched until a later refresh succeeds.
#[derive(Error, Debug, Clone)]
pub enum StateFetchError {
    #[error("ledger unreachable: {0}")]
    Ledger(#[from] LedgerError),

    #[error("program account could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

impl StateFetchError {
    /// A decode failure means the configured account is wrong; it will not
    /// fix itself on the next refresh.
    pub fn is_transient(&self) -> bool {
        match self {
            StateFetchError::Ledger(e) => e.is_transient(),
            StateFetchError::Decode(_) => false,
        }
    }
}

/// Failures reported by the wallet collaborator
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,

    /// The user (or signing device) refused the request
    #[error("signing declined: {0}")]
    Declined(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// The request was signed but the ledger refused it (e.g. preflight)
    #[error("send failed: {message}")]
    Send { code: Option<u32>, message: String },
}

/// Result of a failed `IssuanceSubmitter::submit`
#[derive(Error, Debug, Clone)]
pub enum SubmissionError {
    /// No request reached the ledger: wallet absent or signing declined
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The ledger refused the request; the signal is classified downstream
    #[error("submission failed: {}", .0.message)]
    Failed(FailureSignal),
}

impl From<WalletError> for SubmissionError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Send { code, message } => {
                SubmissionError::Failed(FailureSignal { code, message })
            }
            other => SubmissionError::Rejected(other.to_string()),
        }
    }
}
