//! Infomint - Candy Machine mint client
//!
//! Keeps a local view of a time-gated sale in sync with the issuance
//! program, gates the mint action on that view, submits mint requests and
//! reports one classified outcome per attempt.
//!
//! ## Components
//!
//! - **Sale state**: decodes the program account into supply and go-live time
//! - **Mint gate**: WaitingForStart / Active / SoldOut / Submitting
//! - **Issuance**: builds and dispatches the mint request through the wallet
//! - **Confirmation**: bounded polling for a terminal status
//! - **Classifier**: maps program error codes to user-facing categories
//! - **Session**: the sync loop tying them together

pub mod candy_machine;
pub mod classifier;
pub mod config;
pub mod confirmation;
pub mod endpoints;
pub mod errors;
pub mod gate;
pub mod issuance;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod presentation;
pub mod sale_state;
pub mod session;
pub mod test_utils;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use session::{MintSession, PendingAttempt, SessionSettings};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use types::{AttemptOutcome, FailureCategory, GateState, Notification, SaleState, SaleView};
