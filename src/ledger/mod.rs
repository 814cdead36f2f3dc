//! Ledger connection collaborator
//!
//! The core reads the ledger only through `LedgerClient`; `RpcLedger` is the
//! production implementation over the nonblocking Solana RPC client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    transaction::TransactionError,
};

use crate::errors::LedgerError;

pub mod rpc;

pub use rpc::RpcLedger;

/// Settlement status of a submitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// Unknown to the node yet, or below the required commitment
    Pending,
    Confirmed,
    /// Landed with an error
    Errored { code: Option<u32>, detail: String },
}

/// Required confirmation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    #[serde(alias = "recent")]
    Processed,
    #[default]
    #[serde(alias = "singleGossip", alias = "single_gossip")]
    Confirmed,
    #[serde(alias = "max", alias = "root")]
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(c: Commitment) -> Self {
        let commitment = match c {
            Commitment::Processed => CommitmentLevel::Processed,
            Commitment::Confirmed => CommitmentLevel::Confirmed,
            Commitment::Finalized => CommitmentLevel::Finalized,
        };
        CommitmentConfig { commitment }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Commitment::Processed => f.write_str("processed"),
            Commitment::Confirmed => f.write_str("confirmed"),
            Commitment::Finalized => f.write_str("finalized"),
        }
    }
}

/// Read-only view of the ledger used by the mint core
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance in lamports
    async fn get_account_balance(&self, address: &Pubkey) -> Result<u64, LedgerError>;

    /// Raw data of a program-owned account
    async fn get_program_account_state(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError>;

    async fn get_request_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<RequestStatus, LedgerError>;
}

/// Custom program error code carried by a transaction error, if any
pub fn program_error_code(err: &TransactionError) -> Option<u32> {
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        commitment: Commitment,
    }

    #[test]
    fn test_commitment_aliases() {
        let w: Wrapper = toml::from_str("commitment = \"singleGossip\"").unwrap();
        assert_eq!(w.commitment, Commitment::Confirmed);
        let w: Wrapper = toml::from_str("commitment = \"finalized\"").unwrap();
        assert_eq!(w.commitment, Commitment::Finalized);
        let w: Wrapper = toml::from_str("commitment = \"recent\"").unwrap();
        assert_eq!(w.commitment, Commitment::Processed);
    }

    #[test]
    fn test_commitment_config_conversion() {
        let config: CommitmentConfig = Commitment::Finalized.into();
        assert_eq!(config, CommitmentConfig::finalized());
    }

    #[test]
    fn test_program_error_code() {
        let err = TransactionError::InstructionError(4, InstructionError::Custom(0x137));
        assert_eq!(program_error_code(&err), Some(0x137));
        assert_eq!(program_error_code(&TransactionError::BlockhashNotFound), None);
    }
}
