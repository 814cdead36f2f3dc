//! `LedgerClient` over the nonblocking Solana RPC client

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    request::RpcError,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::TransactionStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{program_error_code, Commitment, LedgerClient, RequestStatus};
use crate::errors::LedgerError;
use crate::metrics::Timer;

/// Ledger reads against a single RPC endpoint
#[derive(Clone)]
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: Commitment,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("endpoint", &self.client.url())
            .field("commitment", &self.commitment)
            .finish()
    }
}

impl RpcLedger {
    pub fn new(endpoint: &str, timeout: Duration, commitment: Commitment) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            endpoint.to_string(),
            timeout,
            commitment.into(),
        );
        Self::from_client(Arc::new(client), commitment)
    }

    pub fn from_client(client: Arc<RpcClient>, commitment: Commitment) -> Self {
        Self { client, commitment }
    }

    /// Shared client, handed to the wallet so it sends through the same endpoint
    pub fn client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    #[instrument(skip(self), level = "debug")]
    async fn get_account_balance(&self, address: &Pubkey) -> Result<u64, LedgerError> {
        let timer = Timer::with_name("rpc_latency_seconds");
        let result = self.client.get_balance(address).await;
        timer.finish();
        result.map_err(map_client_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_program_account_state(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
        let timer = Timer::with_name("rpc_latency_seconds");
        let result = self
            .client
            .get_account_with_commitment(address, self.commitment.into())
            .await;
        timer.finish();

        match result.map_err(map_client_error)?.value {
            Some(account) => Ok(account.data),
            None => Err(LedgerError::AccountNotFound(*address)),
        }
    }

    async fn get_request_status(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<RequestStatus, LedgerError> {
        let timer = Timer::with_name("rpc_latency_seconds");
        let result = self.client.get_signature_statuses(&[*signature]).await;
        timer.finish();

        let status: Option<TransactionStatus> = result
            .map_err(map_client_error)?
            .value
            .into_iter()
            .next()
            .flatten();

        let Some(status) = status else {
            debug!(%signature, "signature not yet visible");
            return Ok(RequestStatus::Pending);
        };

        if let Some(err) = &status.err {
            return Ok(RequestStatus::Errored {
                code: program_error_code(err),
                detail: err.to_string(),
            });
        }

        let required: CommitmentConfig = commitment.into();
        if status.satisfies_commitment(required) {
            Ok(RequestStatus::Confirmed)
        } else {
            Ok(RequestStatus::Pending)
        }
    }
}

/// Map an RPC client failure onto the ledger error taxonomy
pub fn map_client_error(err: ClientError) -> LedgerError {
    match err.kind() {
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            LedgerError::Transport(err.to_string())
        }
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            LedgerError::Rpc {
                code: Some(*code),
                message: message.clone(),
            }
        }
        _ => LedgerError::Rpc {
            code: None,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_rpc_client_api::request::RpcResponseErrorData;

    #[test]
    fn test_map_rpc_response_error() {
        let err = ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code: -32005,
            message: "Node is behind".to_string(),
            data: RpcResponseErrorData::Empty,
        }));

        match map_client_error(err) {
            LedgerError::Rpc { code, message } => {
                assert_eq!(code, Some(-32005));
                assert_eq!(message, "Node is behind");
            }
            other => panic!("Expected Rpc variant, got {:?}", other),
        }
    }

    #[test]
    fn test_map_io_error_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ClientError::from(ClientErrorKind::Io(io));
        assert!(matches!(map_client_error(err), LedgerError::Transport(_)));
    }
}
