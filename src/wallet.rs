//! Wallet collaborator
//!
//! The core asks the wallet for its identity and hands it a request to sign
//! and dispatch. Signing material never leaves the wallet implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::debug;

use crate::errors::WalletError;
use crate::ledger::{program_error_code, Commitment};

/// Unsigned issuance request
///
/// `co_signers` are ephemeral keys created for this request only (the new
/// mint account); the wallet adds its own signature as fee payer.
#[derive(Debug)]
pub struct IssuanceRequest {
    pub payer: Pubkey,
    pub instructions: Vec<Instruction>,
    pub co_signers: Vec<Keypair>,
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Connected address, `None` when no wallet is connected
    fn current_identity(&self) -> Option<Pubkey>;

    /// Sign the request and dispatch it, returning its signature
    async fn sign_and_send(&self, request: IssuanceRequest) -> Result<Signature, WalletError>;
}

/// File-backed keypair wallet that sends through an RPC endpoint
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
    client: Arc<RpcClient>,
    commitment: Commitment,
}

impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("pubkey", &self.keypair.pubkey())
            .field("commitment", &self.commitment)
            .finish()
    }
}

impl KeypairWallet {
    /// Load a keypair file (JSON byte array or raw 64 bytes)
    pub fn from_file(path: &str, client: Arc<RpcClient>, commitment: Commitment) -> Result<Self> {
        let keypair = load_keypair(path)?;
        Ok(Self::from_keypair(keypair, client, commitment))
    }

    pub fn from_keypair(keypair: Keypair, client: Arc<RpcClient>, commitment: Commitment) -> Self {
        Self {
            keypair: Arc::new(keypair),
            client,
            commitment,
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Sign as fee payer together with the request's co-signers.
    /// Kept synchronous: `&dyn Signer` is not `Sync`.
    pub fn sign(&self, request: &IssuanceRequest, blockhash: Hash) -> Result<Transaction, WalletError> {
        let mut tx = Transaction::new_with_payer(&request.instructions, Some(&request.payer));
        let mut signers: Vec<&dyn Signer> = vec![self.keypair.as_ref()];
        signers.extend(request.co_signers.iter().map(|k| k as &dyn Signer));
        tx.try_sign(&signers, blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(tx)
    }
}

/// Read a keypair, rejecting all-zero keys and wrong lengths
pub fn load_keypair(path: &str) -> Result<Keypair> {
    let keypair_bytes =
        std::fs::read(path).with_context(|| format!("Failed to read keypair file: {}", path))?;

    let bytes = if keypair_bytes.len() == 64 {
        keypair_bytes
    } else {
        let json: Vec<u8> =
            serde_json::from_slice(&keypair_bytes).context("Failed to parse keypair JSON")?;
        if json.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", json.len());
        }
        json
    };

    if bytes.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(bytes.as_slice()).context("Invalid keypair bytes")
}

#[async_trait]
impl Wallet for KeypairWallet {
    fn current_identity(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn sign_and_send(&self, request: IssuanceRequest) -> Result<Signature, WalletError> {
        if request.payer != self.keypair.pubkey() {
            return Err(WalletError::Declined(format!(
                "request payer {} is not this wallet",
                request.payer
            )));
        }

        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| WalletError::Send {
                code: None,
                message: format!("failed to fetch blockhash: {}", e),
            })?;

        let tx = self.sign(&request, blockhash)?;

        let preflight: CommitmentConfig = self.commitment.into();
        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(preflight.commitment),
            ..RpcSendTransactionConfig::default()
        };

        debug!(instructions = request.instructions.len(), "sending signed mint transaction");
        self.client
            .send_transaction_with_config(&tx, config)
            .await
            .map_err(|e| WalletError::Send {
                code: e.get_transaction_error().as_ref().and_then(program_error_code),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_keypair_json() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = load_keypair(file.path().to_str().unwrap()).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_load_keypair_raw_bytes() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&keypair.to_bytes()).unwrap();

        let loaded = load_keypair(file.path().to_str().unwrap()).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_load_keypair_rejects_zero_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&vec![0u8; 64]).unwrap().as_bytes())
            .unwrap();
        let err = load_keypair(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("all-zero"));
    }

    #[test]
    fn test_load_keypair_rejects_short_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[1,2,3]").unwrap();
        let err = load_keypair(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("expected 64 bytes"));
    }

    #[tokio::test]
    async fn test_foreign_payer_is_declined_before_network() {
        let client = Arc::new(RpcClient::new("http://127.0.0.1:1".to_string()));
        let wallet = KeypairWallet::from_keypair(Keypair::new(), client, Commitment::Confirmed);
        let request = IssuanceRequest {
            payer: Pubkey::new_unique(),
            instructions: vec![],
            co_signers: vec![],
        };
        let err = wallet.sign_and_send(request).await.unwrap_err();
        assert!(matches!(err, WalletError::Declined(_)));
    }

    fn create_mint_request(payer: &Keypair, mint: Keypair) -> IssuanceRequest {
        IssuanceRequest {
            payer: payer.pubkey(),
            instructions: vec![solana_sdk::system_instruction::create_account(
                &payer.pubkey(),
                &mint.pubkey(),
                1_461_600,
                82,
                &spl_token::id(),
            )],
            co_signers: vec![mint],
        }
    }

    #[test]
    fn test_sign_adds_payer_and_co_signers() {
        let payer = Keypair::new();
        let mint = Keypair::new();
        let mint_pubkey = mint.pubkey();
        let client = Arc::new(RpcClient::new("http://127.0.0.1:1".to_string()));
        let wallet = KeypairWallet::from_keypair(payer.insecure_clone(), client, Commitment::Confirmed);

        let tx = wallet
            .sign(&create_mint_request(&payer, mint), Hash::new_unique())
            .unwrap();

        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.message.account_keys[0], payer.pubkey());
        assert_eq!(tx.message.account_keys[1], mint_pubkey);
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_sign_without_required_co_signer_fails() {
        let payer = Keypair::new();
        let client = Arc::new(RpcClient::new("http://127.0.0.1:1".to_string()));
        let wallet = KeypairWallet::from_keypair(payer.insecure_clone(), client, Commitment::Confirmed);

        let mut request = create_mint_request(&payer, Keypair::new());
        request.co_signers.clear();

        let err = wallet.sign(&request, Hash::new_unique()).unwrap_err();
        assert!(matches!(err, WalletError::Signing(_)));
    }

    #[tokio::test]
    async fn test_sign_and_send_dispatches_signed_request() {
        let payer = Keypair::new();
        let client = Arc::new(RpcClient::new_mock("succeeds".to_string()));
        let wallet = KeypairWallet::from_keypair(payer.insecure_clone(), client, Commitment::Confirmed);

        let signature = wallet
            .sign_and_send(create_mint_request(&payer, Keypair::new()))
            .await
            .unwrap();

        assert_ne!(signature, Signature::default());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_send_failure() {
        let payer = Keypair::new();
        let client = Arc::new(RpcClient::new("http://127.0.0.1:1".to_string()));
        let wallet = KeypairWallet::from_keypair(payer.insecure_clone(), client, Commitment::Confirmed);

        let err = wallet
            .sign_and_send(create_mint_request(&payer, Keypair::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::Send { code: None, .. }));
    }
}
