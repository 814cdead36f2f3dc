//! Issuance submitter
//!
//! Builds one mint request (new mint account, token account, one token,
//! Candy Machine `mint_nft`) and hands it to the wallet. Exactly one dispatch
//! per call; retrying is the user's decision once the gate reopens.

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signature, Signer},
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use spl_token::solana_program::program_pack::Pack;
use tracing::warn;

use crate::candy_machine::{mint_nft_instruction, MintNftAccounts};
use crate::errors::SubmissionError;
use crate::observability::AttemptLogger;
use crate::sale_state::ProgramHandle;
use crate::wallet::{IssuanceRequest, Wallet};

/// Program accounts supplied by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintAccounts {
    pub config: Pubkey,
    pub treasury: Pubkey,
}

#[derive(Debug, Clone, Default)]
pub struct IssuanceSubmitter;

impl IssuanceSubmitter {
    pub fn new() -> Self {
        Self
    }

    /// Build the instruction list for minting into `mint` on behalf of `payer`
    pub fn build_instructions(
        &self,
        handle: &ProgramHandle,
        payer: &Pubkey,
        accounts: &MintAccounts,
        mint: &Pubkey,
    ) -> Result<Vec<Instruction>, SubmissionError> {
        let token_program = spl_token::id();
        let rent = Rent::default().minimum_balance(spl_token::state::Mint::LEN);
        let token_account = get_associated_token_address(payer, mint);

        let init_mint =
            spl_token::instruction::initialize_mint(&token_program, mint, payer, Some(payer), 0)
                .map_err(|e| SubmissionError::Rejected(format!("initialize_mint: {}", e)))?;
        let mint_to =
            spl_token::instruction::mint_to(&token_program, mint, &token_account, payer, &[], 1)
                .map_err(|e| SubmissionError::Rejected(format!("mint_to: {}", e)))?;

        Ok(vec![
            system_instruction::create_account(
                payer,
                mint,
                rent,
                spl_token::state::Mint::LEN as u64,
                &token_program,
            ),
            init_mint,
            create_associated_token_account(payer, payer, mint, &token_program),
            mint_to,
            mint_nft_instruction(
                &handle.program_id,
                &MintNftAccounts {
                    config: accounts.config,
                    candy_machine: handle.candy_machine,
                    payer: *payer,
                    treasury: accounts.treasury,
                    mint: *mint,
                },
            ),
        ])
    }

    /// Build and dispatch one mint request through the wallet
    pub async fn submit(
        &self,
        handle: &ProgramHandle,
        wallet: &dyn Wallet,
        accounts: &MintAccounts,
        logger: &AttemptLogger,
    ) -> Result<Signature, SubmissionError> {
        let Some(payer) = wallet.current_identity() else {
            return Err(SubmissionError::Rejected("wallet not connected".to_string()));
        };

        if accounts.treasury != handle.treasury {
            warn!(
                configured = %accounts.treasury,
                on_chain = %handle.treasury,
                "configured treasury differs from the program's treasury"
            );
        }

        let mint = Keypair::new();
        let instructions = self.build_instructions(handle, &payer, accounts, &mint.pubkey())?;

        logger.log_submit(&handle.candy_machine.to_string(), &payer.to_string());
        let request = IssuanceRequest {
            payer,
            instructions,
            co_signers: vec![mint],
        };

        let signature = wallet.sign_and_send(request).await?;
        logger.log_submitted(&signature);
        Ok(signature)
    }
}
