//! Sale state reader
//!
//! Fetches the issuance program account and decodes it into `SaleState`
//! plus the `ProgramHandle` the submitter needs. Always a full re-read; the
//! reader keeps nothing between calls.

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, instrument};

use crate::candy_machine::CandyMachineAccount;
use crate::errors::StateFetchError;
use crate::ledger::LedgerClient;
use crate::types::SaleState;

/// Everything about the program needed to build a mint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramHandle {
    pub program_id: Pubkey,
    pub candy_machine: Pubkey,
    pub authority: Pubkey,
    /// Treasury recorded on chain
    pub treasury: Pubkey,
    pub config: Pubkey,
    pub token_mint: Option<Pubkey>,
    pub price_lamports: u64,
}

#[derive(Debug, Clone)]
pub struct SaleStateReader {
    program_id: Pubkey,
}

impl SaleStateReader {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    #[instrument(skip(self, ledger, identity), fields(identity = %identity))]
    pub async fn fetch(
        &self,
        ledger: &dyn LedgerClient,
        candy_machine_id: &Pubkey,
        identity: &Pubkey,
    ) -> Result<(SaleState, ProgramHandle), StateFetchError> {
        let data = ledger.get_program_account_state(candy_machine_id).await?;
        let account = CandyMachineAccount::decode(&data)?;
        let sale = account.sale_state();

        debug!(
            candy_machine = %candy_machine_id,
            items_available = sale.items_available,
            items_remaining = sale.items_remaining,
            go_live = ?sale.sale_start_time,
            "sale state fetched"
        );

        let handle = ProgramHandle {
            program_id: self.program_id,
            candy_machine: *candy_machine_id,
            authority: account.authority,
            treasury: account.wallet,
            config: account.config,
            token_mint: account.token_mint,
            price_lamports: account.price,
        };
        Ok((sale, handle))
    }
}
