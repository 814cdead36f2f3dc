//! Candy Machine v1 program layout
//!
//! Account decoding, PDA derivation and `mint_nft` instruction encoding for
//! the issuance program. Everything here is pure; no ledger access.

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::errors::DecodeError;
use crate::types::SaleState;

/// Candy Machine v1 program id
pub const CANDY_MACHINE_PROGRAM_ID: Pubkey = pubkey!("cndyAnrLdpjq1Ssp1z8xxDsB8dxe7u4HL5Nxi2K5WXZ");

/// Token Metadata program id
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

const METADATA_SEED: &[u8] = b"metadata";
const EDITION_SEED: &[u8] = b"edition";

/// Anchor discriminator: first 8 bytes of `sha256("<namespace>:<name>")`
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Decoded Candy Machine account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandyMachineAccount {
    pub authority: Pubkey,
    pub wallet: Pubkey,
    pub token_mint: Option<Pubkey>,
    pub config: Pubkey,
    pub uuid: String,
    pub price: u64,
    pub items_available: u64,
    /// Unix seconds
    pub go_live_date: Option<i64>,
    pub items_redeemed: u64,
    pub bump: u8,
}

impl CandyMachineAccount {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(data);

        let disc = reader.take(8)?;
        if disc != discriminator("account", "CandyMachine") {
            return Err(DecodeError::BadDiscriminator);
        }

        Ok(Self {
            authority: reader.pubkey()?,
            wallet: reader.pubkey()?,
            token_mint: reader.option(|r| r.pubkey())?,
            config: reader.pubkey()?,
            uuid: reader.string()?,
            price: reader.u64()?,
            items_available: reader.u64()?,
            go_live_date: reader.option(|r| r.i64())?,
            items_redeemed: reader.u64()?,
            bump: reader.u8()?,
        })
    }

    /// Go-live date as a timestamp; out-of-range values are treated as unset
    pub fn go_live(&self) -> Option<DateTime<Utc>> {
        self.go_live_date
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn sale_state(&self) -> SaleState {
        SaleState::new(self.items_available, self.items_redeemed, self.go_live(), self.price)
    }
}

/// Little-endian cursor over Anchor/Borsh encoded account bytes
struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.data.len().saturating_sub(self.offset);
        if remaining < len {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: len - remaining,
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    fn pubkey(&mut self) -> Result<Pubkey, DecodeError> {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(self.take(32)?);
        Ok(Pubkey::new_from_array(buf))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let start = self.offset;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(start))
    }

    fn option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        let offset = self.offset;
        match self.u8()? {
            0 => Ok(None),
            1 => read(self).map(Some),
            tag => Err(DecodeError::InvalidOptionTag { tag, offset }),
        }
    }
}

/// Metadata PDA for a mint
pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_SEED, TOKEN_METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

/// Master edition PDA for a mint
pub fn master_edition_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            METADATA_SEED,
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
            EDITION_SEED,
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

/// Accounts for one `mint_nft` call
#[derive(Debug, Clone)]
pub struct MintNftAccounts {
    pub config: Pubkey,
    pub candy_machine: Pubkey,
    pub payer: Pubkey,
    pub treasury: Pubkey,
    pub mint: Pubkey,
}

/// Build the Candy Machine `mint_nft` instruction.
///
/// The payer acts as mint authority and update authority.
pub fn mint_nft_instruction(program_id: &Pubkey, accounts: &MintNftAccounts) -> Instruction {
    let metas = vec![
        AccountMeta::new_readonly(accounts.config, false),
        AccountMeta::new(accounts.candy_machine, false),
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new(accounts.treasury, false),
        AccountMeta::new(metadata_address(&accounts.mint), false),
        AccountMeta::new(accounts.mint, false),
        AccountMeta::new_readonly(accounts.payer, true),
        AccountMeta::new_readonly(accounts.payer, true),
        AccountMeta::new(master_edition_address(&accounts.mint), false),
        AccountMeta::new_readonly(TOKEN_METADATA_PROGRAM_ID, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts: metas,
        data: discriminator("global", "mint_nft").to_vec(),
    }
}

/// Encode an account in the on-chain layout (fixtures and tooling)
pub fn encode_account(account: &CandyMachineAccount) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(&discriminator("account", "CandyMachine"));
    out.extend_from_slice(account.authority.as_ref());
    out.extend_from_slice(account.wallet.as_ref());
    match &account.token_mint {
        Some(mint) => {
            out.push(1);
            out.extend_from_slice(mint.as_ref());
        }
        None => out.push(0),
    }
    out.extend_from_slice(account.config.as_ref());
    out.extend_from_slice(&(account.uuid.len() as u32).to_le_bytes());
    out.extend_from_slice(account.uuid.as_bytes());
    out.extend_from_slice(&account.price.to_le_bytes());
    out.extend_from_slice(&account.items_available.to_le_bytes());
    match account.go_live_date {
        Some(ts) => {
            out.push(1);
            out.extend_from_slice(&ts.to_le_bytes());
        }
        None => out.push(0),
    }
    out.extend_from_slice(&account.items_redeemed.to_le_bytes());
    out.push(account.bump);
    out
}
