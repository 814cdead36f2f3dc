//! Sale state reader tests against a scripted ledger

use solana_sdk::pubkey::Pubkey;

use crate::candy_machine::CANDY_MACHINE_PROGRAM_ID;
use crate::errors::{DecodeError, LedgerError, StateFetchError};
use crate::sale_state::SaleStateReader;
use crate::test_utils::{candy_machine_bytes, mint_accounts, MockLedger};

#[tokio::test]
async fn test_fetch_decodes_supply_and_start() {
    let accounts = mint_accounts();
    let ledger = MockLedger::new(0);
    ledger.push_account(candy_machine_bytes(100, 99, Some(1_630_512_000), &accounts));

    let reader = SaleStateReader::new(CANDY_MACHINE_PROGRAM_ID);
    let candy_machine = Pubkey::new_unique();
    let (sale, handle) = reader
        .fetch(&ledger, &candy_machine, &Pubkey::new_unique())
        .await
        .unwrap();

    assert_eq!(sale.items_available, 100);
    assert_eq!(sale.items_redeemed, 99);
    assert_eq!(sale.items_remaining, 1);
    assert_eq!(sale.sale_start_time.unwrap().timestamp(), 1_630_512_000);
    assert_eq!(sale.price_lamports, 1_000_000_000);

    assert_eq!(handle.candy_machine, candy_machine);
    assert_eq!(handle.treasury, accounts.treasury);
    assert_eq!(handle.config, accounts.config);
    assert_eq!(handle.program_id, CANDY_MACHINE_PROGRAM_ID);
}

#[tokio::test]
async fn test_fetch_without_go_live_date() {
    let accounts = mint_accounts();
    let ledger = MockLedger::new(0);
    ledger.push_account(candy_machine_bytes(10, 0, None, &accounts));

    let (sale, _) = SaleStateReader::new(CANDY_MACHINE_PROGRAM_ID)
        .fetch(&ledger, &Pubkey::new_unique(), &Pubkey::new_unique())
        .await
        .unwrap();

    assert!(sale.sale_start_time.is_none());
    assert_eq!(sale.items_remaining, 10);
}

#[tokio::test]
async fn test_every_fetch_is_a_full_read() {
    let accounts = mint_accounts();
    let ledger = MockLedger::new(0);
    ledger.push_account(candy_machine_bytes(100, 10, None, &accounts));
    ledger.push_account(candy_machine_bytes(100, 11, None, &accounts));

    let reader = SaleStateReader::new(CANDY_MACHINE_PROGRAM_ID);
    let cm = Pubkey::new_unique();
    let identity = Pubkey::new_unique();

    let (first, _) = reader.fetch(&ledger, &cm, &identity).await.unwrap();
    let (second, _) = reader.fetch(&ledger, &cm, &identity).await.unwrap();

    assert_eq!(first.items_remaining, 90);
    assert_eq!(second.items_remaining, 89);
    assert_eq!(ledger.state_calls(), 2);
}

#[tokio::test]
async fn test_ledger_failure_surfaces_as_state_fetch_error() {
    let ledger = MockLedger::new(0);
    ledger.push_account_error(LedgerError::Transport("connection refused".to_string()));

    let err = SaleStateReader::new(CANDY_MACHINE_PROGRAM_ID)
        .fetch(&ledger, &Pubkey::new_unique(), &Pubkey::new_unique())
        .await
        .unwrap_err();

    assert!(matches!(err, StateFetchError::Ledger(LedgerError::Transport(_))));
}

#[tokio::test]
async fn test_foreign_account_fails_to_decode() {
    let ledger = MockLedger::new(0);
    ledger.push_account(vec![0u8; 300]);

    let err = SaleStateReader::new(CANDY_MACHINE_PROGRAM_ID)
        .fetch(&ledger, &Pubkey::new_unique(), &Pubkey::new_unique())
        .await
        .unwrap_err();

    assert!(matches!(err, StateFetchError::Decode(DecodeError::BadDiscriminator)));
}
