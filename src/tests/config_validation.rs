//! Configuration loading and validation tests

use std::io::Write;
use std::time::Duration;

use crate::config::Config;
use crate::ledger::Commitment;

const CANDY_MACHINE: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
const CONFIG_ACCOUNT: &str = "SysvarRent111111111111111111111111111111111";
const TREASURY: &str = "SysvarC1ock11111111111111111111111111111111";

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn full_config() -> String {
    format!(
        r#"
[program]
candy_machine_id = "{CANDY_MACHINE}"
config_account = "{CONFIG_ACCOUNT}"
treasury = "{TREASURY}"

[rpc]
endpoint = "http://127.0.0.1:8899"
commitment = "singleGossip"

[sale]
start_date = "2021-09-01T16:00:00Z"
tx_timeout_ms = 45000
"#
    )
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.rpc.endpoint, "https://api.devnet.solana.com");
    assert_eq!(config.rpc.commitment, Commitment::Confirmed);
    assert_eq!(config.sale.tx_timeout_ms, 30_000);
    assert_eq!(config.sale.poll_interval_ms, 2_000);
    assert_eq!(config.sale.not_live_recheck_secs, 10);
    assert!(!config.monitoring.enable_metrics);
    assert_eq!(
        config.program.program_id,
        crate::candy_machine::CANDY_MACHINE_PROGRAM_ID.to_string()
    );
}

#[test]
fn test_load_full_config() {
    let file = write_config(&full_config());
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.rpc.endpoint, "http://127.0.0.1:8899");
    assert_eq!(config.rpc.commitment, Commitment::Confirmed);
    assert_eq!(config.sale.tx_timeout_ms, 45_000);
    // Unspecified fields keep their defaults
    assert_eq!(config.sale.poll_interval_ms, 2_000);

    let settings = config.session_settings().unwrap();
    assert_eq!(settings.candy_machine_id.to_string(), CANDY_MACHINE);
    assert_eq!(settings.accounts.treasury.to_string(), TREASURY);
    assert_eq!(settings.tx_timeout, Duration::from_millis(45_000));
    assert_eq!(
        settings.initial_start.unwrap().timestamp(),
        1_630_512_000
    );
}

#[test]
fn test_missing_candy_machine_is_rejected() {
    let config = Config::default();
    let err = config.session_settings().unwrap_err();
    assert!(err.to_string().contains("program.candy_machine_id"));
}

#[test]
fn test_invalid_address_is_rejected() {
    let file = write_config(&full_config().replace(TREASURY, "not-a-pubkey"));
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    let err = config.session_settings().unwrap_err();
    assert!(err.to_string().contains("program.treasury"));
}

#[test]
fn test_timeout_constraints() {
    let file = write_config(&full_config());
    let mut config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    assert!(config.validate().is_ok());

    config.sale.tx_timeout_ms = 0;
    assert!(config.validate().is_err());

    config.sale.tx_timeout_ms = 1_000;
    config.sale.poll_interval_ms = 5_000;
    let err = config.session_settings().unwrap_err();
    assert!(err.to_string().contains("exceeds"));
}

#[test]
fn test_env_overrides() {
    let file = write_config(&full_config());
    let mut config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    config
        .apply_env(|key| match key {
            "MINT_RPC_ENDPOINT" => Some("http://override:8899".to_string()),
            "MINT_START_DATE" => Some("1630512000000".to_string()),
            "MINT_TX_TIMEOUT_MS" => Some("60000".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.rpc.endpoint, "http://override:8899");
    assert_eq!(config.sale.tx_timeout_ms, 60_000);
    assert_eq!(config.sale.start_date.unwrap().timestamp(), 1_630_512_000);
    // Untouched by the lookup
    assert_eq!(config.program.treasury, TREASURY);
}

#[test]
fn test_env_override_rejects_garbage() {
    let mut config = Config::default();
    assert!(config
        .apply_env(|key| (key == "MINT_TX_TIMEOUT_MS").then(|| "soon".to_string()))
        .is_err());
}

#[test]
fn test_unreadable_file() {
    assert!(Config::from_file("/nonexistent/mint.toml").is_err());
}

#[test]
fn test_not_live_recheck_is_bounded() {
    let file = write_config(&full_config());
    let mut config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    config.sale.not_live_recheck_secs = crate::config::MAX_NOT_LIVE_RECHECK_SECS;
    assert!(config.validate().is_ok());

    config.sale.not_live_recheck_secs = 1_000_000_000_000_000;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("not_live_recheck_secs"));
}

#[test]
fn test_program_section_may_come_from_env() {
    let file = write_config("[rpc]\nendpoint = \"http://127.0.0.1:8899\"\n");
    let mut config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(
        config.program.program_id,
        crate::candy_machine::CANDY_MACHINE_PROGRAM_ID.to_string()
    );

    config
        .apply_env(|key| match key {
            "MINT_CANDY_MACHINE_ID" => Some(CANDY_MACHINE.to_string()),
            "MINT_CONFIG_ACCOUNT" => Some(CONFIG_ACCOUNT.to_string()),
            "MINT_TREASURY" => Some(TREASURY.to_string()),
            _ => None,
        })
        .unwrap();

    let settings = config.session_settings().unwrap();
    assert_eq!(settings.candy_machine_id.to_string(), CANDY_MACHINE);
    assert_eq!(settings.accounts.config.to_string(), CONFIG_ACCOUNT);
}
