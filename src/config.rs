//! Configuration module for the mint client
//!
//! Loads the TOML configuration file, applies `.env` / environment variable
//! overrides and resolves everything into the typed `SessionSettings`.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::candy_machine::CANDY_MACHINE_PROGRAM_ID;
use crate::issuance::MintAccounts;
use crate::ledger::Commitment;
use crate::session::SessionSettings;

/// Upper bound for `sale.not_live_recheck_secs` (one day)
pub const MAX_NOT_LIVE_RECHECK_SECS: u64 = 86_400;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Issuance program accounts
    #[serde(default)]
    pub program: ProgramConfig,

    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Sale timing and confirmation budget
    #[serde(default)]
    pub sale: SaleConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Issuance program id
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// Candy machine account
    #[serde(default)]
    pub candy_machine_id: String,

    /// Config account passed to `mint_nft`
    #[serde(default)]
    pub config_account: String,

    /// Treasury receiving the mint price
    #[serde(default)]
    pub treasury: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment required for reads and confirmation
    #[serde(default)]
    pub commitment: Commitment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Countdown target until the program state is first read (RFC 3339)
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// Confirmation budget in milliseconds
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,

    /// Status poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Gate stays closed this long after the program reports "not live"
    #[serde(default = "default_not_live_recheck_secs")]
    pub not_live_recheck_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Serve Prometheus metrics
    #[serde(default)]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_program_id() -> String { CANDY_MACHINE_PROGRAM_ID.to_string() }
fn default_rpc_endpoint() -> String { "https://api.devnet.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_tx_timeout_ms() -> u64 { 30_000 }
fn default_poll_interval_ms() -> u64 { 2_000 }
fn default_not_live_recheck_secs() -> u64 { 10 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_metrics_port() -> u16 { 9090 }

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            candy_machine_id: String::new(),
            config_account: String::new(),
            treasury: String::new(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_secs: default_rpc_timeout(),
            commitment: Commitment::default(),
        }
    }
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            tx_timeout_ms: default_tx_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            not_live_recheck_secs: default_not_live_recheck_secs(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MINT_*` overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("MINT_RPC_ENDPOINT") {
            self.rpc.endpoint = v;
        }
        if let Some(v) = lookup("MINT_CANDY_MACHINE_ID") {
            self.program.candy_machine_id = v;
        }
        if let Some(v) = lookup("MINT_CONFIG_ACCOUNT") {
            self.program.config_account = v;
        }
        if let Some(v) = lookup("MINT_TREASURY") {
            self.program.treasury = v;
        }
        if let Some(v) = lookup("MINT_START_DATE") {
            self.sale.start_date = Some(parse_start_date(&v)?);
        }
        if let Some(v) = lookup("MINT_TX_TIMEOUT_MS") {
            self.sale.tx_timeout_ms = v
                .parse()
                .with_context(|| format!("MINT_TX_TIMEOUT_MS is not a number: {}", v))?;
        }
        if let Some(v) = lookup("MINT_KEYPAIR_PATH") {
            self.wallet.keypair_path = v;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.session_settings().map(|_| ())
    }

    /// Check constraints and resolve the typed session settings
    pub fn session_settings(&self) -> Result<SessionSettings> {
        if self.sale.tx_timeout_ms == 0 {
            bail!("sale.tx_timeout_ms must be greater than zero");
        }
        if self.sale.poll_interval_ms == 0 {
            bail!("sale.poll_interval_ms must be greater than zero");
        }
        if self.sale.poll_interval_ms > self.sale.tx_timeout_ms {
            bail!(
                "sale.poll_interval_ms ({}) exceeds sale.tx_timeout_ms ({})",
                self.sale.poll_interval_ms,
                self.sale.tx_timeout_ms
            );
        }
        if self.sale.not_live_recheck_secs > MAX_NOT_LIVE_RECHECK_SECS {
            bail!(
                "sale.not_live_recheck_secs ({}) exceeds {}",
                self.sale.not_live_recheck_secs,
                MAX_NOT_LIVE_RECHECK_SECS
            );
        }
        if self.rpc.timeout_secs == 0 {
            bail!("rpc.timeout_secs must be greater than zero");
        }

        Ok(SessionSettings {
            program_id: parse_pubkey("program.program_id", &self.program.program_id)?,
            candy_machine_id: parse_pubkey("program.candy_machine_id", &self.program.candy_machine_id)?,
            accounts: MintAccounts {
                config: parse_pubkey("program.config_account", &self.program.config_account)?,
                treasury: parse_pubkey("program.treasury", &self.program.treasury)?,
            },
            initial_start: self.sale.start_date,
            tx_timeout: Duration::from_millis(self.sale.tx_timeout_ms),
            poll_interval: Duration::from_millis(self.sale.poll_interval_ms),
            commitment: self.rpc.commitment,
            not_live_recheck: Duration::from_secs(self.sale.not_live_recheck_secs),
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    /// Keypair path with a leading `~` expanded
    pub fn keypair_path(&self) -> String {
        expand_home(&self.wallet.keypair_path)
    }
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    if value.trim().is_empty() {
        bail!("{} is required", field);
    }
    Pubkey::from_str(value.trim()).map_err(|e| anyhow!("{} is not a valid address ({}): {}", field, value, e))
}

/// RFC 3339 timestamp or unix milliseconds
pub fn parse_start_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ms) = value.trim().parse::<i64>() {
        return Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| anyhow!("start date out of range: {}", value));
    }
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("start date is neither RFC 3339 nor unix millis: {}", value))
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_date_formats() {
        let a = parse_start_date("1640000000000").unwrap();
        let b = parse_start_date("2021-12-20T11:33:20Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_start_date("next tuesday").is_err());
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/etc/key.json"), "/etc/key.json");
    }
}
