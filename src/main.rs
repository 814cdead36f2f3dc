//! Infomint - Candy Machine mint client
//!
//! Console front end for a time-gated Candy Machine sale: shows the wallet
//! balance, the remaining supply and a countdown until the sale opens, and
//! mints one item each time `mint` is entered.
//!
//! ## Features
//!
//! - **Sale sync**: program state read on connect and after every attempt
//! - **Mint gate**: countdown, sold-out latch, one attempt in flight at a time
//! - **Classified outcomes**: sold out, not live, insufficient funds
//! - **Metrics**: optional Prometheus endpoint

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::{BoxFuture, FutureExt, OptionFuture};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infomint::config::Config;
use infomint::endpoints;
use infomint::gate::SystemClock;
use infomint::ledger::RpcLedger;
use infomint::presentation::{render_lines, ConsolePresenter, Presenter};
use infomint::session::MintSession;
use infomint::types::{AttemptOutcome, Notification};
use infomint::wallet::KeypairWallet;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mint.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Metrics port (overrides monitoring.metrics_port)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Starting infomint");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("Loading configuration from: {}", args.config);
    let config = load_config(&args.config)?;
    let settings = config
        .session_settings()
        .context("Invalid configuration")?;

    let ledger = RpcLedger::new(&config.rpc.endpoint, config.rpc_timeout(), config.rpc.commitment);
    info!(endpoint = %config.rpc.endpoint, commitment = %config.rpc.commitment, "RPC ledger ready");

    let keypair_path = config.keypair_path();
    info!("Loading wallet from: {}", keypair_path);
    let wallet = KeypairWallet::from_file(&keypair_path, ledger.client(), config.rpc.commitment)
        .context("Failed to load wallet")?;
    info!("Wallet address: {}", wallet.pubkey());

    if config.monitoring.enable_metrics {
        let metrics_port = args.metrics_port.unwrap_or(config.monitoring.metrics_port);
        info!("Starting metrics server on port {}", metrics_port);
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let session = MintSession::new(
        settings,
        Arc::new(ledger),
        Arc::new(wallet),
        Arc::new(SystemClock),
    );

    run_event_loop(session, ConsolePresenter).await
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "infomint=debug,info"
    } else {
        "infomint=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults and environment", path);
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }
}

/// Main event loop
///
/// Single task: user input, the one-second tick and the in-flight attempt
/// are multiplexed here, so session state has exactly one writer.
async fn run_event_loop(mut session: MintSession, presenter: impl Presenter) -> Result<()> {
    info!("Event loop started, type `mint` to mint");

    let gate = session.connect().await;
    info!(gate = %gate, "Initial sync finished");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut tick = tokio::time::interval(tokio::time::Duration::from_secs(1));
    let mut in_flight: Option<BoxFuture<'static, AttemptOutcome>> = None;
    let mut last_rendered: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(input)) => match input.trim() {
                        "mint" | "m" => match session.begin_attempt() {
                            Ok(attempt) => {
                                info!(attempt_id = %attempt.attempt_id(), "Mint attempt started");
                                in_flight = Some(attempt.run().boxed());
                            }
                            Err(state) => presenter.notify(&Notification::error(
                                format!("Mint unavailable ({})", state),
                                None,
                            )),
                        },
                        "" => {}
                        other => warn!("Unknown command '{}'", other),
                    },
                    Ok(None) => {
                        info!("Input closed, waiting for shutdown signal");
                        stdin_open = false;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        stdin_open = false;
                    }
                }
            }

            Some(outcome) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                in_flight = None;
                let notification = session.finish_attempt(outcome).await;
                presenter.notify(&notification);
            }

            _ = tick.tick() => {
                session.tick();
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }

        let view = session.view();
        let rendered = render_lines(&view);
        if rendered != last_rendered {
            presenter.render(&view);
            last_rendered = rendered;
        }
    }

    if in_flight.is_some() {
        warn!("Shutting down with a mint attempt in flight; its outcome is unknown");
    }
    info!("Shutting down gracefully...");
    Ok(())
}
