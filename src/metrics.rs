//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub mint_attempts_total: IntCounter,
    pub mint_success_total: IntCounter,
    pub mint_failed_total: IntCounterVec,
    pub mint_rejected_total: IntCounter,
    pub confirmation_timeouts_total: IntCounter,
    pub state_refresh_failures_total: IntCounter,

    // Gauges
    pub items_remaining: IntGauge,
    pub wallet_balance_lamports: IntGauge,

    // Histograms
    pub confirmation_latency: Histogram,
    pub rpc_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let mint_attempts_total = IntCounter::with_opts(Opts::new(
            "mint_attempts_total",
            "Mint attempts that passed the gate",
        ))?;

        let mint_success_total = IntCounter::with_opts(Opts::new(
            "mint_success_total",
            "Mint attempts confirmed on the ledger",
        ))?;

        let mint_failed_total = IntCounterVec::new(
            Opts::new("mint_failed_total", "Failed mint attempts by category"),
            &["category"],
        )?;

        let mint_rejected_total = IntCounter::with_opts(Opts::new(
            "mint_rejected_total",
            "Mint requests rejected by the gate without a network call",
        ))?;

        let confirmation_timeouts_total = IntCounter::with_opts(Opts::new(
            "confirmation_timeouts_total",
            "Attempts with no terminal status inside the confirmation budget",
        ))?;

        let state_refresh_failures_total = IntCounter::with_opts(Opts::new(
            "state_refresh_failures_total",
            "Sale state refreshes that failed and kept the previous state",
        ))?;

        let items_remaining = IntGauge::with_opts(Opts::new(
            "items_remaining",
            "Items remaining as of the last successful refresh",
        ))?;

        let wallet_balance_lamports = IntGauge::with_opts(Opts::new(
            "wallet_balance_lamports",
            "Connected wallet balance as of the last refresh",
        ))?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from submission to a terminal confirmation outcome",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;

        // Register all metrics
        registry.register(Box::new(mint_attempts_total.clone()))?;
        registry.register(Box::new(mint_success_total.clone()))?;
        registry.register(Box::new(mint_failed_total.clone()))?;
        registry.register(Box::new(mint_rejected_total.clone()))?;
        registry.register(Box::new(confirmation_timeouts_total.clone()))?;
        registry.register(Box::new(state_refresh_failures_total.clone()))?;
        registry.register(Box::new(items_remaining.clone()))?;
        registry.register(Box::new(wallet_balance_lamports.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            mint_attempts_total,
            mint_success_total,
            mint_failed_total,
            mint_rejected_total,
            confirmation_timeouts_total,
            state_refresh_failures_total,
            items_remaining,
            wallet_balance_lamports,
            confirmation_latency,
            rpc_latency,
        })
    }

    /// Prometheus text exposition of every registered metric
    pub fn export_text(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Gauge reading for an unsigned count, saturating at `i64::MAX`
pub fn gauge_value(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
    histogram_name: Option<&'static str>,
}

impl Timer {
    /// Create a timer with a histogram name for automatic recording
    pub fn with_name(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name: Some(histogram_name),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Finish the timer and record to the associated histogram
    pub fn finish(self) {
        let Some(name) = self.histogram_name else {
            return;
        };
        let duration = self.start.elapsed().as_secs_f64();
        match name {
            "confirmation_latency_seconds" => metrics().confirmation_latency.observe(duration),
            "rpc_latency_seconds" => metrics().rpc_latency.observe(duration),
            _ => tracing::debug!("Unknown histogram name: {}", name),
        }
    }
}
