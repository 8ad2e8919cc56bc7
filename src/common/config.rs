use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "JITTER_TICKER";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TickerConfig {
    pub interval_ms: u64,
    pub jitter_ms: u64,
    /// How long the demo runner keeps the ticker alive.
    #[serde(default)]
    pub run_for_ms: Option<u64>,
}

impl TickerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn run_for(&self) -> Duration {
        Duration::from_millis(self.run_for_ms.unwrap_or(1000))
    }
}

pub fn load_ticker_config(path: &str) -> Result<TickerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ticker config {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid ticker config {}", path))
}

/// Reads `JITTER_TICKER_INTERVAL_MS`, `JITTER_TICKER_JITTER_MS` and
/// `JITTER_TICKER_RUN_FOR_MS`, after loading a `.env` file if one exists.
pub fn load_ticker_config_from_env() -> Result<TickerConfig> {
    dotenv::dotenv().ok();
    load_ticker_config_from_vars(None)
}

/// Same as [`load_ticker_config_from_env`] but reads `vars` instead of the
/// process environment when given.
pub fn load_ticker_config_from_vars(vars: Option<config::Map<String, String>>) -> Result<TickerConfig> {
    let env = config::Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .source(vars);
    let config = config::Config::builder()
        .set_default("interval_ms", 1000_i64)?
        .set_default("jitter_ms", 100_i64)?
        .add_source(env)
        .build()?;
    Ok(config.try_deserialize()?)
}
