// =============================================================================
// Runtime Configuration — dashboard settings with atomic save
// =============================================================================
//
// Every tunable setting lives here: watched symbols, history window, refresh
// interval and the signal parameters adjusted from the dashboard form.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::market_data::client::DEFAULT_BASE_URL;
use crate::signals::SignalParameters;

pub const DEFAULT_CONFIG_PATH: &str = "signal_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "LTCUSDT".to_string(),
        "XRPUSDT".to_string(),
    ]
}

fn default_lookback_days() -> u32 {
    30
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Symbols the dashboard tracks.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Days of hourly history fetched on every refresh.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Seconds between scheduled refreshes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Base URL of the price API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Address the HTTP API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Parameters applied to every timeframe.
    #[serde(default)]
    pub signal_params: SignalParameters,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            lookback_days: default_lookback_days(),
            poll_interval_secs: default_poll_interval_secs(),
            api_base_url: default_api_base_url(),
            bind_addr: default_bind_addr(),
            signal_params: SignalParameters::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;
        config.sanitize();

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            poll_interval_secs = config.poll_interval_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Replace the symbol list from a comma-separated string such as
    /// `"btcusdt, ETHUSDT"`. Blank entries are dropped.
    pub fn apply_symbols_override(&mut self, raw: &str) {
        let symbols = normalize_symbols(raw.split(','));
        if !symbols.is_empty() {
            self.symbols = symbols;
        }
    }

    /// Repair values that would make the service unusable.
    fn sanitize(&mut self) {
        if let Err(e) = self.signal_params.validate() {
            warn!(error = %e, "invalid signal parameters in config, using defaults");
            self.signal_params = SignalParameters::default();
        }
        if self.poll_interval_secs == 0 {
            warn!("poll_interval_secs must be positive, using default");
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.lookback_days == 0 {
            warn!("lookback_days must be positive, using default");
            self.lookback_days = default_lookback_days();
        }
        self.symbols = normalize_symbols(self.symbols.iter().map(String::as_str));
        if self.symbols.is_empty() {
            warn!("no usable symbols in config, using defaults");
            self.symbols = default_symbols();
        }
    }
}

/// Trim and uppercase symbols, dropping blanks and repeats.
fn normalize_symbols<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for s in raw.map(|s| s.trim().to_uppercase()) {
        if !s.is_empty() && !symbols.contains(&s) {
            symbols.push(s);
        }
    }
    symbols
}
