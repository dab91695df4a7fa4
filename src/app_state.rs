// =============================================================================
// Central Application State
// =============================================================================
//
// Holds the latest signal snapshot per symbol, the runtime configuration and
// a capped error log. The poller is the only writer of snapshots; the HTTP
// handlers only read them.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
// =============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Notify;

use crate::indicators::rsi::rsi_zone;
use crate::runtime_config::RuntimeConfig;
use crate::signals::{MultiTimeframeSignals, SignalParameters, TimeframeLevels};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Symbol the failure relates to, if any.
    pub symbol: Option<String>,
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// Symbol Snapshot
// =============================================================================

/// Everything the dashboard shows for one symbol after a refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub current_price: Option<f64>,
    /// Latest daily RSI and its zone (OVERBOUGHT / OVERSOLD / NEUTRAL).
    pub daily_rsi: Option<f64>,
    pub rsi_zone: Option<&'static str>,
    /// Buy / sell counts on the daily table.
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub levels: Vec<TimeframeLevels>,
    pub params: SignalParameters,
    pub computed_at: DateTime<Utc>,
    pub signals: MultiTimeframeSignals,
}

impl SymbolSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        current_price: Option<f64>,
        params: SignalParameters,
        signals: MultiTimeframeSignals,
    ) -> Self {
        let daily_rsi = signals.one_day.latest().and_then(|row| row.rsi);
        Self {
            symbol: symbol.into(),
            current_price,
            daily_rsi,
            rsi_zone: daily_rsi.map(rsi_zone),
            buy_signals: signals.one_day.buy_count(),
            sell_signals: signals.one_day.sell_count(),
            levels: signals.latest_levels(),
            params,
            computed_at: Utc::now(),
            signals,
        }
    }
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Shared state handed to every task and handler via `Arc<AppState>`.
pub struct AppState {
    /// Incremented on every meaningful mutation.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    /// Where parameter changes are persisted.
    pub config_path: PathBuf,

    pub snapshots: RwLock<HashMap<String, SymbolSnapshot>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Wakes the poller for an immediate refresh.
    pub refresh_trigger: Arc<Notify>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig, config_path: impl Into<PathBuf>) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            config_path: config_path.into(),
            snapshots: RwLock::new(HashMap::new()),
            recent_errors: RwLock::new(Vec::new()),
            refresh_trigger: Arc::new(Notify::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Configuration ───────────────────────────────────────────────────

    pub fn symbols(&self) -> Vec<String> {
        self.runtime_config.read().symbols.clone()
    }

    pub fn signal_params(&self) -> SignalParameters {
        self.runtime_config.read().signal_params
    }

    /// Replace the signal parameters. Callers validate first.
    pub fn set_signal_params(&self, params: SignalParameters) -> RuntimeConfig {
        let snapshot = {
            let mut config = self.runtime_config.write();
            config.signal_params = params;
            config.clone()
        };
        self.increment_version();
        snapshot
    }

    /// Ask the poller to refresh every symbol as soon as possible.
    pub fn request_refresh(&self) {
        self.refresh_trigger.notify_one();
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    pub fn store_snapshot(&self, snapshot: SymbolSnapshot) {
        self.snapshots
            .write()
            .insert(snapshot.symbol.clone(), snapshot);
        self.increment_version();
    }

    pub fn snapshot(&self, symbol: &str) -> Option<SymbolSnapshot> {
        self.snapshots.read().get(symbol).cloned()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error. The log is capped at [`MAX_RECENT_ERRORS`]; oldest
    /// entries are evicted first.
    pub fn push_error(&self, symbol: Option<&str>, msg: String) {
        let record = ErrorRecord {
            symbol: symbol.map(str::to_string),
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().clone()
    }
}
