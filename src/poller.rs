// =============================================================================
// Signal Poller — cancellable periodic refresh
// =============================================================================
//
// One background Tokio task refreshes every configured symbol:
//   - on a fixed interval (default 60 s; the first tick fires immediately),
//   - whenever `AppState::request_refresh` is called,
//   - until `PollerHandle::stop` is awaited.
//
// All refreshes run inside this single task, so no two refreshes ever race on
// the same snapshot. A failed fetch is treated as "no data": the error is
// logged and recorded, and the previous snapshot stays in place.
// =============================================================================

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::app_state::{AppState, SymbolSnapshot};
use crate::market_data::PriceSource;
use crate::signals::{derive_multi_timeframe, SignalParameters};
use crate::types::PriceSeries;

/// Handle to a running poller task.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the task to exit and wait for it. An in-flight refresh is
    /// allowed to finish first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "signal poller task failed");
        }
        info!("signal poller stopped");
    }
}

/// Spawn the poller on the current Tokio runtime.
pub fn start<S: PriceSource>(state: Arc<AppState>, source: Arc<S>) -> PollerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let period = Duration::from_secs(state.runtime_config.read().poll_interval_secs.max(1));
    let trigger = state.refresh_trigger.clone();

    let task = tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "signal poller starting");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
                _ = trigger.notified() => debug!("on-demand refresh requested"),
                _ = ticker.tick() => {}
            }

            refresh_all(&state, source.as_ref()).await;
        }
    });

    PollerHandle {
        shutdown: shutdown_tx,
        task,
    }
}

/// Refresh every configured symbol in order. Returns how many succeeded.
pub async fn refresh_all<S: PriceSource>(state: &AppState, source: &S) -> usize {
    let symbols = state.symbols();
    let mut ok = 0;
    for symbol in &symbols {
        if refresh_symbol(state, source, symbol).await {
            ok += 1;
        }
    }
    debug!(ok, total = symbols.len(), "refresh cycle complete");
    ok
}

/// Fetch data for `symbol`, derive all timeframes and store the snapshot.
///
/// Returns `false` when no snapshot could be produced.
pub async fn refresh_symbol<S: PriceSource>(state: &AppState, source: &S, symbol: &str) -> bool {
    let (days, params) = {
        let config = state.runtime_config.read();
        (config.lookback_days, config.signal_params)
    };

    let history = match source.fetch_history(symbol, days).await {
        Ok(series) => series,
        Err(e) => {
            warn!(symbol, error = %e, "price history unavailable, treating as no data");
            state.push_error(Some(symbol), format!("price history unavailable: {e:#}"));
            PriceSeries::empty()
        }
    };

    let current_price = match source.current_price(symbol).await {
        Ok(price) => Some(price),
        Err(e) => {
            warn!(symbol, error = %e, "current price unavailable");
            None
        }
    };

    match derive_multi_timeframe(&history, &params) {
        Ok(signals) => {
            let snapshot = SymbolSnapshot::new(symbol, current_price, params, signals);
            info!(
                symbol,
                points = history.len(),
                buy_signals = snapshot.buy_signals,
                sell_signals = snapshot.sell_signals,
                "signals refreshed"
            );
            if signals_in_warmup(&snapshot, &params) {
                debug!(symbol, "daily table has no fully defined rows yet");
            }
            state.store_snapshot(snapshot);
            true
        }
        Err(e) => {
            warn!(symbol, error = %e, "signal derivation failed");
            state.push_error(Some(symbol), format!("signal derivation failed: {e}"));
            false
        }
    }
}

fn signals_in_warmup(snapshot: &SymbolSnapshot, params: &SignalParameters) -> bool {
    snapshot.signals.one_day.len() <= params.warmup_rows()
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::PricePoint;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        series: Option<PriceSeries>,
        fetches: AtomicUsize,
    }

    impl StaticSource {
        fn ok(hours: usize) -> Self {
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let points = (0..hours)
                .map(|i| {
                    PricePoint::new(
                        start + chrono::Duration::hours(i as i64),
                        100.0 + (i % 17) as f64,
                    )
                })
                .collect();
            Self {
                series: Some(PriceSeries::new(points).unwrap()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                series: None,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl PriceSource for StaticSource {
        async fn fetch_history(&self, _symbol: &str, _days: u32) -> Result<PriceSeries> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.series
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }

        async fn current_price(&self, _symbol: &str) -> Result<f64> {
            match &self.series {
                Some(s) => Ok(s.last().map(|p| p.price).unwrap_or_default()),
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    fn state_with(symbols: &[&str]) -> Arc<AppState> {
        let config = RuntimeConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            poll_interval_secs: 3600,
            ..Default::default()
        };
        Arc::new(AppState::new(config, "unused.json"))
    }

    #[tokio::test]
    async fn refresh_symbol_stores_snapshot() {
        let state = state_with(&["BTCUSDT"]);
        let source = StaticSource::ok(24 * 3);

        assert!(refresh_symbol(&state, &source, "BTCUSDT").await);

        let snap = state.snapshot("BTCUSDT").unwrap();
        assert_eq!(snap.signals.one_hour.len(), 72);
        assert_eq!(snap.signals.one_day.len(), 3);
        assert!(snap.current_price.is_some());
        assert!(state.errors().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_is_treated_as_no_data() {
        let state = state_with(&["BTCUSDT"]);
        let source = StaticSource::failing();

        assert!(!refresh_symbol(&state, &source, "BTCUSDT").await);

        assert!(state.snapshot("BTCUSDT").is_none());
        let errors = state.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("connection refused"));
        assert!(errors[1].message.contains("empty"));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let state = state_with(&["BTCUSDT"]);
        assert!(refresh_symbol(&state, &StaticSource::ok(48), "BTCUSDT").await);
        let first = state.snapshot("BTCUSDT").unwrap().computed_at;

        assert!(!refresh_symbol(&state, &StaticSource::failing(), "BTCUSDT").await);
        assert_eq!(state.snapshot("BTCUSDT").unwrap().computed_at, first);
    }

    #[tokio::test]
    async fn refresh_all_counts_successes() {
        let state = state_with(&["BTCUSDT", "ETHUSDT"]);
        let source = StaticSource::ok(30);
        assert_eq!(refresh_all(&state, &source).await, 2);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn poller_refreshes_on_start_and_on_demand_then_stops() {
        let state = state_with(&["BTCUSDT"]);
        let source = Arc::new(StaticSource::ok(30));
        let handle = start(state.clone(), source.clone());

        // The first interval tick fires immediately.
        wait_for(|| state.snapshot("BTCUSDT").is_some()).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        state.request_refresh();
        wait_for(|| source.fetches.load(Ordering::SeqCst) >= 2).await;

        handle.stop().await;
        let after_stop = source.fetches.load(Ordering::SeqCst);
        state.request_refresh();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), after_stop);
    }

    async fn wait_for(cond: impl Fn() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }
}
