// =============================================================================
// Binance public REST client — price history and spot price
// =============================================================================
//
// Only public market-data endpoints are used, so no request signing or API
// keys are involved. Kline history is requested at 1-hour resolution; the
// signal pipeline resamples it into 1H / 4H / 1D.
// =============================================================================

use std::future::Future;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, warn};

use crate::types::{PricePoint, PriceSeries};

/// Binance caps a single klines request at 1000 entries.
const MAX_KLINES: i64 = 1000;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Supplies closing-price history and the latest spot price for a symbol.
pub trait PriceSource: Send + Sync + 'static {
    /// Hourly closing prices for the last `days` days.
    fn fetch_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> impl Future<Output = Result<PriceSeries>> + Send;

    /// Most recent traded price.
    fn current_price(&self, symbol: &str) -> impl Future<Output = Result<f64>> + Send;
}

/// Binance REST API client for public market data.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET `path` and decode the JSON body, failing on non-2xx statuses.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("Binance GET {} returned {}: {}", path, status, body);
        }

        Ok(body)
    }

    /// GET /api/v3/klines at 1h resolution starting `days` ago, paging
    /// through as many requests as the window needs.
    #[instrument(skip(self), name = "binance::get_hourly_closes")]
    pub async fn get_hourly_closes(&self, symbol: &str, days: u32) -> Result<PriceSeries> {
        let windows = kline_windows(Utc::now(), i64::from(days) * 24);
        if windows.len() > 1 {
            debug!(symbol, pages = windows.len(), "klines history needs paging");
        }

        let mut points = Vec::new();
        for (start_ms, limit) in windows {
            let path = format!(
                "/api/v3/klines?symbol={symbol}&interval=1h&startTime={start_ms}&limit={limit}"
            );
            let body = self.get_json(&path).await?;
            let page = parse_klines(&body)?;
            if page.is_empty() {
                break;
            }
            points.extend_from_slice(page.points());
        }

        let series = PriceSeries::from_unsorted(points)
            .context("kline pages do not form a valid price series")?;

        debug!(
            symbol,
            days,
            count = series.len(),
            from = ?series.first().map(|p| p.timestamp),
            "klines fetched"
        );
        Ok(series)
    }

    /// GET /api/v3/ticker/price.
    #[instrument(skip(self), name = "binance::get_ticker_price")]
    pub async fn get_ticker_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .get_json(&format!("/api/v3/ticker/price?symbol={symbol}"))
            .await?;
        let price = parse_str_f64(&body["price"]).context("ticker response missing 'price'")?;
        debug!(symbol, price, "ticker price retrieved");
        Ok(price)
    }
}

impl PriceSource for BinanceClient {
    async fn fetch_history(&self, symbol: &str, days: u32) -> Result<PriceSeries> {
        self.get_hourly_closes(symbol, days).await
    }

    async fn current_price(&self, symbol: &str) -> Result<f64> {
        self.get_ticker_price(symbol).await
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Split `hours` of history ending at `end` into klines requests of at most
/// [`MAX_KLINES`] entries, as `(start_time_ms, limit)` pairs in time order.
pub fn kline_windows(end: DateTime<Utc>, hours: i64) -> Vec<(i64, i64)> {
    let mut remaining = hours.max(1);
    let mut start = end - Duration::hours(remaining);
    let mut windows = Vec::new();
    while remaining > 0 {
        let limit = remaining.min(MAX_KLINES);
        windows.push((start.timestamp_millis(), limit));
        start += Duration::hours(limit);
        remaining -= limit;
    }
    windows
}

/// Parse Binance's array-of-arrays klines payload into a close-price series.
///
/// Array indices used: [0] openTime (ms), [4] close. The open time stamps
/// each point. Malformed entries are skipped with a warning.
pub fn parse_klines(body: &serde_json::Value) -> Result<PriceSeries> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut points = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(arr) = entry.as_array().filter(|a| a.len() >= 5) else {
            warn!(entry = %entry, "skipping malformed kline entry");
            continue;
        };

        let Some(timestamp) = arr[0].as_i64().and_then(DateTime::<Utc>::from_timestamp_millis) else {
            warn!(open_time = %arr[0], "skipping kline with invalid open time");
            continue;
        };
        let close = match parse_str_f64(&arr[4]) {
            Ok(c) if c.is_finite() && c >= 0.0 => c,
            Ok(c) => {
                warn!(close = c, "skipping kline with out-of-range close");
                continue;
            }
            Err(e) => {
                warn!(close = %arr[4], error = %e, "skipping kline with unparseable close");
                continue;
            }
        };

        points.push(PricePoint::new(timestamp, close));
    }

    PriceSeries::from_unsorted(points).context("kline closes do not form a valid price series")
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_klines_extracts_open_time_and_close() {
        let body = serde_json::json!([
            [1700000000000i64, "37000.0", "37050.0", "36990.0", "37020.5", "1.0", 1700003599999i64],
            [1700003600000i64, "37020.5", "37100.0", "37000.0", "37090.0", "1.0", 1700007199999i64]
        ]);
        let series = parse_klines(&body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.prices(), vec![37020.5, 37090.0]);
        assert_eq!(series.first().unwrap().timestamp.timestamp_millis(), 1700000000000);
    }

    #[test]
    fn parse_klines_skips_short_entries() {
        let body = serde_json::json!([[1700000000000i64, "1.0"], [1700003600000i64, "1", "1", "1", "2.5"]]);
        let series = parse_klines(&body).unwrap();
        assert_eq!(series.prices(), vec![2.5]);
    }

    #[test]
    fn parse_klines_rejects_non_array() {
        let body = serde_json::json!({ "code": -1121, "msg": "Invalid symbol." });
        assert!(parse_klines(&body).is_err());
    }

    #[test]
    fn parse_klines_skips_bad_closes() {
        let body = serde_json::json!([
            [1700000000000i64, "1", "1", "1", "abc"],
            [1700003600000i64, "1", "1", "1", "-4.0"],
            [1700007200000i64, "1", "1", "1", "3.5"]
        ]);
        let series = parse_klines(&body).unwrap();
        assert_eq!(series.prices(), vec![3.5]);
    }

    #[test]
    fn kline_windows_single_page_for_short_history() {
        let end = Utc::now();
        let windows = kline_windows(end, 30 * 24);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].1, 720);
        assert_eq!(windows[0].0, (end - Duration::hours(720)).timestamp_millis());
    }

    #[test]
    fn kline_windows_page_through_long_history() {
        let end = Utc::now();
        let windows = kline_windows(end, 60 * 24);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0], ((end - Duration::hours(1440)).timestamp_millis(), 1000));
        assert_eq!(windows[1], ((end - Duration::hours(440)).timestamp_millis(), 440));
        assert_eq!(windows.iter().map(|w| w.1).sum::<i64>(), 1440);
    }

    #[test]
    fn kline_windows_requests_at_least_one_hour() {
        let windows = kline_windows(Utc::now(), 0);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].1, 1);
    }

    #[test]
    fn parse_str_f64_accepts_numbers_and_strings() {
        assert_eq!(parse_str_f64(&serde_json::json!("1.5")).unwrap(), 1.5);
        assert_eq!(parse_str_f64(&serde_json::json!(2.5)).unwrap(), 2.5);
        assert!(parse_str_f64(&serde_json::json!(null)).is_err());
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = BinanceClient::new("http://localhost:9999/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
