// =============================================================================
// Signal derivation pipeline
// =============================================================================
//
// Maps a PriceSeries plus SignalParameters to a SignalTable:
//
//   buy  = RSI < 30 AND MACD > signal line
//   sell = RSI > 70 AND MACD < signal line
//   target     = close * (1 + target_pct)
//   stop_loss  = close * (1 - stop_loss_pct)
//   buy_conf   = clamp(1 - (RSI - 30) / 30, 0, 1)
//   sell_conf  = clamp(1 - (70 - RSI) / 30, 0, 1)
//
// Rows without enough history carry `None` indicators and never fire.
// The function is pure: no I/O, no shared state, identical output for
// identical input.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::params::SignalParameters;
use crate::error::{SignalError, SignalResult};
use crate::indicators::rsi::{OVERBOUGHT, OVERSOLD};
use crate::indicators::{calculate_macd, calculate_rsi};
use crate::types::PriceSeries;

/// Width of the RSI band used by the confidence formulas.
const CONFIDENCE_BAND: f64 = 30.0;

/// Indicators and signals for one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub timestamp: DateTime<Utc>,
    pub close_price: f64,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal_line: f64,
    pub macd_histogram: f64,
    pub buy: bool,
    pub sell: bool,
    pub target_price: f64,
    pub stop_loss_price: f64,
    pub buy_confidence: Option<f64>,
    pub sell_confidence: Option<f64>,
}

impl SignalRow {
    /// `1 - buy_confidence`.
    pub fn buy_error(&self) -> Option<f64> {
        self.buy_confidence.map(|c| 1.0 - c)
    }

    /// `1 - sell_confidence`.
    pub fn sell_error(&self) -> Option<f64> {
        self.sell_confidence.map(|c| 1.0 - c)
    }

    /// Both RSI and MACD are defined for this row.
    pub fn is_complete(&self) -> bool {
        self.rsi.is_some() && self.macd.is_some()
    }
}

/// Ordered rows aligned 1:1 with the input series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalTable {
    pub params: SignalParameters,
    pub rows: Vec<SignalRow>,
}

impl SignalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn latest(&self) -> Option<&SignalRow> {
        self.rows.last()
    }

    pub fn buy_count(&self) -> usize {
        self.rows.iter().filter(|r| r.buy).count()
    }

    pub fn sell_count(&self) -> usize {
        self.rows.iter().filter(|r| r.sell).count()
    }

    /// Rows where every indicator is defined.
    pub fn complete_rows(&self) -> impl Iterator<Item = &SignalRow> {
        self.rows.iter().filter(|r| r.is_complete())
    }

    /// Line-chart view: close, RSI, MACD minus signal line and 0/1 markers.
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.rows
            .iter()
            .map(|r| ChartPoint {
                timestamp: r.timestamp,
                close: r.close_price,
                rsi: r.rsi,
                macd_minus_signal: r.macd.map(|m| m - r.macd_signal_line),
                buy: u8::from(r.buy),
                sell: u8::from(r.sell),
            })
            .collect()
    }
}

/// One point of the price/indicator line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub rsi: Option<f64>,
    pub macd_minus_signal: Option<f64>,
    pub buy: u8,
    pub sell: u8,
}

/// Derive the full signal table for `prices`.
///
/// Fails fast on invalid parameters or an empty series; never returns a
/// partially computed table.
pub fn derive_signals(prices: &PriceSeries, params: &SignalParameters) -> SignalResult<SignalTable> {
    params.validate()?;
    if prices.is_empty() {
        return Err(SignalError::EmptyInput);
    }

    let closes = prices.prices();
    let rsi = calculate_rsi(&closes, params.rsi_period)?;
    let macd = calculate_macd(
        &closes,
        params.macd_fast_period,
        params.macd_slow_period,
        params.macd_signal_period,
    )?;

    debug_assert_eq!(macd.macd.len(), closes.len());
    let macd_warmup = params.macd_slow_period - 1;

    let rows = prices
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let rsi_i = rsi[i];
            let macd_i = (i >= macd_warmup).then_some(macd.macd[i]);
            let signal_i = macd.signal_line[i];

            let (buy, sell) = match (rsi_i, macd_i) {
                (Some(r), Some(m)) => (
                    r < OVERSOLD && m > signal_i,
                    r > OVERBOUGHT && m < signal_i,
                ),
                _ => (false, false),
            };

            SignalRow {
                timestamp: point.timestamp,
                close_price: point.price,
                rsi: rsi_i,
                macd: macd_i,
                macd_signal_line: signal_i,
                macd_histogram: macd.histogram[i],
                buy,
                sell,
                target_price: point.price * (1.0 + params.target_pct),
                stop_loss_price: point.price * (1.0 - params.stop_loss_pct),
                buy_confidence: rsi_i.map(buy_confidence),
                sell_confidence: rsi_i.map(sell_confidence),
            }
        })
        .collect();

    Ok(SignalTable {
        params: *params,
        rows,
    })
}

fn buy_confidence(rsi: f64) -> f64 {
    (1.0 - (rsi - OVERSOLD) / CONFIDENCE_BAND).clamp(0.0, 1.0)
}

fn sell_confidence(rsi: f64) -> f64 {
    (1.0 - (OVERBOUGHT - rsi) / CONFIDENCE_BAND).clamp(0.0, 1.0)
}
