// =============================================================================
// Moving Average Convergence-Divergence (MACD)
// =============================================================================
//
//   macd        = EMA(close, fast) - EMA(close, slow)
//   signal_line = EMA(macd, signal)
//   histogram   = macd - signal_line
//
// All three EMAs are seeded by their first input, so every series is defined
// from index 0 and matches the input length.
// =============================================================================

use serde::Serialize;

use super::ema::calculate_ema;
use crate::error::{SignalError, SignalResult};

/// Full MACD output, one element per input close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute MACD, signal line and histogram for `closes`.
///
/// Fails with `InvalidParameter` when any span is zero or `slow <= fast`.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> SignalResult<MacdSeries> {
    if fast == 0 || slow == 0 || signal == 0 {
        return Err(SignalError::invalid(format!(
            "MACD periods must be at least 1 (fast={fast}, slow={slow}, signal={signal})"
        )));
    }
    if slow <= fast {
        return Err(SignalError::invalid(format!(
            "MACD slow period ({slow}) must be greater than fast period ({fast})"
        )));
    }

    let ema_fast = calculate_ema(closes, fast)?;
    let ema_slow = calculate_ema(closes, slow)?;

    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd, signal)?;
    let histogram = macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Ok(MacdSeries {
        macd,
        signal_line,
        histogram,
    })
}
