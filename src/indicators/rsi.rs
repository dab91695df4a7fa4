// =============================================================================
// Relative Strength Index (RSI) — simple rolling means
// =============================================================================
//
// Step 1 — Deltas from consecutive closes. The first close has no predecessor
//          and contributes a delta of 0.
// Step 2 — Split each delta into a gain (positive part) and a loss (magnitude
//          of the negative part).
// Step 3 — Average gain / average loss are plain means over the trailing
//          `period` deltas (not Wilder / exponential smoothing).
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// When avg_loss is zero the ratio is infinite and RSI is 100, including the
// flat case where avg_gain is zero as well.
// =============================================================================

use crate::error::{SignalError, SignalResult};

pub const OVERBOUGHT: f64 = 70.0;
pub const OVERSOLD: f64 = 30.0;

/// Compute the RSI series for `closes`.
///
/// The result has the same length as `closes`. Index `i` is `None` while
/// fewer than `period` observations are available (`i < period - 1`).
pub fn calculate_rsi(closes: &[f64], period: usize) -> SignalResult<Vec<Option<f64>>> {
    if period == 0 {
        return Err(SignalError::invalid("RSI period must be at least 1"));
    }

    let n = closes.len();
    let mut gains = Vec::with_capacity(n);
    let mut losses = Vec::with_capacity(n);
    for i in 0..n {
        let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let period_f = period as f64;
    let result = (0..n)
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let start = i + 1 - period;
            // Divide before summing so the means stay finite for huge prices.
            let avg_gain = gains[start..=i].iter().map(|g| g / period_f).sum::<f64>();
            let avg_loss = losses[start..=i].iter().map(|l| l / period_f).sum::<f64>();
            Some(rsi_from_averages(avg_gain, avg_loss))
        })
        .collect();

    Ok(result)
}

/// Human-readable zone for an RSI value.
pub fn rsi_zone(value: f64) -> &'static str {
    if value > OVERBOUGHT {
        "OVERBOUGHT"
    } else if value < OVERSOLD {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
