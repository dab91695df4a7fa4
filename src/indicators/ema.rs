// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   alpha  = 2 / (span + 1)
//   EMA_0  = x_0
//   EMA_t  = x_t * alpha + EMA_{t-1} * (1 - alpha)
//
// Seeding with the first observation means the series is defined from index
// 0 and always has the same length as the input.
// =============================================================================

use crate::error::{SignalError, SignalResult};

/// Smoothing factor for a given span.
pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA of `values` with the given `span`.
///
/// Returns one value per input element. An empty input yields an empty vec.
pub fn calculate_ema(values: &[f64], span: usize) -> SignalResult<Vec<f64>> {
    if span == 0 {
        return Err(SignalError::invalid("EMA span must be at least 1"));
    }

    let alpha = smoothing_factor(span);
    let mut result = Vec::with_capacity(values.len());

    let mut iter = values.iter();
    let Some(&seed) = iter.next() else {
        return Ok(result);
    };
    result.push(seed);

    let mut prev = seed;
    for &v in iter {
        let ema = v * alpha + prev * (1.0 - alpha);
        result.push(ema);
        prev = ema;
    }

    Ok(result)
}
