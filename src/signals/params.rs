// =============================================================================
// SignalParameters — immutable per-invocation pipeline settings
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{SignalError, SignalResult};

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast_period() -> usize {
    12
}

fn default_macd_slow_period() -> usize {
    26
}

fn default_macd_signal_period() -> usize {
    9
}

fn default_target_pct() -> f64 {
    0.05
}

fn default_stop_loss_pct() -> f64 {
    0.02
}

/// Tunable parameters for one `derive_signals` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParameters {
    /// Trailing window of the RSI rolling means.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Span of the fast MACD EMA.
    #[serde(default = "default_macd_fast_period")]
    pub macd_fast_period: usize,

    /// Span of the slow MACD EMA. Must exceed `macd_fast_period`.
    #[serde(default = "default_macd_slow_period")]
    pub macd_slow_period: usize,

    /// Span of the EMA applied to the MACD line.
    #[serde(default = "default_macd_signal_period")]
    pub macd_signal_period: usize,

    /// Take-profit distance as a fraction of close, in (0, 1).
    #[serde(default = "default_target_pct")]
    pub target_pct: f64,

    /// Stop-loss distance as a fraction of close, in (0, 1).
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
}

impl Default for SignalParameters {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            macd_fast_period: default_macd_fast_period(),
            macd_slow_period: default_macd_slow_period(),
            macd_signal_period: default_macd_signal_period(),
            target_pct: default_target_pct(),
            stop_loss_pct: default_stop_loss_pct(),
        }
    }
}

impl SignalParameters {
    /// Check every range and ordering constraint.
    pub fn validate(&self) -> SignalResult<()> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast_period", self.macd_fast_period),
            ("macd_slow_period", self.macd_slow_period),
            ("macd_signal_period", self.macd_signal_period),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(SignalError::invalid(format!("{name} must be at least 1")));
            }
        }

        if self.macd_slow_period <= self.macd_fast_period {
            return Err(SignalError::invalid(format!(
                "macd_slow_period ({}) must be greater than macd_fast_period ({})",
                self.macd_slow_period, self.macd_fast_period
            )));
        }

        for (name, value) in [
            ("target_pct", self.target_pct),
            ("stop_loss_pct", self.stop_loss_pct),
        ] {
            // NaN fails both comparisons and is rejected here too.
            if !(value > 0.0 && value < 1.0) {
                return Err(SignalError::invalid(format!(
                    "{name} must be strictly between 0 and 1, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Number of leading rows without a full RSI and MACD history.
    pub fn warmup_rows(&self) -> usize {
        self.rsi_period.max(self.macd_slow_period).saturating_sub(1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = SignalParameters::default();
        assert_eq!(params.rsi_period, 14);
        assert_eq!(params.macd_fast_period, 12);
        assert_eq!(params.macd_slow_period, 26);
        assert_eq!(params.macd_signal_period, 9);
        assert!(params.validate().is_ok());
        assert_eq!(params.warmup_rows(), 25);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let params: SignalParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params, SignalParameters::default());
    }

    #[test]
    fn rejects_zero_period() {
        let params = SignalParameters {
            rsi_period: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SignalError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_slow_not_above_fast() {
        let params = SignalParameters {
            macd_fast_period: 26,
            macd_slow_period: 12,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_percentages_outside_open_interval() {
        for bad in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let params = SignalParameters {
                target_pct: bad,
                ..Default::default()
            };
            assert!(params.validate().is_err(), "target_pct {bad} accepted");

            let params = SignalParameters {
                stop_loss_pct: bad,
                ..Default::default()
            };
            assert!(params.validate().is_err(), "stop_loss_pct {bad} accepted");
        }
    }
}
