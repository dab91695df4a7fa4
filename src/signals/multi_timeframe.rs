// =============================================================================
// Multi-timeframe signal sets (1H / 4H / 1D)
// =============================================================================
//
// Each timeframe is an independent resample + derive_signals call over the
// same raw series. A failure on any timeframe fails the whole set, so callers
// never see a partial result.

use serde::Serialize;

use super::params::SignalParameters;
use super::pipeline::{derive_signals, SignalTable};
use super::resample::resample;
use crate::error::SignalResult;
use crate::types::{PriceSeries, Timeframe};

/// Signal tables for every display timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTimeframeSignals {
    pub one_hour: SignalTable,
    pub four_hours: SignalTable,
    pub one_day: SignalTable,
}

/// Latest target and stop-loss for one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeframeLevels {
    pub timeframe: Timeframe,
    pub target_price: f64,
    pub stop_loss_price: f64,
}

impl MultiTimeframeSignals {
    pub fn get(&self, timeframe: Timeframe) -> &SignalTable {
        match timeframe {
            Timeframe::OneHour => &self.one_hour,
            Timeframe::FourHours => &self.four_hours,
            Timeframe::OneDay => &self.one_day,
        }
    }

    /// Tables in display order, paired with their timeframe.
    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, &SignalTable)> {
        Timeframe::ALL.into_iter().map(move |tf| (tf, self.get(tf)))
    }

    /// Target / stop-loss of the most recent row on each timeframe.
    pub fn latest_levels(&self) -> Vec<TimeframeLevels> {
        self.iter()
            .filter_map(|(timeframe, table)| {
                table.latest().map(|row| TimeframeLevels {
                    timeframe,
                    target_price: row.target_price,
                    stop_loss_price: row.stop_loss_price,
                })
            })
            .collect()
    }
}

/// Resample `prices` into every timeframe and derive a table for each.
pub fn derive_multi_timeframe(
    prices: &PriceSeries,
    params: &SignalParameters,
) -> SignalResult<MultiTimeframeSignals> {
    let derive = |tf: Timeframe| -> SignalResult<SignalTable> {
        let bucketed = resample(prices, tf.bucket())?;
        derive_signals(&bucketed, params)
    };

    Ok(MultiTimeframeSignals {
        one_hour: derive(Timeframe::OneHour)?,
        four_hours: derive(Timeframe::FourHours)?,
        one_day: derive(Timeframe::OneDay)?,
    })
}
