// =============================================================================
// Shared types used across the signal desk
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SignalError, SignalResult};

/// A single closing-price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Time-ordered closing prices with strictly ascending, unique timestamps.
///
/// The only ways to build one are the validating constructors below, so every
/// `PriceSeries` the pipeline sees already satisfies the ordering invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points that must already be in strictly ascending
    /// timestamp order with finite, non-negative prices.
    pub fn new(points: Vec<PricePoint>) -> SignalResult<Self> {
        for (i, p) in points.iter().enumerate() {
            if !p.price.is_finite() || p.price < 0.0 {
                return Err(SignalError::invalid(format!(
                    "price at index {i} must be finite and non-negative, got {}",
                    p.price
                )));
            }
        }
        if let Some(i) = points
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(SignalError::invalid(format!(
                "timestamps must be strictly ascending (index {} is not after index {i})",
                i + 1
            )));
        }
        Ok(Self { points })
    }

    /// Build a series from raw observations in any order.
    ///
    /// Points are sorted by timestamp; for duplicate timestamps the later
    /// observation in the input wins. Non-finite or negative prices are
    /// rejected.
    pub fn from_unsorted(mut points: Vec<PricePoint>) -> SignalResult<Self> {
        // Stable sort keeps input order among equal timestamps.
        points.sort_by_key(|p| p.timestamp);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(last) if last.timestamp == p.timestamp => *last = p,
                _ => deduped.push(p),
            }
        }
        Self::new(deduped)
    }

    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// Display resolution for a signal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Self::OneHour, Self::FourHours, Self::OneDay];

    /// Bucket width used when resampling into this timeframe.
    pub fn bucket(self) -> Duration {
        match self {
            Self::OneHour => Duration::hours(1),
            Self::FourHours => Duration::hours(4),
            Self::OneDay => Duration::days(1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
