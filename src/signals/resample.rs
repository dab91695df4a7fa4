// =============================================================================
// Resampling — fixed-width time buckets, last observation wins
// =============================================================================
//
// Buckets are aligned to the Unix epoch in UTC, so a 1-hour bucket starts on
// the hour and a 1-day bucket at midnight UTC. Each output point carries the
// bucket start as its timestamp and the last price observed in the bucket.
// Empty buckets are omitted; there is no forward-fill.

use chrono::{DateTime, Duration, Utc};

use crate::error::{SignalError, SignalResult};
use crate::types::{PricePoint, PriceSeries};

/// Downsample `prices` into buckets of width `bucket`.
///
/// `bucket` must be a whole number of seconds and at least one second.
pub fn resample(prices: &PriceSeries, bucket: Duration) -> SignalResult<PriceSeries> {
    let width = bucket_seconds(bucket)?;

    let mut out: Vec<PricePoint> = Vec::new();
    for point in prices.points() {
        let start = bucket_start(point.timestamp, width)?;
        match out.last_mut() {
            // Input is ascending, so a repeated bucket is always the last one.
            Some(last) if last.timestamp == start => last.price = point.price,
            _ => out.push(PricePoint::new(start, point.price)),
        }
    }

    PriceSeries::new(out)
}

/// Start of the epoch-aligned bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>, width_secs: i64) -> SignalResult<DateTime<Utc>> {
    let secs = ts.timestamp();
    let start = secs - secs.rem_euclid(width_secs);
    DateTime::<Utc>::from_timestamp(start, 0)
        .ok_or_else(|| SignalError::invalid(format!("bucket start {start} is out of range")))
}

fn bucket_seconds(bucket: Duration) -> SignalResult<i64> {
    let secs = bucket.num_seconds();
    if secs < 1 || Duration::seconds(secs) != bucket {
        return Err(SignalError::invalid(format!(
            "bucket width must be a positive whole number of seconds, got {bucket}"
        )));
    }
    Ok(secs)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn keeps_last_observation_per_bucket() {
        let series = PriceSeries::new(vec![
            PricePoint::new(at(0, 5), 1.0),
            PricePoint::new(at(0, 40), 2.0),
            PricePoint::new(at(1, 0), 3.0),
            PricePoint::new(at(1, 59), 4.0),
            PricePoint::new(at(5, 30), 5.0),
        ])
        .unwrap();

        let hourly = resample(&series, Duration::hours(1)).unwrap();
        let got: Vec<(DateTime<Utc>, f64)> =
            hourly.points().iter().map(|p| (p.timestamp, p.price)).collect();
        assert_eq!(
            got,
            vec![(at(0, 0), 2.0), (at(1, 0), 4.0), (at(5, 0), 5.0)]
        );
    }

    #[test]
    fn four_hour_buckets_align_to_midnight() {
        let series = PriceSeries::new(vec![
            PricePoint::new(at(3, 0), 1.0),
            PricePoint::new(at(4, 0), 2.0),
            PricePoint::new(at(7, 59), 3.0),
            PricePoint::new(at(8, 0), 4.0),
        ])
        .unwrap();
        let out = resample(&series, Duration::hours(4)).unwrap();
        assert_eq!(out.prices(), vec![1.0, 3.0, 4.0]);
        assert_eq!(out.points()[1].timestamp.hour(), 4);
    }

    #[test]
    fn empty_series_resamples_to_empty() {
        let out = resample(&PriceSeries::empty(), Duration::hours(1)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_non_positive_bucket() {
        assert!(resample(&PriceSeries::empty(), Duration::zero()).is_err());
        assert!(resample(&PriceSeries::empty(), Duration::seconds(-60)).is_err());
        assert!(resample(&PriceSeries::empty(), Duration::milliseconds(1500)).is_err());
    }

    proptest! {
        #[test]
        fn output_is_shorter_and_aligned(
            mut offsets in prop::collection::vec(0i64..30 * 86_400, 0..200),
            width in prop::sample::select(vec![60i64, 3_600, 4 * 3_600, 86_400]),
        ) {
            offsets.sort_unstable();
            offsets.dedup();
            let base = 1_700_000_000i64;
            let points: Vec<PricePoint> = offsets
                .iter()
                .map(|o| PricePoint::new(DateTime::<Utc>::from_timestamp(base + o, 0).unwrap(), *o as f64))
                .collect();
            let series = PriceSeries::new(points).unwrap();

            let out = resample(&series, Duration::seconds(width)).unwrap();
            prop_assert!(out.len() <= series.len());
            for p in out.points() {
                prop_assert_eq!(p.timestamp.timestamp().rem_euclid(width), 0);
            }
        }
    }
}
