// =============================================================================
// CSV export for signal tables
// =============================================================================
//
// Columns: timeframe, timestamp, close, rsi, macd, signal_line, histogram,
// buy, sell, target, stop_loss, buy_confidence, sell_confidence, buy_error,
// sell_error
//
// Undefined indicator values are written as empty fields, never as 0.

use anyhow::{Context, Result};

use super::multi_timeframe::MultiTimeframeSignals;
use super::pipeline::{SignalRow, SignalTable};
use crate::types::Timeframe;

const HEADER: [&str; 15] = [
    "timeframe",
    "timestamp",
    "close",
    "rsi",
    "macd",
    "signal_line",
    "histogram",
    "buy",
    "sell",
    "target",
    "stop_loss",
    "buy_confidence",
    "sell_confidence",
    "buy_error",
    "sell_error",
];

/// Export every timeframe of `signals` into one CSV document.
///
/// With `complete_only`, rows that still lack RSI or MACD history are
/// skipped.
pub fn export_signals_csv(signals: &MultiTimeframeSignals, complete_only: bool) -> Result<String> {
    let tables: Vec<(Timeframe, &SignalTable)> = signals.iter().collect();
    export_tables_csv(&tables, complete_only)
}

/// Export an arbitrary list of labelled tables into one CSV document.
pub fn export_tables_csv(tables: &[(Timeframe, &SignalTable)], complete_only: bool) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;

    for (timeframe, table) in tables {
        let rows: Vec<&SignalRow> = if complete_only {
            table.complete_rows().collect()
        } else {
            table.rows.iter().collect()
        };
        for row in rows {
            wtr.write_record(record(*timeframe, row))
                .with_context(|| format!("failed to write {timeframe} row at {}", row.timestamp))?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn record(timeframe: Timeframe, row: &SignalRow) -> [String; 15] {
    [
        timeframe.label().to_string(),
        row.timestamp.to_rfc3339(),
        row.close_price.to_string(),
        optional(row.rsi),
        optional(row.macd),
        row.macd_signal_line.to_string(),
        row.macd_histogram.to_string(),
        row.buy.to_string(),
        row.sell.to_string(),
        row.target_price.to_string(),
        row.stop_loss_price.to_string(),
        optional(row.buy_confidence),
        optional(row.sell_confidence),
        optional(row.buy_error()),
        optional(row.sell_error()),
    ]
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::pipeline::derive_signals;
    use crate::signals::{derive_multi_timeframe, SignalParameters};
    use crate::types::{PricePoint, PriceSeries};
    use chrono::{Duration, TimeZone, Utc};

    fn hourly_series(hours: usize) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::new(
            (0..hours)
                .map(|i| {
                    let price = 50.0 + ((i * 7) % 13) as f64;
                    PricePoint::new(start + Duration::hours(i as i64), price)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn header_and_row_count() {
        let series = hourly_series(30);
        let table = derive_signals(&series, &SignalParameters::default()).unwrap();
        let csv = export_tables_csv(&[(Timeframe::OneHour, &table)], false).unwrap();

        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timeframe,timestamp,close,rsi,macd,signal_line,histogram,buy,sell,target,stop_loss,buy_confidence,sell_confidence,buy_error,sell_error"
        );
        assert_eq!(lines.count(), 30);
    }

    #[test]
    fn undefined_values_are_blank() {
        let series = hourly_series(3);
        let table = derive_signals(&series, &SignalParameters::default()).unwrap();
        let csv = export_tables_csv(&[(Timeframe::OneHour, &table)], false).unwrap();
        let first_row = csv.lines().nth(1).unwrap();
        let fields: Vec<&str> = first_row.split(',').collect();
        assert_eq!(fields[0], "1h");
        assert_eq!(fields[3], "");
        assert_eq!(fields[4], "");
        assert_eq!(fields[7], "false");
        assert_eq!(fields[11], "");
        assert_eq!(fields[14], "");
    }

    #[test]
    fn complete_only_drops_warmup_rows() {
        let series = hourly_series(30);
        let table = derive_signals(&series, &SignalParameters::default()).unwrap();
        let csv = export_tables_csv(&[(Timeframe::OneHour, &table)], true).unwrap();
        // 30 rows minus 25 warm-up rows.
        assert_eq!(csv.lines().count(), 1 + 5);
    }

    #[test]
    fn multi_timeframe_export_is_byte_identical_across_runs() {
        let series = hourly_series(24 * 5);
        let params = SignalParameters::default();
        let a = export_signals_csv(&derive_multi_timeframe(&series, &params).unwrap(), false).unwrap();
        let b = export_signals_csv(&derive_multi_timeframe(&series, &params).unwrap(), false).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\n1h,"));
        assert!(a.contains("\n4h,"));
        assert!(a.contains("\n1d,"));
    }
}
