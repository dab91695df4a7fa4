// =============================================================================
// Signals Module
// =============================================================================
//
// Signal derivation pipeline:
// - Parameter validation
// - RSI / MACD buy-sell signals with targets, stops and confidences
// - Fixed-width resampling and the 1H / 4H / 1D signal sets
// - CSV export

pub mod export;
pub mod multi_timeframe;
pub mod params;
pub mod pipeline;
pub mod resample;

pub use export::export_signals_csv;
pub use multi_timeframe::{derive_multi_timeframe, MultiTimeframeSignals, TimeframeLevels};
pub use params::SignalParameters;
