// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math. Every series has the same length as
// its input; values that need more history than is available are `None`.

pub mod ema;
pub mod macd;
pub mod rsi;

pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
