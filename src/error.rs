// =============================================================================
// Signal pipeline errors
// =============================================================================
//
// The pipeline fails fast and never retries. Insufficient history is not an
// error: it shows up as `None` values in the leading rows of a table.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// A period, percentage, bucket width or ordering constraint was violated.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The price series has no observations.
    #[error("price series is empty")]
    EmptyInput,
}

impl SignalError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

pub type SignalResult<T> = std::result::Result<T, SignalError>;
