//! Error types for data conversion in glucolink-types.

use thiserror::Error;

/// Errors that can occur when converting raw telemetry values.
///
/// This error type is platform-agnostic and does not include
/// transport-specific errors (those belong in glucolink-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Trend code outside the 0-7 range used by the shared export format.
    #[error("Unknown trend code: {0}")]
    UnknownTrendCode(u8),

    /// Lifecycle code not produced by any known transport driver.
    #[error("Unknown sensor lifecycle code: {0}")]
    UnknownLifecycleCode(u8),
}

/// Result type alias using glucolink-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
