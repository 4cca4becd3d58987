//! Error types for Burstgate.

use thiserror::Error;

/// Main error type for Burstgate operations.
#[derive(Error, Debug)]
pub enum BurstgateError {
    /// A limiter was used before `init` was called
    #[error("rate limiter used before initialization")]
    Uninitialized,

    /// A limit triple that cannot describe a sensible budget
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A throttled transfer that can never make progress
    #[error("Transfer stalled: {0}")]
    Stalled(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Burstgate operations.
pub type Result<T> = std::result::Result<T, BurstgateError>;
