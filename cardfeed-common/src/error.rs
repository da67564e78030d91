//! Common error types for cardfeed

use thiserror::Error;

/// Common result type for cardfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the cardfeed crates
#[derive(Error, Debug)]
pub enum Error {
    /// Payload was not valid JSON
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Event stream line exceeded the buffering limit
    #[error("Event stream line longer than {limit} bytes")]
    LineTooLong { limit: usize },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file could not be parsed
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
