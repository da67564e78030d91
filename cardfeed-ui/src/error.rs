//! Error types for cardfeed-ui
//!
//! Every failure is handled where it occurs (logged, event dropped, stream
//! torn down); these types only travel between the helpers and the manager.

use thiserror::Error;

/// Main error type for cardfeed-ui
#[derive(Error, Debug)]
pub enum Error {
    /// Request could not be sent or its body could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Push endpoint did not answer with `text/event-stream`
    #[error("Unexpected content type: {0}")]
    ContentType(String),

    /// Push endpoint did not answer in time
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Push stream ended
    #[error("Stream closed by server")]
    StreamClosed,

    /// Payload or event stream framing could not be decoded
    #[error(transparent)]
    Decode(#[from] cardfeed_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using cardfeed-ui Error
pub type Result<T> = std::result::Result<T, Error>;
