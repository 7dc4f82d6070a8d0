//! Domain-specific error types for the baton engine.
//!
//! All fallible operations return `Result<T, BatonError>`.
//! No panics on invalid input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the baton engine.
#[derive(Debug, Error)]
pub enum BatonError {
    // ── Discovery Errors ─────────────────────────────────────────
    /// No usable network interface or address to scan from.
    #[error("no active network interface with a usable IPv4 address")]
    NoActiveInterface,

    /// The subnet prefix cannot describe a scannable host range.
    #[error("invalid subnet prefix /{0}: expected 1..=30")]
    InvalidPrefix(u8),

    /// A scan or operation was cancelled via its cancellation flag.
    #[error("operation cancelled")]
    Cancelled,

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// An internal channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Frame Errors ─────────────────────────────────────────────
    /// An outbound frame does not fit the 16-bit length prefix.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Inbound payload is not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A command has no representation in the requested encoding.
    #[error("command not encodable as {encoding}: {reason}")]
    NotEncodable {
        encoding: &'static str,
        reason: &'static str,
    },
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BatonError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        BatonError::ChannelClosed
    }
}
