//! Bridge error types

use shared::CorrelationKey;
use thiserror::Error;

/// Error type for all bridge operations.
///
/// Connection-level failures recover locally through the reconnect loop;
/// callers only ever see them as [`BridgeError::NotConnected`] on new
/// requests or [`BridgeError::ConnectionClosed`] on requests that were in
/// flight when the link dropped.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// No attempt was made: the connection state precondition failed.
    #[error("not connected to IMS")]
    NotConnected,

    /// The request was sent but no reply arrived within the deadline.
    #[error("IMS request timed out")]
    Timeout,

    /// Transport-level send error.
    #[error("failed to send to IMS: {0}")]
    SendFailed(String),

    /// A request for the same correlation key is already in flight.
    #[error("request already in flight for {0}")]
    Conflict(CorrelationKey),

    /// Explicit error reply from the IMS.
    #[error("IMS rejected request: {0}")]
    Rejected(String),

    /// The connection dropped while the request was in flight.
    #[error("IMS connection closed")]
    ConnectionClosed,

    /// The caller cancelled the request before resolution.
    #[error("request cancelled")]
    Cancelled,

    /// Bulk sync fetch failed. Non-fatal: callers fall back to cached data.
    #[error("catalog fetch failed: {0}")]
    FetchFailed(String),

    /// The reply decoded but did not have the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
