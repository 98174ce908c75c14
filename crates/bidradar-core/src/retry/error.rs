//! Transport-level error for one upstream call.

use std::fmt;

/// Failure before a complete HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connect or overall request timeout.
    Timeout(String),
    /// Anything else: DNS, connection reset, malformed URL, ...
    Other(String),
}

impl TransportError {
    /// Map a libcurl error into a timeout or generic transport failure.
    pub fn from_curl(e: &curl::Error) -> Self {
        if e.is_operation_timedout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout(msg) => write!(f, "timeout: {}", msg),
            TransportError::Other(msg) => write!(f, "transport: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}
