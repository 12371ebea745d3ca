//! Error types for UDP request/response calls.

use std::fmt;

/// Errors surfaced by [`UdpClient`](crate::UdpClient) operations.
///
/// The variants are deliberately coarse: callers mostly need to tell
/// "no response arrived" ([`Timeout`](Self::Timeout)) apart from "the
/// transport is broken" ([`Connect`](Self::Connect) /
/// [`Transport`](Self::Transport)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Binding the local socket or fixing the remote peer failed.
    ///
    /// A connect failure is shared: every call awaiting the same in-flight
    /// connect attempt receives the same error.
    Connect(String),
    /// Transmitting the datagram failed at the OS level.
    Transport(String),
    /// No matching response arrived within the allotted time.
    Timeout,
    /// The client was closed before or while the call was in flight.
    Closed,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "Connect error: {msg}"),
            Self::Transport(msg) => write!(f, "Transport error: {msg}"),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Closed => write!(f, "Client is closed"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A specialized Result type for UDP request operations.
pub type Result<T> = std::result::Result<T, ClientError>;
