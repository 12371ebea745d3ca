//! Correlated request/response over UDP.
//!
//! UDP gives no pairing between what you send and what comes back: responses
//! arrive out of order, interleaved with unrelated traffic, or not at all.
//! This crate provides [`UdpClient`], a socket bound to one fixed remote
//! endpoint where each `send` registers its own view of the inbound stream
//! and resolves with the first datagram that parses and matches, a timeout,
//! or a transport error — exactly one of the three, with the per-call
//! listener removed on every path.
//!
//! The wire format is the caller's: `send` takes the raw payload bytes, a
//! `parse` function from raw bytes to a typed value, and a `matches`
//! predicate that recognizes the awaited response.
//!
//! # Example
//!
//! ```ignore
//! use udp_request::{UdpClient, UdpClientConfig};
//!
//! let client = UdpClient::new(UdpClientConfig::new("127.0.0.1", 9999));
//!
//! // Concurrent calls share the socket; each resolves independently.
//! let (a, b) = tokio::join!(
//!     client.send(&query(1), decode, |r| r.id == 1),
//!     client.send(&query(2), decode, |r| r.id == 2),
//! );
//!
//! client.close().await;
//! ```
//!
//! # Error handling
//!
//! [`ClientError::Timeout`] is a distinct variant so callers can tell "no
//! response" apart from "transport broken". Datagrams that fail to parse are
//! treated as noise and never fail a call. Retry policy is the caller's
//! responsibility; the client never retries internally.

mod client;
mod config;
mod correlation;
mod error;
mod state;

pub use client::UdpClient;
pub use config::{DEFAULT_TIMEOUT, UdpClientConfig};
pub use error::{ClientError, Result};
pub use state::UdpClientState;
