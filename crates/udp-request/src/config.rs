//! Configuration for the UDP client.

use std::time::Duration;

/// Default per-call timeout applied by [`UdpClient::send`](crate::UdpClient::send).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration for a [`UdpClient`](crate::UdpClient).
///
/// The remote endpoint is fixed at construction and never changes for the
/// lifetime of the client.
#[derive(Clone, Debug)]
pub struct UdpClientConfig {
    /// The remote host to send datagrams to.
    pub host: String,
    /// The remote port to send datagrams to.
    pub port: u16,
    /// The local address to bind to. The local port is always OS-assigned.
    pub bind_address: String,
    /// Receive buffer size in bytes.
    pub recv_buffer_size: usize,
    /// Timeout applied by [`send`](crate::UdpClient::send) when the caller
    /// does not pick one explicitly.
    pub default_timeout: Duration,
}

impl Default for UdpClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            bind_address: "0.0.0.0".into(),
            recv_buffer_size: 65535,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UdpClientConfig {
    /// Create a configuration targeting the given remote endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the local address to bind to.
    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set the default per-call timeout.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Get the remote address string (host:port).
    pub fn remote_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the local bind address string (address:port, ephemeral port).
    pub fn bind_addr(&self) -> String {
        format!("{}:0", self.bind_address)
    }
}
