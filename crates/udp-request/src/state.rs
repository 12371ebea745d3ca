//! State enumeration for the UDP client.

/// Lifecycle state of a [`UdpClient`](crate::UdpClient).
///
/// The state is derived on demand from the underlying socket rather than
/// tracked separately, so it is always consistent with what the OS reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UdpClientState {
    /// No socket exists yet; the client has never connected.
    #[default]
    Unconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The socket is bound and its remote peer is fixed.
    Connected,
    /// The client was closed. Terminal.
    Closed,
}

impl std::fmt::Display for UdpClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UdpClientState::Unconnected => write!(f, "Unconnected"),
            UdpClientState::Connecting => write!(f, "Connecting"),
            UdpClientState::Connected => write!(f, "Connected"),
            UdpClientState::Closed => write!(f, "Closed"),
        }
    }
}
