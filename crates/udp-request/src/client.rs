//! UDP client with request/response correlation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::UdpClientConfig;
use crate::correlation::{ListenerGuard, ListenerSet};
use crate::error::{ClientError, Result};
use crate::state::UdpClientState;

/// The shared in-flight connect attempt. Concurrent callers clone and await
/// the same future, so the underlying connect runs at most once at a time
/// and all waiters observe the same completion.
type ConnectFuture = Shared<BoxFuture<'static, Result<Arc<UdpSocket>>>>;

/// State shared between the client handle, the connect future, and `send`
/// calls in flight.
struct Inner {
    config: UdpClientConfig,
    socket: Mutex<Option<Arc<UdpSocket>>>,
    connecting: Mutex<Option<ConnectFuture>>,
    listeners: Arc<ListenerSet>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// A UDP client bound to one fixed remote endpoint that correlates each
/// outbound datagram with its matching response.
///
/// The client lazily fixes the remote peer on first use; concurrent `send`
/// calls racing on an unconnected socket share a single connect attempt.
/// Every inbound datagram is delivered to all calls currently waiting, and
/// each call picks out its own response with a caller-supplied `parse`
/// function and `matches` predicate. A call resolves exactly once: with the
/// matched value, a [`Timeout`](ClientError::Timeout), or a transport error.
///
/// # Example
///
/// ```ignore
/// use udp_request::{UdpClient, UdpClientConfig};
///
/// let client = UdpClient::new(UdpClientConfig::new("127.0.0.1", 9999));
///
/// let reply = client
///     .send(
///         &query_bytes,
///         |payload| decode_reply(payload).ok(),
///         |reply| reply.id == query_id,
///     )
///     .await?;
/// ```
pub struct UdpClient {
    inner: Arc<Inner>,
}

impl UdpClient {
    /// Create a new client targeting the configured remote endpoint.
    ///
    /// No socket is allocated and no I/O happens until the first `send`.
    pub fn new(config: UdpClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                socket: Mutex::new(None),
                connecting: Mutex::new(None),
                listeners: Arc::new(ListenerSet::new()),
                reader: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Get the current client state.
    pub fn state(&self) -> UdpClientState {
        if self.inner.closed.load(Ordering::SeqCst) {
            UdpClientState::Closed
        } else if self.is_connected() {
            UdpClientState::Connected
        } else if self.inner.connecting.lock().is_some() {
            UdpClientState::Connecting
        } else {
            UdpClientState::Unconnected
        }
    }

    /// Check whether the socket currently reports a fixed remote peer.
    ///
    /// Any internal error querying the socket reads as "not connected".
    pub fn is_connected(&self) -> bool {
        self.inner
            .socket
            .lock()
            .as_ref()
            .is_some_and(|socket| socket.peer_addr().is_ok())
    }

    /// Get the local address after connecting.
    /// Returns `None` if the client has not connected yet.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        let socket = self.inner.socket.lock();
        socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Get the remote peer address after connecting.
    /// Returns `None` if the client has not connected yet.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        let socket = self.inner.socket.lock();
        socket.as_ref().and_then(|s| s.peer_addr().ok())
    }

    /// Number of `send` calls currently waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Get the host this client is configured to send to.
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Get the port this client is configured to send to.
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Get the full remote address (host:port) this client sends to.
    pub fn remote_addr(&self) -> String {
        self.inner.config.remote_addr()
    }

    /// Send a datagram and await the matching response, using the
    /// configured default timeout.
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send<T, P, M>(&self, data: &[u8], parse: P, matches: M) -> Result<T>
    where
        T: Send + 'static,
        P: Fn(&[u8]) -> Option<T> + Send + 'static,
        M: Fn(&T) -> bool + Send + 'static,
    {
        let timeout = self.inner.config.default_timeout;
        self.send_with_timeout(data, parse, matches, Some(timeout))
            .await
    }

    /// Send a datagram and await the matching response.
    ///
    /// Connects first if the remote peer is not yet fixed, then registers a
    /// listener for this call, transmits `data`, and resolves with whichever
    /// comes first: an inbound datagram that `parse`s and `matches`, the
    /// timeout expiring, or a transport error from the transmission itself.
    ///
    /// `parse` maps a raw payload to a typed value; returning `None` marks
    /// the datagram as noise for this call (malformed or unrelated) and the
    /// call keeps waiting. `matches` decides whether a parsed value is the
    /// response this call is waiting for. Datagrams are delivered to every
    /// call in flight, so one response can be inspected (and discarded) by
    /// several calls while resolving only the one whose predicate accepts it.
    ///
    /// A `timeout` of `None` or zero disables the timeout entirely; the call
    /// then waits until a match arrives or the client is closed.
    pub async fn send_with_timeout<T, P, M>(
        &self,
        data: &[u8],
        parse: P,
        matches: M,
        timeout: Option<Duration>,
    ) -> Result<T>
    where
        T: Send + 'static,
        P: Fn(&[u8]) -> Option<T> + Send + 'static,
        M: Fn(&T) -> bool + Send + 'static,
    {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }

        let socket = self.ensure_connected().await?;

        // Register before transmitting so a response cannot slip past the
        // listener, and resolve through a take-once slot so at most one of
        // {match, timeout, transport error} ever settles this call.
        let (tx, rx) = oneshot::channel::<T>();
        let slot = Mutex::new(Some(tx));
        let id = self.inner.listeners.register(Box::new(move |payload| {
            let Some(value) = parse(payload) else {
                return;
            };
            if !matches(&value) {
                return;
            }
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(value);
            }
        }));
        let _guard = ListenerGuard::new(self.inner.listeners.clone(), id);

        // close() flips the flag before clearing the listener set, so a
        // listener that registered after the clear is caught here instead
        // of waiting on a sender nothing will ever drop.
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }

        socket
            .send(data)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let response = match timeout.filter(|t| !t.is_zero()) {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(response) => response,
                Err(_) => {
                    tracing::debug!(
                        target: "udp_request::client",
                        remote = %self.inner.config.remote_addr(),
                        timeout_ms = limit.as_millis() as u64,
                        "request timed out"
                    );
                    return Err(ClientError::Timeout);
                }
            },
            None => rx.await,
        };

        // The sender is only dropped without resolving when close() clears
        // the listener set out from under this call.
        response.map_err(|_| ClientError::Closed)
    }

    /// Close the client, releasing the underlying socket.
    ///
    /// Idempotent. Any `send` still waiting for a response fails with
    /// [`ClientError::Closed`]; calling `send` afterwards fails the same way.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.inner.connecting.lock() = None;
        let reader = self.inner.reader.lock().take();
        if let Some(handle) = reader {
            handle.abort();
            let _ = handle.await;
        }
        *self.inner.socket.lock() = None;
        self.inner.listeners.clear();

        tracing::debug!(
            target: "udp_request::client",
            remote = %self.inner.config.remote_addr(),
            "client closed"
        );
    }

    /// Return the connected socket, establishing the connection first if
    /// needed.
    ///
    /// Concurrent callers racing on an unconnected socket attach to one
    /// shared connect attempt; its completion (success or failure) is
    /// observed by all of them. After a failure the pending slot is empty
    /// again, so a later call starts a fresh attempt.
    async fn ensure_connected(&self) -> Result<Arc<UdpSocket>> {
        if let Some(socket) = self.inner.socket.lock().clone() {
            return Ok(socket);
        }

        let attempt = {
            let mut pending = self.inner.connecting.lock();
            match pending.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let attempt = Inner::run_connect(self.inner.clone()).boxed().shared();
                    *pending = Some(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }
}

impl Inner {
    /// The single-flight connect attempt: bind the local socket, fix the
    /// remote peer, and start the reader task that fans inbound datagrams
    /// out to the registered listeners.
    async fn run_connect(inner: Arc<Inner>) -> Result<Arc<UdpSocket>> {
        let result = Inner::establish(&inner).await;

        // Empty the pending slot so callers arriving after a failure can
        // retry with a fresh attempt.
        *inner.connecting.lock() = None;

        match &result {
            Ok(socket) => {
                tracing::debug!(
                    target: "udp_request::client",
                    remote = %inner.config.remote_addr(),
                    local = ?socket.local_addr().ok(),
                    "connected"
                );
            }
            Err(e) => {
                tracing::debug!(
                    target: "udp_request::client",
                    remote = %inner.config.remote_addr(),
                    error = %e,
                    "connect failed"
                );
            }
        }

        result
    }

    async fn establish(inner: &Arc<Inner>) -> Result<Arc<UdpSocket>> {
        let socket = UdpSocket::bind(inner.config.bind_addr())
            .await
            .map_err(|e| ClientError::Connect(format!("failed to bind: {e}")))?;
        socket
            .connect(inner.config.remote_addr())
            .await
            .map_err(|e| {
                ClientError::Connect(format!(
                    "failed to connect to {}: {e}",
                    inner.config.remote_addr()
                ))
            })?;
        let socket = Arc::new(socket);

        if inner.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }

        let handle = tokio::spawn(Inner::read_loop(
            socket.clone(),
            inner.listeners.clone(),
            inner.config.recv_buffer_size,
        ));
        *inner.reader.lock() = Some(handle);
        *inner.socket.lock() = Some(socket.clone());

        Ok(socket)
    }

    /// Receive datagrams and broadcast each payload to every registered
    /// listener. Runs until aborted by `close` or by dropping the client.
    async fn read_loop(socket: Arc<UdpSocket>, listeners: Arc<ListenerSet>, buffer_size: usize) {
        let mut buffer = vec![0u8; buffer_size];
        loop {
            match socket.recv(&mut buffer).await {
                Ok(n) => {
                    tracing::trace!(
                        target: "udp_request::client",
                        len = n,
                        listeners = listeners.len(),
                        "datagram received"
                    );
                    listeners.dispatch(&buffer[..n]);
                }
                Err(e) => {
                    // Transient on connected UDP sockets (e.g. ICMP port
                    // unreachable surfacing as ECONNREFUSED); keep reading.
                    tracing::debug!(
                        target: "udp_request::client",
                        error = %e,
                        "receive error"
                    );
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // The reader task holds the socket alive; stop it when the last
        // client handle goes away.
        if let Some(handle) = self.reader.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for UdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpClient")
            .field("remote_addr", &self.inner.config.remote_addr())
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}
