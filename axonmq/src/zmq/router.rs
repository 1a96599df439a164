//! ROUTER socket implementation.

use bytes::Bytes;
use compio::net::{TcpListener, TcpStream};
use axonmq_core::monitor::{create_monitor, SocketEvent, SocketEventSender, SocketMonitor};
use axonmq_zmtp::router::RouterSocket as InternalRouter;
use axonmq_zmtp::SocketType;
use std::io;

/// A ROUTER socket for identity-based routing.
///
/// ROUTER sockets prefix incoming messages with the sender's identity,
/// and route outgoing messages based on the first frame (identity). They
/// hold an arbitrary number of peer connections at once, addressing each
/// by identity. They're used for:
///
/// - Async request-reply servers
/// - Brokers and proxies
/// - Stateful connection tracking
///
/// ## ZeroMQ Compatibility
///
/// Compatible with `zmq::ROUTER` and `zmq::DEALER` sockets from libzmq.
///
/// ## Message Format
///
/// **Incoming**: `[identity, delimiter, ...user_frames]`\
/// **Outgoing**: `[identity, delimiter, ...user_frames]` (routes to peer with that identity)
///
/// ## Example
///
/// ```rust,no_run
/// use axonmq::zmq::RouterSocket;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Bind and accept first connection
/// let (listener, mut socket) = RouterSocket::bind("127.0.0.1:5555").await?;
///
/// // Echo server
/// while let Some(msg) = socket.recv().await {
///     // msg[0] = identity, msg[1] = delimiter, msg[2+] = payload
///     socket.send(msg).await?; // Echo back to sender
/// }
/// # Ok(())
/// # }
/// ```
pub struct RouterSocket {
    inner: InternalRouter,
    monitor: Option<SocketEventSender>,
}

impl RouterSocket {
    /// Bind to an address and accept the first connection.
    ///
    /// This is the recommended way to create a server-side ROUTER socket.
    /// It handles TCP binding, accepting the first connection, and ZMTP handshake.
    /// Further connections can be added with [`RouterSocket::add_stream`].
    ///
    /// # Returns
    ///
    /// A tuple of `(listener, socket)` where:
    /// - `listener` can be used to accept additional connections
    /// - `socket` is ready to send/receive with the first peer
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The address is already in use
    /// - Permission denied (e.g., binding to privileged port without root)
    /// - Invalid address format
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use axonmq::zmq::RouterSocket;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let (listener, socket) = RouterSocket::bind("127.0.0.1:5555").await?;
    ///
    /// // Accept more connections from listener as needed:
    /// // let (stream, _) = listener.accept().await?;
    /// // socket.add_stream(stream).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn bind(
        addr: impl compio::net::ToSocketAddrsAsync,
    ) -> io::Result<(TcpListener, Self)> {
        let listener = TcpListener::bind(addr).await?;
        let (stream, _) = listener.accept().await?;
        let socket = Self::from_tcp(stream).await?;
        Ok((listener, socket))
    }

    /// Create a ROUTER socket from an existing TCP stream.
    ///
    /// **Deprecated**: Use [`RouterSocket::from_tcp()`] instead to enable TCP_NODELAY for optimal latency.
    #[deprecated(
        since = "0.1.0",
        note = "Use `from_tcp()` instead to enable TCP_NODELAY"
    )]
    pub async fn from_stream(stream: TcpStream) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::new(stream).await?,
            monitor: None,
        })
    }

    /// Create a ROUTER socket from a TCP stream with TCP_NODELAY enabled.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::from_tcp(stream).await?,
            monitor: None,
        })
    }

    /// Create a ROUTER socket from a TCP stream with custom options.
    pub async fn from_tcp_with_options(
        stream: TcpStream,
        options: axonmq_core::options::SocketOptions,
    ) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::from_tcp_with_options(stream, options).await?,
            monitor: None,
        })
    }

    /// Create a ROUTER socket from any stream with custom options.
    pub async fn with_options<Stream>(
        stream: Stream,
        options: axonmq_core::options::SocketOptions,
    ) -> io::Result<Self>
    where
        Stream: compio::io::AsyncRead + compio::io::AsyncWrite + Unpin + Send + 'static,
    {
        Ok(RouterSocket {
            inner: InternalRouter::with_options(stream, options).await?,
            monitor: None,
        })
    }

    /// Accept an additional TCP peer onto this ROUTER socket.
    pub async fn add_stream(&self, stream: TcpStream) -> io::Result<()> {
        self.inner.add_connection(stream).await
    }

    /// Enable monitoring for this socket.
    ///
    /// Returns a receiver for socket lifecycle events. Once enabled, the socket
    /// will emit events like Accepted, Disconnected, etc.
    pub fn monitor(&mut self) -> SocketMonitor {
        let (sender, receiver) = create_monitor();
        self.monitor = Some(sender);
        receiver
    }

    /// Helper to emit monitoring events (if monitoring is enabled).
    #[allow(dead_code)]
    fn emit_event(&self, event: SocketEvent) {
        if let Some(monitor) = &self.monitor {
            let _ = monitor.send(event); // Ignore errors if receiver dropped
        }
    }

    /// Send a multipart message.
    ///
    /// The first frame must be the peer identity to route to.
    /// Messages are sent asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if `ZMQ_ROUTER_MANDATORY` is set and the identity is
    /// unknown, or if routing fails because the hub has shut down.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use axonmq::zmq::RouterSocket;
    /// # use bytes::Bytes;
    /// # async fn example(mut socket: RouterSocket, identity: Bytes) -> Result<(), Box<dyn std::error::Error>> {
    /// socket.send(vec![
    ///     identity,              // Route to this peer
    ///     Bytes::new(),          // Delimiter
    ///     Bytes::from("reply"),  // Payload
    /// ]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.inner.send(msg).await
    }

    /// Send a message to the internal buffer without flushing.
    ///
    /// Use this for batching multiple messages before a single flush.
    pub fn send_buffered(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.inner.send_buffered(msg)
    }

    /// Flush all buffered messages to the network.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    /// Send multiple messages in a single batch.
    pub async fn send_batch(&mut self, messages: &[Vec<Bytes>]) -> io::Result<()> {
        self.inner.send_batch(messages).await
    }

    /// Get the socket type.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_TYPE` (16) option.
    #[inline]
    pub const fn socket_type() -> SocketType {
        SocketType::Router
    }

    /// Number of currently connected peers.
    #[inline]
    pub fn peer_count(&self) -> usize {
        self.inner.peer_count()
    }

    /// Check whether a peer with the given identity is currently connected.
    #[inline]
    pub fn is_connected(&self, identity: &[u8]) -> bool {
        self.inner.is_connected(identity)
    }

    /// Set the routing identity for the next accepted connection.
    ///
    /// This identity will be used for the next peer that connects to this ROUTER.
    /// The option is consumed after the connection and must be set again for
    /// subsequent connections.
    ///
    /// # Arguments
    ///
    /// * `id` - The identity to assign (1-255 bytes, cannot start with null byte)
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is invalid (empty, too long, or starts
    /// with null byte).
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_CONNECT_ROUTING_ID` (62).
    pub fn set_connect_routing_id(&mut self, id: Vec<u8>) -> io::Result<()> {
        axonmq_core::options::SocketOptions::validate_router_identity(&id)?;
        self.inner.options_mut().connect_routing_id = Some(Bytes::from(id));
        Ok(())
    }

    /// Enable or disable ROUTER_MANDATORY mode.
    ///
    /// When enabled, sending to an unknown identity returns an error.
    /// When disabled (default), messages to unknown identities are silently dropped.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_ROUTER_MANDATORY` (33).
    pub fn set_router_mandatory(&mut self, enabled: bool) {
        self.inner.options_mut().router_mandatory = enabled;
    }

    /// Enable or disable ROUTER_HANDOVER mode.
    ///
    /// When enabled, a new connection with an existing identity takes over
    /// that identity, closing the old connection. When disabled (default),
    /// the new connection is rejected and closed instead.
    ///
    /// # ZeroMQ Compatibility
    ///
    /// Corresponds to `ZMQ_ROUTER_HANDOVER` (56).
    pub fn set_router_handover(&mut self, enabled: bool) {
        self.inner.options_mut().router_handover = enabled;
    }

    /// Receive a multipart message.
    ///
    /// The returned message will have the sender's identity as the first frame,
    /// followed by a delimiter, then the payload frames. Fair-queues across
    /// every connected peer.
    ///
    /// Returns `None` when a peer disconnects.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use axonmq::zmq::RouterSocket;
    /// # async fn example(mut socket: RouterSocket) -> Result<(), Box<dyn std::error::Error>> {
    /// while let Some(msg) = socket.recv().await {
    ///     let identity = &msg[0];
    ///     let payload = &msg[2..]; // Skip identity and delimiter
    ///     println!("From {:?}: {:?}", identity, payload);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn recv(&mut self) -> Option<Vec<Bytes>> {
        self.inner.recv().await.ok().flatten()
    }
}

// Unix-specific impl for IPC support
#[cfg(unix)]
impl RouterSocket {
    /// Create a ROUTER socket from an existing Unix domain socket stream (IPC).
    pub async fn from_unix_stream(stream: compio::net::UnixStream) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::new(stream).await?,
            monitor: None,
        })
    }

    /// Create a ROUTER socket from an existing Unix stream with custom options.
    pub async fn from_unix_stream_with_options(
        stream: compio::net::UnixStream,
        options: axonmq_core::options::SocketOptions,
    ) -> io::Result<Self> {
        Ok(Self {
            inner: InternalRouter::with_options(stream, options).await?,
            monitor: None,
        })
    }

    /// Accept an additional Unix-domain peer onto this ROUTER socket.
    pub async fn add_unix_stream(&self, stream: compio::net::UnixStream) -> io::Result<()> {
        self.inner.add_connection(stream).await
    }
}

// Implement ProxySocket for the high-level RouterSocket wrapper
impl axonmq_zmtp::proxy::ProxySocket for RouterSocket {
    fn recv_multipart<'life0, 'async_trait>(
        &'life0 mut self,
    ) -> ::core::pin::Pin<Box<dyn ::core::future::Future<Output = io::Result<Option<Vec<Bytes>>>> + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { Ok(self.recv().await) })
    }

    fn send_multipart<'life0, 'async_trait>(
        &'life0 mut self,
        msg: Vec<Bytes>,
    ) -> ::core::pin::Pin<Box<dyn ::core::future::Future<Output = io::Result<()>> + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { self.send(msg).await })
    }

    fn socket_desc(&self) -> &'static str {
        "ROUTER"
    }
}
