//! DEALER socket implementation.

use super::common::channel_to_io_error;
use bytes::Bytes;
use compio::net::TcpStream;
use axonmq_core::monitor::{create_monitor, SocketEvent, SocketEventSender, SocketMonitor};
use axonmq_zmtp::dealer::DealerSocket as InternalDealer;
use std::io;

/// A DEALER socket for asynchronous request-reply patterns.
///
/// DEALER sockets are fair-queuing clients that distribute messages
/// across multiple server endpoints. They're used for:
///
/// - Load-balanced request-reply
/// - Async RPC clients
/// - Worker pools
///
/// ## ZeroMQ Compatibility
///
/// Compatible with `zmq::DEALER` and `zmq::ROUTER` sockets from libzmq.
///
/// ## Example
///
/// ```rust,no_run
/// use axonmq::zmq::DealerSocket;
/// use bytes::Bytes;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Connect to server
/// let mut socket = DealerSocket::connect("127.0.0.1:5555").await?;
///
/// // Send request
/// socket.send(vec![Bytes::from("REQUEST")]).await?;
///
/// // Receive reply
/// if let Some(reply) = socket.recv().await {
///     println!("Got reply: {:?}", reply);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DealerSocket {
    inner: InternalDealer,
    monitor: Option<SocketEventSender>,
}

impl DealerSocket {
    /// Connect to a ZeroMQ peer and create a DEALER socket.
    ///
    /// Supports both TCP and IPC endpoints:
    /// - TCP: `"tcp://127.0.0.1:5555"` or `"127.0.0.1:5555"`
    /// - IPC: `"ipc:///tmp/socket.sock"` (Unix only)
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Endpoint to connect to
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The connection fails (network unreachable, connection refused, etc.)
    /// - DNS resolution fails for TCP endpoints
    /// - Invalid endpoint format
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use axonmq::zmq::DealerSocket;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// // TCP connection
    /// let socket1 = DealerSocket::connect("tcp://127.0.0.1:5555").await?;
    ///
    /// // IPC connection (Unix only)
    /// #[cfg(unix)]
    /// let socket2 = DealerSocket::connect("ipc:///tmp/socket.sock").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(endpoint: &str) -> io::Result<Self> {
        // Try parsing as endpoint, fall back to raw address
        let addr = if let Ok(axonmq_core::endpoint::Endpoint::Tcp(a)) =
            axonmq_core::endpoint::Endpoint::parse(endpoint)
        {
            a
        } else {
            endpoint
                .parse::<std::net::SocketAddr>()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        };

        let stream = TcpStream::connect(addr).await?;
        let sock = Self::from_stream(stream).await;
        sock.emit_event(SocketEvent::Connected(
            axonmq_core::endpoint::Endpoint::Tcp(addr),
        ));
        Ok(sock)
    }

    /// Connect to a ZeroMQ peer via IPC (Unix domain sockets).
    ///
    /// Unix-only. Accepts IPC paths with or without `ipc://` prefix.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # #[cfg(unix)]
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use axonmq::zmq::DealerSocket;
    ///
    /// let mut socket = DealerSocket::connect_ipc("/tmp/dealer.sock").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(unix)]
    pub async fn connect_ipc(path: &str) -> io::Result<Self> {
        use std::path::PathBuf;

        let clean_path = path.strip_prefix("ipc://").unwrap_or(path);
        let ipc_path = PathBuf::from(clean_path);

        let stream = axonmq_core::ipc::connect(&ipc_path).await?;
        let sock = Self::from_unix_stream(stream).await;
        sock.emit_event(SocketEvent::Connected(
            axonmq_core::endpoint::Endpoint::Ipc(ipc_path),
        ));
        Ok(sock)
    }

    /// Create a DEALER socket from an existing TCP stream.
    ///
    /// Use this for advanced scenarios where you need full control over
    /// the TCP connection (e.g., custom socket options, TLS wrapping).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use axonmq::zmq::DealerSocket;
    /// use compio::net::TcpStream;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let stream = TcpStream::connect("127.0.0.1:5555").await?;
    /// // Configure stream (e.g., set TCP_NODELAY)
    /// let socket = DealerSocket::from_stream(stream).await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn from_stream(stream: TcpStream) -> Self {
        Self {
            inner: InternalDealer::new(stream).await,
            monitor: None,
        }
    }

    /// Connect an additional peer to this DEALER socket.
    ///
    /// Outbound messages round-robin across every connected peer; inbound
    /// messages fair-queue across them.
    pub async fn add_stream(&self, stream: TcpStream) {
        self.inner.add_connection(stream).await;
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.inner.peer_count()
    }

    /// Enable monitoring for this socket.
    ///
    /// Returns a receiver for socket lifecycle events. Once enabled, the socket
    /// will emit events like Connected, Disconnected, etc.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use axonmq::zmq::{DealerSocket, SocketEvent};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut socket = DealerSocket::connect("127.0.0.1:5555").await?;
    /// let monitor = socket.monitor();
    ///
    /// // Spawn task to handle events
    /// compio::runtime::spawn(async move {
    ///     while let Ok(event) = monitor.recv_async().await {
    ///         println!("Socket event: {}", event);
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
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
    /// Messages are sent asynchronously - this returns immediately after
    /// queuing the message for transmission. With several peers connected,
    /// the message goes to the next peer in round-robin order.
    ///
    /// # Errors
    ///
    /// Returns an error if no peer is connected, or a connected peer's
    /// channel has closed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use axonmq::zmq::DealerSocket;
    /// # use bytes::Bytes;
    /// # async fn example(mut socket: DealerSocket) -> Result<(), Box<dyn std::error::Error>> {
    /// socket.send(vec![
    ///     Bytes::from("part1"),
    ///     Bytes::from("part2"),
    /// ]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        channel_to_io_error(self.inner.send(msg).await)
    }

    /// Receive a multipart message.
    ///
    /// Returns `None` if every connected peer has disconnected.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use axonmq::zmq::DealerSocket;
    /// # async fn example(mut socket: DealerSocket) -> Result<(), Box<dyn std::error::Error>> {
    /// while let Some(msg) = socket.recv().await {
    ///     println!("Received {} parts", msg.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn recv(&mut self) -> Option<Vec<Bytes>> {
        self.inner.recv().await.ok()
    }
}

// Unix-specific impl for IPC support
#[cfg(unix)]
impl DealerSocket {
    /// Create a DEALER socket from an existing Unix domain socket stream (IPC).
    pub async fn from_unix_stream(stream: compio::net::UnixStream) -> Self {
        Self {
            inner: InternalDealer::new(stream).await,
            monitor: None,
        }
    }

    /// Connect an additional Unix-domain peer to this DEALER socket.
    pub async fn add_unix_stream(&self, stream: compio::net::UnixStream) {
        self.inner.add_connection(stream).await;
    }
}
