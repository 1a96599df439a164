//! # DEALER Socket Implementation
//!
//! The DEALER socket provides asynchronous request-reply patterns with load balancing.
//!
//! ## Features
//!
//! - **Bidirectional**: Can both send and receive multipart messages
//! - **Load Balanced**: Messages are round-robinned across every connected peer
//! - **Asynchronous**: Non-blocking send and receive operations
//! - **Multipart**: Full support for ZeroMQ multipart messages
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use axonmq_zmtp::dealer::DealerSocket;
//! use compio::net::TcpStream;
//! use bytes::Bytes;
//!
//! #[compio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect to ROUTER server
//!     let stream = TcpStream::connect("127.0.0.1:5555").await?;
//!     let socket = DealerSocket::new(stream).await;
//!
//!     // Send request
//!     socket.send(vec![Bytes::from("Hello")]).await?;
//!
//!     // Receive response
//!     let response = socket.recv().await?;
//!     println!("Got {} frames", response.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol Details
//!
//! DEALER implements the ZeroMQ DEALER socket pattern:
//! - Messages are sent as-is (no envelope modification)
//! - Compatible with ROUTER and REP sockets
//! - Fair queuing and round-robin load balancing across connected peers

use crate::{integrated_actor::ZmtpIntegratedActor, session::SocketType};
use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use flume::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use axonmq_core::{
    actor::{SocketActor, SocketEvent, UserCmd},
    alloc::IoArena,
};
use tracing::trace;

/// A DEALER socket for asynchronous request-reply patterns.
///
/// DEALER sockets provide:
/// - Bidirectional communication (send and receive)
/// - Multipart message support
/// - Round-robin load balancing across every connected peer
/// - Asynchronous, non-blocking operations
///
/// # Architecture
///
/// Every connection gets its own `SocketActor` + `ZmtpIntegratedActor` pump,
/// spawned as background tasks. `recv()` fair-queues across peers because
/// every pump shares the same inbound channel; `send()` round-robins across
/// the outbound channels, one per peer.
///
/// # Example
///
/// ```rust,no_run
/// use axonmq_zmtp::dealer::DealerSocket;
/// use compio::net::TcpStream;
/// use bytes::Bytes;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = TcpStream::connect("127.0.0.1:5555").await?;
/// let socket = DealerSocket::new(stream).await;
///
/// // Send a request
/// socket.send(vec![Bytes::from("REQUEST")]).await?;
///
/// // Receive response
/// let reply = socket.recv().await?;
/// # Ok(())
/// # }
/// ```
pub struct DealerSocket {
    /// Channel integrated actors deliver received messages to (shared, for fair-queued recv).
    app_tx: Sender<Vec<Bytes>>,
    /// Channel `recv()` reads completed messages from.
    app_rx: Receiver<Vec<Bytes>>,
    /// One outbound channel per connected peer, round-robinned by `send()`.
    peer_txs: Mutex<Vec<Sender<Vec<Bytes>>>>,
    rr: AtomicUsize,
    /// Task handles (kept alive to prevent task cancellation), one pair per peer.
    _task_handles: Mutex<Vec<(compio::runtime::Task<()>, compio::runtime::Task<()>)>>,
}

impl DealerSocket {
    fn empty() -> Self {
        let (app_tx, app_rx) = unbounded();
        Self {
            app_tx,
            app_rx,
            peer_txs: Mutex::new(Vec::new()),
            rr: AtomicUsize::new(0),
            _task_handles: Mutex::new(Vec::new()),
        }
    }

    /// Create a new DEALER socket from an established stream.
    ///
    /// **Internal API**: For public-facing ergonomics, use `axonmq::DealerSocket::connect()`.
    ///
    /// This spawns background tasks for I/O, protocol handling, and routing.
    pub async fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let dealer = Self::empty();
        dealer.add_connection(stream).await;
        dealer
    }

    /// Connect an additional peer, round-robinned alongside existing ones.
    pub async fn add_connection<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        // Create channels
        let (socket_event_tx, socket_event_rx) = unbounded(); // SocketActor → integration
        let (socket_cmd_tx, socket_cmd_rx) = unbounded(); // integration → SocketActor
        let (user_tx, user_rx) = unbounded(); // application → integrated (for send)

        // Create SocketActor
        let arena = IoArena::new();
        let socket_actor = SocketActor::new(stream, socket_event_tx, socket_cmd_rx, arena);

        // Create ZmtpIntegratedActor, sharing this socket's inbound channel
        let mut integrated_actor =
            ZmtpIntegratedActor::new(SocketType::Dealer, self.app_tx.clone(), user_rx);

        // Send initial greeting
        let greeting = integrated_actor.local_greeting();
        let _ = socket_cmd_tx.send(UserCmd::SendBytes(greeting));

        // Spawn the integration task: bridges SocketActor events to ZmtpIntegratedActor
        let integration_handle = compio::runtime::spawn(async move {
            let mut handshake_complete = false;

            loop {
                if let Ok(event) = socket_event_rx.try_recv() {
                    match event {
                        SocketEvent::Connected => {}
                        SocketEvent::ReceivedBytes(bytes) => {
                            let session_events = integrated_actor.session.on_bytes(bytes);

                            for event in session_events {
                                match event {
                                    crate::session::SessionEvent::SendBytes(data) => {
                                        let _ = socket_cmd_tx.send(UserCmd::SendBytes(data));
                                    }
                                    crate::session::SessionEvent::HandshakeComplete {
                                        peer_identity,
                                        peer_socket_type: _,
                                    } => {
                                        integrated_actor.handle_handshake_complete(peer_identity);
                                        handshake_complete = true;
                                    }
                                    crate::session::SessionEvent::Frame(frame) => {
                                        if handshake_complete {
                                            integrated_actor.handle_frame(frame);
                                        }
                                    }
                                    crate::session::SessionEvent::Error(_) => {
                                        trace!("[DEALER] session error, closing peer");
                                        return;
                                    }
                                }
                            }
                        }
                        SocketEvent::Disconnected => {
                            trace!("[DEALER] peer disconnected");
                            return;
                        }
                    }
                }

                for frame in integrated_actor.process_events().await {
                    let _ = socket_cmd_tx.send(UserCmd::SendBytes(frame));
                }

                compio::time::sleep(std::time::Duration::from_micros(100)).await;
            }
        });

        let socket_handle = compio::runtime::spawn(socket_actor.run());

        // Yield to allow spawned tasks to start
        compio::time::sleep(std::time::Duration::from_micros(1)).await;

        self.peer_txs.lock().push(user_tx);
        self._task_handles
            .lock()
            .push((integration_handle, socket_handle));
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.peer_txs.lock().len()
    }

    /// Send a multipart message asynchronously.
    ///
    /// Round-robins across every connected peer. Returns an error if no
    /// peer is connected.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use axonmq_zmtp::dealer::DealerSocket;
    /// # use bytes::Bytes;
    /// # async fn example(socket: &DealerSocket) {
    /// socket.send(vec![Bytes::from("Hello")]).await.unwrap();
    /// # }
    /// ```
    pub async fn send(&self, parts: Vec<Bytes>) -> Result<(), flume::SendError<Vec<Bytes>>> {
        let peer_tx = {
            let peers = self.peer_txs.lock();
            if peers.is_empty() {
                return Err(flume::SendError(parts));
            }
            let idx = self.rr.fetch_add(1, Ordering::Relaxed) % peers.len();
            peers[idx].clone()
        };
        peer_tx.send_async(parts).await
    }

    /// Receive a multipart message asynchronously.
    ///
    /// Fair-queues across every connected peer: the first completed message
    /// from any peer is returned first.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use axonmq_zmtp::dealer::DealerSocket;
    /// # async fn example(socket: &DealerSocket) {
    /// let message = socket.recv().await.unwrap();
    /// println!("Got {} frames", message.len());
    /// # }
    /// ```
    pub async fn recv(&self) -> Result<Vec<Bytes>, flume::RecvError> {
        self.app_rx.recv_async().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_dealer_has_no_peers() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let dealer = DealerSocket::empty();
            assert_eq!(dealer.peer_count(), 0);
        });
    }

    #[test]
    fn send_with_no_peers_errors() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let dealer = DealerSocket::empty();
            let result = dealer.send(vec![Bytes::from_static(b"hi")]).await;
            assert!(result.is_err());
        });
    }
}
