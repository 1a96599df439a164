//! Multi-peer ROUTER socket implementation.
//!
//! Each accepted connection becomes a named peer: a background pump task
//! (one `SocketActor` + `ZmtpIntegratedActor` pair, mirroring the DEALER
//! socket's architecture) bridges that connection's frames to a shared
//! routing table. `recv()` fair-queues across every connected peer (they
//! all feed the same channel); `send()` looks the destination identity up
//! in the routing table and forwards directly to that peer's command
//! channel.
//!
//! # ROUTER Pattern
//!
//! ROUTER sockets receive messages with sender identity prepended and can
//! route replies back to specific senders by addressing the first frame.

use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::TcpStream;
use dashmap::DashMap;
use flume::{unbounded, Receiver, Sender};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::integrated_actor::{HubEvent, PeerCmd, RouterCmd, ZmtpIntegratedActor};
use crate::session::SocketType;
use axonmq_core::actor::{SocketActor, SocketEvent, UserCmd};
use axonmq_core::alloc::IoArena;
use axonmq_core::options::SocketOptions;

/// Multi-peer ROUTER socket.
///
/// Holds no stream directly: every accepted connection is handed to
/// [`RouterSocket::add_connection`], which spawns its own pump task and
/// registers the peer in a routing table shared by all connections.
pub struct RouterSocket {
    /// Messages received from any peer, in arrival order.
    app_rx: Receiver<Vec<Bytes>>,
    app_tx: Sender<Vec<Bytes>>,
    /// Fires once per peer disconnection, letting `recv()` surface EOF.
    disconnect_rx: Receiver<()>,
    disconnect_tx: Sender<()>,
    /// Lifecycle events from peer pumps (PeerUp/PeerDown).
    hub_event_tx: Sender<HubEvent>,
    /// Outbound routing commands handled by the background hub task.
    hub_cmd_tx: Sender<RouterCmd>,
    /// Routing table, shared with the hub task for membership checks.
    known_peers: Arc<DashMap<Bytes, Sender<PeerCmd>>>,
    options: SocketOptions,
    _hub_task: compio::runtime::Task<()>,
}

impl RouterSocket {
    /// Create a ROUTER socket with no peers yet connected.
    fn empty(options: SocketOptions) -> Self {
        let (app_tx, app_rx) = unbounded();
        let (disconnect_tx, disconnect_rx) = unbounded();
        let (hub_event_tx, hub_event_rx) = unbounded();
        let (hub_cmd_tx, hub_cmd_rx) = unbounded();
        let known_peers: Arc<DashMap<Bytes, Sender<PeerCmd>>> = Arc::new(DashMap::new());

        let hub_task = compio::runtime::spawn(run_router_hub(
            hub_event_rx,
            hub_cmd_rx,
            known_peers.clone(),
            options.router_handover,
        ));

        Self {
            app_rx,
            app_tx,
            disconnect_rx,
            disconnect_tx,
            hub_event_tx,
            hub_cmd_tx,
            known_peers,
            options,
            _hub_task: hub_task,
        }
    }

    /// Create a new ROUTER socket from a stream with default options.
    pub async fn new<S>(stream: S) -> io::Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new ROUTER socket with custom buffer configuration.
    ///
    /// The actor-based transport sizes its buffers from the arena
    /// allocator rather than fixed read/write buffers, so `config` only
    /// affects the handshake path; kept for API symmetry with the other
    /// direct-stream sockets.
    pub async fn with_config<S>(stream: S, _config: crate::config::BufferConfig) -> io::Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new ROUTER socket with the first peer and custom options.
    pub async fn with_options<S>(stream: S, options: SocketOptions) -> io::Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let router = Self::empty(options);
        router.add_connection(stream).await?;
        Ok(router)
    }

    /// Add an already-accepted connection as a new ROUTER peer.
    ///
    /// Spawns a background pump (`SocketActor` + `ZmtpIntegratedActor`,
    /// the same pairing DEALER uses) that performs the handshake, decodes
    /// frames, and forwards completed messages into this socket's shared
    /// `recv()` queue. Identity collisions are resolved by the hub task
    /// according to `router_handover`: off (default) closes the new
    /// connection, on evicts the existing peer.
    pub async fn add_connection<S>(&self, stream: S) -> io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (socket_event_tx, socket_event_rx) = unbounded();
        let (socket_cmd_tx, socket_cmd_rx) = unbounded();
        // ROUTER routes outbound sends through the hub, not per-peer app
        // channels, so this side of the pair is never fed; kept alive so
        // the actor doesn't observe it as disconnected.
        let (user_tx, user_rx) = unbounded::<Vec<Bytes>>();

        let socket_actor = SocketActor::new(stream, socket_event_tx, socket_cmd_rx, IoArena::new());
        let mut actor = ZmtpIntegratedActor::new(SocketType::Router, self.app_tx.clone(), user_rx);
        actor.attach_router(self.hub_event_tx.clone());

        let greeting = actor.local_greeting();
        let _ = socket_cmd_tx.send(UserCmd::SendBytes(greeting));

        let disconnect_tx = self.disconnect_tx.clone();
        compio::runtime::spawn(async move {
            let _keep_alive = user_tx;
            loop {
                if let Ok(event) = socket_event_rx.try_recv() {
                    match event {
                        SocketEvent::Connected => {}
                        SocketEvent::ReceivedBytes(bytes) => {
                            for frame in actor.on_bytes(bytes) {
                                let _ = socket_cmd_tx.send(UserCmd::SendBytes(frame));
                            }
                        }
                        SocketEvent::Disconnected => {
                            let _ = disconnect_tx.send(());
                            break;
                        }
                    }
                }

                for frame in actor.process_events().await {
                    let _ = socket_cmd_tx.send(UserCmd::SendBytes(frame));
                }

                compio::time::sleep(Duration::from_micros(100)).await;
            }
        })
        .detach();

        compio::runtime::spawn(socket_actor.run()).detach();
        // Let the spawned tasks get their first poll in before returning,
        // matching the DEALER socket's startup sequencing.
        compio::time::sleep(Duration::from_micros(1)).await;
        Ok(())
    }

    /// Receive a message with sender identity prepended: `[identity, empty, ...frames]`.
    ///
    /// Returns `Ok(None)` when a peer disconnects (mirroring single-peer
    /// EOF semantics); with several peers connected, other peers' messages
    /// keep arriving through subsequent calls.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        use futures::{select, FutureExt};

        trace!("[ROUTER] Waiting for message");
        select! {
            msg = self.app_rx.recv_async().fuse() => {
                match msg {
                    Ok(frames) => Ok(Some(frames)),
                    Err(_) => Ok(None),
                }
            }
            _ = self.disconnect_rx.recv_async().fuse() => {
                trace!("[ROUTER] Peer disconnected");
                Ok(None)
            }
        }
    }

    /// Send a message to the peer named by the first frame.
    ///
    /// If `router_mandatory` is set and the identity is unknown, returns
    /// an error instead of silently dropping the message (`ZMQ_ROUTER_MANDATORY`).
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.route(msg)
    }

    /// Buffer a message for the hub to route; the hub dispatches
    /// immediately, so there is no separate flush step.
    pub fn send_buffered(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        self.route(msg)
    }

    /// No-op: `send_buffered` already dispatched via the hub.
    pub async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Send multiple messages in a single batch (convenience method).
    pub async fn send_batch(&mut self, messages: &[Vec<Bytes>]) -> io::Result<()> {
        for msg in messages {
            self.route(msg.clone())?;
        }
        Ok(())
    }

    fn route(&self, mut msg: Vec<Bytes>) -> io::Result<()> {
        let Some(identity) = msg.first().cloned() else {
            return Ok(());
        };
        trace!(identity = ?identity, "[ROUTER] Routing {} frames", msg.len());

        if !self.known_peers.contains_key(&identity) {
            if self.options.router_mandatory {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no ROUTER peer with identity {identity:?}"),
                ));
            }
            debug!(identity = ?identity, "[ROUTER] dropping message to unknown peer");
            return Ok(());
        }

        msg.remove(0);
        self.hub_cmd_tx
            .send(RouterCmd::SendMessage(msg))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "router hub closed"))
    }

    /// Number of currently connected peers.
    #[inline]
    pub fn peer_count(&self) -> usize {
        self.known_peers.len()
    }

    /// Check whether a peer with the given identity is currently connected.
    #[inline]
    pub fn is_connected(&self, identity: &[u8]) -> bool {
        self.known_peers.contains_key(identity)
    }

    /// Get a reference to the socket options.
    #[inline]
    pub fn options(&self) -> &SocketOptions {
        &self.options
    }

    /// Get a mutable reference to the socket options.
    ///
    /// Note: `router_handover` is captured by the hub task at socket
    /// creation time; mutating it afterward does not change how already
    /// in-flight identity collisions are resolved.
    #[inline]
    pub fn options_mut(&mut self) -> &mut SocketOptions {
        &mut self.options
    }

    /// Set socket options (builder-style).
    #[inline]
    pub fn set_options(&mut self, options: SocketOptions) {
        self.options = options;
    }

    /// Close the socket, asking every connected peer to close in turn.
    pub async fn close(self) -> io::Result<()> {
        let _ = self.hub_cmd_tx.send(RouterCmd::Close);
        Ok(())
    }
}

/// Background routing hub: tracks peer membership and forwards outbound
/// sends to the right peer's command channel.
///
/// Ported from [`axonmq_core::router::RouterHub`]'s `Standard`-mode
/// algorithm against this crate's own `HubEvent`/`PeerCmd`/`RouterCmd`
/// types (the ones `ZmtpIntegratedActor` is wired to), since ROUTER only
/// ever needs identity-addressed dispatch, never the load-balancer mode.
async fn run_router_hub(
    hub_event_rx: Receiver<HubEvent>,
    hub_cmd_rx: Receiver<RouterCmd>,
    known_peers: Arc<DashMap<Bytes, Sender<PeerCmd>>>,
    router_handover: bool,
) {
    use futures::{select, FutureExt};

    loop {
        select! {
            ev = hub_event_rx.recv_async().fuse() => {
                match ev {
                    Ok(HubEvent::PeerUp { routing_id, tx }) => {
                        if let Some(existing) = known_peers.get(&routing_id) {
                            if router_handover {
                                debug!(identity = ?routing_id, "[ROUTER] handover: evicting existing peer");
                                let _ = existing.send(PeerCmd::Close);
                                drop(existing);
                                known_peers.insert(routing_id, tx);
                            } else {
                                warn!(identity = ?routing_id, "[ROUTER] rejecting duplicate identity (handover disabled)");
                                let _ = tx.send(PeerCmd::Close);
                            }
                        } else {
                            known_peers.insert(routing_id, tx);
                        }
                    }
                    Ok(HubEvent::PeerDown { routing_id }) => {
                        known_peers.remove(&routing_id);
                    }
                    Err(_) => break,
                }
            }
            cmd = hub_cmd_rx.recv_async().fuse() => {
                match cmd {
                    Ok(RouterCmd::SendMessage(mut parts)) => {
                        if parts.is_empty() {
                            continue;
                        }
                        let target = parts.remove(0);
                        if !parts.is_empty() && parts[0].is_empty() {
                            parts.remove(0);
                        }
                        if let Some(tx) = known_peers.get(&target) {
                            let _ = tx.send(PeerCmd::SendBody(parts));
                        }
                    }
                    Ok(RouterCmd::Close) => {
                        for entry in known_peers.iter() {
                            let _ = entry.value().send(PeerCmd::Close);
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }
}

// Specialized constructors for TCP streams to enable TCP_NODELAY.
impl RouterSocket {
    /// Create a new ROUTER socket from a TCP stream with TCP_NODELAY enabled.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        axonmq_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[ROUTER] TCP_NODELAY enabled");
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new ROUTER socket from a TCP stream with TCP_NODELAY and custom config.
    pub async fn from_tcp_with_config(
        stream: TcpStream,
        _config: crate::config::BufferConfig,
    ) -> io::Result<Self> {
        axonmq_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[ROUTER] TCP_NODELAY enabled");
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new ROUTER socket from a TCP stream with full configuration.
    pub async fn from_tcp_with_options(
        stream: TcpStream,
        options: SocketOptions,
    ) -> io::Result<Self> {
        axonmq_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[ROUTER] TCP_NODELAY enabled");
        Self::with_options(stream, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_tracks_peer_count() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let router = RouterSocket::empty(SocketOptions::default());
            assert_eq!(router.peer_count(), 0);
            assert!(!router.is_connected(b"nobody"));
        });
    }

    #[test]
    fn mandatory_send_to_unknown_peer_errors() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let mut router = RouterSocket::empty(
                SocketOptions::default().with_router_mandatory(true),
            );
            let result = router
                .send(vec![Bytes::from_static(b"ghost"), Bytes::from_static(b"hi")])
                .await;
            assert!(result.is_err());
        });
    }

    #[test]
    fn non_mandatory_send_to_unknown_peer_is_silent() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let mut router = RouterSocket::empty(SocketOptions::default());
            let result = router
                .send(vec![Bytes::from_static(b"ghost"), Bytes::from_static(b"hi")])
                .await;
            assert!(result.is_ok());
        });
    }
}
