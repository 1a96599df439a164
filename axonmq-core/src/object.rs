//! `object`/`own`: the parent-child command tree every context-owned thing
//! (I/O thread, socket, session, pipe endpoint) is a node of.
//!
//! Shutdown is the one protocol this module exists to get right: a parent
//! tells its children to `term`; each child waits out its own linger, tears
//! its own children down the same way, and only then sends `term_ack` back
//! up. A node is fully reaped once every child it ever registered has
//! ack'd — not just the ones still alive, since a child that already
//! self-terminated must still be accounted for or the parent waits forever.
//!
//! Built on [`crate::mailbox`], in the same `flume` + `futures::select!`
//! style as [`crate::router::RouterHub`]'s event loop.

use std::time::Duration;

use hashbrown::HashMap;

use crate::clock::next_global_id;
use crate::mailbox::{mailbox, MailboxReceiver, MailboxSender};

/// Stable identity for a node in the ownership tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    #[must_use]
    pub fn fresh() -> Self {
        Self(next_global_id())
    }
}

/// Commands exchanged between tree nodes. Distinct from the socket-facing
/// command types in [`crate::router`]/[`crate::actor`] — this is the
/// lifecycle layer underneath those, not the data-plane one.
#[derive(Debug)]
pub enum Command {
    /// Parent finished wiring a freshly spawned child into the tree; the
    /// child may now begin normal operation.
    Plug,
    /// A child asks its parent for permission to begin tearing itself
    /// down (e.g. a socket the user closed). The parent acknowledges by
    /// issuing `Term` back.
    TermReq(ObjectId),
    /// Parent orders this node (and transitively, its children) to shut
    /// down, waiting at most `linger` for queued output to drain.
    Term(Option<Duration>),
    /// Child reports that its own subtree has fully unwound.
    TermAck(ObjectId),
    /// A pipe endpoint owned by this node saw its peer begin terminating.
    PipeTerm,
    /// The other side of a pipe's termination handshake completed.
    PipeTermAck,
    /// A transport hiccup: the peer reconnected under the same pipe.
    Hiccup,
    /// The pipe crossed back below its low-water mark; resume sending.
    ActivateWrite,
    /// The pipe has data to read again after being empty.
    ActivateRead,
}

/// Wiring handed from a parent to a freshly registered child so the child
/// can construct its own [`Own`] via [`Own::new_child`].
pub struct ChildLink {
    pub id: ObjectId,
    pub inbox: MailboxReceiver<Command>,
    pub self_sender: MailboxSender<Command>,
    pub parent_tx: MailboxSender<Command>,
}

/// One node of the ownership tree.
pub struct Own {
    id: ObjectId,
    inbox: MailboxReceiver<Command>,
    self_sender: MailboxSender<Command>,
    parent: Option<(ObjectId, MailboxSender<Command>)>,
    children: HashMap<ObjectId, MailboxSender<Command>>,
    /// Children registered but not yet ack'd as terminated. Shrinks to
    /// zero before this node may send its own `TermAck` upward.
    pending_term_acks: HashMap<ObjectId, ()>,
    terminating: bool,
    linger: Option<Duration>,
}

impl Own {
    /// Create the root of a tree (a context has no parent).
    #[must_use]
    pub fn new_root() -> Self {
        let (tx, rx) = mailbox();
        Self {
            id: ObjectId::fresh(),
            inbox: rx,
            self_sender: tx,
            parent: None,
            children: HashMap::new(),
            pending_term_acks: HashMap::new(),
            terminating: false,
            linger: None,
        }
    }

    /// Register a new child slot and return the wiring the child needs to
    /// build its own `Own` via [`new_child`](Self::new_child) — the child's
    /// inbox is the *same* channel whose sender this node just filed under
    /// the child's id, so `Term`/`TermAck` actually reach it.
    pub fn spawn_child(&mut self) -> ChildLink {
        let (child_tx, child_rx) = mailbox();
        let child_id = ObjectId::fresh();
        self.children.insert(child_id, child_tx.clone());
        self.pending_term_acks.insert(child_id, ());
        ChildLink {
            id: child_id,
            inbox: child_rx,
            self_sender: child_tx,
            parent_tx: self.self_sender.clone(),
        }
    }

    /// Build a child `Own` from the wiring returned by
    /// [`spawn_child`](Self::spawn_child).
    #[must_use]
    pub fn new_child(link: ChildLink) -> Self {
        Self {
            id: link.id,
            inbox: link.inbox,
            self_sender: link.self_sender,
            parent: Some((link.id, link.parent_tx)),
            children: HashMap::new(),
            pending_term_acks: HashMap::new(),
            terminating: false,
            linger: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn sender(&self) -> MailboxSender<Command> {
        self.self_sender.clone()
    }

    #[must_use]
    pub const fn is_terminating(&self) -> bool {
        self.terminating
    }

    #[must_use]
    pub fn is_fully_reaped(&self) -> bool {
        self.terminating && self.pending_term_acks.is_empty()
    }

    /// Begin termination: record the linger budget, mark terminating, and
    /// forward `Term` to every still-registered child.
    pub fn begin_term(&mut self, linger: Option<Duration>) {
        if self.terminating {
            return;
        }
        self.terminating = true;
        self.linger = linger;
        for child in self.children.values() {
            let _ = child.send(Command::Term(linger));
        }
        self.maybe_ack_parent();
    }

    /// Drain and apply one pending command, if any. Returns `true` if a
    /// command was processed (used by the caller's event loop to decide
    /// whether to keep polling before yielding to I/O readiness).
    pub fn process_one(&mut self) -> bool {
        match self.inbox.try_recv() {
            Some(cmd) => {
                self.process_command(cmd);
                true
            }
            None => false,
        }
    }

    fn process_command(&mut self, cmd: Command) {
        match cmd {
            Command::Plug => {}
            Command::TermReq(child_id) => {
                if let Some(tx) = self.children.get(&child_id) {
                    let _ = tx.send(Command::Term(self.linger));
                }
            }
            Command::Term(linger) => self.begin_term(linger),
            Command::TermAck(child_id) => {
                self.pending_term_acks.remove(&child_id);
                self.children.remove(&child_id);
                self.maybe_ack_parent();
            }
            Command::PipeTerm
            | Command::PipeTermAck
            | Command::Hiccup
            | Command::ActivateRead
            | Command::ActivateWrite => {
                // These are consumed by the pipe/session layer that owns
                // this node's data plane; the tree layer only needs to
                // know termination has reached every leaf, which `TermAck`
                // already tracks.
            }
        }
    }

    fn maybe_ack_parent(&mut self) {
        if self.terminating && self.pending_term_acks.is_empty() {
            if let Some((id, parent)) = &self.parent {
                let _ = parent.send(Command::TermAck(*id));
            }
        }
    }

    /// Request this node's own termination, asking the parent first
    /// (used when a leaf, e.g. a socket the user closed, initiates
    /// shutdown rather than being told to by its parent).
    pub fn request_term(&mut self) {
        if let Some((id, parent)) = &self.parent {
            let _ = parent.send(Command::TermReq(*id));
        } else {
            self.begin_term(self.linger);
        }
    }
}
