//! Axon Core
//!
//! Runtime-agnostic building blocks shared by every transport and socket
//! type in `axonmq-zmtp`:
//! - Monotonic clock and atomic primitives (`clock`)
//! - Owned/borrowed byte buffer (`blob`)
//! - The wire message tagged union (`msg`) and its ergonomic multipart
//!   builder (`message_builder`)
//! - Lock-free-handshake SPSC queue (`ypipe`) and the HWM-bounded pipe
//!   built on it (`pipe`)
//! - Cross-thread command mailbox (`mailbox`) and the object/own shutdown
//!   tree (`object`)
//! - The context: socket registry + scoped inproc namespace (`context`)
//! - Byte-keyed subscription trie (`subscription`)
//! - Fair-queue/load-balance pipe rotations (`dispatch`)
//! - Pinned / io_uring-safe allocation (`alloc`)
//! - Split-pump socket actor (`actor`)
//! - ROUTER hub + peer map (`router`), PUB/SUB hub + subscription index
//!   (`pubsub`)
//! - Byte-based backpressure (`backpressure`)
//! - Endpoint parsing (`endpoint`), reconnect backoff (`reconnect`),
//!   transport hygiene (`tcp`, `ipc`), socket options (`options`),
//!   socket type enum (`socket_type`), receive buffering (`buffer`),
//!   cancellation-safety guard (`poison`), socket monitor events
//!   (`monitor`), timeouts (`timeout`), raw inproc channel pair (`inproc`)
//! - Error types (`error`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_pass_by_ref_mut)]
#![allow(clippy::match_same_arms)]
pub mod actor;
pub mod alloc;
pub mod backpressure;
pub mod blob;
pub mod buffer;
pub mod clock;
pub mod context;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod inproc;
pub mod ipc;
pub mod mailbox;
pub mod message_builder;
pub mod monitor;
pub mod msg;
pub mod object;
pub mod options;
pub mod pipe;
pub mod poison;
pub mod reconnect;
pub mod router;
pub mod socket_type;
pub mod subscription;
pub mod tcp;
pub mod timeout;
pub mod ypipe;

pub mod pubsub {
    pub mod hub;
    pub mod index;
}

// Small prelude to make downstream crates ergonomic. Kept minimal to
// avoid API lock-in; `monitor::SocketEvent` is intentionally left out
// since `actor::SocketEvent` already claims that name in the prelude.
pub mod prelude {
    pub use crate::actor::{SocketActor, SocketEvent, UserCmd};
    pub use crate::alloc::{IoArena, SlabMut};
    pub use crate::backpressure::{BytePermits, NoOpPermits, Permit};
    pub use crate::blob::Blob;
    pub use crate::context::{Context, ContextOptions};
    pub use crate::dispatch::{Fq, Lb};
    pub use crate::mailbox::{mailbox, MailboxReceiver, MailboxSender};
    pub use crate::msg::{Msg, MsgFlags};
    pub use crate::object::{ChildLink, Command, ObjectId, Own};
    pub use crate::pipe::{pipepair, Pipe, PipeState};
    pub use crate::pubsub::hub::{PubSubCmd, PubSubEvent, PubSubHub};
    pub use crate::pubsub::index::{PeerKey, SubscriptionIndex};
    pub use crate::router::{HubEvent, PeerCmd, RouterBehavior, RouterCmd, RouterHub};
    pub use crate::ypipe::{ypipe, YPipeReader, YPipeWriter};
}
