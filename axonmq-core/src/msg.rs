//! The wire-level message type: a tagged union of small-inline, large
//! heap-refcounted, zero-copy-borrowed, and control-frame variants.
//!
//! This is distinct from [`crate::message_builder::Message`], which is an
//! ergonomic multipart *application* builder layered on top of frames; `Msg`
//! is the single-frame primitive the pipe, session, and engine pass around.
//!
//! Variant choice mirrors the source design (`vsm`/`lmsg`/`cmsg`), but on top
//! of `bytes::Bytes` — which is already a refcounted zero-copy buffer — the
//! `vsm`/`lmsg` split is purely a size classification (no separate inline
//! representation is needed in safe Rust the way it is in a C allocator), and
//! `Drop` gives us the "exactly one `close` per `init`" invariant for free:
//! a leaked `Msg` is a compile-time impossibility, not a runtime contract to
//! police.

use bytes::Bytes;
use std::fmt;

/// Payload small enough to avoid the bookkeeping of a dedicated large-buffer
/// classification. Matches the spec's "≈30 bytes" small-message bound.
pub const VSM_MAX: usize = 30;

/// Message-level flags (distinct from the wire frame flags in the ZMTP
/// codec, though `MORE` and `COMMAND` share the same bit position by
/// convention).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgFlags(u8);

impl MsgFlags {
    pub const MORE: Self = Self(0b0000_0001);
    pub const COMMAND: Self = Self(0b0000_0010);
    pub const CREDENTIAL: Self = Self(0b0000_0100);
    pub const ROUTING_ID: Self = Self(0b0000_1000);
    pub const SHARED: Self = Self(0b0001_0000);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for MsgFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A deallocator invoked exactly once, when the last reference to a
/// zero-copy ("cmsg") buffer is dropped. Must be safe to call from any
/// thread, since the final `close` may happen on whichever thread drops
/// the last clone.
pub type Dealloc = Box<dyn FnOnce(&[u8]) + Send + 'static>;

struct CmsgOwner {
    buf: Vec<u8>,
    dealloc: Option<Dealloc>,
}

impl AsRef<[u8]> for CmsgOwner {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for CmsgOwner {
    fn drop(&mut self) {
        if let Some(d) = self.dealloc.take() {
            d(&self.buf);
        }
    }
}

#[derive(Clone)]
enum Kind {
    /// Empty message (the result of `init()` or of a `move` source).
    Empty,
    /// Inline-small payload, no separate allocation strategy needed.
    Vsm(Bytes),
    /// Heap-allocated content, shared via refcount on `clone`.
    Lmsg(Bytes),
    /// Zero-copy borrowed buffer with a user deallocator, invoked on last
    /// release (i.e. when the underlying `Bytes`'s refcount hits zero).
    Cmsg(Bytes),
    Join,
    Leave,
    Delimiter,
    Ping(Bytes),
    Pong(Bytes),
    Close,
    Subscribe(Bytes),
    Cancel(Bytes),
    RoutingId(Bytes),
}

/// The tagged-union wire message. Cheap to `clone` (refcount bump for the
/// data-carrying variants); every data-carrying variant's payload is
/// accessible uniformly via [`Msg::data`].
#[derive(Clone)]
pub struct Msg {
    kind: Kind,
    flags: MsgFlags,
    routing_id: u32,
}

impl Msg {
    /// `init()` — empty message.
    #[must_use]
    pub const fn init() -> Self {
        Self {
            kind: Kind::Empty,
            flags: MsgFlags::empty(),
            routing_id: 0,
        }
    }

    /// `init_size(n)` — classify by size; small payloads are tagged `vsm`,
    /// larger ones `lmsg`. Both share the same `Bytes` backing; the
    /// distinction only affects `is_vsm`/`is_lmsg` introspection.
    #[must_use]
    pub fn init_size(data: Bytes) -> Self {
        let kind = if data.len() <= VSM_MAX {
            Kind::Vsm(data)
        } else {
            Kind::Lmsg(data)
        };
        Self {
            kind,
            flags: MsgFlags::empty(),
            routing_id: 0,
        }
    }

    /// `init_buffer(src, n)` — copy-in constructor.
    #[must_use]
    pub fn init_buffer(src: &[u8]) -> Self {
        Self::init_size(Bytes::copy_from_slice(src))
    }

    /// `init_data(ptr, n, dealloc, hint)` — zero-copy send with a release
    /// callback. `hint` has no meaningful analogue in safe Rust (it exists
    /// in the source purely so the same deallocator fn can serve several
    /// allocation pools) and is dropped from the signature.
    #[must_use]
    pub fn init_data(buf: Vec<u8>, dealloc: Dealloc) -> Self {
        let owner = CmsgOwner {
            buf,
            dealloc: Some(dealloc),
        };
        Self {
            kind: Kind::Cmsg(Bytes::from_owner(owner)),
            flags: MsgFlags::empty(),
            routing_id: 0,
        }
    }

    #[must_use]
    pub const fn init_join() -> Self {
        Self::control(Kind::Join)
    }

    #[must_use]
    pub const fn init_leave() -> Self {
        Self::control(Kind::Leave)
    }

    #[must_use]
    pub const fn init_delimiter() -> Self {
        Self::control(Kind::Delimiter)
    }

    #[must_use]
    pub fn init_ping(context: Bytes) -> Self {
        let mut m = Self::control(Kind::Ping(context));
        m.flags.insert(MsgFlags::COMMAND);
        m
    }

    #[must_use]
    pub fn init_pong(context: Bytes) -> Self {
        let mut m = Self::control(Kind::Pong(context));
        m.flags.insert(MsgFlags::COMMAND);
        m
    }

    #[must_use]
    pub fn init_close() -> Self {
        let mut m = Self::control(Kind::Close);
        m.flags.insert(MsgFlags::COMMAND);
        m
    }

    #[must_use]
    pub fn init_subscribe(prefix: Bytes) -> Self {
        Self::control(Kind::Subscribe(prefix))
    }

    #[must_use]
    pub fn init_cancel(prefix: Bytes) -> Self {
        Self::control(Kind::Cancel(prefix))
    }

    #[must_use]
    pub fn init_routing_id_frame(id: Bytes) -> Self {
        let mut m = Self::control(Kind::RoutingId(id));
        m.flags.insert(MsgFlags::ROUTING_ID);
        m
    }

    const fn control(kind: Kind) -> Self {
        Self {
            kind,
            flags: MsgFlags::empty(),
            routing_id: 0,
        }
    }

    /// `close()` — explicit release. A no-op beyond `drop`: Rust's
    /// ownership model already guarantees every `init*` is paired with
    /// exactly one release of its resources. Kept for API symmetry with
    /// call sites that want to make the release point explicit.
    pub fn close(self) {}

    /// `copy(dst)` — for `lmsg`/`cmsg`, bumps the refcount and marks both
    /// sides `SHARED`; for control variants, trivial copy.
    #[must_use]
    pub fn copy(&self) -> Self {
        let mut c = self.clone();
        if matches!(self.kind, Kind::Lmsg(_) | Kind::Cmsg(_)) {
            c.flags.insert(MsgFlags::SHARED);
        }
        c
    }

    /// `move(dst)` — transfers content, leaving `self` reinitialised as an
    /// empty message.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::init())
    }

    /// `data()` — variant-dispatched payload view. Control variants with no
    /// payload return `None`.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match &self.kind {
            Kind::Empty | Kind::Join | Kind::Leave | Kind::Delimiter | Kind::Close => None,
            Kind::Vsm(b) | Kind::Lmsg(b) | Kind::Cmsg(b) => Some(b),
            Kind::Ping(b) | Kind::Pong(b) => Some(b),
            Kind::Subscribe(b) | Kind::Cancel(b) => Some(b),
            Kind::RoutingId(b) => Some(b),
        }
    }

    /// `size()` — byte length of the payload (`0` for payload-less control
    /// variants).
    #[must_use]
    pub fn size(&self) -> usize {
        self.data().map_or(0, <[u8]>::len)
    }

    /// Underlying refcounted buffer, when this variant carries one. Useful
    /// for handing the payload directly to a writer without copying.
    #[must_use]
    pub fn bytes(&self) -> Option<Bytes> {
        match &self.kind {
            Kind::Vsm(b) | Kind::Lmsg(b) | Kind::Cmsg(b) => Some(b.clone()),
            Kind::Ping(b) | Kind::Pong(b) => Some(b.clone()),
            Kind::Subscribe(b) | Kind::Cancel(b) => Some(b.clone()),
            Kind::RoutingId(b) => Some(b.clone()),
            Kind::Empty | Kind::Join | Kind::Leave | Kind::Delimiter | Kind::Close => None,
        }
    }

    #[must_use]
    pub const fn is_vsm(&self) -> bool {
        matches!(self.kind, Kind::Vsm(_))
    }

    #[must_use]
    pub const fn is_lmsg(&self) -> bool {
        matches!(self.kind, Kind::Lmsg(_))
    }

    #[must_use]
    pub const fn is_cmsg(&self) -> bool {
        matches!(self.kind, Kind::Cmsg(_))
    }

    #[must_use]
    pub const fn is_delimiter(&self) -> bool {
        matches!(self.kind, Kind::Delimiter)
    }

    #[must_use]
    pub const fn is_subscribe(&self) -> bool {
        matches!(self.kind, Kind::Subscribe(_))
    }

    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        matches!(self.kind, Kind::Cancel(_))
    }

    #[must_use]
    pub const fn is_ping(&self) -> bool {
        matches!(self.kind, Kind::Ping(_))
    }

    #[must_use]
    pub const fn is_pong(&self) -> bool {
        matches!(self.kind, Kind::Pong(_))
    }

    #[must_use]
    pub const fn flags(&self) -> MsgFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: MsgFlags) {
        self.flags.insert(flags);
    }

    pub fn reset_flags(&mut self, flags: MsgFlags) {
        self.flags.remove(flags);
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.flags.contains(MsgFlags::MORE)
    }

    pub fn set_more(&mut self, more: bool) {
        if more {
            self.flags.insert(MsgFlags::MORE);
        } else {
            self.flags.remove(MsgFlags::MORE);
        }
    }

    #[must_use]
    pub const fn get_routing_id(&self) -> u32 {
        self.routing_id
    }

    pub fn set_routing_id(&mut self, id: u32) {
        self.routing_id = id;
    }
}

impl fmt::Debug for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::Empty => "empty",
            Kind::Vsm(_) => "vsm",
            Kind::Lmsg(_) => "lmsg",
            Kind::Cmsg(_) => "cmsg",
            Kind::Join => "join",
            Kind::Leave => "leave",
            Kind::Delimiter => "delimiter",
            Kind::Ping(_) => "ping",
            Kind::Pong(_) => "pong",
            Kind::Close => "close",
            Kind::Subscribe(_) => "subscribe",
            Kind::Cancel(_) => "cancel",
            Kind::RoutingId(_) => "routing_id",
        };
        f.debug_struct("Msg")
            .field("kind", &kind)
            .field("size", &self.size())
            .field("flags", &self.flags)
            .finish()
    }
}

impl Default for Msg {
    fn default() -> Self {
        Self::init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn vsm_lmsg_size_classification() {
        let small = Msg::init_size(Bytes::from_static(b"short"));
        assert!(small.is_vsm());

        let large = Msg::init_size(Bytes::from(vec![0u8; VSM_MAX + 1]));
        assert!(large.is_lmsg());
    }

    #[test]
    fn copy_marks_shared_and_bumps_refcount() {
        let original = Msg::init_size(Bytes::from(vec![0u8; VSM_MAX + 5]));
        let copy = original.copy();
        assert!(copy.flags().contains(MsgFlags::SHARED));
        assert_eq!(original.data(), copy.data());
    }

    #[test]
    fn move_leaves_source_empty() {
        let mut original = Msg::init_buffer(b"payload");
        let moved = original.take();
        assert_eq!(original.size(), 0);
        assert_eq!(moved.data(), Some(b"payload".as_ref()));
    }

    #[test]
    fn cmsg_dealloc_runs_exactly_once_on_last_release() {
        let called = Arc::new(AtomicBool::new(false));
        let called2 = called.clone();
        let msg = Msg::init_data(
            b"zero-copy".to_vec(),
            Box::new(move |_| {
                called2.store(true, Ordering::SeqCst);
            }),
        );
        let clone = msg.copy();
        drop(msg);
        assert!(!called.load(Ordering::SeqCst), "dealloc ran before last release");
        drop(clone);
        assert!(called.load(Ordering::SeqCst), "dealloc did not run on last release");
    }

    #[test]
    fn control_variants_round_trip() {
        assert!(Msg::init_delimiter().is_delimiter());
        assert!(Msg::init_subscribe(Bytes::from_static(b"news.")).is_subscribe());
        assert!(Msg::init_cancel(Bytes::from_static(b"news.")).is_cancel());
        assert!(Msg::init_ping(Bytes::new()).is_ping());
        assert!(Msg::init_pong(Bytes::new()).is_pong());
    }

    #[test]
    fn more_flag_and_routing_id() {
        let mut m = Msg::init_buffer(b"x");
        m.set_more(true);
        assert!(m.has_more());
        m.set_more(false);
        assert!(!m.has_more());

        m.set_routing_id(42);
        assert_eq!(m.get_routing_id(), 42);
    }

    #[test]
    fn zero_length_message_is_distinct_from_no_message() {
        let zero = Msg::init_buffer(b"");
        assert_eq!(zero.size(), 0);
        assert!(zero.data().is_some());
    }

    #[test]
    fn vsm_max_boundary() {
        let at_max = Msg::init_size(Bytes::from(vec![0u8; VSM_MAX]));
        assert!(at_max.is_vsm());
        let over_max = Msg::init_size(Bytes::from(vec![0u8; VSM_MAX + 1]));
        assert!(over_max.is_lmsg());
    }
}
