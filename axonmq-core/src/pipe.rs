//! The `pipe_t` abstraction: a HWM/LWM-bounded, orderly-shutdown channel
//! between a socket and its I/O-thread-side peer, built on two
//! [`crate::ypipe`] queues running in opposite directions.
//!
//! A pipe is always created as a pair — [`pipepair`] returns both ends —
//! because termination is a handshake between them, not a unilateral
//! close.

use std::sync::Arc;

use crate::clock::AtomicCounter;
use crate::msg::Msg;
use crate::ypipe::{ypipe, YPipeReader, YPipeWriter};

/// Lifecycle state of one end of a pipe. Termination is a two-phase
/// handshake so that messages already in flight when `terminate` is
/// called are not silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    Active,
    /// A `delimiter` has been read from the peer; no more reads will
    /// succeed, but this end may still write until it terminates.
    DelimiterReceived,
    /// This end asked the peer to terminate and is waiting for the
    /// peer's own `term` request to arrive before it can ack.
    WaitingForDelimiter,
    TermReqSent1,
    TermReqSent2,
    TermAckSent,
}

struct Endpoint {
    outstanding: Arc<AtomicCounter>,
    hwm: usize,
    lwm: usize,
}

impl Endpoint {
    fn new(hwm: usize) -> Self {
        let lwm = if hwm == 0 { 0 } else { (hwm + 1) / 2 };
        Self {
            outstanding: Arc::new(AtomicCounter::new(0)),
            hwm,
            lwm,
        }
    }

    fn below_hwm(&self) -> bool {
        self.hwm == 0 || self.outstanding.get() < self.hwm as i64
    }
}

type WakeHook = Box<dyn Fn() + Send + Sync>;

/// One end of a bidirectional pipe. `T` is almost always [`Msg`]; kept
/// generic so tests can exercise the state machine with plain values.
pub struct Pipe<T = Msg> {
    out_writer: YPipeWriter<T>,
    in_reader: YPipeReader<T>,
    out: Endpoint,
    in_outstanding: Arc<AtomicCounter>,
    state: PipeState,
    /// Invoked when a previously-hwm-blocked peer becomes writable again
    /// (the `activate_write` command in the source design).
    on_writable: Option<WakeHook>,
}

/// Create a connected pair of pipes. `hwm` is `(this_to_peer, peer_to_this)`
/// — asymmetric high-water marks are legal and used by ROUTER (which often
/// sets HWM differently per direction than DEALER).
#[must_use]
pub fn pipepair<T>(hwm: (usize, usize)) -> (Pipe<T>, Pipe<T>) {
    let (a_to_b_w, a_to_b_r) = ypipe::<T>();
    let (b_to_a_w, b_to_a_r) = ypipe::<T>();

    let a_out = Endpoint::new(hwm.0);
    let b_out = Endpoint::new(hwm.1);
    let a_in_outstanding = b_out.outstanding.clone();
    let b_in_outstanding = a_out.outstanding.clone();

    let a = Pipe {
        out_writer: a_to_b_w,
        in_reader: b_to_a_r,
        out: a_out,
        in_outstanding: a_in_outstanding,
        state: PipeState::Active,
        on_writable: None,
    };
    let b = Pipe {
        out_writer: b_to_a_w,
        in_reader: a_to_b_r,
        out: b_out,
        in_outstanding: b_in_outstanding,
        state: PipeState::Active,
        on_writable: None,
    };
    (a, b)
}

impl<T> Pipe<T> {
    /// Register a callback fired when this end transitions from
    /// above-HWM to below-LWM, i.e. the peer may resume sending.
    pub fn set_writable_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.on_writable = Some(Box::new(hook));
    }

    #[must_use]
    pub const fn state(&self) -> PipeState {
        self.state
    }

    /// `check_write()` — false once outstanding-in-flight reaches this
    /// direction's HWM; the caller must stop sending until capacity frees.
    #[must_use]
    pub fn check_write(&self) -> bool {
        matches!(self.state, PipeState::Active) && self.out.below_hwm()
    }

    /// `write(msg)` — stage a message for the peer. Does not block on HWM;
    /// callers must consult [`check_write`](Self::check_write) first, same
    /// as the socket_base send path does.
    pub fn write(&mut self, msg: T, incomplete: bool) {
        self.out_writer.write(msg, incomplete);
        self.out.outstanding.add(1);
    }

    pub fn unwrite(&mut self) -> Option<T> {
        let v = self.out_writer.unwrite();
        if v.is_some() {
            self.out.outstanding.sub(1);
        }
        v
    }

    pub fn rollback(&mut self) {
        let n = self.out_writer.pending_len() as i64;
        self.out_writer.rollback();
        self.out.outstanding.sub(n);
    }

    /// `flush()` — publish staged writes to the peer. Returns `true` if
    /// the peer's read side needed an explicit wakeup signal.
    pub fn flush(&mut self) -> bool {
        !self.out_writer.flush()
    }

    /// `check_read()` — true if a message is available without blocking.
    #[must_use]
    pub fn check_read(&self) -> bool {
        self.in_reader.check_read()
    }

    /// `read()` — consume the next inbound message, if any, and fire the
    /// writable hook if this crossed back below LWM.
    pub fn read(&mut self) -> Option<T> {
        let msg = self.in_reader.read()?;
        let prev = self.in_outstanding.sub(1);
        let after = prev - 1;
        // TODO: this end doesn't own the peer's lwm, only its outstanding
        // counter; fire on fully drained rather than lwm-crossing until the
        // real lwm is threaded through from the peer's Endpoint.
        if after == 0 {
            if let Some(hook) = &self.on_writable {
                hook();
            }
        }
        Some(msg)
    }

    /// `terminate(delay)` — begin the two-phase shutdown handshake. When
    /// `delay` is true (linger-style), any already-queued outbound writes
    /// are still flushed before the delimiter is sent; when false, pending
    /// writes are rolled back immediately.
    pub fn terminate(&mut self, delay: bool) {
        if !delay {
            self.rollback();
        }
        self.state = match self.state {
            PipeState::Active => PipeState::TermReqSent1,
            PipeState::DelimiterReceived => PipeState::TermAckSent,
            other => other,
        };
    }

    /// Called when a `delimiter` control message is observed on the read
    /// side — the peer has begun terminating.
    pub fn on_delimiter_received(&mut self) {
        self.state = match self.state {
            PipeState::Active => PipeState::DelimiterReceived,
            PipeState::TermReqSent1 => PipeState::TermAckSent,
            other => other,
        };
    }

    /// Called when the peer's `term_ack` arrives, completing the
    /// handshake's second phase.
    pub fn on_term_ack(&mut self) {
        self.state = PipeState::TermAckSent;
    }

    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self.state, PipeState::TermAckSent)
    }

    #[must_use]
    pub fn outstanding_out(&self) -> i64 {
        self.out.outstanding.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hwm_blocks_writer_past_limit() {
        let (mut a, _b) = pipepair::<i32>((2, 2));
        assert!(a.check_write());
        a.write(1, false);
        assert!(a.check_write());
        a.write(2, false);
        assert!(!a.check_write(), "should be blocked at hwm");
    }

    #[test]
    fn read_side_sees_flushed_writes() {
        let (mut a, mut b) = pipepair::<i32>((4, 4));
        a.write(10, false);
        a.write(20, false);
        a.flush();
        assert!(b.check_read());
        assert_eq!(b.read(), Some(10));
        assert_eq!(b.read(), Some(20));
        assert_eq!(b.read(), None);
    }

    #[test]
    fn zero_hwm_means_unbounded() {
        let (mut a, _b) = pipepair::<i32>((0, 0));
        for i in 0..1000 {
            assert!(a.check_write());
            a.write(i, false);
        }
    }

    #[test]
    fn unwrite_undoes_outstanding_count() {
        let (mut a, _b) = pipepair::<i32>((1, 1));
        a.write(1, false);
        assert!(!a.check_write());
        assert_eq!(a.unwrite(), Some(1));
        assert!(a.check_write());
    }

    #[test]
    fn terminate_without_delay_rolls_back_pending() {
        let (mut a, mut b) = pipepair::<i32>((4, 4));
        a.write(1, false);
        a.terminate(false);
        a.flush();
        assert!(!b.check_read());
        assert_eq!(a.state(), PipeState::TermReqSent1);
    }

    #[test]
    fn delimiter_then_terminate_reaches_term_ack_sent() {
        let (mut a, _b) = pipepair::<i32>((4, 4));
        a.on_delimiter_received();
        assert_eq!(a.state(), PipeState::DelimiterReceived);
        a.terminate(true);
        assert!(a.is_terminated());
    }

    #[test]
    fn writable_hook_fires_when_outstanding_drains() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();

        let (mut a, mut b) = pipepair::<i32>((4, 4));
        b.set_writable_hook(move || fired2.store(true, Ordering::SeqCst));
        a.write(1, false);
        a.flush();
        assert!(!fired.load(Ordering::SeqCst));
        b.read();
        assert!(fired.load(Ordering::SeqCst));
    }
}
