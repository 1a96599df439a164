//! Lock-free-handshake single-producer/single-consumer queue.
//!
//! Split into a writer half and a reader half (the same shape as this
//! crate's other channel-like primitives), each owned by exactly one
//! thread. Writes accumulate in the writer's private, unshared buffer and
//! only become visible to the reader on [`YPipeWriter::flush`] — this is
//! what lets a pipe batch several `write`s into one cross-thread
//! publication instead of synchronizing per message.
//!
//! The one genuinely shared, contended state is the sleep/wake handshake:
//! `flush` needs to know whether the reader is parked waiting on the
//! mailbox signaler, because if it is, the writer must also push an
//! explicit wakeup; if the reader is still spinning/polling, no signal is
//! needed and the syscall is skipped. That handshake is the
//! compare-and-swap pair this module exists to get right — get it wrong in
//! either direction and you either miss a wakeup (reader blocks forever) or
//! signal redundantly (harmless but defeats the batching).
//!
//! The queue storage itself is a `Mutex`-guarded `VecDeque` rather than an
//! unsafe lock-free linked list: with a single producer and a single
//! consumer the mutex is never meaningfully contended, and this crate
//! confines `unsafe` to [`crate::alloc`].

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::{AtomicCounter, AtomicCursor};

/// Sentinel meaning "the reader is awake (spinning or about to check
/// again)" — no wakeup signal is owed.
const AWAKE: usize = usize::MAX;
/// Sentinel meaning "the reader found nothing and parked" — the next
/// flush must also signal the mailbox.
const SLEEPING: usize = 0;

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    flushed: AtomicCounter,
    sleep_marker: AtomicCursor,
}

/// Writer half. Not `Sync`: only the owning thread may call its methods.
pub struct YPipeWriter<T> {
    shared: Arc<Shared<T>>,
    pending: VecDeque<T>,
}

/// Reader half. Not `Sync`: only the owning thread may call its methods.
pub struct YPipeReader<T> {
    shared: Arc<Shared<T>>,
}

/// Construct a fresh pipe, returning its writer and reader halves.
#[must_use]
pub fn ypipe<T>() -> (YPipeWriter<T>, YPipeReader<T>) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::new()),
        flushed: AtomicCounter::new(0),
        sleep_marker: AtomicCursor::new(AWAKE),
    });
    (
        YPipeWriter {
            shared: shared.clone(),
            pending: VecDeque::new(),
        },
        YPipeReader { shared },
    )
}

impl<T> YPipeWriter<T> {
    /// Append `value` to the writer's private buffer. Not visible to the
    /// reader until [`flush`](Self::flush). `incomplete` marks a value that
    /// is part of an in-progress multipart message — present for symmetry
    /// with [`unwrite`](Self::unwrite), which only ever needs to cancel the
    /// most recent, still-unflushed write.
    pub fn write(&mut self, value: T, incomplete: bool) {
        let _ = incomplete;
        self.pending.push_back(value);
    }

    /// Cancel the most recent not-yet-flushed write (used to back out a
    /// multipart message abandoned mid-send). Returns `None` if there is
    /// nothing pending to cancel.
    pub fn unwrite(&mut self) -> Option<T> {
        self.pending.pop_back()
    }

    /// Discard every pending, not-yet-flushed write (used on pipe
    /// termination, where in-flight-but-unpublished frames are dropped).
    pub fn rollback(&mut self) {
        self.pending.clear();
    }

    /// Publish all pending writes to the reader.
    ///
    /// Returns `true` if the reader was already awake (no signal needed),
    /// `false` if the reader had parked and the caller must also send an
    /// explicit wakeup through the pipe's mailbox.
    pub fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        let n = self.pending.len() as i64;
        {
            let mut q = self.shared.queue.lock();
            q.extend(self.pending.drain(..));
        }
        self.shared.flushed.add(n);
        let observed = self.shared.sleep_marker.cas(SLEEPING, AWAKE);
        observed != SLEEPING
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl<T> YPipeReader<T> {
    /// Check whether an item is available without consuming it. If none is
    /// available, marks the pipe as sleeping so the next `flush` knows to
    /// signal a wakeup.
    pub fn check_read(&self) -> bool {
        if !self.shared.queue.lock().is_empty() {
            return true;
        }
        self.shared.sleep_marker.cas(AWAKE, SLEEPING);
        !self.shared.queue.lock().is_empty()
    }

    /// Pop the next item visible to the reader, if any.
    pub fn read(&self) -> Option<T> {
        let item = self.shared.queue.lock().pop_front();
        if item.is_some() {
            self.shared.sleep_marker.cas(SLEEPING, AWAKE);
        }
        item
    }

    #[must_use]
    pub fn flushed_count(&self) -> i64 {
        self.shared.flushed.get()
    }

    /// True once the marker shows the reader has gone to sleep (used only
    /// by tests to assert the handshake actually parked the reader).
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.shared.sleep_marker.load() == SLEEPING
    }
}
