//! Monotonic clock and atomic counter/pointer primitives.
//!
//! These are the leaf primitives the rest of the runtime is built on: a
//! monotonic time source for timers and reconnect backoff, a process-wide
//! unique-id counter, and the acquire/release atomic pointer operations the
//! [`crate::ypipe`] flush handshake depends on.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;

static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic microseconds since the first call into this module.
#[must_use]
pub fn now_us() -> u64 {
    CLOCK_ORIGIN.elapsed().as_micros() as u64
}

/// Monotonic milliseconds since the first call into this module.
#[must_use]
pub fn now_ms() -> u64 {
    CLOCK_ORIGIN.elapsed().as_millis() as u64
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide monotonically increasing identifier, used only for
/// diagnostic identity (socket ids, peer ids) — never for correctness.
#[must_use]
pub fn next_global_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Signed atomic counter with acquire/release semantics, used for seqnums
/// and pending-term counts that must be visible across threads.
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicI64);

impl AtomicCounter {
    #[must_use]
    pub const fn new(v: i64) -> Self {
        Self(AtomicI64::new(v))
    }

    pub fn add(&self, delta: i64) -> i64 {
        self.0.fetch_add(delta, Ordering::AcqRel)
    }

    pub fn sub(&self, delta: i64) -> i64 {
        self.0.fetch_sub(delta, Ordering::AcqRel)
    }

    #[must_use]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, v: i64) {
        self.0.store(v, Ordering::Release);
    }
}

/// Atomic cursor used by [`crate::ypipe`]'s flush handshake.
///
/// Wraps a plain `usize` cursor (an index into a chunk list, not a raw
/// pointer — safe Rust has no business CASing real pointers here) with the
/// exact orderings the ypipe protocol requires: `xchg` is acq_rel, `cas`
/// is release-on-success / acquire-on-failure.
#[derive(Debug, Default)]
pub struct AtomicCursor(AtomicUsize);

impl AtomicCursor {
    #[must_use]
    pub const fn new(v: usize) -> Self {
        Self(AtomicUsize::new(v))
    }

    #[must_use]
    pub fn load(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    pub fn xchg(&self, new: usize) -> usize {
        self.0.swap(new, Ordering::AcqRel)
    }

    /// Compare-and-swap: succeeds iff the cursor currently equals `current`.
    /// Returns the value observed (== `current` on success).
    pub fn cas(&self, current: usize, new: usize) -> usize {
        match self
            .0
            .compare_exchange(current, new, Ordering::Release, Ordering::Acquire)
        {
            Ok(v) | Err(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let a = now_us();
        std::thread::sleep(std::time::Duration::from_micros(50));
        let b = now_us();
        assert!(b >= a);
    }

    #[test]
    fn global_ids_are_unique_and_increasing() {
        let a = next_global_id();
        let b = next_global_id();
        assert!(b > a);
    }

    #[test]
    fn atomic_counter_add_sub() {
        let c = AtomicCounter::new(0);
        c.add(3);
        assert_eq!(c.get(), 3);
        c.sub(1);
        assert_eq!(c.get(), 2);
    }

    #[test]
    fn atomic_cursor_cas_semantics() {
        let cur = AtomicCursor::new(0);
        assert_eq!(cur.cas(0, 5), 0); // success, returns old value
        assert_eq!(cur.load(), 5);
        assert_eq!(cur.cas(0, 9), 5); // failure, returns current value
        assert_eq!(cur.load(), 5);
    }
}
