//! Owned or borrowed byte buffer with strong lexicographic ordering.
//!
//! Used as a peer routing-id and as a subscription-trie key. Built directly
//! on `bytes::Bytes`, which already gives cheap `clone` (refcount bump, not
//! a copy) — the "owns vs. borrows" distinction from the source design is
//! therefore just which constructor was used; both behave identically at
//! the API surface.

use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;

/// An owned or zero-copy-borrowed byte string, ordered lexicographically.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Blob(Bytes);

impl Blob {
    /// Construct a `Blob` that owns a fresh copy of `data`.
    #[must_use]
    pub fn copy_from(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }

    /// Construct a `Blob` from an already-owned, refcounted buffer. Cloning
    /// this `Blob` is a refcount bump, not a copy.
    #[must_use]
    pub fn from_bytes(data: Bytes) -> Self {
        Self(data)
    }

    /// The empty blob.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Deep-copy this blob into a brand-new allocation (used where the
    /// source explicitly distinguishes "move" from "copy" semantics).
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self::copy_from(&self.0)
    }

    /// True if `self` is a byte-prefix of `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &[u8]) -> bool {
        other.starts_with(self.as_slice())
    }
}

impl PartialOrd for Blob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Blob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_ref().cmp(other.0.as_ref())
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "Blob({s:?})"),
            _ => write!(f, "Blob({:?})", self.0.as_ref()),
        }
    }
}

impl From<&[u8]> for Blob {
    fn from(v: &[u8]) -> Self {
        Self::copy_from(v)
    }
}

impl From<Vec<u8>> for Blob {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<Bytes> for Blob {
    fn from(v: Bytes) -> Self {
        Self(v)
    }
}

impl From<&str> for Blob {
    fn from(v: &str) -> Self {
        Self::copy_from(v.as_bytes())
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::borrow::Borrow<[u8]> for Blob {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        let a = Blob::from("abc");
        let b = Blob::from("abd");
        assert!(a < b);
    }

    #[test]
    fn clone_is_cheap_refcount_bump() {
        let a = Blob::from("routing-id-42");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn deep_copy_produces_independent_allocation() {
        let a = Blob::from("x");
        let b = a.deep_copy();
        assert_eq!(a, b);
    }

    #[test]
    fn prefix_matching() {
        let prefix = Blob::from("news.");
        assert!(prefix.is_prefix_of(b"news.weather"));
        assert!(!prefix.is_prefix_of(b"sports.football"));
    }
}
