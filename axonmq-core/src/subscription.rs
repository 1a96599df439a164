//! Byte-keyed subscription trie for XPUB/XSUB/SUB topic matching.
//!
//! Each node owns a refcount rather than a boolean "is this prefix
//! subscribed" flag, because the same exact prefix can be subscribed more
//! than once (multiple local subscribers forwarding the same topic through
//! one XSUB, or a PUB/SUB test that subscribes twice before unsubscribing
//! once). `subscribe` reports whether this was the prefix's first
//! subscriber and `unsubscribe` whether it was the last — XSUB needs
//! exactly those edges to know when to forward a SUBSCRIBE/CANCEL frame
//! upstream instead of swallowing it locally.

use bytes::Bytes;
use hashbrown::HashMap;

#[derive(Default)]
struct TrieNode {
    children: HashMap<u8, Box<TrieNode>>,
    refcount: u32,
}

impl TrieNode {
    fn is_empty(&self) -> bool {
        self.refcount == 0 && self.children.is_empty()
    }

    /// Returns `(was_last_subscriber, this_node_now_removable)`.
    fn unsubscribe(&mut self, prefix: &[u8]) -> (bool, bool) {
        if prefix.is_empty() {
            let was_last = self.refcount > 0 && {
                self.refcount -= 1;
                self.refcount == 0
            };
            return (was_last, self.is_empty());
        }
        let b = prefix[0];
        let mut was_last = false;
        let mut drop_child = false;
        if let Some(child) = self.children.get_mut(&b) {
            let (l, removable) = child.unsubscribe(&prefix[1..]);
            was_last = l;
            drop_child = removable;
        }
        if drop_child {
            self.children.remove(&b);
        }
        (was_last, self.is_empty())
    }

    fn collect(&self, buf: &mut Vec<u8>, out: &mut Vec<Bytes>) {
        if self.refcount > 0 {
            out.push(Bytes::copy_from_slice(buf));
        }
        for (&b, child) in &self.children {
            buf.push(b);
            child.collect(buf, out);
            buf.pop();
        }
    }
}

/// A single subscribed prefix, with its reference count. Returned by
/// [`SubscriptionTrie::apply`] for enumeration/debugging; the trie itself
/// does not store a flat list of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub prefix: Bytes,
    pub refcount: u32,
}

/// Byte-keyed prefix trie mapping subscribed prefixes to reference counts,
/// with prefix-match lookup in `O(topic length)` rather than `O(number of
/// subscriptions)`.
#[derive(Default)]
pub struct SubscriptionTrie {
    root: TrieNode,
    distinct_count: usize,
}

impl SubscriptionTrie {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            distinct_count: 0,
        }
    }

    /// Add a subscription for `prefix`. Returns `true` if this is the
    /// first subscriber for this exact prefix (refcount 0 -> 1).
    pub fn subscribe(&mut self, prefix: impl AsRef<[u8]>) -> bool {
        let mut node = &mut self.root;
        for &b in prefix.as_ref() {
            node = node.children.entry(b).or_insert_with(Box::default);
        }
        node.refcount += 1;
        if node.refcount == 1 {
            self.distinct_count += 1;
            true
        } else {
            false
        }
    }

    /// Remove one subscriber from `prefix`. Returns `true` if this was the
    /// last subscriber for this exact prefix (refcount 1 -> 0). A prefix
    /// with no matching subscription at all returns `false`.
    pub fn unsubscribe(&mut self, prefix: impl AsRef<[u8]>) -> bool {
        let (was_last, _) = self.root.unsubscribe(prefix.as_ref());
        if was_last {
            self.distinct_count -= 1;
        }
        was_last
    }

    /// True if any subscribed prefix is a byte-prefix of `topic` — the
    /// fan-out test PUB/XPUB run per outbound message.
    #[must_use]
    pub fn matches(&self, topic: &[u8]) -> bool {
        let mut node = &self.root;
        if node.refcount > 0 {
            return true;
        }
        for &b in topic {
            match node.children.get(&b) {
                Some(child) => {
                    node = child;
                    if node.refcount > 0 {
                        return true;
                    }
                }
                None => return false,
            }
        }
        false
    }

    /// Enumerate every distinct subscribed prefix with its refcount.
    #[must_use]
    pub fn apply(&self) -> Vec<Subscription> {
        let mut prefixes = Vec::new();
        let mut buf = Vec::new();
        self.root.collect(&mut buf, &mut prefixes);
        let mut out = Vec::with_capacity(prefixes.len());
        for prefix in prefixes {
            let refcount = self.refcount_of(&prefix);
            out.push(Subscription { prefix, refcount });
        }
        out
    }

    fn refcount_of(&self, prefix: &[u8]) -> u32 {
        let mut node = &self.root;
        for &b in prefix {
            match node.children.get(&b) {
                Some(child) => node = child,
                None => return 0,
            }
        }
        node.refcount
    }

    /// All distinct subscribed prefixes (no refcounts), the shape
    /// XSUB/tests actually want to enumerate.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Bytes> {
        let mut out = Vec::new();
        let mut buf = Vec::new();
        self.root.collect(&mut buf, &mut out);
        out
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.distinct_count == 0
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.distinct_count
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::default();
        self.distinct_count = 0;
    }
}

/// Subscription event for XPUB/XSUB control frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Subscribe(Bytes),
    Unsubscribe(Bytes),
}

impl SubscriptionEvent {
    /// Parse a ZMTP subscription control frame: `[0x01|0x00][prefix...]`.
    #[must_use]
    pub fn from_message(msg: &[u8]) -> Option<Self> {
        if msg.is_empty() {
            return None;
        }
        let prefix = Bytes::copy_from_slice(&msg[1..]);
        match msg[0] {
            0x01 => Some(Self::Subscribe(prefix)),
            0x00 => Some(Self::Unsubscribe(prefix)),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_message(&self) -> Bytes {
        let (cmd, prefix) = match self {
            Self::Subscribe(p) => (0x01u8, p),
            Self::Unsubscribe(p) => (0x00u8, p),
        };
        let mut msg = Vec::with_capacity(1 + prefix.len());
        msg.push(cmd);
        msg.extend_from_slice(prefix);
        Bytes::from(msg)
    }

    #[must_use]
    pub const fn prefix(&self) -> &Bytes {
        match self {
            Self::Subscribe(p) | Self::Unsubscribe(p) => p,
        }
    }

    #[must_use]
    pub const fn is_subscribe(&self) -> bool {
        matches!(self, Self::Subscribe(_))
    }

    #[must_use]
    pub const fn is_unsubscribe(&self) -> bool {
        matches!(self, Self::Unsubscribe(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trie_basic_prefix_match() {
        let mut trie = SubscriptionTrie::new();
        assert!(!trie.matches(b"topic.foo"));

        trie.subscribe(b"topic.");
        assert!(trie.matches(b"topic.foo"));
        assert!(!trie.matches(b"other.foo"));

        trie.unsubscribe(b"topic.");
        assert!(!trie.matches(b"topic.foo"));
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let mut trie = SubscriptionTrie::new();
        trie.subscribe(b"");
        assert!(trie.matches(b"anything"));
        assert!(trie.matches(b""));
    }

    #[test]
    fn multiple_distinct_prefixes() {
        let mut trie = SubscriptionTrie::new();
        trie.subscribe(b"topic.");
        trie.subscribe(b"events.");
        assert!(trie.matches(b"topic.foo"));
        assert!(trie.matches(b"events.bar"));
        assert!(!trie.matches(b"other.baz"));
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn refcounted_duplicate_subscribe() {
        let mut trie = SubscriptionTrie::new();
        assert!(trie.subscribe(b"a"), "first subscriber");
        assert!(!trie.subscribe(b"a"), "second subscriber, not first");
        assert_eq!(trie.len(), 1);

        assert!(!trie.unsubscribe(b"a"), "one subscriber remains");
        assert!(trie.matches(b"abc"));
        assert!(trie.unsubscribe(b"a"), "last subscriber removed");
        assert!(!trie.matches(b"abc"));
    }

    #[test]
    fn unsubscribe_prunes_dead_branches() {
        let mut trie = SubscriptionTrie::new();
        trie.subscribe(b"aaa");
        trie.unsubscribe(b"aaa");
        assert!(trie.root.children.is_empty());
    }

    #[test]
    fn shared_prefix_nodes_do_not_interfere() {
        let mut trie = SubscriptionTrie::new();
        trie.subscribe(b"ab");
        trie.subscribe(b"abc");
        assert!(trie.matches(b"ab"));
        assert!(trie.matches(b"abcdef"));

        trie.unsubscribe(b"abc");
        assert!(trie.matches(b"abcdef"), "still matches via shorter prefix 'ab'");
        assert!(!trie.matches(b"xy"));
    }

    #[test]
    fn apply_enumerates_prefixes_with_refcounts() {
        let mut trie = SubscriptionTrie::new();
        trie.subscribe(b"x");
        trie.subscribe(b"x");
        trie.subscribe(b"y");

        let mut subs = trie.apply();
        subs.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].prefix, Bytes::from_static(b"x"));
        assert_eq!(subs[0].refcount, 2);
        assert_eq!(subs[1].prefix, Bytes::from_static(b"y"));
        assert_eq!(subs[1].refcount, 1);
    }

    #[test]
    fn subscription_event_round_trip() {
        let sub = SubscriptionEvent::Subscribe(Bytes::from_static(b"topic"));
        let msg = sub.to_message();
        assert_eq!(msg[0], 0x01);
        assert_eq!(&msg[1..], b"topic");
        assert_eq!(SubscriptionEvent::from_message(&msg).unwrap(), sub);

        let unsub = SubscriptionEvent::Unsubscribe(Bytes::from_static(b"topic"));
        let msg = unsub.to_message();
        assert_eq!(msg[0], 0x00);
        assert_eq!(SubscriptionEvent::from_message(&msg).unwrap(), unsub);
    }
}
