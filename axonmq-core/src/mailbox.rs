//! Cross-thread command queue.
//!
//! Every `object` in [`crate::object`] owns one mailbox; sending a command
//! to an object means pushing onto its mailbox and, unlike the ypipe data
//! path, always signals the receiver — command traffic is low-volume and
//! latency-sensitive (termination, pipe attach/detach), so there is no
//! batching to protect by staying quiet.
//!
//! Built directly on `flume`, the channel crate already used by
//! [`crate::actor`] and [`crate::router`], rather than hand-rolling a
//! signaled queue on top of `ypipe`.

use flume::{Receiver, RecvError, Sender, TryRecvError};

/// Send half of a mailbox. Cheaply `Clone`-able; every object's children
/// and parent hold a clone so any of them can post a command.
#[derive(Clone)]
pub struct MailboxSender<C>(Sender<C>);

/// Receive half of a mailbox. Owned by exactly one object — the thread
/// that runs its event loop.
pub struct MailboxReceiver<C>(Receiver<C>);

/// Create a connected mailbox pair.
#[must_use]
pub fn mailbox<C>() -> (MailboxSender<C>, MailboxReceiver<C>) {
    let (tx, rx) = flume::unbounded();
    (MailboxSender(tx), MailboxReceiver(rx))
}

impl<C> MailboxSender<C> {
    /// Post a command. Fails only if the receiving object has already been
    /// torn down (its `MailboxReceiver` dropped).
    pub fn send(&self, cmd: C) -> Result<(), C> {
        self.0.send(cmd).map_err(|e| e.into_inner())
    }
}

impl<C> MailboxReceiver<C> {
    /// Non-blocking poll, used inside a `select!` alongside ypipe/engine
    /// I/O readiness.
    pub fn try_recv(&self) -> Option<C> {
        match self.0.try_recv() {
            Ok(cmd) => Some(cmd),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Async wait for the next command; resolves to `None` once every
    /// sender has been dropped (the object has no remaining parent/peers
    /// and should treat this as an implicit `term`).
    pub async fn recv(&self) -> Option<C> {
        match self.0.recv_async().await {
            Ok(cmd) => Some(cmd),
            Err(RecvError::Disconnected) => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum TestCmd {
        Ping,
        Term,
    }

    #[test]
    fn send_then_try_recv() {
        let (tx, rx) = mailbox::<TestCmd>();
        assert!(rx.try_recv().is_none());
        tx.send(TestCmd::Ping).unwrap();
        assert_eq!(rx.try_recv(), Some(TestCmd::Ping));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn send_after_receiver_dropped_fails() {
        let (tx, rx) = mailbox::<TestCmd>();
        drop(rx);
        assert_eq!(tx.send(TestCmd::Term), Err(TestCmd::Term));
    }

    #[test]
    fn recv_async_resolves_to_none_once_senders_gone() {
        let (tx, rx) = mailbox::<TestCmd>();
        drop(tx);
        let rt = compio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            assert_eq!(rx.recv().await, None);
        });
    }

    #[test]
    fn recv_async_gets_posted_command() {
        let (tx, rx) = mailbox::<TestCmd>();
        tx.send(TestCmd::Ping).unwrap();
        let rt = compio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            assert_eq!(rx.recv().await, Some(TestCmd::Ping));
        });
    }
}
