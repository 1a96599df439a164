//! `fq`/`lb`: the inbound fair-queue and outbound load-balance rotations
//! that give DEALER (and XPUB/XSUB's control-message path) their
//! many-pipes-look-like-one-socket behavior. ROUTER's addressed routing is
//! a different shape and lives in [`crate::router::RouterHub`] instead —
//! `fq`/`lb` never look at a routing-id frame, they just rotate.
//!
//! Both keep a single owned collection of `(key, Pipe<Msg>)` rather than
//! handing out pipe handles to share with some other owner, since a pipe
//! belongs to exactly one dispatcher for its lifetime.

use crate::msg::Msg;
use crate::pipe::Pipe;

/// Inbound fair queue: round-robins across attached pipes so no single
/// peer can starve the others of read attention.
pub struct Fq<K> {
    pipes: Vec<(K, Pipe<Msg>)>,
    cursor: usize,
}

impl<K: Clone + PartialEq> Default for Fq<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + PartialEq> Fq<K> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pipes: Vec::new(),
            cursor: 0,
        }
    }

    pub fn attach(&mut self, key: K, pipe: Pipe<Msg>) {
        self.pipes.push((key, pipe));
    }

    pub fn detach(&mut self, key: &K) -> Option<Pipe<Msg>> {
        let pos = self.pipes.iter().position(|(k, _)| k == key)?;
        let (_, pipe) = self.pipes.remove(pos);
        if self.cursor > pos || self.cursor >= self.pipes.len() {
            self.cursor = self.pipes.len().saturating_sub(1).min(self.cursor);
        }
        Some(pipe)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Read the next available message, starting the search from just
    /// past whichever pipe won last time — this is the fairness: a
    /// chatty peer never gets read twice before a quiet one gets a turn.
    pub fn recv(&mut self) -> Option<(K, Msg)> {
        let n = self.pipes.len();
        if n == 0 {
            return None;
        }
        for step in 0..n {
            let idx = (self.cursor + step) % n;
            if self.pipes[idx].1.check_read() {
                let msg = self.pipes[idx].1.read()?;
                self.cursor = (idx + 1) % n;
                return Some((self.pipes[idx].0.clone(), msg));
            }
        }
        None
    }
}

/// Outbound load balance: round-robins across attached pipes on each new
/// (non-multipart-continuation) send, but pins to the same pipe for the
/// remainder of a `MORE`-chain message so frames of one logical message
/// never interleave across peers.
pub struct Lb<K> {
    pipes: Vec<(K, Pipe<Msg>)>,
    current: usize,
    mid_message: bool,
}

impl<K: Clone + PartialEq> Default for Lb<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + PartialEq> Lb<K> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pipes: Vec::new(),
            current: 0,
            mid_message: false,
        }
    }

    pub fn attach(&mut self, key: K, pipe: Pipe<Msg>) {
        self.pipes.push((key, pipe));
    }

    pub fn detach(&mut self, key: &K) -> Option<Pipe<Msg>> {
        let pos = self.pipes.iter().position(|(k, _)| k == key)?;
        let (_, pipe) = self.pipes.remove(pos);
        if pos == self.current {
            self.mid_message = false;
        }
        if self.current >= self.pipes.len() {
            self.current = 0;
        }
        Some(pipe)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Send one frame. `more` marks that further frames of the same
    /// logical message will follow and must land on the same pipe.
    ///
    /// # Errors
    /// Returns the message back to the caller if no pipe can accept it
    /// right now (all blocked at HWM).
    pub fn send(&mut self, msg: Msg, more: bool) -> Result<(), Msg> {
        if self.pipes.is_empty() {
            return Err(msg);
        }

        if !self.mid_message {
            let n = self.pipes.len();
            let mut chosen = None;
            for step in 0..n {
                let idx = (self.current + step) % n;
                if self.pipes[idx].1.check_write() {
                    chosen = Some(idx);
                    break;
                }
            }
            match chosen {
                Some(idx) => self.current = idx,
                None => return Err(msg),
            }
        }

        self.pipes[self.current].1.write(msg, more);
        self.pipes[self.current].1.flush();
        self.mid_message = more;
        if !more {
            self.current = (self.current + 1) % self.pipes.len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::pipepair;

    fn attach_pair(fq: &mut Fq<u32>, key: u32, hwm: usize) -> Pipe<Msg> {
        let (local, remote) = pipepair::<Msg>((hwm, hwm));
        fq.attach(key, remote);
        local
    }

    #[test]
    fn fq_rotates_fairly_across_peers() {
        let mut fq: Fq<u32> = Fq::new();
        let mut remotes = Vec::new();
        for key in 0..3u32 {
            remotes.push(attach_pair(&mut fq, key, 8));
        }

        for r in &mut remotes {
            r.write(Msg::init_buffer(b"x"), false);
            r.flush();
        }

        let mut order = Vec::new();
        for _ in 0..3 {
            let (key, _msg) = fq.recv().unwrap();
            order.push(key);
        }
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn fq_returns_none_when_empty() {
        let mut fq: Fq<u32> = Fq::new();
        assert_eq!(fq.recv(), None);
    }

    #[test]
    fn lb_round_robins_single_frame_messages() {
        let (mut a_local, a_remote) = pipepair::<Msg>((8, 8));
        let (mut b_local, b_remote) = pipepair::<Msg>((8, 8));
        let mut lb: Lb<u32> = Lb::new();
        lb.attach(0, a_remote);
        lb.attach(1, b_remote);

        lb.send(Msg::init_buffer(b"1"), false).unwrap();
        lb.send(Msg::init_buffer(b"2"), false).unwrap();

        assert!(a_local.check_read());
        assert!(b_local.check_read());
    }

    #[test]
    fn lb_pins_multipart_message_to_one_pipe() {
        let (mut a_local, a_remote) = pipepair::<Msg>((8, 8));
        let (mut b_local, b_remote) = pipepair::<Msg>((8, 8));
        let mut lb: Lb<u32> = Lb::new();
        lb.attach(0, a_remote);
        lb.attach(1, b_remote);

        lb.send(Msg::init_buffer(b"part1"), true).unwrap();
        lb.send(Msg::init_buffer(b"part2"), false).unwrap();

        let mut a_count = 0;
        while a_local.read().is_some() {
            a_count += 1;
        }
        let mut b_count = 0;
        while b_local.read().is_some() {
            b_count += 1;
        }
        assert_eq!(a_count + b_count, 2);
        assert!(a_count == 0 || b_count == 0, "frames split across pipes");
    }

    #[test]
    fn lb_reports_full_when_all_pipes_blocked() {
        let (_a_local, a_remote) = pipepair::<Msg>((1, 1));
        let mut lb: Lb<u32> = Lb::new();
        lb.attach(0, a_remote);

        lb.send(Msg::init_buffer(b"1"), false).unwrap();
        assert!(lb.send(Msg::init_buffer(b"2"), false).is_err());
    }
}
