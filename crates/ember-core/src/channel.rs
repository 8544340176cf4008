//! Channel slots.
//!
//! A channel is a named rendezvous between publishers and long-poll
//! subscribers. Slots are preallocated by the hub and recycled through a
//! free list; [`Channel::reset`] returns a slot to its never-used state.

use std::collections::VecDeque;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::seq::Seq;
use crate::subscriber::SubscriberId;

/// Length of minted channel tokens.
const TOKEN_LENGTH: usize = 32;

/// Idle value marking a slot that has never been signed or used.
pub const IDLE_UNUSED: i32 = -1;

/// A channel slot.
///
/// `idle` is a tick counter with three regimes: `-1` means the slot is
/// present but was never admitted, `>= 0` means live and aging, and while
/// subscribers are parked the sweeper clamps it up so a busy channel never
/// expires.
#[derive(Debug)]
pub struct Channel {
    /// Stable index into the hub's slot array.
    pub(crate) id: usize,
    /// Channel name; unique among live channels, empty in a free slot.
    pub(crate) name: String,
    /// Access token for token-auth mode; empty until `sign` mints one.
    pub(crate) token: String,
    /// Sequence number the next published message will carry.
    pub(crate) seq_next: Seq,
    /// Ring of recent message contents, oldest first.
    pub(crate) msgs: VecDeque<String>,
    /// Parked subscribers in arrival order.
    pub(crate) subs: Vec<SubscriberId>,
    /// Tick counter, see type docs.
    pub(crate) idle: i32,
    /// Ring capacity.
    buffer_size: usize,
}

impl Channel {
    /// Create an unused slot.
    #[must_use]
    pub(crate) fn new(id: usize, buffer_size: usize) -> Self {
        Self {
            id,
            name: String::new(),
            token: String::new(),
            seq_next: 1,
            msgs: VecDeque::with_capacity(buffer_size),
            subs: Vec::new(),
            idle: IDLE_UNUSED,
            buffer_size,
        }
    }

    /// Slot index.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sequence number of the oldest buffered message.
    ///
    /// Equals `seq_next` when the buffer is empty.
    #[must_use]
    pub fn msg_seq_min(&self) -> Seq {
        self.seq_next.wrapping_sub(self.msgs.len() as u32)
    }

    /// Append a message, evicting the oldest when the ring is full.
    ///
    /// Returns the sequence number the message was assigned.
    pub(crate) fn push_message(&mut self, content: String) -> Seq {
        let seq = self.seq_next;
        self.msgs.push_back(content);
        self.seq_next = self.seq_next.wrapping_add(1);
        if self.msgs.len() > self.buffer_size {
            self.msgs.pop_front();
        }
        seq
    }

    /// Mint a fresh access token. Callers only invoke this when the token is
    /// empty; an existing token survives re-signing.
    pub(crate) fn create_token(&mut self) {
        self.token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
    }

    /// Return the slot to its never-used state, keeping `id`.
    pub(crate) fn reset(&mut self) {
        self.name.clear();
        self.token.clear();
        self.msgs.clear();
        self.idle = IDLE_UNUSED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_unused() {
        let channel = Channel::new(3, 10);
        assert_eq!(channel.id(), 3);
        assert_eq!(channel.idle, IDLE_UNUSED);
        assert_eq!(channel.seq_next, 1);
        assert_eq!(channel.msg_seq_min(), 1);
    }

    #[test]
    fn test_push_assigns_sequences() {
        let mut channel = Channel::new(0, 3);
        assert_eq!(channel.push_message("a".into()), 1);
        assert_eq!(channel.push_message("b".into()), 2);
        assert_eq!(channel.seq_next, 3);
        assert_eq!(channel.msg_seq_min(), 1);
    }

    #[test]
    fn test_ring_eviction() {
        let mut channel = Channel::new(0, 3);
        for content in ["a", "b", "c", "d"] {
            channel.push_message(content.into());
        }
        assert_eq!(channel.msgs.len(), 3);
        assert_eq!(channel.msgs.front().map(String::as_str), Some("b"));
        // four published, buffer holds [2, 4]
        assert_eq!(channel.seq_next, 5);
        assert_eq!(channel.msg_seq_min(), 2);
    }

    #[test]
    fn test_seq_min_tracks_wrap() {
        let mut channel = Channel::new(0, 2);
        channel.seq_next = u32::MAX;
        assert_eq!(channel.push_message("a".into()), u32::MAX);
        assert_eq!(channel.push_message("b".into()), 0);
        assert_eq!(channel.seq_next, 1);
        assert_eq!(channel.msg_seq_min(), u32::MAX);
    }

    #[test]
    fn test_token_minting() {
        let mut channel = Channel::new(0, 10);
        channel.create_token();
        let first = channel.token.clone();
        assert_eq!(first.len(), TOKEN_LENGTH);
        channel.create_token();
        assert_ne!(channel.token, first);
    }

    #[test]
    fn test_reset_clears_state_keeps_id() {
        let mut channel = Channel::new(7, 10);
        channel.name = "room".into();
        channel.create_token();
        channel.push_message("a".into());
        channel.idle = 5;

        channel.reset();
        assert_eq!(channel.id(), 7);
        assert!(channel.name.is_empty());
        assert!(channel.token.is_empty());
        assert!(channel.msgs.is_empty());
        assert_eq!(channel.idle, IDLE_UNUSED);
        // seq_next survives reset; history is per-slot, not per-name
        assert_eq!(channel.seq_next, 2);
    }
}
