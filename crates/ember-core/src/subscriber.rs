//! Parked subscribers and the transport seam.
//!
//! A [`Subscriber`] is one long-poll request parked on a channel; a
//! [`PresenceSubscriber`] is a persistent response receiving channel
//! online/offline lines. Both hold a [`ResponseSink`], the only thing the
//! hub knows about the transport.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Identifier of a parked subscriber.
///
/// Ids are never reused, so a connection-close hook firing after the hub has
/// already released its subscriber resolves to nothing instead of to a
/// recycled slot.
pub type SubscriberId = u64;

/// Identifier of a parked presence subscriber.
pub type PresenceId = u64;

/// Write side of a parked HTTP response.
///
/// The hub releases a subscriber by writing exactly one frame and ending the
/// response; presence subscribers receive an open-ended sequence of writes.
/// Implementations must not block: a wedged peer is detected by the
/// transport's close notification, never by the hub.
pub trait ResponseSink: Send + Sync {
    /// Append one chunk to the response body.
    fn write(&self, chunk: Bytes);

    /// End the response body.
    fn end(&self);
}

/// A long-poll request parked on a channel.
pub struct Subscriber {
    /// Slot index of the owning channel.
    pub channel: usize,
    /// JSONP callback to wrap frames in.
    pub callback: String,
    /// Client-supplied value echoed in noop frames.
    pub noop_seq: u32,
    /// Sweeper ticks spent parked.
    pub idle: u32,
    /// Write handle to the parked response.
    pub sink: Arc<dyn ResponseSink>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("channel", &self.channel)
            .field("callback", &self.callback)
            .field("noop_seq", &self.noop_seq)
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}

/// A persistent response receiving the presence stream.
pub struct PresenceSubscriber {
    /// Identifier handed back to the connection-close hook.
    pub id: PresenceId,
    /// Write handle to the response.
    pub sink: Arc<dyn ResponseSink>,
}

impl fmt::Debug for PresenceSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceSubscriber")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
