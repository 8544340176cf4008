//! # ember-core
//!
//! The channel and subscriber state engine for the ember comet relay.
//!
//! This crate owns everything stateful:
//!
//! - **Channel** - a preallocated slot with a bounded ring of recent messages
//! - **Hub** - the fixed-capacity channel pool and the server verbs
//!   (`sub`, `pub`, `sign`, `close`, `ping`, `info`, `check`, `psub`)
//! - **Subscriber** - a parked long-poll response awaiting one frame
//! - **Sweeper** - the periodic tick that ages channels and noops idle polls
//!
//! The HTTP layer is a collaborator: it parses queries, hands the hub a
//! [`ResponseSink`] per long-poll request, maps reply shapes to status codes,
//! and calls [`Hub::sweep`] on a timer. The hub itself is a plain
//! single-threaded struct; callers serialize access behind one lock and all
//! releases happen synchronously inside it.

pub mod channel;
pub mod config;
pub mod hub;
pub mod seq;
pub mod subscriber;

pub use config::{AuthMode, HubConfig};
pub use hub::{
    CloseReply, Hub, HubError, HubStats, PubReply, SignReply, SubReply, SubRequest,
    TOO_MANY_CHANNELS_BODY,
};
pub use seq::{seq_gt, Seq};
pub use subscriber::{PresenceId, ResponseSink, SubscriberId};
