//! # ember-protocol
//!
//! Wire envelope definitions for the ember comet relay.
//!
//! Clients speak JSONP over long-polled HTTP: every frame the server pushes
//! is a JavaScript call `cb({...});` followed by a newline, and presence
//! streams are plain `"<code> <cname>\n"` lines. The envelope grammar is
//! fixed and deliberately quirky (unquoted keys, string-quoted sequence
//! numbers in data frames but bare integers in sign frames) — deployed
//! clients parse it as-is, so rendering is byte-exact and hand-rolled.
//!
//! ## Example
//!
//! ```rust
//! use ember_protocol::{codec, Frame};
//!
//! let frame = Frame::data("chat", 7, "hello");
//! let wire = codec::jsonp("cb", &frame);
//! assert_eq!(wire, "cb({type: \"data\", cname: \"chat\", seq: \"7\", content: \"hello\"});\n");
//! ```

pub mod codec;
pub mod frames;

pub use codec::{jsonp, jsonp_batch, jsonp_opt, presence_line, render};
pub use frames::{Frame, PresenceEvent};

/// Callback used when a `sub` or `ping` request does not name one.
pub const DEFAULT_JSONP_CALLBACK: &str = "ember_cb";
