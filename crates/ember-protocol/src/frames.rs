//! Frame types for the ember envelope.
//!
//! A [`Frame`] is one JSONP object pushed to a client. Error conditions are
//! frames too: auth failures and per-channel rate limits travel as `"401"`
//! and `"429"` typed frames inside an HTTP 200, because a long-poll client
//! can only read bodies.

/// Presence stream event codes.
///
/// The numeric value is the wire format: presence subscribers receive one
/// `"<code> <cname>\n"` line per channel lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PresenceEvent {
    /// A channel was freed.
    Offline = 0,
    /// A channel was created.
    Online = 1,
}

impl PresenceEvent {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A protocol frame.
///
/// Sequence numbers are rendered string-quoted in data-path frames and as
/// bare integers in `sign`/`ping` frames; both forms are load-bearing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// One published message.
    Data {
        /// Channel name.
        cname: String,
        /// Sequence number of this message.
        seq: u32,
        /// Message content, embedded verbatim.
        content: String,
    },

    /// Idle heartbeat; tells the client to reconnect.
    Noop {
        /// Channel name.
        cname: String,
        /// The `noop` value the client supplied on its poll.
        seq: u32,
    },

    /// Token mismatch or unknown channel in token-auth mode (type `"401"`).
    TokenError {
        /// Channel name as supplied by the client.
        cname: String,
    },

    /// Per-channel subscriber cap hit (type `"429"`).
    TooManyRequests {
        /// Channel name.
        cname: String,
    },

    /// Channel is going away; content is always empty.
    Close {
        /// Channel name.
        cname: String,
        /// Next unpublished sequence number.
        seq: u32,
    },

    /// Liveness probe response.
    Ping {
        /// Long-poll timeout in seconds.
        sub_timeout: u32,
    },

    /// Channel admission receipt.
    Sign {
        /// Channel name.
        cname: String,
        /// Oldest sequence still held in the channel buffer.
        seq: u32,
        /// Access token; `sign` mints one the first time a channel is
        /// signed and hands the same one back after that.
        token: String,
        /// Granted lifetime in seconds.
        expires: i32,
        /// Long-poll timeout in seconds.
        sub_timeout: u32,
    },

    /// Publish acknowledgment.
    Ok,
}

impl Frame {
    /// Create a data frame.
    #[must_use]
    pub fn data(cname: impl Into<String>, seq: u32, content: impl Into<String>) -> Self {
        Frame::Data {
            cname: cname.into(),
            seq,
            content: content.into(),
        }
    }

    /// Create a noop frame.
    #[must_use]
    pub fn noop(cname: impl Into<String>, seq: u32) -> Self {
        Frame::Noop {
            cname: cname.into(),
            seq,
        }
    }

    /// Create a token-error frame.
    #[must_use]
    pub fn token_error(cname: impl Into<String>) -> Self {
        Frame::TokenError {
            cname: cname.into(),
        }
    }

    /// Create a too-many-requests frame.
    #[must_use]
    pub fn too_many_requests(cname: impl Into<String>) -> Self {
        Frame::TooManyRequests {
            cname: cname.into(),
        }
    }

    /// Create a close frame.
    #[must_use]
    pub fn close(cname: impl Into<String>, seq: u32) -> Self {
        Frame::Close {
            cname: cname.into(),
            seq,
        }
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(sub_timeout: u32) -> Self {
        Frame::Ping { sub_timeout }
    }

    /// Create a sign frame.
    #[must_use]
    pub fn sign(
        cname: impl Into<String>,
        seq: u32,
        token: impl Into<String>,
        expires: i32,
        sub_timeout: u32,
    ) -> Self {
        Frame::Sign {
            cname: cname.into(),
            seq,
            token: token.into(),
            expires,
            sub_timeout,
        }
    }

    /// The wire value of the `type` key.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Frame::Data { .. } => "data",
            Frame::Noop { .. } => "noop",
            Frame::TokenError { .. } => "401",
            Frame::TooManyRequests { .. } => "429",
            Frame::Close { .. } => "close",
            Frame::Ping { .. } => "ping",
            Frame::Sign { .. } => "sign",
            Frame::Ok => "ok",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Frame::data("c", 1, "x").type_name(), "data");
        assert_eq!(Frame::token_error("c").type_name(), "401");
        assert_eq!(Frame::too_many_requests("c").type_name(), "429");
        assert_eq!(Frame::Ok.type_name(), "ok");
    }

    #[test]
    fn test_presence_codes() {
        assert_eq!(PresenceEvent::Online.code(), 1);
        assert_eq!(PresenceEvent::Offline.code(), 0);
    }
}
