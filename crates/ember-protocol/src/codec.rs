//! Rendering of frames into the JSONP envelope.
//!
//! The output must match the deployed client grammar byte for byte: unquoted
//! keys, `seq` string-quoted in data-path frames but bare in `sign`/`ping`,
//! and every JSONP call terminated with `);\n`. Channel names and content are
//! embedded verbatim — no escaping.

use std::fmt::Write;

use crate::frames::{Frame, PresenceEvent};

/// Render a frame as a bare object literal (no callback, no newline).
#[must_use]
pub fn render(frame: &Frame) -> String {
    match frame {
        Frame::Data {
            cname,
            seq,
            content,
        } => format!(
            "{{type: \"data\", cname: \"{cname}\", seq: \"{seq}\", content: \"{content}\"}}"
        ),
        Frame::Noop { cname, seq } => {
            format!("{{type: \"noop\", cname: \"{cname}\", seq: \"{seq}\"}}")
        }
        Frame::TokenError { cname } => {
            format!("{{type: \"401\", cname: \"{cname}\", seq: \"0\", content: \"Token Error\"}}")
        }
        Frame::TooManyRequests { cname } => format!(
            "{{type: \"429\", cname: \"{cname}\", seq: \"0\", content: \"Too Many Requests\"}}"
        ),
        Frame::Close { cname, seq } => {
            format!("{{type: \"close\", cname: \"{cname}\", seq: \"{seq}\", content: \"\"}}")
        }
        Frame::Ping { sub_timeout } => {
            format!("{{type: \"ping\", sub_timeout: {sub_timeout}}}")
        }
        Frame::Sign {
            cname,
            seq,
            token,
            expires,
            sub_timeout,
        } => format!(
            "{{type: \"sign\", cname: \"{cname}\", seq: {seq}, token: \"{token}\", \
             expires: {expires}, sub_timeout: {sub_timeout}}}"
        ),
        Frame::Ok => "{type: \"ok\"}".to_string(),
    }
}

/// Render a frame wrapped in a JSONP callback call.
#[must_use]
pub fn jsonp(cb: &str, frame: &Frame) -> String {
    format!("{cb}({});\n", render(frame))
}

/// Render with an optional callback.
///
/// `pub`, `sign` and `close` treat the callback as genuinely optional: with
/// one the body is a JSONP call, without one it is the bare object followed
/// by a newline.
#[must_use]
pub fn jsonp_opt(cb: Option<&str>, frame: &Frame) -> String {
    match cb {
        Some(cb) => jsonp(cb, frame),
        None => format!("{}\n", render(frame)),
    }
}

/// Render a backlog reply: one JSONP call carrying an array of frames.
#[must_use]
pub fn jsonp_batch(cb: &str, frames: &[Frame]) -> String {
    let mut out = String::with_capacity(64 * frames.len().max(1));
    let _ = write!(out, "{cb}([");
    for (i, frame) in frames.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&render(frame));
    }
    out.push_str("]);\n");
    out
}

/// Render one presence stream line.
#[must_use]
pub fn presence_line(event: PresenceEvent, cname: &str) -> String {
    format!("{} {cname}\n", event.code())
}
