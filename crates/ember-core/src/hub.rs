//! The hub: fixed-capacity channel pool and the server verbs.
//!
//! The hub owns every piece of process-wide state: the preallocated channel
//! slots partitioned into free and used lists, the name index, the parked
//! subscriber table, the presence subscriber list and the live-subscriber
//! count. All verbs run synchronously; nothing blocks. A verb either returns
//! a complete response body or parks the request behind its
//! [`ResponseSink`], and every parked request is released by exactly one of:
//! a message flush, a sweeper noop, a channel close, or the transport's
//! connection-close hook calling [`Hub::sub_end`].
//!
//! Errors the client can cause are response shapes, not `Err` — see the
//! reply enums. [`HubError`] only covers pool exhaustion.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use ember_protocol::{codec, Frame, PresenceEvent, DEFAULT_JSONP_CALLBACK};

use crate::channel::{Channel, IDLE_UNUSED};
use crate::config::{AuthMode, HubConfig};
use crate::seq::{seq_gt, Seq};
use crate::subscriber::{
    PresenceId, PresenceSubscriber, ResponseSink, Subscriber, SubscriberId,
};

/// Subscriber table preallocation; keeps steady-state polling free of
/// rehashing.
const SUBSCRIBER_POOL_SIZE: usize = 1024;

/// Plain 404 body for an exhausted channel pool.
pub const TOO_MANY_CHANNELS_BODY: &str = "too many channels\n";

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// Channel pool exhausted.
    #[error("too many channels")]
    TooManyChannels,
}

/// A `sub` request, already query-parsed and defaulted by the HTTP layer.
#[derive(Debug, Clone)]
pub struct SubRequest {
    /// Channel name.
    pub cname: String,
    /// Last sequence the client has seen, plus one.
    pub seq: Seq,
    /// Value to echo in a noop frame.
    pub noop: u32,
    /// JSONP callback.
    pub cb: String,
    /// Channel token, checked in token-auth mode.
    pub token: String,
}

impl Default for SubRequest {
    fn default() -> Self {
        Self {
            cname: String::new(),
            seq: 0,
            noop: 0,
            cb: DEFAULT_JSONP_CALLBACK.to_string(),
            token: String::new(),
        }
    }
}

/// Outcome of a `sub`.
#[derive(Debug)]
pub enum SubReply {
    /// 200 with a complete body: a backlog array, or a 401/429 frame.
    Done(String),
    /// 404 with [`TOO_MANY_CHANNELS_BODY`].
    TooManyChannels,
    /// Parked; the response stays open and is fed through the sink.
    Parked(SubscriberId),
}

/// Outcome of a `pub`.
#[derive(Debug)]
pub enum PubReply {
    /// 200; the message was flushed to every parked subscriber.
    Ok(String),
    /// 404; the channel does not exist or was never admitted.
    NotConnected(String),
}

/// Outcome of a `sign`.
#[derive(Debug)]
pub enum SignReply {
    /// 200 with the sign frame.
    Ok(String),
    /// 404 with [`TOO_MANY_CHANNELS_BODY`].
    TooManyChannels,
}

/// Outcome of a `close`.
#[derive(Debug)]
pub enum CloseReply {
    /// 200 `ok <seq_next>`.
    Ok(String),
    /// 404; no such channel.
    NotFound(String),
}

/// A point-in-time census of the hub.
#[derive(Debug, Clone, Copy)]
pub struct HubStats {
    /// Channels on the used list.
    pub channels: usize,
    /// Parked subscribers across all channels.
    pub subscribers: usize,
    /// Parked presence subscribers.
    pub presence_subscribers: usize,
}

/// The channel and subscriber state engine.
pub struct Hub {
    config: HubConfig,
    /// All channel slots, live and free; index is the channel id.
    slots: Vec<Channel>,
    /// Slot indices available for `new_channel`, FIFO.
    free: VecDeque<usize>,
    /// Slot indices of live channels.
    used: Vec<usize>,
    /// Name index over the used list.
    names: HashMap<String, usize>,
    /// Parked subscribers by id.
    subs: HashMap<SubscriberId, Subscriber>,
    /// Parked presence subscribers.
    psubs: Vec<PresenceSubscriber>,
    /// Live subscriber count; always the sum of per-channel list lengths.
    subscribers: usize,
    next_sub_id: SubscriberId,
    next_psub_id: PresenceId,
}

impl Hub {
    /// Create a hub with every channel slot preallocated and free.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        let slots: Vec<Channel> = (0..config.max_channels)
            .map(|id| Channel::new(id, config.channel_buffer_size))
            .collect();
        let free: VecDeque<usize> = (0..config.max_channels).collect();

        Self {
            config,
            slots,
            free,
            used: Vec::new(),
            names: HashMap::new(),
            subs: HashMap::with_capacity(SUBSCRIBER_POOL_SIZE),
            psubs: Vec::new(),
            subscribers: 0,
            next_sub_id: 1,
            next_psub_id: 1,
        }
    }

    /// Hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Current channel/subscriber census.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            channels: self.used.len(),
            subscribers: self.subscribers,
            presence_subscribers: self.psubs.len(),
        }
    }

    fn get_by_name(&self, cname: &str) -> Option<usize> {
        self.names.get(cname).copied()
    }

    /// Take a slot off the free list and register it under `name`.
    fn new_channel(&mut self, name: String) -> Result<usize, HubError> {
        let Some(cid) = self.free.pop_front() else {
            warn!(channel = %name, "channel pool exhausted");
            return Err(HubError::TooManyChannels);
        };
        debug_assert!(self.slots[cid].subs.is_empty());
        self.used.push(cid);
        self.slots[cid].name = name.clone();
        self.names.insert(name, cid);
        debug!(id = cid, channel = %self.slots[cid].name, "new channel");

        self.add_presence(PresenceEvent::Online, &self.slots[cid].name);
        Ok(cid)
    }

    /// Return a live channel slot to the free list. The subscriber list must
    /// already be empty.
    fn free_channel(&mut self, cid: usize) {
        debug_assert!(self.slots[cid].subs.is_empty());
        debug!(id = cid, channel = %self.slots[cid].name, "free channel");
        let name = std::mem::take(&mut self.slots[cid].name);
        self.add_presence(PresenceEvent::Offline, &name);

        self.used.retain(|&c| c != cid);
        self.free.push_back(cid);

        self.names.remove(&name);
        self.slots[cid].reset();
    }

    /// Write one frame to every parked subscriber on the channel and release
    /// them all.
    fn flush(&mut self, cid: usize, frame: &Frame) {
        let parked = std::mem::take(&mut self.slots[cid].subs);
        for id in parked {
            if let Some(sub) = self.subs.remove(&id) {
                sub.sink.write(Bytes::from(codec::jsonp(&sub.callback, frame)));
                sub.sink.end();
                self.subscribers -= 1;
            }
        }
    }

    /// Unpark one subscriber, wherever it is parked. Misses (already
    /// released) return `None`.
    fn release(&mut self, id: SubscriberId) -> Option<Subscriber> {
        let sub = self.subs.remove(&id)?;
        let channel = &mut self.slots[sub.channel];
        if let Some(pos) = channel.subs.iter().position(|&s| s == id) {
            channel.subs.remove(pos);
        }
        self.subscribers -= 1;
        Some(sub)
    }

    /// Write one presence line to every parked presence subscriber.
    fn add_presence(&self, event: PresenceEvent, cname: &str) {
        if self.psubs.is_empty() {
            return;
        }
        let line = Bytes::from(codec::presence_line(event, cname));
        for psub in &self.psubs {
            psub.sink.write(line.clone());
        }
    }

    /// `ping`: report the long-poll timeout.
    #[must_use]
    pub fn ping(&self, cb: &str) -> String {
        codec::jsonp(cb, &Frame::ping(self.config.polling_timeout))
    }

    /// `sub`: deliver backlog, park, or reject.
    pub fn sub(&mut self, req: SubRequest, sink: Arc<dyn ResponseSink>) -> SubReply {
        let mut cid = self.get_by_name(&req.cname);
        if cid.is_none() && self.config.auth == AuthMode::None {
            match self.new_channel(req.cname.clone()) {
                Ok(id) => cid = Some(id),
                Err(HubError::TooManyChannels) => return SubReply::TooManyChannels,
            }
        }

        let cid = match cid {
            Some(cid)
                if self.config.auth != AuthMode::Token
                    || self.slots[cid].token == req.token =>
            {
                cid
            }
            _ => {
                warn!(channel = %req.cname, "token error");
                return SubReply::Done(codec::jsonp(
                    &req.cb,
                    &Frame::token_error(req.cname.as_str()),
                ));
            }
        };

        if self.slots[cid].subs.len() >= self.config.max_subscribers_per_channel {
            warn!(channel = %req.cname, "subscriber cap hit");
            return SubReply::Done(codec::jsonp(
                &req.cb,
                &Frame::too_many_requests(req.cname.as_str()),
            ));
        }
        self.slots[cid].idle = self.config.channel_idles;

        // Backlog path: the client lags the buffer.
        let channel = &self.slots[cid];
        if !channel.msgs.is_empty() && req.seq != channel.seq_next {
            let msg_seq_min = channel.msg_seq_min();
            let mut seq = req.seq;
            if seq_gt(seq, channel.seq_next) || seq_gt(msg_seq_min, seq) {
                seq = msg_seq_min;
            }
            debug!(
                channel = %channel.name,
                first = seq,
                last = channel.seq_next.wrapping_sub(1),
                "replaying buffered messages"
            );
            let skip = channel.msgs.len() - channel.seq_next.wrapping_sub(seq) as usize;
            let frames: Vec<Frame> = channel
                .msgs
                .iter()
                .skip(skip)
                .enumerate()
                .map(|(i, content)| {
                    Frame::data(
                        channel.name.as_str(),
                        seq.wrapping_add(i as u32),
                        content.as_str(),
                    )
                })
                .collect();
            return SubReply::Done(codec::jsonp_batch(&req.cb, &frames));
        }

        // Park path.
        let id = self.next_sub_id;
        self.next_sub_id += 1;
        self.subs.insert(
            id,
            Subscriber {
                channel: cid,
                callback: req.cb,
                noop_seq: req.noop,
                idle: 0,
                sink,
            },
        );
        self.slots[cid].subs.push(id);
        self.subscribers += 1;
        debug!(
            channel = %self.slots[cid].name,
            subs = self.slots[cid].subs.len(),
            channels = self.used.len(),
            "sub parked"
        );
        SubReply::Parked(id)
    }

    /// Connection-close hook for a parked `sub`; also the internal release
    /// path. Safe to call more than once per id.
    pub fn sub_end(&mut self, id: SubscriberId) -> bool {
        match self.release(id) {
            Some(sub) => {
                debug!(
                    channel = %self.slots[sub.channel].name,
                    subs = self.slots[sub.channel].subs.len(),
                    channels = self.used.len(),
                    "sub released"
                );
                true
            }
            None => false,
        }
    }

    /// `pub`: acknowledge the publisher, then flush the message to every
    /// parked subscriber and store it in the ring.
    pub fn publish(&mut self, cname: &str, content: &str, cb: Option<&str>) -> PubReply {
        let cid = match self.get_by_name(cname) {
            Some(cid) if self.slots[cid].idle != IDLE_UNUSED => cid,
            _ => {
                debug!(channel = %cname, "pub to unconnected channel");
                return PubReply::NotConnected(format!("cname[{cname}] not connected\n"));
            }
        };
        debug!(
            channel = %cname,
            subs = self.slots[cid].subs.len(),
            "pub"
        );
        let body = codec::jsonp_opt(cb, &Frame::Ok);

        // The frame carries the message's own sequence number; store and
        // advance after rendering.
        let seq = self.slots[cid].seq_next;
        let frame = Frame::data(cname, seq, content);
        self.flush(cid, &frame);
        self.slots[cid].push_message(content.to_string());

        PubReply::Ok(body)
    }

    /// `sign`: admit (or refresh) a channel and hand out its token.
    pub fn sign(&mut self, cname: &str, expires: i32, cb: Option<&str>) -> SignReply {
        let expires = if expires <= 0 {
            self.config.channel_timeout
        } else {
            expires
        };

        let cid = match self.get_by_name(cname) {
            Some(cid) => cid,
            None => match self.new_channel(cname.to_string()) {
                Ok(cid) => cid,
                Err(HubError::TooManyChannels) => return SignReply::TooManyChannels,
            },
        };

        if self.slots[cid].token.is_empty() {
            self.slots[cid].create_token();
        }
        let channel = &mut self.slots[cid];
        if channel.idle == IDLE_UNUSED {
            debug!(channel = %cname, id = channel.id(), expires, "sign");
        } else {
            debug!(channel = %cname, id = channel.id(), expires, "re-sign");
        }
        channel.idle = expires / self.config.check_interval as i32;

        let frame = Frame::sign(
            cname,
            channel.msg_seq_min(),
            channel.token.as_str(),
            expires,
            self.config.polling_timeout,
        );
        SignReply::Ok(codec::jsonp_opt(cb, &frame))
    }

    /// `close`: tear the channel down, releasing every parked subscriber
    /// with a close frame.
    pub fn close(&mut self, cname: &str) -> CloseReply {
        let Some(cid) = self.get_by_name(cname) else {
            warn!(channel = %cname, "close on unknown channel");
            return CloseReply::NotFound(format!("channel[{cname}] not connected\n"));
        };
        debug!(channel = %cname, subs = self.slots[cid].subs.len(), "close");
        let body = format!("ok {}\n", self.slots[cid].seq_next);

        if self.slots[cid].idle != IDLE_UNUSED {
            let frame = Frame::close(cname, self.slots[cid].seq_next);
            self.flush(cid, &frame);
            self.free_channel(cid);
        }
        CloseReply::Ok(body)
    }

    /// `info`: per-channel subscriber count, or the global census.
    #[must_use]
    pub fn info(&self, cname: &str) -> String {
        if cname.is_empty() {
            format!(
                "{{channels: {}, subscribers: {}}}\n",
                self.used.len(),
                self.subscribers
            )
        } else {
            let subscribers = self
                .get_by_name(cname)
                .map(|cid| self.slots[cid].subs.len())
                .unwrap_or(0);
            format!("{{cname: \"{cname}\", subscribers: {subscribers}}}\n")
        }
    }

    /// `check`: `{"<cname>": 1}` when the channel is live, `{}` otherwise.
    #[must_use]
    pub fn check(&self, cname: &str) -> String {
        match self.get_by_name(cname) {
            Some(cid) if self.slots[cid].idle != IDLE_UNUSED => {
                format!("{{\"{cname}\": 1}}\n")
            }
            _ => "{}\n".to_string(),
        }
    }

    /// `psub`: park a presence subscriber.
    pub fn psub(&mut self, sink: Arc<dyn ResponseSink>) -> PresenceId {
        let id = self.next_psub_id;
        self.next_psub_id += 1;
        self.psubs.push(PresenceSubscriber { id, sink });
        debug!(psubs = self.psubs.len(), "psub");
        id
    }

    /// Connection-close hook for a presence subscriber.
    pub fn psub_end(&mut self, id: PresenceId) -> bool {
        let before = self.psubs.len();
        self.psubs.retain(|p| p.id != id);
        let removed = self.psubs.len() < before;
        if removed {
            debug!(psubs = self.psubs.len(), "psub released");
        }
        removed
    }

    /// One sweeper tick: age empty channels out, keep busy channels alive,
    /// noop subscribers past their polling budget.
    pub fn sweep(&mut self) {
        let used: Vec<usize> = self.used.clone();
        for cid in used {
            if self.slots[cid].subs.is_empty() {
                self.slots[cid].idle -= 1;
                if self.slots[cid].idle < 0 {
                    self.free_channel(cid);
                }
                continue;
            }

            if self.slots[cid].idle < self.config.channel_idles {
                self.slots[cid].idle = self.config.channel_idles;
            }

            let parked = self.slots[cid].subs.clone();
            for id in parked {
                let expired = match self.subs.get_mut(&id) {
                    Some(sub) => {
                        sub.idle += 1;
                        sub.idle > self.config.polling_idles
                    }
                    None => false,
                };
                if !expired {
                    continue;
                }
                if let Some(sub) = self.release(id) {
                    let frame = Frame::noop(self.slots[cid].name.as_str(), sub.noop_seq);
                    sub.sink.write(Bytes::from(codec::jsonp(&sub.callback, &frame)));
                    sub.sink.end();
                }
            }
        }
    }
}
