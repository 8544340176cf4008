//! Long-poll response plumbing.
//!
//! A parked `sub` or `psub` response is a chunked body fed through an
//! unbounded channel. The hub writes through the [`ResponseSink`] side; a
//! watcher task waits on the other side to learn whether the client hung up
//! before the hub released the subscriber.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use bytes::Bytes;
use ember_core::ResponseSink;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Write side of a parked response.
pub struct StreamSink {
    tx: mpsc::UnboundedSender<Bytes>,
    done: Notify,
}

impl StreamSink {
    /// Create a sink and the receiver feeding the response body.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                done: Notify::new(),
            }),
            rx,
        )
    }

    /// Turn the receiver into a chunked response body.
    pub fn body(rx: mpsc::UnboundedReceiver<Bytes>) -> Body {
        Body::from_stream(UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>))
    }

    /// Wait for the response to settle.
    ///
    /// Returns `true` when the client disconnected while parked; `false`
    /// when the hub released the subscriber first. Callers run the
    /// connection-close hook only in the `true` case; the hub ignores stale
    /// hooks either way.
    pub async fn wait_disconnected(&self) -> bool {
        tokio::select! {
            () = self.tx.closed() => true,
            () = self.done.notified() => false,
        }
    }
}

impl ResponseSink for StreamSink {
    fn write(&self, chunk: Bytes) {
        // a send to a gone client fails; the close watcher cleans up
        let _ = self.tx.send(chunk);
    }

    fn end(&self) {
        self.done.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_reaches_receiver() {
        let (sink, mut rx) = StreamSink::new();
        sink.write(Bytes::from_static(b"chunk"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"chunk"));
    }

    #[tokio::test]
    async fn test_end_settles_before_wait() {
        let (sink, _rx) = StreamSink::new();
        // release happens before the watcher starts waiting
        sink.end();
        assert!(!sink.wait_disconnected().await);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_a_disconnect() {
        let (sink, rx) = StreamSink::new();
        drop(rx);
        assert!(sink.wait_disconnected().await);
    }

    #[tokio::test]
    async fn test_release_wins_over_later_disconnect() {
        let (sink, rx) = StreamSink::new();
        let waiter = {
            let sink = sink.clone();
            tokio::spawn(async move { sink.wait_disconnected().await })
        };
        sink.end();
        let disconnected = waiter.await.unwrap();
        assert!(!disconnected);
        drop(rx);
    }
}
