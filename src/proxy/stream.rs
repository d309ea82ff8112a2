//! Incremental relay of upstream bodies.
//!
//! A pump task pulls one chunk at a time from the upstream response and
//! hands it to the caller's body through a single-slot channel, so memory
//! per connection is bounded by the chunk size no matter how large the
//! object is.
//!
//! Both directions run under the idle timeout: a stalled upstream ends the
//! stream with an error, and a caller that keeps its socket open but stops
//! reading loses the stream once a hand-off waits too long. Either way the
//! upstream connection and the pool permit are released, and the body ends
//! with an error so a truncated response is never mistaken for a complete
//! one. Dropping the response body (the caller went away) closes the
//! channel and stops the pump immediately.

use axum::body::Body;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OwnedSemaphorePermit};

use crate::observability::metrics;
use crate::proxy::pool::UpstreamKind;


struct Relay {
    chunks: BoxStream<'static, reqwest::Result<Bytes>>,
    idle_timeout: Duration,
    kind: UpstreamKind,
    target: String,
    relayed: u64,
    finished: bool,
    /// Set only when upstream reached its end of stream.
    complete: Arc<AtomicBool>,
    _permit: OwnedSemaphorePermit,
}

impl Relay {
    async fn pump(mut self, tx: mpsc::Sender<Bytes>) {
        loop {
            let next = tokio::select! {
                _ = tx.closed() => return,
                next = tokio::time::timeout(self.idle_timeout, self.chunks.next()) => next,
            };

            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(err))) => {
                    self.finished = true;
                    let err = err.without_url();
                    tracing::warn!(
                        target_path = %self.target,
                        relayed = self.relayed,
                        error = %err,
                        "Upstream stream failed"
                    );
                    metrics::record_upstream_error(self.kind.as_str(), "stream");
                    return;
                }
                Ok(None) => {
                    self.finished = true;
                    self.complete.store(true, Ordering::Release);
                    tracing::debug!(
                        target_path = %self.target,
                        relayed = self.relayed,
                        "Upstream stream complete"
                    );
                    return;
                }
                Err(_) => {
                    self.finished = true;
                    tracing::warn!(
                        target_path = %self.target,
                        relayed = self.relayed,
                        idle_timeout = ?self.idle_timeout,
                        "Upstream stream stalled"
                    );
                    metrics::record_upstream_error(self.kind.as_str(), "stream_timeout");
                    return;
                }
            };

            let len = chunk.len() as u64;
            match tokio::time::timeout(self.idle_timeout, tx.send(chunk)).await {
                Ok(Ok(())) => self.relayed += len,
                // Receiver dropped: the caller went away.
                Ok(Err(_)) => return,
                Err(_) => {
                    self.finished = true;
                    tracing::warn!(
                        target_path = %self.target,
                        relayed = self.relayed,
                        idle_timeout = ?self.idle_timeout,
                        "Caller stopped reading, upstream released"
                    );
                    metrics::record_upstream_error(self.kind.as_str(), "caller_stalled");
                    return;
                }
            }
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        metrics::record_bytes_relayed(self.kind.as_str(), self.relayed);
        if !self.finished {
            tracing::debug!(
                target_path = %self.target,
                relayed = self.relayed,
                "Caller went away mid-stream, upstream read cancelled"
            );
        }
    }
}

/// Wrap an upstream response into a streaming body.
///
/// `idle_timeout` bounds the wait for each upstream chunk and for each
/// hand-off to the caller.
pub fn relay_body(
    upstream: reqwest::Response,
    permit: OwnedSemaphorePermit,
    kind: UpstreamKind,
    idle_timeout: Duration,
    target: String,
) -> Body {
    let complete = Arc::new(AtomicBool::new(false));
    let relay = Relay {
        chunks: upstream.bytes_stream().boxed(),
        idle_timeout,
        kind,
        target,
        relayed: 0,
        finished: false,
        complete: complete.clone(),
        _permit: permit,
    };

    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(relay.pump(tx));

    let chunks = stream::unfold(Some(rx), move |rx| {
        let complete = complete.clone();
        async move {
            let mut rx = rx?;
            match rx.recv().await {
                Some(chunk) => Some((Ok(chunk), Some(rx))),
                None if complete.load(Ordering::Acquire) => None,
                None => Some((Err(io::Error::other("upstream relay aborted")), None)),
            }
        }
    });
    Body::from_stream(chunks)
}
