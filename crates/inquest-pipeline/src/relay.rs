//! Streaming relay
//!
//! Consumes a provider chunk stream on the caller's task, assembling the
//! full text while fanning chunks out to observers over a bounded
//! broadcast channel. A slow observer lags and loses the oldest chunks;
//! the producer never blocks on it. Cancellation stops consumption and
//! returns whatever text accumulated so far.

use futures::stream::BoxStream;
use futures::StreamExt;
use inquest_core::{ProgressSink, ProviderResult};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Default broadcast capacity before a lagging observer starts losing
/// chunks
pub const DEFAULT_RELAY_CAPACITY: usize = 256;

/// Cooperative cancellation handle
///
/// Clones share the flag; `cancel` is idempotent and observable from any
/// clone.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembled result of a relayed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutput {
    pub text: String,
    pub cancelled: bool,
}

pub struct StreamingRelay {
    tx: broadcast::Sender<String>,
}

impl StreamingRelay {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RELAY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Observe chunks as they arrive. Lagging receivers skip the oldest
    /// chunks rather than stalling the relay.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Drain `stream` to completion or cancellation.
    ///
    /// Each chunk is appended to the assembled buffer, broadcast to
    /// observers, and reflected to `sink` as a partial preview. A stream
    /// error aborts the relay and surfaces as that provider's failure;
    /// text accumulated before a cancellation is returned, not discarded.
    pub async fn run(
        &self,
        mut stream: BoxStream<'_, ProviderResult<String>>,
        step: &'static str,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> ProviderResult<RelayOutput> {
        let mut text = String::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(RelayOutput {
                        text,
                        cancelled: true,
                    });
                }
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(delta)) => {
                            text.push_str(&delta);
                            // No receivers is fine; send only fails then
                            let _ = self.tx.send(delta);
                            sink.on_progress(step, "streaming", Some(&text));
                        }
                        Some(Err(e)) => return Err(e),
                        None => {
                            return Ok(RelayOutput {
                                text,
                                cancelled: false,
                            });
                        }
                    }
                }
            }
        }
    }
}

impl Default for StreamingRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inquest_core::{NullSink, ProviderError};

    fn chunk_stream(chunks: Vec<&'static str>) -> BoxStream<'static, ProviderResult<String>> {
        Box::pin(futures::stream::iter(
            chunks.into_iter().map(|c| Ok(c.to_string())),
        ))
    }

    #[tokio::test]
    async fn assembles_chunks_in_order() {
        let relay = StreamingRelay::new();
        let output = relay
            .run(
                chunk_stream(vec!["The ", "quick ", "brown ", "fox"]),
                "generate",
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(output.text, "The quick brown fox");
        assert!(!output.cancelled);
    }

    #[tokio::test]
    async fn observers_see_every_chunk_when_keeping_up() {
        let relay = StreamingRelay::new();
        let mut rx = relay.subscribe();

        relay
            .run(
                chunk_stream(vec!["a", "b", "c"]),
                "generate",
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            seen.push(chunk);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn lagging_observer_loses_oldest_chunks() {
        let relay = StreamingRelay::with_capacity(2);
        let mut rx = relay.subscribe();

        relay
            .run(
                chunk_stream(vec!["1", "2", "3", "4", "5"]),
                "generate",
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        // Capacity 2: the observer lags and the oldest chunks are dropped.
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
        assert_eq!(rx.try_recv().unwrap(), "4");
        assert_eq!(rx.try_recv().unwrap(), "5");
    }

    #[tokio::test]
    async fn cancellation_returns_partial_text() {
        let cancel = CancelToken::new();
        let cancel_after_two = cancel.clone();

        let stream: BoxStream<'static, ProviderResult<String>> =
            Box::pin(async_stream::stream! {
                yield Ok("first ".to_string());
                yield Ok("second".to_string());
                cancel_after_two.cancel();
                // Give the select a chance to observe the flag
                tokio::task::yield_now().await;
                yield Ok(" never".to_string());
            });

        let relay = StreamingRelay::new();
        let output = relay.run(stream, "generate", &NullSink, &cancel).await.unwrap();

        assert!(output.cancelled);
        assert_eq!(output.text, "first second");
    }

    #[tokio::test]
    async fn stream_error_surfaces_as_provider_failure() {
        let stream: BoxStream<'static, ProviderResult<String>> =
            Box::pin(futures::stream::iter(vec![
                Ok("partial".to_string()),
                Err(ProviderError::Transient("connection reset".to_string())),
            ]));

        let relay = StreamingRelay::new();
        let err = relay
            .run(stream, "generate", &NullSink, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn pre_cancelled_token_yields_empty_partial() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());

        let relay = StreamingRelay::new();
        let output = relay
            .run(chunk_stream(vec!["unseen"]), "generate", &NullSink, &cancel)
            .await
            .unwrap();
        assert!(output.cancelled);
        assert!(output.text.is_empty());
    }
}
