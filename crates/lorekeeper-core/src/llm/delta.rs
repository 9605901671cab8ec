//! Cancellable delta channel between a streaming completion and its consumer.
//!
//! A spawned producer drains the provider's event stream and pushes text
//! deltas over a bounded channel. The consumer pulls with
//! [`DeltaStream::next_delta`] and, once that returns `None`, reads exactly
//! one terminal [`StreamOutcome`]. Dropping the consumer or calling
//! [`DeltaStream::cancel`] stops the producer at its next await point.

use futures_util::StreamExt;
use lorekeeper_types::llm::{LlmError, StreamEvent, Usage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::provider::EventStream;

const DEFAULT_CAPACITY: usize = 64;

/// How a delta stream closed.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// The upstream marked the generation done.
    Completed { usage: Option<Usage> },
    /// The upstream errored or was cut off before its final payload.
    Failed(LlmError),
    /// The consumer abandoned the stream.
    Cancelled,
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed { .. })
    }
}

enum Signal {
    Delta(String),
    Finished(StreamOutcome),
}

/// Consumer half of a streaming completion.
pub struct DeltaStream {
    rx: mpsc::Receiver<Signal>,
    cancel: CancellationToken,
    outcome: Option<StreamOutcome>,
}

impl DeltaStream {
    /// Start draining `upstream` on a background task.
    pub fn spawn(upstream: EventStream) -> Self {
        Self::spawn_with_capacity(upstream, DEFAULT_CAPACITY)
    }

    pub fn spawn_with_capacity(upstream: EventStream, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        tokio::spawn(produce(upstream, tx, cancel.clone()));
        Self {
            rx,
            cancel,
            outcome: None,
        }
    }

    /// Next non-empty text delta, or `None` once the stream has closed.
    pub async fn next_delta(&mut self) -> Option<String> {
        if self.outcome.is_some() {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.outcome = Some(StreamOutcome::Cancelled);
            return None;
        }
        match self.rx.recv().await {
            Some(Signal::Delta(text)) => Some(text),
            Some(Signal::Finished(outcome)) => {
                self.outcome = Some(outcome);
                None
            }
            None if self.cancel.is_cancelled() => {
                self.outcome = Some(StreamOutcome::Cancelled);
                None
            }
            None => {
                self.outcome = Some(StreamOutcome::Failed(LlmError::Stream(
                    "stream producer stopped without a terminal signal".to_string(),
                )));
                None
            }
        }
    }

    /// Terminal outcome. `None` until `next_delta` has returned `None`.
    pub fn outcome(&self) -> Option<&StreamOutcome> {
        self.outcome.as_ref()
    }

    /// Stop the producer. Buffered deltas are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain the whole stream into one string.
    pub async fn collect_text(mut self) -> Result<(String, Option<Usage>), LlmError> {
        let mut text = String::new();
        while let Some(delta) = self.next_delta().await {
            text.push_str(&delta);
        }
        match self.outcome.take() {
            Some(StreamOutcome::Completed { usage }) => Ok((text, usage)),
            Some(StreamOutcome::Failed(e)) => Err(e),
            Some(StreamOutcome::Cancelled) | None => {
                Err(LlmError::Stream("stream cancelled".to_string()))
            }
        }
    }
}

impl Drop for DeltaStream {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            debug!("Delta stream dropped before completion, cancelling producer");
        }
        self.cancel.cancel();
    }
}

async fn produce(mut upstream: EventStream, tx: mpsc::Sender<Signal>, cancel: CancellationToken) {
    let mut usage = None;
    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break StreamOutcome::Cancelled,
            item = upstream.next() => match item {
                Some(Ok(StreamEvent::TextDelta { text })) => {
                    if text.is_empty() {
                        continue;
                    }
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break StreamOutcome::Cancelled,
                        sent = tx.send(Signal::Delta(text)) => {
                            if sent.is_err() {
                                break StreamOutcome::Cancelled;
                            }
                        }
                    }
                }
                Some(Ok(StreamEvent::Usage(u))) => usage = Some(u),
                Some(Ok(StreamEvent::Done)) => break StreamOutcome::Completed { usage },
                Some(Err(e)) => break StreamOutcome::Failed(e),
                None => break StreamOutcome::Failed(LlmError::Truncated),
            },
        }
    };

    match &outcome {
        StreamOutcome::Completed { usage } => info!(
            tokens = usage.map(|u| u.output_tokens),
            prompt_tokens = usage.map(|u| u.input_tokens),
            "Streaming completion finished"
        ),
        StreamOutcome::Failed(e) => warn!(error = %e, "Streaming completion failed"),
        StreamOutcome::Cancelled => info!("Streaming completion cancelled"),
    }

    // A cancelled consumer observes the token itself.
    if !matches!(outcome, StreamOutcome::Cancelled) {
        let _ = tx.send(Signal::Finished(outcome)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn events(items: Vec<Result<StreamEvent, LlmError>>) -> EventStream {
        Box::pin(futures_util::stream::iter(items))
    }

    fn delta(text: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::TextDelta {
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_completed_stream() {
        let mut stream = DeltaStream::spawn(events(vec![
            delta("Kil"),
            delta(""),
            delta("la"),
            Ok(StreamEvent::Usage(Usage {
                input_tokens: 12,
                output_tokens: 2,
            })),
            Ok(StreamEvent::Done),
        ]));

        let mut got = Vec::new();
        while let Some(d) = stream.next_delta().await {
            got.push(d);
        }
        assert_eq!(got, ["Kil", "la"]);
        match stream.outcome() {
            Some(StreamOutcome::Completed { usage }) => {
                assert_eq!(usage.unwrap().output_tokens, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(stream.next_delta().await.is_none());
    }

    #[tokio::test]
    async fn test_events_after_done_are_ignored() {
        let stream = DeltaStream::spawn(events(vec![
            delta("a"),
            Ok(StreamEvent::Done),
            delta("ignored"),
        ]));
        let (text, _) = stream.collect_text().await.unwrap();
        assert_eq!(text, "a");
    }

    #[tokio::test]
    async fn test_missing_done_is_truncation() {
        let mut stream = DeltaStream::spawn(events(vec![delta("partial")]));
        assert_eq!(stream.next_delta().await.as_deref(), Some("partial"));
        assert!(stream.next_delta().await.is_none());
        assert!(matches!(
            stream.outcome(),
            Some(StreamOutcome::Failed(LlmError::Truncated))
        ));
    }

    #[tokio::test]
    async fn test_upstream_error_is_failure() {
        let stream = DeltaStream::spawn(events(vec![
            delta("a"),
            Err(LlmError::Stream("connection reset".into())),
        ]));
        let err = stream.collect_text().await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_cancel_stops_producer() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let upstream: EventStream = Box::pin(async_stream::stream! {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                yield Ok(StreamEvent::TextDelta { text: "x".to_string() });
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let mut stream = DeltaStream::spawn_with_capacity(upstream, 1);
        assert!(stream.next_delta().await.is_some());
        stream.cancel();
        assert!(stream.next_delta().await.is_none());
        assert!(matches!(stream.outcome(), Some(StreamOutcome::Cancelled)));

        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_cancel = polled.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(polled.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_drop_stops_producer() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let upstream: EventStream = Box::pin(async_stream::stream! {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                yield Ok(StreamEvent::TextDelta { text: "x".to_string() });
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let mut stream = DeltaStream::spawn_with_capacity(upstream, 1);
        assert!(stream.next_delta().await.is_some());
        drop(stream);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_drop = polled.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(polled.load(Ordering::SeqCst), after_drop);
    }
}
