//! Newline-delimited JSON stream to [`StreamEvent`] adapter.
//!
//! Ollama streams one JSON object per line. Network chunks do not respect
//! line boundaries, so bytes are buffered until a full line is available.

use std::fmt;

use futures_util::{Stream, StreamExt};

use lorekeeper_core::llm::provider::EventStream;
use lorekeeper_types::llm::{LlmError, StreamEvent};

use super::types::OllamaChatChunk;

/// Incremental line splitter over arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator, if one is buffered.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Events carried by one line, and whether it was the final one.
fn line_events(line: &[u8]) -> Result<(Vec<StreamEvent>, bool), LlmError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok((vec![], false));
    }

    let chunk: OllamaChatChunk = serde_json::from_slice(line)
        .map_err(|e| LlmError::Deserialization(format!("stream line: {e}")))?;

    if let Some(message) = chunk.error {
        return Err(LlmError::Provider { message });
    }

    let mut events = Vec::new();
    let content = chunk.content();
    if !content.is_empty() {
        events.push(StreamEvent::TextDelta {
            text: content.to_string(),
        });
    }
    if chunk.done {
        if let Some(usage) = chunk.usage() {
            tracing::debug!(
                model = %chunk.model,
                eval_count = usage.output_tokens,
                prompt_eval_count = usage.input_tokens,
                "Ollama stream finished"
            );
            events.push(StreamEvent::Usage(usage));
        }
        events.push(StreamEvent::Done);
    }
    Ok((events, chunk.done))
}

/// Map a chunked response body to a stream of [`StreamEvent`]s.
///
/// Blank lines are skipped. The stream ends after the first `done: true`
/// object, ignoring anything after it. A body that ends without one yields
/// [`LlmError::Truncated`].
pub fn decode_chat_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    Box::pin(async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = LineDecoder::default();
        let mut finished = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
            decoder.push(chunk.as_ref());

            while let Some(line) = decoder.next_line() {
                let (events, done) = line_events(&line)?;
                for event in events {
                    yield event;
                }
                if done {
                    finished = true;
                    break 'read;
                }
            }
        }

        // A final object may arrive without a trailing newline.
        if !finished {
            if let Some(tail) = decoder.finish() {
                let (events, done) = line_events(&tail)?;
                for event in events {
                    yield event;
                }
                finished = done;
            }
        }

        if !finished {
            Err::<(), _>(LlmError::Truncated)?;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use lorekeeper_types::llm::Usage;

    type Body = stream::Iter<std::vec::IntoIter<Result<&'static [u8], String>>>;

    fn body(chunks: &[&'static str]) -> Body {
        stream::iter(chunks.iter().map(|c| Ok(c.as_bytes())).collect::<Vec<_>>())
    }

    async fn collect(chunks: &[&'static str]) -> Vec<Result<StreamEvent, LlmError>> {
        decode_chat_stream(body(chunks)).collect().await
    }

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::TextDelta {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_line_decoder_splits_and_strips_cr() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"ab");
        assert!(decoder.next_line().is_none());
        decoder.push(b"c\r\nde\nf");
        assert_eq!(decoder.next_line().unwrap(), b"abc");
        assert_eq!(decoder.next_line().unwrap(), b"de");
        assert!(decoder.next_line().is_none());
        assert_eq!(decoder.finish().unwrap(), b"f");
        assert!(decoder.finish().is_none());
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let events = collect(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Kil\"},\"do",
            "ne\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"la\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"prompt_eval_count\":7,\"eval_count\":2}\n",
        ])
        .await;

        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                delta("Kil"),
                delta("la"),
                StreamEvent::Usage(Usage {
                    input_tokens: 7,
                    output_tokens: 2
                }),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_lines_and_empty_content_skipped() {
        let events = collect(&[
            "\n\n{\"message\":{\"content\":\"\"},\"done\":false}\n",
            "  \n{\"message\":{\"content\":\"ok\"},\"done\":false}\n",
            "{\"done\":true}\n",
        ])
        .await;
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events, vec![delta("ok"), StreamEvent::Done]);
    }

    #[tokio::test]
    async fn test_content_after_done_is_ignored() {
        let events = collect(&[
            "{\"message\":{\"content\":\"a\"},\"done\":true}\n{\"message\":{\"content\":\"b\"},\"done\":false}\n",
        ])
        .await;
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events, vec![delta("a"), StreamEvent::Done]);
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let events = collect(&["{\"message\":{\"content\":\"x\"},\"done\":false}\n{\"done\":true}"]).await;
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events, vec![delta("x"), StreamEvent::Done]);
    }

    #[tokio::test]
    async fn test_missing_done_is_truncation() {
        let events = collect(&["{\"message\":{\"content\":\"half\"},\"done\":false}\n"]).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap(), &delta("half"));
        assert!(matches!(events[1], Err(LlmError::Truncated)));
    }

    #[tokio::test]
    async fn test_error_line_fails_stream() {
        let events = collect(&["{\"error\":\"model not found\"}\n"]).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(LlmError::Provider { message }) => assert_eq!(message, "model not found"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_line_fails_stream() {
        let events = collect(&["{not json}\n"]).await;
        assert!(matches!(events[0], Err(LlmError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_body_read_error() {
        let failing = stream::iter(vec![
            Ok::<&'static [u8], String>(b"{\"message\":{\"content\":\"a\"},\"done\":false}\n"),
            Err("connection reset".to_string()),
        ]);
        let events: Vec<_> = decode_chat_stream(failing).collect().await;
        assert_eq!(events[0].as_ref().unwrap(), &delta("a"));
        match &events[1] {
            Err(LlmError::Stream(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("expected stream error, got {other:?}"),
        }
    }
}
