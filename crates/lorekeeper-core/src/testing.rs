//! In-crate fakes for the storage, retrieval, and completion ports.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lorekeeper_types::chat::{ChatMessage, SessionId};
use lorekeeper_types::document::{Metadata, RagDocument};
use lorekeeper_types::error::{EmbeddingError, RepositoryError};
use lorekeeper_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StreamEvent, Usage,
};

use crate::chat::repository::ChatRepository;
use crate::llm::provider::{EventStream, LlmProvider};
use crate::retrieval::embedder::Embedder;
use crate::retrieval::index::{DocumentIndex, VectorQuery};

pub fn doc(table: &str, id: &str, lang: &str, content: &str, similarity: f64) -> RagDocument {
    RagDocument {
        source_table: table.to_string(),
        source_id: id.to_string(),
        lang: lang.to_string(),
        content: content.to_string(),
        metadata: Metadata::default(),
        similarity,
    }
}

// --- Chat repository ---

#[derive(Clone, Default)]
pub struct FakeChatRepository {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    fail_writes: Arc<AtomicBool>,
    /// Writes allowed before every further write fails.
    write_budget: Arc<Mutex<Option<usize>>>,
}

impl FakeChatRepository {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes_after(&self, allowed: usize) {
        *self.write_budget.lock().unwrap() = Some(allowed);
    }

    pub fn all(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    fn try_write(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".to_string()));
        }
        let mut budget = self.write_budget.lock().unwrap();
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                return Err(RepositoryError::Query("disk I/O error".to_string()));
            }
            *remaining -= 1;
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

impl ChatRepository for FakeChatRepository {
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        let result = self.try_write(message);
        async move { result }
    }

    fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send {
        let mut rows: Vec<ChatMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows.truncate(limit);
        async move { Ok(rows) }
    }
}

// --- Embedder ---

enum EmbedMode {
    Ok,
    Failing,
    Misreporting { actual: usize },
}

pub struct FakeEmbedder {
    dimension: usize,
    mode: EmbedMode,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            mode: EmbedMode::Ok,
        }
    }

    pub fn failing() -> Self {
        Self {
            dimension: 4,
            mode: EmbedMode::Failing,
        }
    }

    /// Claims `reported` dimensions but returns vectors of length `actual`.
    pub fn misreporting(reported: usize, actual: usize) -> Self {
        Self {
            dimension: reported,
            mode: EmbedMode::Misreporting { actual },
        }
    }
}

impl Embedder for FakeEmbedder {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send {
        let result = match self.mode {
            EmbedMode::Ok => Ok(vec![vec![0.5; self.dimension]; texts.len()]),
            EmbedMode::Failing => Err(EmbeddingError::Status {
                status: 503,
                body: "model is loading".to_string(),
            }),
            EmbedMode::Misreporting { actual } => Ok(vec![vec![0.5; actual]; texts.len()]),
        };
        async move { result }
    }

    fn model_name(&self) -> &str {
        "fake-embed"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// --- Document index ---

#[derive(Clone, Default)]
pub struct FakeDocumentIndex {
    docs: Arc<Mutex<Vec<RagDocument>>>,
    fail: Arc<AtomicBool>,
}

impl FakeDocumentIndex {
    pub fn with_docs(docs: Vec<RagDocument>) -> Self {
        Self {
            docs: Arc::new(Mutex::new(docs)),
            fail: Arc::default(),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl DocumentIndex for FakeDocumentIndex {
    fn nearest(
        &self,
        query: &VectorQuery<'_>,
    ) -> impl Future<Output = Result<Vec<RagDocument>, RepositoryError>> + Send {
        let result = if self.fail.load(Ordering::SeqCst) {
            Err(RepositoryError::Timeout(10))
        } else {
            let mut rows: Vec<RagDocument> = self
                .docs
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.lang == query.lang)
                .filter(|d| query.source_table.is_none_or(|t| d.source_table == t))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            rows.truncate(query.limit);
            Ok(rows)
        };
        async move { result }
    }
}

// --- Completion provider ---

#[derive(Clone)]
enum Script {
    Answer(String),
    Fail,
    Stream(Vec<String>),
    StreamThenFail(Vec<String>),
    Truncated(Vec<String>),
    Endless,
}

struct ProviderState {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
    polls: AtomicUsize,
}

/// Completion provider that replays a fixed script and records requests.
#[derive(Clone)]
pub struct ScriptedProvider {
    state: Arc<ProviderState>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            state: Arc::new(ProviderState {
                script,
                requests: Mutex::new(Vec::new()),
                polls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self::with_script(Script::Answer(answer.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    pub fn streaming(tokens: &[&str]) -> Self {
        Self::with_script(Script::Stream(tokens.iter().map(|t| t.to_string()).collect()))
    }

    pub fn streaming_then_failing(tokens: &[&str]) -> Self {
        Self::with_script(Script::StreamThenFail(
            tokens.iter().map(|t| t.to_string()).collect(),
        ))
    }

    pub fn truncated(tokens: &[&str]) -> Self {
        Self::with_script(Script::Truncated(
            tokens.iter().map(|t| t.to_string()).collect(),
        ))
    }

    /// Streams "x" forever until the consumer goes away.
    pub fn endless() -> Self {
        Self::with_script(Script::Endless)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Upstream items produced so far by streaming calls.
    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }
}

fn usage() -> StreamEvent {
    StreamEvent::Usage(Usage {
        input_tokens: 100,
        output_tokens: 7,
    })
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
        self.state.requests.lock().unwrap().push(request.clone());
        let model = request.model.clone();
        let result = match &self.state.script {
            Script::Answer(answer) => Ok(answer.clone()),
            Script::Stream(tokens) => Ok(tokens.concat()),
            _ => Err(LlmError::Provider {
                message: "model not found".to_string(),
            }),
        };
        async move {
            result.map(|content| CompletionResponse {
                content,
                model,
                usage: Some(Usage {
                    input_tokens: 100,
                    output_tokens: 7,
                }),
            })
        }
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.state.requests.lock().unwrap().push(request);
        let script = self.state.script.clone();
        let state = self.state.clone();
        Box::pin(async_stream::stream! {
            match script {
                Script::Answer(answer) => {
                    yield Ok(StreamEvent::TextDelta { text: answer });
                    yield Ok(usage());
                    yield Ok(StreamEvent::Done);
                }
                Script::Fail => {
                    yield Err(LlmError::Provider { message: "model not found".to_string() });
                }
                Script::Stream(tokens) => {
                    for text in tokens {
                        state.polls.fetch_add(1, Ordering::SeqCst);
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Ok(usage());
                    yield Ok(StreamEvent::Done);
                }
                Script::StreamThenFail(tokens) => {
                    for text in tokens {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Err(LlmError::Stream("connection reset by peer".to_string()));
                }
                Script::Truncated(tokens) => {
                    for text in tokens {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                }
                Script::Endless => loop {
                    state.polls.fetch_add(1, Ordering::SeqCst);
                    yield Ok(StreamEvent::TextDelta { text: "x".to_string() });
                    tokio::time::sleep(Duration::from_millis(5)).await;
                },
            }
        })
    }
}
