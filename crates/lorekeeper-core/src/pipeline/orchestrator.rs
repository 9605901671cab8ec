//! PipelineOrchestrator: one chat turn, blocking or streamed.
//!
//! Both variants run the same ordered steps:
//! 1. fetch recent history
//! 2. persist the user turn (durable before any completion call)
//! 3. retrieve documents
//! 4. build the context block
//! 5. generate, then persist the assistant turn with the retrieval provenance

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use lorekeeper_types::chat::{MessageRole, SessionId, SourceDoc};
use lorekeeper_types::document::RagDocument;
use lorekeeper_types::error::{PipelineStage, RagError};
use lorekeeper_types::lang::Lang;
use lorekeeper_types::llm::{LlmError, Message};
use lorekeeper_types::pipeline::{PipelineAnswer, PipelineEvent, PipelineRequest};
use tracing::{error, info, warn};

use super::state::PipelineState;
use crate::chat::history::HistoryStore;
use crate::chat::repository::ChatRepository;
use crate::llm::client::LlmClient;
use crate::llm::delta::StreamOutcome;
use crate::prompt::context::ContextBuilder;
use crate::retrieval::index::DocumentIndex;
use crate::retrieval::retriever::VectorRetriever;

/// Upper bound on documents retrieved per request.
pub const MAX_RAG_LIMIT: usize = 50;
/// Upper bound on history turns sent per request.
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Event stream of the streaming variant.
pub type PipelineStream = Pin<Box<dyn Stream<Item = PipelineEvent> + Send + 'static>>;

/// Tracks one request through the state machine and tags failures.
struct RunTracker {
    session_id: SessionId,
    state: PipelineState,
}

impl RunTracker {
    fn new(session_id: &SessionId) -> Self {
        Self {
            session_id: session_id.clone(),
            state: PipelineState::Idle,
        }
    }

    fn reached(&mut self, next: PipelineState) {
        if let Err(e) = self.state.advance(next) {
            error!(session_id = %self.session_id, error = %e, "Pipeline state out of order");
            debug_assert!(false, "{e}");
        }
    }

    /// Log and record a failure at the stage currently pending.
    ///
    /// While `Generating`, the pending stage is the assistant write; model
    /// failures go through [`RunTracker::fail_generation`] instead.
    fn fail(&mut self, err: RagError) -> RagError {
        let stage = self
            .state
            .pending_stage()
            .unwrap_or(PipelineStage::PersistAssistant);
        self.fail_at(stage, err)
    }

    fn fail_generation(&mut self, err: LlmError) -> RagError {
        self.fail_at(PipelineStage::Generate, RagError::Generation(err))
    }

    fn fail_at(&mut self, stage: PipelineStage, err: RagError) -> RagError {
        if err.is_client_fault() {
            warn!(session_id = %self.session_id, stage = %stage, error = %err, "Pipeline rejected request");
        } else {
            error!(session_id = %self.session_id, stage = %stage, error = %err, "Pipeline failed");
        }
        self.reached(PipelineState::Failed { stage });
        err
    }
}

impl Drop for RunTracker {
    fn drop(&mut self) {
        #[cfg(test)]
        finished::record(self.state);
        if !self.state.is_terminal() && self.state != PipelineState::Idle {
            info!(
                session_id = %self.session_id,
                state = %self.state,
                "Pipeline abandoned before completion"
            );
        }
    }
}

/// Final state of every tracker dropped on the current thread.
#[cfg(test)]
mod finished {
    use std::cell::RefCell;

    use super::PipelineState;

    thread_local! {
        static STATES: RefCell<Vec<PipelineState>> = const { RefCell::new(Vec::new()) };
    }

    pub(super) fn record(state: PipelineState) {
        STATES.with(|s| s.borrow_mut().push(state));
    }

    pub(super) fn take() -> Vec<PipelineState> {
        STATES.with(|s| std::mem::take(&mut *s.borrow_mut()))
    }
}

/// Output of steps 1-4.
struct Prepared {
    turns: Vec<Message>,
    docs: Vec<RagDocument>,
    context: String,
    lang: Lang,
}

/// Sequences history, retrieval, prompting, generation, and persistence.
///
/// Holds only shared, stateless collaborators; one instance serves every
/// concurrent request.
pub struct PipelineOrchestrator<R: ChatRepository, I: DocumentIndex> {
    history: Arc<HistoryStore<R>>,
    retriever: Arc<VectorRetriever<I>>,
    llm: Arc<LlmClient>,
}

impl<R: ChatRepository, I: DocumentIndex> Clone for PipelineOrchestrator<R, I> {
    fn clone(&self) -> Self {
        Self {
            history: self.history.clone(),
            retriever: self.retriever.clone(),
            llm: self.llm.clone(),
        }
    }
}

impl<R: ChatRepository, I: DocumentIndex> PipelineOrchestrator<R, I> {
    pub fn new(
        history: Arc<HistoryStore<R>>,
        retriever: Arc<VectorRetriever<I>>,
        llm: Arc<LlmClient>,
    ) -> Self {
        Self {
            history,
            retriever,
            llm,
        }
    }

    pub fn history(&self) -> &HistoryStore<R> {
        &self.history
    }

    pub fn retriever(&self) -> &VectorRetriever<I> {
        &self.retriever
    }

    /// Blocking variant: returns the full answer and the ranked documents.
    pub async fn run(&self, req: &PipelineRequest) -> Result<PipelineAnswer, RagError> {
        let mut tracker = RunTracker::new(&req.session_id);
        let prepared = self.prepare(req, &mut tracker).await?;

        tracker.reached(PipelineState::Generating);
        let answer = self
            .llm
            .chat(&prepared.turns, &prepared.context, prepared.lang)
            .await
            .map_err(|e| tracker.fail_generation(e))?;

        let sources: Vec<SourceDoc> = prepared.docs.iter().map(RagDocument::source).collect();
        self.history
            .save(
                &req.session_id,
                MessageRole::Assistant,
                &answer,
                &req.lang,
                sources,
            )
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.reached(PipelineState::AssistantPersisted);

        info!(
            session_id = %req.session_id,
            lang = %req.lang,
            docs = prepared.docs.len(),
            "RAG pipeline completed"
        );
        Ok(PipelineAnswer {
            answer,
            docs: prepared.docs,
        })
    }

    /// Streaming variant.
    ///
    /// Steps 1-4 run before this returns, so their failures are ordinary
    /// errors. The stream then yields one `docs` event, a `token` event per
    /// delta, and `done` once the assistant turn is stored. Generation or
    /// storage failures end the stream with a single `error` event instead.
    /// Dropping the stream cancels generation and nothing partial is stored.
    pub async fn run_stream(&self, req: PipelineRequest) -> Result<PipelineStream, RagError>
    where
        R: 'static,
        I: 'static,
    {
        let mut tracker = RunTracker::new(&req.session_id);
        let prepared = self.prepare(&req, &mut tracker).await?;
        let sources: Vec<SourceDoc> = prepared.docs.iter().map(RagDocument::source).collect();

        let history = self.history.clone();
        let llm = self.llm.clone();

        Ok(Box::pin(async_stream::stream! {
            let mut tracker = tracker;
            yield PipelineEvent::Docs { docs: sources.clone() };

            tracker.reached(PipelineState::Generating);
            let mut deltas = llm.chat_stream(&prepared.turns, &prepared.context, prepared.lang);
            let mut buffer = String::new();
            while let Some(delta) = deltas.next_delta().await {
                buffer.push_str(&delta);
                yield PipelineEvent::Token { content: delta };
            }

            let outcome = deltas.outcome().cloned();
            match outcome {
                Some(StreamOutcome::Completed { .. }) => {
                    let saved = history
                        .save(&req.session_id, MessageRole::Assistant, &buffer, &req.lang, sources)
                        .await;
                    match saved {
                        Ok(_) => {
                            tracker.reached(PipelineState::AssistantPersisted);
                            info!(
                                session_id = %req.session_id,
                                lang = %req.lang,
                                docs = prepared.docs.len(),
                                answer_chars = buffer.chars().count(),
                                "RAG stream completed"
                            );
                            yield PipelineEvent::Done;
                        }
                        Err(e) => {
                            let e = tracker.fail(e);
                            yield PipelineEvent::Error { message: e.to_string() };
                        }
                    }
                }
                Some(StreamOutcome::Failed(e)) => {
                    let e = tracker.fail_generation(e);
                    yield PipelineEvent::Error { message: e.to_string() };
                }
                Some(StreamOutcome::Cancelled) | None => {
                    let e = tracker.fail_generation(LlmError::Stream(
                        "generation cancelled".to_string(),
                    ));
                    yield PipelineEvent::Error { message: e.to_string() };
                }
            }
        }))
    }

    /// Steps 1-4, shared by both variants.
    async fn prepare(
        &self,
        req: &PipelineRequest,
        tracker: &mut RunTracker,
    ) -> Result<Prepared, RagError> {
        validate(req).map_err(|e| tracker.fail_at(PipelineStage::Validate, e))?;

        let mut turns = self
            .history
            .get(&req.session_id, req.history_limit)
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.reached(PipelineState::HistoryFetched);

        self.history
            .save(
                &req.session_id,
                MessageRole::User,
                &req.query,
                &req.lang,
                Vec::new(),
            )
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.reached(PipelineState::UserPersisted);

        let docs = self
            .retriever
            .search(
                &req.query,
                &req.lang,
                req.rag_limit,
                req.source_table.as_deref(),
            )
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.reached(PipelineState::Retrieved);

        let context = ContextBuilder::build(&docs);
        tracker.reached(PipelineState::ContextBuilt);

        turns.push(Message::user(req.query.clone()));
        Ok(Prepared {
            turns,
            docs,
            context,
            lang: Lang::resolve(&req.lang),
        })
    }
}

fn validate(req: &PipelineRequest) -> Result<(), RagError> {
    if req.query.trim().is_empty() {
        return Err(RagError::Validation("query must not be empty".to_string()));
    }
    if req.lang.trim().is_empty() {
        return Err(RagError::Validation("lang must not be empty".to_string()));
    }
    if req.rag_limit == 0 || req.rag_limit > MAX_RAG_LIMIT {
        return Err(RagError::Validation(format!(
            "rag_limit must be between 1 and {MAX_RAG_LIMIT}"
        )));
    }
    if req.history_limit > MAX_HISTORY_LIMIT {
        return Err(RagError::Validation(format!(
            "history_limit must be at most {MAX_HISTORY_LIMIT}"
        )));
    }
    Ok(())
}
