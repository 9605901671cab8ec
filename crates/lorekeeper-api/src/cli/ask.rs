//! `lorekeeper ask`: run one question through the pipeline.

use std::io::Write;

use anyhow::{Result, anyhow};
use console::style;
use futures_util::StreamExt;

use lorekeeper_types::chat::SessionId;
use lorekeeper_types::pipeline::{PipelineEvent, PipelineRequest};

use crate::state::AppState;

/// Options of one `ask` invocation.
pub struct AskOptions {
    pub query: String,
    pub session: Option<String>,
    pub lang: Option<String>,
    pub rag_limit: Option<usize>,
    pub history_limit: Option<usize>,
    pub table: Option<String>,
    pub stream: bool,
}

impl AskOptions {
    fn into_request(self, state: &AppState) -> Result<PipelineRequest> {
        let session = self
            .session
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        Ok(PipelineRequest {
            session_id: SessionId::new(session).map_err(|e| anyhow!(e))?,
            query: self.query,
            lang: self
                .lang
                .unwrap_or_else(|| state.defaults.default_lang.clone()),
            rag_limit: self.rag_limit.unwrap_or(state.defaults.rag_limit),
            history_limit: self.history_limit.unwrap_or(state.defaults.history_limit),
            source_table: self.table,
        })
    }
}

pub async fn ask(state: &AppState, options: AskOptions, json: bool) -> Result<()> {
    let stream = options.stream;
    let request = options.into_request(state)?;
    let session_id = request.session_id.clone();

    if stream {
        return ask_streaming(state, request, json).await;
    }

    let answer = state.orchestrator.run(&request).await?;
    if json {
        let out = serde_json::json!({
            "session_id": session_id,
            "answer": answer.answer,
            "docs": answer.docs,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", answer.answer.trim());
    println!();
    print_sources(
        answer
            .docs
            .iter()
            .map(|d| (d.source_table.as_str(), d.source_id.as_str(), d.similarity)),
    );
    print_session_hint(&session_id);
    Ok(())
}

/// Print tokens as they arrive. With `json`, prints each event as one JSON line.
async fn ask_streaming(state: &AppState, request: PipelineRequest, json: bool) -> Result<()> {
    let session_id = request.session_id.clone();
    let mut events = state.orchestrator.run_stream(request).await?;
    let mut stdout = std::io::stdout();
    let mut sources = Vec::new();

    while let Some(event) = events.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        }
        match event {
            PipelineEvent::Docs { docs } => {
                if !json {
                    println!();
                }
                sources = docs;
            }
            PipelineEvent::Token { content } => {
                if !json {
                    write!(stdout, "{content}")?;
                    stdout.flush()?;
                }
            }
            PipelineEvent::Done => {
                if !json {
                    println!();
                    println!();
                    print_sources(
                        sources
                            .iter()
                            .map(|d| (d.source_table.as_str(), d.source_id.as_str(), d.similarity)),
                    );
                    print_session_hint(&session_id);
                }
                return Ok(());
            }
            PipelineEvent::Error { message } => {
                if !json {
                    println!();
                }
                return Err(anyhow!(message));
            }
        }
    }
    Err(anyhow!("answer stream ended unexpectedly"))
}

fn print_sources<'a>(sources: impl Iterator<Item = (&'a str, &'a str, f64)>) {
    let mut any = false;
    for (i, (table, id, similarity)) in sources.enumerate() {
        if !any {
            println!("  {}", style("Sources").bold());
            any = true;
        }
        println!(
            "  {} {}/{} {}",
            style(format!("[{}]", i + 1)).dim(),
            style(table).cyan(),
            id,
            style(format!("({similarity:.4})")).dim()
        );
    }
    if any {
        println!();
    }
}

fn print_session_hint(session_id: &SessionId) {
    println!(
        "  {}",
        style(format!("Continue with: lorekeeper ask --session {session_id} \"...\"")).dim()
    );
    println!();
}
