//! `lorekeeper search`: retrieval only, no generation.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use lorekeeper_core::pipeline::orchestrator::MAX_RAG_LIMIT;
use lorekeeper_types::document::RagDocument;

use crate::state::AppState;

pub async fn search(
    state: &AppState,
    query: &str,
    lang: Option<String>,
    limit: Option<usize>,
    table: Option<String>,
    json: bool,
) -> Result<()> {
    let lang = lang.unwrap_or_else(|| state.defaults.default_lang.clone());
    let limit = limit.unwrap_or(state.defaults.rag_limit);
    if limit == 0 || limit > MAX_RAG_LIMIT {
        bail!("--limit must be between 1 and {MAX_RAG_LIMIT}");
    }

    let docs = state
        .orchestrator
        .retriever()
        .search(query, &lang, limit, table.as_deref())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }

    if docs.is_empty() {
        println!();
        println!(
            "  {} No documents matched in '{}'",
            style("i").blue().bold(),
            style(&lang).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", render_table(&docs));
    println!();
    Ok(())
}

pub(crate) fn render_table(docs: &[RagDocument]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Source").fg(Color::White),
        Cell::new("Similarity").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);

    for (i, doc) in docs.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(format!("{}/{}", doc.source_table, doc.source_id)).fg(Color::Cyan),
            Cell::new(format!("{:.4}", doc.similarity)).fg(Color::Green),
            Cell::new(preview(&doc.content, 80)),
        ]);
    }
    table
}

/// First `max` characters of `text` on one line.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
