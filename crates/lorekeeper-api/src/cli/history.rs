//! `lorekeeper history`: show the recent messages of a session.

use anyhow::{Result, anyhow, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use lorekeeper_core::pipeline::orchestrator::MAX_HISTORY_LIMIT;
use lorekeeper_types::chat::{ChatMessage, MessageRole, SessionId};

use crate::cli::search::preview;
use crate::state::AppState;

pub async fn history(
    state: &AppState,
    session: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let session_id = SessionId::new(session).map_err(|e| anyhow!(e))?;
    let limit = limit.unwrap_or(state.defaults.history_limit);
    if limit > MAX_HISTORY_LIMIT {
        bail!("--limit must be at most {MAX_HISTORY_LIMIT}");
    }

    let messages = state
        .orchestrator
        .history()
        .messages(&session_id, limit)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} No messages in session '{}'",
            style("i").blue().bold(),
            style(session).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("  Session '{}'", style(session).cyan().bold());
    println!();
    println!("{}", render_table(&messages));
    println!();
    Ok(())
}

fn render_table(messages: &[ChatMessage]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Lang").fg(Color::White),
        Cell::new("Content").fg(Color::White),
        Cell::new("Sources").fg(Color::White),
    ]);

    for message in messages {
        let role = match message.role {
            MessageRole::User => Cell::new("user").fg(Color::Cyan),
            _ => Cell::new(message.role.to_string()).fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(message.created_at.format("%Y-%m-%d %H:%M:%S")).fg(Color::DarkGrey),
            role,
            Cell::new(&message.lang),
            Cell::new(preview(&message.content, 60)),
            Cell::new(message.source_docs.len()).fg(Color::DarkGrey),
        ]);
    }
    table
}
