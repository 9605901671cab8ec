//! `lorekeeper ingest`: load rendered documents into the vector store.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use lorekeeper_infra::ingest::{IngestReport, Ingestor};

use crate::state::AppState;

/// Embed and upsert every usable row of `file`, then optionally build the index.
///
/// # Examples
///
/// ```bash
/// lorekeeper ingest --file docs.jsonl
/// lorekeeper ingest --file docs.jsonl --index
/// ```
pub async fn ingest(
    state: &AppState,
    file: &Path,
    batch_size: usize,
    build_index: bool,
    json: bool,
) -> Result<()> {
    let ingestor = Ingestor::new(state.embedder.clone(), state.store.documents.clone(), batch_size);
    let report = ingestor
        .ingest_file(file)
        .await
        .with_context(|| format!("Ingestion of {} failed", file.display()))?;

    if build_index {
        ingestor
            .index()
            .create_index()
            .await
            .context("Building the vector index failed")?;
    }
    let total = ingestor.index().count().await?;

    if json {
        let out = serde_json::json!({
            "read": report.read,
            "written": report.written,
            "skipped_empty": report.skipped_empty,
            "invalid": report.invalid,
            "embed_failed": report.embed_failed,
            "indexed": build_index,
            "total_documents": total,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_report(&report, total);
    if build_index {
        println!("  {} Vector index rebuilt", style("✓").green().bold());
        println!();
    }
    Ok(())
}

fn print_report(report: &IngestReport, total: usize) {
    let skipped = report.skipped_empty + report.invalid + report.embed_failed;
    println!();
    println!(
        "  {} Stored {} of {} documents",
        style("✓").green().bold(),
        style(report.written).bold(),
        report.read
    );
    if skipped > 0 {
        println!(
            "  {} Skipped {} (empty: {}, invalid: {}, embedding failed: {})",
            style("!").yellow().bold(),
            skipped,
            report.skipped_empty,
            report.invalid,
            report.embed_failed
        );
    }
    println!(
        "  {}",
        style(format!("{total} documents in the store")).dim()
    );
    println!();
}
