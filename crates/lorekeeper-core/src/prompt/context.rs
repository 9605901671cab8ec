//! Prompt-context assembly from retrieved documents.

use std::fmt::Write;

use lorekeeper_types::document::RagDocument;

/// Formats ranked documents into one context block.
///
/// Pure and deterministic. Documents are numbered from 1 in the order given.
/// No documents means an empty string: the closed-book prompt relies on an
/// empty context to trigger its refusal, so no placeholder is ever produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn build(docs: &[RagDocument]) -> String {
        let mut out = String::new();
        for (i, doc) in docs.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "[Document {}] (source: {}/{}, similarity: {})\n{}",
                i + 1,
                doc.source_table,
                doc.source_id,
                doc.similarity,
                doc.content
            );
        }
        out
    }
}
