//! Terminal output for retrieval and query results.

use std::path::Path;

use ragline_core::{QueryResult, RetrievedDocument};

pub const RULE_WIDTH: usize = 70;

/// A horizontal rule of `ch`.
pub fn rule(ch: char) -> String {
    std::iter::repeat_n(ch, RULE_WIDTH).collect()
}

/// The first `max_chars` characters of `text`, with an ellipsis if cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

/// File name of a chunk source, or the source itself if it has none.
pub fn source_name(source: &str) -> &str {
    Path::new(source).file_name().and_then(|name| name.to_str()).unwrap_or(source)
}

/// One line per retrieved document: rank, score, source and a text preview.
pub fn retrieved_summary(documents: &[RetrievedDocument], preview_chars: usize) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "  [{}] Score: {:.4} | Source: {}\n      {}",
                i + 1,
                doc.score,
                source_name(&doc.chunk.source),
                preview(&doc.chunk.text, preview_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full report of a query: retrieved documents followed by the answer.
pub fn query_report(result: &QueryResult) -> String {
    let mut out = String::new();
    out.push_str(&rule('-'));
    out.push_str("\nRETRIEVED DOCUMENTS:\n");
    out.push_str(&rule('-'));
    out.push('\n');
    if result.retrieved_documents.is_empty() {
        out.push_str("  (none)\n");
    } else {
        out.push_str(&retrieved_summary(&result.retrieved_documents, 200));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&rule('-'));
    out.push_str("\nGENERATED ANSWER:\n");
    out.push_str(&rule('-'));
    out.push('\n');
    out.push_str(&result.answer.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::{Chunk, GeneratedAnswer};

    #[test]
    fn preview_counts_characters() {
        assert_eq!(preview("héllo", 3), "hél...");
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("exact", 5), "exact");
    }

    #[test]
    fn source_name_strips_directories() {
        assert_eq!(source_name("documents/crop_farming.txt"), "crop_farming.txt");
        assert_eq!(source_name("inline"), "inline");
    }

    #[test]
    fn report_includes_scores_and_answer() {
        let result = QueryResult {
            question: "q".to_string(),
            answer: GeneratedAnswer::Unavailable,
            retrieved_documents: vec![RetrievedDocument {
                chunk: Chunk::new(
                    "Crop rotation keeps soil healthy.",
                    "documents/crop_farming.txt",
                    0,
                ),
                score: 0.71234,
            }],
        };
        let report = query_report(&result);
        assert!(report.contains("[1] Score: 0.7123 | Source: crop_farming.txt"));
        assert!(report.ends_with(ragline_core::GENERATION_DISABLED));
    }
}
