use std::path::Path;

use anyhow::{Context, Result, bail};
use ragline_core::{IndexOrigin, RagPipeline, Settings, loader};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::debug;

use crate::render::{preview, query_report, retrieved_summary, rule, source_name};
use crate::samples::write_samples;

/// Questions the demo runs through retrieval only.
pub const DEMO_QUERIES: [&str; 3] = [
    "What is crop farming?",
    "What are the key aspects of livestock management?",
    "What is sustainable agriculture?",
];

/// Question the demo answers end to end.
pub const DEMO_QUESTION: &str = "What are the best practices for sustainable crop farming?";

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

/// Whether `line` asks the chat loop to stop.
pub fn is_exit_command(line: &str) -> bool {
    EXIT_WORDS.iter().any(|word| line.eq_ignore_ascii_case(word))
}

async fn open_index(pipeline: &mut RagPipeline, settings: &Settings) -> Result<()> {
    let origin = pipeline
        .open_or_build(&settings.index_path, &settings.documents_dir)
        .await
        .context("failed to prepare the index")?;
    match origin {
        IndexOrigin::Loaded => {
            let stats = pipeline.document_stats().await?;
            println!("Loaded index with {} document chunks", stats.total_chunks);
        }
        IndexOrigin::Built { chunk_count } => {
            println!("Index built with {chunk_count} document chunks");
        }
        IndexOrigin::Missing => bail!(
            "no saved index at {} and no .txt files in {}",
            settings.index_path.display(),
            settings.documents_dir.display()
        ),
    }
    Ok(())
}

pub async fn chat(settings: &Settings, samples: bool) -> Result<()> {
    if samples {
        let written = write_samples(&settings.documents_dir).await?;
        println!(
            "Wrote {} sample documents to {}",
            written.len(),
            settings.documents_dir.display()
        );
    }

    let mut pipeline = settings.pipeline()?;
    open_index(&mut pipeline, settings).await?;

    println!("\n{}", rule('='));
    println!("RAG System Ready! Ask questions (type 'quit' to exit)");
    println!("{}", rule('='));

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match tokio::task::block_in_place(|| editor.readline("\nYour question: ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if is_exit_command(question) {
            break;
        }
        if question.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(question) {
            debug!(error = %e, "failed to record history");
        }

        println!("\nProcessing your question...\n");
        match pipeline.query(question).await {
            Ok(result) => println!("{}\n", query_report(&result)),
            Err(e) => eprintln!("Error processing query: {e}"),
        }
    }

    println!("Goodbye!");
    Ok(())
}

pub async fn ask(settings: &Settings, question: &str) -> Result<()> {
    let mut pipeline = settings.pipeline()?;
    if !pipeline.index().has_saved(&settings.index_path).await {
        bail!(
            "no saved index at {}; run `ragline index` first",
            settings.index_path.display()
        );
    }
    pipeline
        .load_index(&settings.index_path)
        .await
        .with_context(|| format!("failed to load index {}", settings.index_path.display()))?;

    let result = pipeline.query(question).await?;
    println!("{}", query_report(&result));
    Ok(())
}

pub async fn index(settings: &Settings) -> Result<()> {
    let files = loader::text_files_in(&settings.documents_dir).await?;
    if files.is_empty() {
        bail!("no .txt files found in {}", settings.documents_dir.display());
    }

    let pipeline = settings.pipeline()?;
    let chunks = pipeline.load_documents(&files).await?;
    pipeline.build_index(&chunks).await?;
    pipeline
        .save_index(&settings.index_path)
        .await
        .with_context(|| format!("failed to save index {}", settings.index_path.display()))?;

    println!(
        "Indexed {} chunks from {} files into {}",
        chunks.len(),
        files.len(),
        settings.index_path.display()
    );
    Ok(())
}

fn step(n: usize, title: &str) {
    println!("\n[{n}/5] {title}");
    println!("{}", rule('-'));
}

pub async fn demo(settings: &Settings) -> Result<()> {
    println!("{}", rule('='));
    println!("RAG SYSTEM DEMONSTRATION");
    println!("{}", rule('='));

    step(1, "Initializing RAG System...");
    let mut pipeline = settings.pipeline()?;
    let embedder = pipeline.index().embedder().clone();
    println!("Embedding model: {} ({} dimensions)", embedder.model_name(), embedder.dimensions());

    if pipeline.index().has_saved(&settings.index_path).await {
        step(2, "Loading existing vector index...");
    } else {
        step(2, "Building vector index from documents...");
        write_samples(&settings.documents_dir).await?;
    }
    open_index(&mut pipeline, settings).await?;

    step(3, "Testing Document Retrieval...");
    for (i, query) in DEMO_QUERIES.iter().enumerate() {
        println!("\nQuery {}: {query}", i + 1);
        let retrieved = pipeline.retrieve(query).await?;
        println!("  Retrieved {} relevant chunks:", retrieved.len());
        println!("{}", retrieved_summary(&retrieved, 80));
    }

    step(4, "Full RAG Query (Retrieval + Generation)...");
    println!("\nQuestion: {DEMO_QUESTION}\n");
    let result = pipeline.query(DEMO_QUESTION).await?;
    for (i, doc) in result.retrieved_documents.iter().enumerate() {
        println!("\n  [{}] Relevance Score: {:.4}", i + 1, doc.score);
        println!("      Source: {}", source_name(&doc.chunk.source));
        println!("      Content: {}", preview(&doc.chunk.text, 150));
    }
    println!("\n{}", rule('-'));
    println!("Generated Answer:");
    println!("{}", rule('-'));
    println!("{}", result.answer);

    step(5, "How RAG Works:");
    let config = pipeline.config();
    print_explanation(config.chunk_size, config.chunk_overlap, &settings.index_path);

    println!("{}", rule('='));
    println!("Demo completed!");
    println!("{}", rule('='));
    Ok(())
}

fn print_explanation(chunk_size: usize, chunk_overlap: usize, index_path: &Path) {
    println!(
        "
1. DOCUMENT PROCESSING:
   - Documents are split into overlapping chunks
     ({chunk_size} chars with {chunk_overlap} char overlap)
   - Each chunk preserves context while keeping sizes manageable

2. EMBEDDING GENERATION:
   - Each chunk is converted to a fixed-size vector by the embedding model
   - Similar meanings produce similar vectors

3. VECTOR STORAGE:
   - Normalized embeddings are kept in the vector index and saved to {}
   - Search compares the query against every chunk by cosine similarity

4. QUERY PROCESSING:
   - Your question is embedded into the same vector space
   - The top-k most similar chunks are retrieved

5. ANSWER GENERATION:
   - Retrieved chunks are given to the language model as context
   - The answer is grounded in those chunks, which reduces hallucinations
",
        index_path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_are_case_insensitive() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("q"));
        assert!(!is_exit_command("question"));
        assert!(!is_exit_command(""));
    }
}
