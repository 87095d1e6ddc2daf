//! Reading text documents from disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chunking::Chunker;
use crate::document::Chunk;
use crate::error::Result;

/// Load and chunk the given text files.
///
/// Each chunk's `source` is the path as given. Paths that do not exist are
/// logged and skipped; the remaining files are still processed.
///
/// # Errors
///
/// Returns [`RagError::Io`](crate::RagError::Io) if an existing file cannot be
/// read as UTF-8 text.
pub async fn load_documents<P: AsRef<Path>>(
    chunker: &dyn Chunker,
    paths: &[P],
) -> Result<Vec<Chunk>> {
    let mut all_chunks = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "file not found, skipping");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let chunks = chunker.chunk(&path.display().to_string(), &content);
        let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        info!(file = %file_name, chunk_count = chunks.len(), "loaded document");
        all_chunks.extend(chunks);
    }

    Ok(all_chunks)
}

/// List the `*.txt` files directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub async fn text_files_in(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir.as_ref()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
