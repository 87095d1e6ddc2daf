//! On-disk format for the in-memory index.
//!
//! An index saved under the name `P` consists of two files:
//!
//! - `P.index` — bincode-encoded vectors
//! - `P.metadata` — JSON with the chunk list, chunking/retrieval settings, the
//!   embedding model name and the SHA-256 of `P.index`
//!
//! Both are written to a temporary sibling and renamed into place, vectors
//! first. The metadata file is the commit record: a crash between the two
//! renames leaves a checksum that no longer matches, and loading fails loudly
//! instead of pairing vectors with the wrong chunks.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, IndexEntry};
use crate::error::{RagError, Result};

/// Version of the metadata layout written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Everything stored alongside the vectors of a saved index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMetadata {
    /// Layout version, see [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Model that produced the vectors.
    pub embedding_model: String,
    /// Vector dimension.
    pub dimension: usize,
    /// Hex SHA-256 of the `.index` file.
    #[serde(default)]
    pub index_sha256: String,
    /// Indexed chunks, positionally aligned with the vectors.
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    /// Chunk size the index was built with.
    pub chunk_size: usize,
    /// Chunk overlap the index was built with.
    pub chunk_overlap: usize,
    /// Retrieval depth the index was built with.
    pub top_k: usize,
}

impl IndexMetadata {
    /// Describe an index built by `embedding_model` with `config`.
    ///
    /// The checksum and chunk list are filled in by [`save_index`].
    pub fn new(embedding_model: impl Into<String>, dimension: usize, config: &RagConfig) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            index_sha256: String::new(),
            chunks: Vec::new(),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            top_k: config.top_k,
        }
    }

    /// The chunking and retrieval settings recorded in this metadata.
    pub fn rag_config(&self) -> RagConfig {
        RagConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.top_k,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VectorBlob {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the vector file for the index named `base`.
pub fn index_file(base: &Path) -> PathBuf {
    with_suffix(base, ".index")
}

/// Path of the metadata file for the index named `base`.
pub fn metadata_file(base: &Path) -> PathBuf {
    with_suffix(base, ".metadata")
}

/// Whether a saved index named `base` appears to exist.
pub fn index_exists(base: &Path) -> bool {
    index_file(base).is_file()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = with_suffix(path, ".tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write `entries` and `metadata` as the index named `base`.
pub async fn save_index(
    base: &Path,
    entries: &[IndexEntry],
    mut metadata: IndexMetadata,
) -> Result<()> {
    let blob = VectorBlob {
        dimension: metadata.dimension,
        vectors: entries.iter().map(|e| e.embedding.clone()).collect(),
    };
    let bytes = bincode::serialize(&blob)
        .map_err(|e| RagError::Persistence(format!("failed to encode vectors: {e}")))?;

    metadata.format_version = FORMAT_VERSION;
    metadata.index_sha256 = sha256_hex(&bytes);
    metadata.chunks = entries.iter().map(|e| e.chunk.clone()).collect();
    let json = serde_json::to_vec_pretty(&metadata)
        .map_err(|e| RagError::Persistence(format!("failed to encode metadata: {e}")))?;

    write_atomically(&index_file(base), &bytes).await?;
    write_atomically(&metadata_file(base), &json).await?;

    debug!(path = %base.display(), entry_count = entries.len(), "saved index");
    Ok(())
}

/// Read the index named `base`, checking it against an embedder of `dimension`.
///
/// The returned metadata has its chunk list moved into the entries.
///
/// # Errors
///
/// Returns [`RagError::Io`] if either file cannot be read and
/// [`RagError::Persistence`] if the files are inconsistent with each other or
/// with `dimension`.
pub async fn load_index(base: &Path, dimension: usize) -> Result<(Vec<IndexEntry>, IndexMetadata)> {
    let json = tokio::fs::read(metadata_file(base)).await?;
    let mut metadata: IndexMetadata = serde_json::from_slice(&json)
        .map_err(|e| RagError::Persistence(format!("invalid metadata file: {e}")))?;
    if metadata.format_version != FORMAT_VERSION {
        return Err(RagError::Persistence(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            metadata.format_version
        )));
    }

    let bytes = tokio::fs::read(index_file(base)).await?;
    if sha256_hex(&bytes) != metadata.index_sha256 {
        return Err(RagError::Persistence(
            "index file does not match its metadata checksum (interrupted save?)".to_string(),
        ));
    }
    let blob: VectorBlob = bincode::deserialize(&bytes)
        .map_err(|e| RagError::Persistence(format!("failed to decode vectors: {e}")))?;

    if blob.dimension != metadata.dimension {
        return Err(RagError::Persistence(format!(
            "vector file dimension {} disagrees with metadata dimension {}",
            blob.dimension, metadata.dimension
        )));
    }
    if blob.dimension != dimension {
        return Err(RagError::DimensionMismatch { expected: dimension, actual: blob.dimension });
    }
    if blob.vectors.len() != metadata.chunks.len() {
        return Err(RagError::Persistence(format!(
            "{} vectors but {} chunks",
            blob.vectors.len(),
            metadata.chunks.len()
        )));
    }
    if let Some(bad) = blob.vectors.iter().find(|v| v.len() != dimension) {
        return Err(RagError::DimensionMismatch { expected: dimension, actual: bad.len() });
    }

    let chunks = std::mem::take(&mut metadata.chunks);
    let entries: Vec<IndexEntry> = chunks
        .into_iter()
        .zip(blob.vectors)
        .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
        .collect();

    if entries.is_empty() {
        warn!(path = %base.display(), "loaded an empty index");
    }
    debug!(path = %base.display(), entry_count = entries.len(), "loaded index");
    Ok((entries, metadata))
}
