//! Bundled agriculture documents used by `ragline demo` and `ragline chat --samples`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// File name and contents of each sample document.
pub const SAMPLE_DOCUMENTS: [(&str, &str); 3] = [
    ("crop_farming.txt", include_str!("../samples/crop_farming.txt")),
    ("livestock_management.txt", include_str!("../samples/livestock_management.txt")),
    ("sustainable_agriculture.txt", include_str!("../samples/sustainable_agriculture.txt")),
];

/// Write the sample documents into `dir`, creating it if needed.
///
/// Existing files with the same names are overwritten. Returns the written paths.
pub async fn write_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut paths = Vec::with_capacity(SAMPLE_DOCUMENTS.len());
    for (name, contents) in SAMPLE_DOCUMENTS {
        let path = dir.join(name);
        tokio::fs::write(&path, contents.trim())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        paths.push(path);
    }
    Ok(paths)
}
