use std::path::Path;

use ragline_cli::{commands, samples::write_samples};
use ragline_core::Settings;

fn settings(root: &Path) -> Settings {
    let vars = [
        ("EMBEDDING_PROVIDER", "hashing".to_string()),
        ("INDEX_PATH", root.join("rag_index").display().to_string()),
        ("DOCUMENTS_DIR", root.join("documents").display().to_string()),
    ];
    Settings::from_lookup(|name| {
        vars.iter().find(|(key, _)| *key == name).map(|(_, value)| value.clone())
    })
    .expect("settings")
}

#[tokio::test]
async fn index_then_ask() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings(dir.path());
    write_samples(&settings.documents_dir).await.expect("samples");

    commands::index(&settings).await.expect("index");
    assert!(dir.path().join("rag_index.index").exists());
    assert!(dir.path().join("rag_index.metadata").exists());

    commands::ask(&settings, "What is crop rotation?").await.expect("ask");
}

#[tokio::test]
async fn index_without_documents_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = commands::index(&settings(dir.path())).await.unwrap_err();
    assert!(err.to_string().contains("no .txt files"), "{err}");
}

#[tokio::test]
async fn ask_without_index_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = commands::ask(&settings(dir.path()), "anything").await.unwrap_err();
    assert!(err.to_string().contains("ragline index"), "{err}");
}

#[tokio::test]
async fn demo_builds_then_reuses_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings(dir.path());

    commands::demo(&settings).await.expect("first demo");
    assert!(dir.path().join("documents").join("crop_farming.txt").exists());
    assert!(dir.path().join("rag_index.index").exists());

    commands::demo(&settings).await.expect("second demo");
}
