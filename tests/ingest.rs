mod common;

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use common::{corpus, doc_chunk, BrokenEmbedder, KeywordEmbedder};
use doc_portal::ingest::{IndexState, IngestOptions, IngestionManager};
use doc_portal::ledger::Ledger;
use doc_portal::store;
use doc_portal::Error;
use doc_portal_core::models::Chunk;

fn open(dir: &std::path::Path, embedder: Arc<KeywordEmbedder>) -> IngestionManager {
    IngestionManager::open(dir, embedder, IngestOptions { batch_size: 2 }).unwrap()
}

#[test]
fn test_create_then_reingest_adds_nothing() {
    let tmp = TempDir::new().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let mut m = open(tmp.path(), embedder.clone());

    let chunks = corpus();
    assert_eq!(m.create_or_load(Some(chunks.as_slice())).unwrap().len(), 4);
    assert_eq!(m.state(), IndexState::Loaded);
    assert_eq!(embedder.texts_embedded(), 4);

    let index_before = fs::read(store::index_path(tmp.path())).unwrap();
    let ledger_before = fs::read(store::ledger_path(tmp.path())).unwrap();

    assert_eq!(m.add(&chunks).unwrap(), 0);
    assert_eq!(m.add(&chunks).unwrap(), 0);

    assert_eq!(embedder.texts_embedded(), 4);
    assert_eq!(fs::read(store::index_path(tmp.path())).unwrap(), index_before);
    assert_eq!(fs::read(store::ledger_path(tmp.path())).unwrap(), ledger_before);
    assert_eq!(m.stats().vectors, 4);
    assert_eq!(m.stats().ledger_rows, 4);
}

#[test]
fn test_only_novel_chunks_are_embedded() {
    let tmp = TempDir::new().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let mut m = open(tmp.path(), embedder.clone());
    m.create_or_load(Some(corpus().as_slice())).unwrap();

    let mut batch = corpus();
    batch.push(doc_chunk("ops.txt", 1, "Rollbacks use the previous docker tag."));
    batch.push(Chunk::new("an anonymous note"));
    assert_eq!(m.add(&batch).unwrap(), 2);
    assert_eq!(embedder.texts_embedded(), 6);

    let ledger = Ledger::load(tmp.path()).unwrap();
    assert!(ledger.contains("ops.txt::1"));
    assert!(ledger.contains(&doc_portal_core::fingerprint::content_hash(
        "an anonymous note"
    )));
    assert_eq!(ledger.len(), 6);
}

#[test]
fn test_same_source_row_with_new_text_is_a_duplicate() {
    let tmp = TempDir::new().unwrap();
    let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
    m.create_or_load(Some(corpus().as_slice())).unwrap();

    let edited = doc_chunk("guide.md", 0, "Completely rewritten paragraph.");
    assert_eq!(m.add(&[edited]).unwrap(), 0);
}

#[test]
fn test_state_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
        m.create_or_load(Some(corpus().as_slice())).unwrap();
    }

    let embedder = Arc::new(KeywordEmbedder::default());
    let mut m = open(tmp.path(), embedder.clone());
    assert!(m.exists());
    assert_eq!(m.state(), IndexState::Uninitialized);
    assert_eq!(m.create_or_load(None).unwrap().len(), 4);
    assert_eq!(m.add(&corpus()).unwrap(), 0);
    assert_eq!(embedder.calls(), 0);

    let texts: Vec<String> = m
        .index()
        .unwrap()
        .chunks()
        .map(|c| c.text.clone())
        .collect();
    assert_eq!(texts[2], "Docker images are rebuilt nightly.");
}

#[test]
fn test_second_writer_is_locked_out() {
    let tmp = TempDir::new().unwrap();
    let _first = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
    let second = IngestionManager::open(
        tmp.path(),
        Arc::new(KeywordEmbedder::default()),
        IngestOptions::default(),
    );
    assert!(matches!(second, Err(Error::Locked { .. })));
}

#[test]
fn test_lock_released_on_drop() {
    let tmp = TempDir::new().unwrap();
    drop(open(tmp.path(), Arc::new(KeywordEmbedder::default())));
    open(tmp.path(), Arc::new(KeywordEmbedder::default()));
}

#[test]
fn test_fresh_directory_without_seed_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
    let err = m.create_or_load(None).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(!store::index_path(tmp.path()).exists());
    assert!(!store::ledger_path(tmp.path()).exists());
}

#[test]
fn test_embedding_failure_leaves_disk_untouched() {
    let tmp = TempDir::new().unwrap();
    {
        let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
        m.create_or_load(Some(corpus().as_slice())).unwrap();
    }
    let index_before = fs::read(store::index_path(tmp.path())).unwrap();

    let mut m =
        IngestionManager::open(tmp.path(), Arc::new(BrokenEmbedder), IngestOptions::default())
            .unwrap();
    m.create_or_load(None).unwrap();
    let err = m
        .add(&[doc_chunk("new.md", 0, "fresh content")])
        .unwrap_err();
    assert!(err.is_provider());

    assert_eq!(fs::read(store::index_path(tmp.path())).unwrap(), index_before);
    assert!(!Ledger::load(tmp.path()).unwrap().contains("new.md::0"));
    assert_eq!(m.stats().vectors, 4);
}

#[test]
fn test_corrupt_index_is_reported() {
    let tmp = TempDir::new().unwrap();
    fs::write(store::index_path(tmp.path()), b"garbage").unwrap();
    let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
    assert!(matches!(
        m.create_or_load(None),
        Err(Error::Corrupt { .. })
    ));
}

#[test]
fn test_recreate_over_stale_ledger_reseeds_everything() {
    let tmp = TempDir::new().unwrap();
    {
        let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
        m.create_or_load(Some(corpus().as_slice())).unwrap();
    }
    fs::remove_file(store::index_path(tmp.path())).unwrap();

    let embedder = Arc::new(KeywordEmbedder::default());
    let mut m = open(tmp.path(), embedder.clone());
    assert!(!m.exists());
    assert_eq!(m.ledger().len(), 4);

    let index = m.create_or_load(Some(corpus().as_slice())).unwrap();
    assert_eq!(index.len(), 4);
    assert_eq!(embedder.texts_embedded(), 4);

    let ledger = Ledger::load(tmp.path()).unwrap();
    assert_eq!(m.index().unwrap().len(), ledger.len());
    assert_eq!(m.add(&corpus()).unwrap(), 0);
}

#[test]
fn test_recreate_drops_stale_fingerprints_not_in_seed() {
    let tmp = TempDir::new().unwrap();
    {
        let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
        m.create_or_load(Some(corpus().as_slice())).unwrap();
    }
    fs::remove_file(store::index_path(tmp.path())).unwrap();

    let mut m = open(tmp.path(), Arc::new(KeywordEmbedder::default()));
    let seed = vec![doc_chunk("fresh.md", 0, "A new start.")];
    m.create_or_load(Some(seed.as_slice())).unwrap();

    let ledger = Ledger::load(tmp.path()).unwrap();
    assert_eq!(ledger.len(), 1);
    assert!(ledger.contains("fresh.md::0"));
    assert_eq!(m.add(&corpus()).unwrap(), 4);
    assert_eq!(m.stats().vectors, m.stats().ledger_rows);
}
