use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use docquery_lib::chunk::{EmbeddedChunk, SentenceChunker, SourceDocument};
use docquery_lib::embed::{Embedder, Embedding};
use docquery_lib::question::extract_questions;
use docquery_lib::search::SearchEngine;
use docquery_lib::store::{IngestOutcome, InsertReport, MemoryStore, SearchResult, VectorStore};
use docquery_lib::{Error, Result};

const CAT: &str = "The cat sat on the mat.";
const DOGS: &str = "Dogs bark at night.";
const DOC1: &str = "The cat sat on the mat. Dogs bark at night.";

/// Deterministic embedder: known texts map to fixed vectors, anything else
/// to a vector derived from its bytes.
struct TableEmbedder {
    table: HashMap<String, Embedding>,
    available: bool,
}

impl TableEmbedder {
    fn new() -> Self {
        let table = HashMap::from([
            (CAT.to_string(), vec![1.0, 0.0, 0.0]),
            (DOGS.to_string(), vec![0.6, 0.8, 0.0]),
        ]);
        Self { table, available: true }
    }

    fn unavailable() -> Self {
        Self { table: HashMap::new(), available: false }
    }

    fn vector(&self, text: &str) -> Result<Embedding> {
        if !self.available {
            return Err(Error::EmbeddingUnavailable("model offline".to_string()));
        }
        Ok(self.table.get(text).cloned().unwrap_or_else(|| {
            let sum: u32 = text.bytes().map(u32::from).sum();
            vec![0.1, 0.1, 1.0 + (sum % 7) as f32]
        }))
    }
}

impl Embedder for TableEmbedder {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.vector(t)).collect()
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        self.vector(text)
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "table"
    }
}

/// Counts calls into the wrapped embedder.
struct CountingEmbedder {
    inner: TableEmbedder,
    calls: usize,
}

impl Embedder for CountingEmbedder {
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.calls += 1;
        self.inner.embed_documents(texts)
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        self.calls += 1;
        self.inner.embed_query(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Store whose database is unreachable once a write or search starts.
struct DownStore;

fn down() -> Error {
    Error::StorageUnavailable("connection refused".to_string())
}

impl VectorStore for DownStore {
    fn dimension(&self) -> usize {
        3
    }

    fn is_indexed(&self, _source_id: &str) -> Result<bool> {
        Ok(false)
    }

    fn insert_chunks(&self, _source_id: &str, _chunks: &[EmbeddedChunk]) -> Result<InsertReport> {
        Err(down())
    }

    fn index_document(&self, _source_id: &str, _chunks: &[EmbeddedChunk]) -> Result<IngestOutcome> {
        Err(down())
    }

    fn nearest(&self, _query: &Embedding, _k: usize) -> Result<Vec<SearchResult>> {
        Err(down())
    }

    fn len(&self) -> Result<usize> {
        Err(down())
    }

    fn documents(&self) -> Result<Vec<SourceDocument>> {
        Err(down())
    }
}

fn engine() -> SearchEngine<TableEmbedder, MemoryStore> {
    SearchEngine::with_chunker(
        TableEmbedder::new(),
        MemoryStore::new(3),
        SentenceChunker::new(30),
    )
}

#[test]
fn end_to_end_query_matches_first_chunk() {
    let mut engine = engine();
    let outcome = engine.ingest("doc1", DOC1).unwrap();
    assert_eq!(outcome.inserted(), 2);

    // querying with chunk 1's own text reproduces its embedding
    let results = engine.answer(CAT, 3).unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].chunk.text, CAT);
    assert_eq!(results[0].chunk.source_id, "doc1");
    assert_eq!(results[0].chunk.ordinal, 0);
    assert!(results[0].distance.abs() < 1e-6);

    assert_eq!(results[1].chunk.text, DOGS);
    assert_eq!(results[1].chunk.ordinal, 1);
    assert!((results[1].distance - 0.4).abs() < 1e-5);
}

#[test]
fn ingesting_twice_is_a_no_op() {
    let mut engine = engine();
    engine.ingest("doc1", DOC1).unwrap();
    let before = engine.answer(CAT, 10).unwrap();

    let second = engine.ingest("doc1", DOC1).unwrap();
    assert_eq!(second, IngestOutcome::AlreadyIndexed);

    let after = engine.answer(CAT, 10).unwrap();
    assert_eq!(before, after);
    assert_eq!(engine.len().unwrap(), 2);
}

#[test]
fn edited_document_under_same_id_is_skipped() {
    let mut engine = engine();
    engine.ingest("doc1", DOC1).unwrap();

    let outcome = engine
        .ingest("doc1", "Completely new content. With more sentences.")
        .unwrap();
    assert_eq!(outcome, IngestOutcome::AlreadyIndexed);
    assert_eq!(engine.store().documents().unwrap()[0].ordinal_count, 2);
}

#[test]
fn empty_store_answers_with_no_results() {
    let mut engine = engine();
    let results = engine.answer("anything", 3).unwrap();
    assert!(results.is_empty());
}

#[test]
fn zero_k_answers_with_no_results() {
    let mut engine = engine();
    engine.ingest("doc1", DOC1).unwrap();
    assert!(engine.answer(CAT, 0).unwrap().is_empty());
}

#[test]
fn embedding_failure_propagates_and_writes_nothing() {
    let mut engine = SearchEngine::new(TableEmbedder::unavailable(), MemoryStore::new(3));

    let err = engine.ingest("doc1", DOC1).unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    assert!(err.is_retryable());
    assert!(engine.is_empty().unwrap());
    assert!(!engine.store().is_indexed("doc1").unwrap());

    let err = engine.answer("anything", 3).unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
}

#[test]
fn storage_failure_propagates_from_ingest_and_answer() {
    let embedder = CountingEmbedder { inner: TableEmbedder::new(), calls: 0 };
    let mut engine = SearchEngine::new(embedder, DownStore);

    let err = engine.ingest("doc1", DOC1).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert!(err.is_retryable());
    // one batch for the whole document
    assert_eq!(engine.embedder().calls, 1);

    let err = engine.answer(CAT, 3).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert_eq!(engine.embedder().calls, 2);

    let err = engine.answer_all(&["Where did the cat sit?"], 3).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
}

#[test]
fn non_finite_embedding_is_rejected_before_storage() {
    let mut embedder = TableEmbedder::new();
    embedder.table.insert(CAT.to_string(), vec![f32::NAN, 0.0, 0.0]);
    let mut engine =
        SearchEngine::with_chunker(embedder, MemoryStore::new(3), SentenceChunker::new(30));

    let err = engine.ingest("doc1", DOC1).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(engine.is_empty().unwrap());
}

#[test]
fn embedder_dimension_mismatch_is_rejected() {
    // store expects 4 components, embedder produces 3
    let mut engine = SearchEngine::new(TableEmbedder::new(), MemoryStore::new(4));
    let err = engine.ingest("doc1", DOC1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
    assert!(engine.is_empty().unwrap());
}

#[test]
fn questions_seed_batch_answers() {
    let mut engine = engine();
    engine.ingest("doc1", DOC1).unwrap();

    let sheet = "Quiz\nWhere did the cat sit?\nNot a question.\nDo dogs bark?";
    let questions = extract_questions(sheet);
    assert_eq!(questions, vec!["Where did the cat sit?", "Do dogs bark?"]);

    let answers = engine.answer_all(&questions, 1).unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0].0, "Where did the cat sit?");
    assert_eq!(answers[1].1.len(), 1);
}

#[test]
fn concurrent_same_source_indexes_once() {
    let store = Arc::new(MemoryStore::new(3));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let chunks = vec![
                    EmbeddedChunk { ordinal: 0, text: CAT.into(), embedding: vec![1.0, 0.0, 0.0] },
                    EmbeddedChunk { ordinal: 1, text: DOGS.into(), embedding: vec![0.6, 0.8, 0.0] },
                ];
                barrier.wait();
                store.index_document("doc1", &chunks).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<IngestOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let indexed = outcomes
        .iter()
        .filter(|o| matches!(o, IngestOutcome::Indexed(_)))
        .count();

    assert_eq!(indexed, 1);
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn concurrent_engines_share_one_store() {
    let store = Arc::new(MemoryStore::new(3));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut engine = SearchEngine::with_chunker(
                    TableEmbedder::new(),
                    store,
                    SentenceChunker::new(30),
                );
                engine.ingest(&format!("doc{i}"), DOC1).unwrap();
                engine.ingest("shared", DOC1).unwrap()
            })
        })
        .collect();

    let shared_indexed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| matches!(o, IngestOutcome::Indexed(_)))
        .count();

    assert_eq!(shared_indexed, 1);
    // four private documents plus the shared one, two chunks each
    assert_eq!(store.len().unwrap(), 10);
    assert_eq!(store.documents().unwrap().len(), 5);
}
