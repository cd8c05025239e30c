use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::chunk::{Chunk, EmbeddedChunk, SourceDocument};
use crate::embed::Embedding;
use crate::store::{
    by_distance, cosine_distance, validate_batch, validate_vector, IngestOutcome, InsertReport,
    SearchResult, VectorStore,
};
use crate::{Error, Result};

/// In-memory vector store for development and testing.
///
/// Uses brute-force cosine distance search. Suitable for small datasets
/// (< 10k chunks). Rows are kept in insertion order, which is also the
/// tie-break order for equal distances.
pub struct MemoryStore {
    dimension: usize,
    rows: RwLock<Rows>,
}

#[derive(Default)]
struct Rows {
    chunks: Vec<Chunk>,
    /// `(text, ordinal, source_id)` of every stored chunk
    keys: HashSet<(String, usize, String)>,
    documents: Vec<SourceDocument>,
    /// source id -> position in `documents`
    by_source: HashMap<String, usize>,
}

impl Rows {
    fn insert(&mut self, source_id: &str, chunks: &[EmbeddedChunk]) -> InsertReport {
        let mut report = InsertReport::default();
        for chunk in chunks {
            let key = (chunk.text.clone(), chunk.ordinal, source_id.to_string());
            if !self.keys.insert(key) {
                report.skipped += 1;
                continue;
            }

            let doc = *self.by_source.entry(source_id.to_string()).or_insert_with(|| {
                self.documents.push(SourceDocument {
                    source_id: source_id.to_string(),
                    ordinal_count: 0,
                });
                self.documents.len() - 1
            });
            self.documents[doc].ordinal_count += 1;

            self.chunks.push(chunk.clone().into_chunk(source_id));
            report.inserted += 1;
        }
        report
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store for vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: RwLock::new(Rows::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Rows>> {
        self.rows
            .read()
            .map_err(|_| Error::StorageUnavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Rows>> {
        self.rows
            .write()
            .map_err(|_| Error::StorageUnavailable("memory store lock poisoned".to_string()))
    }
}

impl VectorStore for MemoryStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_indexed(&self, source_id: &str) -> Result<bool> {
        Ok(self.read()?.by_source.contains_key(source_id))
    }

    fn insert_chunks(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<InsertReport> {
        validate_batch(source_id, chunks, self.dimension)?;

        let report = self.write()?.insert(source_id, chunks);
        if report.skipped > 0 {
            warn!(source_id, skipped = report.skipped, "skipped duplicate chunks");
        }
        debug!(source_id, inserted = report.inserted, "inserted chunks");
        Ok(report)
    }

    fn index_document(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<IngestOutcome> {
        validate_batch(source_id, chunks, self.dimension)?;

        // hold the write lock across the check so a racing caller sees our rows
        let mut rows = self.write()?;
        if rows.by_source.contains_key(source_id) {
            return Ok(IngestOutcome::AlreadyIndexed);
        }
        Ok(IngestOutcome::Indexed(rows.insert(source_id, chunks)))
    }

    fn nearest(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        validate_vector(query, self.dimension)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self.read()?;
        let mut results: Vec<SearchResult> = rows
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                distance: cosine_distance(query, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        // stable: equal distances keep insertion order
        results.sort_by(by_distance);
        results.truncate(k);
        Ok(results)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.read()?.chunks.len())
    }

    fn documents(&self) -> Result<Vec<SourceDocument>> {
        Ok(self.read()?.documents.clone())
    }
}
