//! Vector storage backends
//!
//! [`MemoryStore`] serves tests and one-shot runs; [`PgVectorStore`] keeps
//! the index in PostgreSQL with the pgvector extension.
//!
//! # Storage Model
//!
//! Each stored row is a [`Chunk`]: text, source id, ordinal and embedding.
//! `(text, ordinal, source_id)` is unique. Rows are only ever added.
//!
//! # Usage
//!
//! ```ignore
//! use docquery_lib::store::{MemoryStore, VectorStore};
//!
//! let store = MemoryStore::new(768);
//!
//! // Index a document's embedded chunks
//! store.index_document("report.pdf", &chunks)?;
//!
//! // Search by vector distance
//! let results = store.nearest(&query_embedding, 3)?;
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, EmbeddedChunk, SourceDocument};
use crate::embed::{ensure_dimension, Embedding};
use crate::{Error, Result};

/// A search result with its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine distance (lower is more similar), in `[0, 2]`
    pub distance: f32,
}

/// Outcome of inserting a batch of chunks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct InsertReport {
    /// Rows newly written
    pub inserted: usize,
    /// Rows skipped because an identical `(text, ordinal, source_id)` exists
    pub skipped: usize,
}

/// Outcome of indexing a whole document.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IngestOutcome {
    /// The document was new and its chunks were written
    Indexed(InsertReport),
    /// Chunks for this source already exist; nothing was written
    AlreadyIndexed,
}

impl IngestOutcome {
    /// Number of rows this ingestion wrote.
    pub fn inserted(&self) -> usize {
        match self {
            IngestOutcome::Indexed(report) => report.inserted,
            IngestOutcome::AlreadyIndexed => 0,
        }
    }
}

/// Trait for vector storage backends
///
/// All methods take `&self`; stores are shared between ingestion and query
/// callers and guard their own state.
pub trait VectorStore: Send + Sync {
    /// Dimension every stored vector must have
    fn dimension(&self) -> usize;

    /// True iff at least one chunk exists for `source_id`
    fn is_indexed(&self, source_id: &str) -> Result<bool>;

    /// Insert chunks for `source_id`, skipping exact duplicates
    ///
    /// The batch is atomic: on error nothing from this call is visible.
    fn insert_chunks(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<InsertReport>;

    /// Insert a document's chunks unless the source is already indexed
    ///
    /// The existence check and the insert happen as one unit, so concurrent
    /// calls for the same source write its rows exactly once.
    fn index_document(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<IngestOutcome>;

    /// Search for the `k` chunks closest to `query`
    ///
    /// # Returns
    /// At most `k` results sorted by ascending distance, ties in insertion order
    fn nearest(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>>;

    /// Get total number of stored chunks
    fn len(&self) -> Result<usize>;

    /// Check if store is empty
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Indexed source documents, in order of first insertion
    fn documents(&self) -> Result<Vec<SourceDocument>>;
}

impl<T: VectorStore + ?Sized> VectorStore for Arc<T> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn is_indexed(&self, source_id: &str) -> Result<bool> {
        (**self).is_indexed(source_id)
    }

    fn insert_chunks(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<InsertReport> {
        (**self).insert_chunks(source_id, chunks)
    }

    fn index_document(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<IngestOutcome> {
        (**self).index_document(source_id, chunks)
    }

    fn nearest(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        (**self).nearest(query, k)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }

    fn documents(&self) -> Result<Vec<SourceDocument>> {
        (**self).documents()
    }
}

/// Validate the inputs of an insert before anything is written.
pub(crate) fn validate_batch(
    source_id: &str,
    chunks: &[EmbeddedChunk],
    dimension: usize,
) -> Result<()> {
    if source_id.trim().is_empty() {
        return Err(Error::InvalidInput("source id must not be empty".to_string()));
    }
    for chunk in chunks {
        validate_vector(&chunk.embedding, dimension)?;
    }
    Ok(())
}

/// Check a stored or query vector: exact dimension and finite components.
pub(crate) fn validate_vector(vector: &[f32], dimension: usize) -> Result<()> {
    ensure_dimension(vector, dimension)?;
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(Error::InvalidInput(format!(
            "vector component {pos} is not finite ({})",
            vector[pos]
        )));
    }
    Ok(())
}

/// Compute cosine distance between two vectors.
///
/// Returns `1 - cos(a, b)`, a value in [0, 2] where 0 means identical
/// direction. A zero-norm vector has distance 1 to everything.
///
/// Accumulates in `f64` so large finite components cannot overflow.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let wide = |x: &f32| f64::from(*x);
    let dot: f64 = a.iter().map(wide).zip(b.iter().map(wide)).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(wide).map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(wide).map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)) as f32
}

/// Ascending distance order; NaN sorts last whatever its sign bit.
pub(crate) fn by_distance(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.distance
        .is_nan()
        .cmp(&b.distance.is_nan())
        .then_with(|| a.distance.total_cmp(&b.distance))
}

mod memory;
mod pg;

pub use self::memory::*;
pub use self::pg::*;
