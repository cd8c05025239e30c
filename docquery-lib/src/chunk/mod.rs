//! Document chunking
//!
//! Extracted text is split into sentence-aligned chunks of bounded size.
//! Each chunk is embedded and stored on its own, so the chunk size trades
//! retrieval precision against context per hit.
//!
//! # Implementing a Chunker
//!
//! ```ignore
//! use docquery_lib::chunk::Chunker;
//!
//! struct MyChunker { /* ... */ }
//!
//! impl Chunker for MyChunker {
//!     fn chunk(&self, text: &str) -> Vec<String> {
//!         // Your chunking logic here
//!         todo!()
//!     }
//!
//!     fn name(&self) -> &str {
//!         "mine"
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::embed::Embedding;

/// Default upper bound on chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 500;

/// A stored chunk: its text, where it came from, and its embedding.
///
/// `(text, ordinal, source_id)` is the natural key of a chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of this chunk
    pub text: String,
    /// Source document identifier (e.g. the uploaded file name)
    pub source_id: String,
    /// Position within the source document (0-indexed)
    pub ordinal: usize,
    /// The vector representation of `text`
    pub embedding: Embedding,
}

/// A chunk that has been embedded but not yet assigned to a source.
///
/// This is the unit handed to a [`VectorStore`](crate::store::VectorStore)
/// when indexing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub ordinal: usize,
    pub text: String,
    pub embedding: Embedding,
}

impl EmbeddedChunk {
    /// Tag this chunk with its source document.
    pub fn into_chunk(self, source_id: &str) -> Chunk {
        Chunk {
            text: self.text,
            source_id: source_id.to_string(),
            ordinal: self.ordinal,
            embedding: self.embedding,
        }
    }
}

/// An indexed source document and how many chunks it produced.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SourceDocument {
    pub source_id: String,
    pub ordinal_count: usize,
}

/// Trait for document chunking strategies
///
/// Chunkers are pure: the same text always yields the same chunks.
pub trait Chunker: Send + Sync {
    /// Split text into chunks
    ///
    /// # Returns
    /// Chunk texts in document order; empty input yields no chunks
    fn chunk(&self, text: &str) -> Vec<String>;

    /// Returns the name of this chunking strategy
    fn name(&self) -> &str;
}

mod sentence;

pub use sentence::*;
