//! Text embedding using local models
//!
//! Uses BAAI/bge-base-en-v1.5 via the fastembed crate (ONNX runtime).
//!
//! # Model Details
//!
//! - Dimensions: 768
//! - Max tokens: 512
//!
//! # Usage
//!
//! ```ignore
//! use docquery_lib::embed::{BgeEmbedder, Embedder};
//!
//! let mut embedder = BgeEmbedder::new()?;
//!
//! // Embed chunks (for indexing)
//! let doc_embeddings = embedder.embed_documents(&["First chunk.", "Second chunk."])?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("What is retrieval augmented generation?")?;
//! ```

use crate::{Error, Result};

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
///
/// Implementations must fail with [`Error::EmbeddingUnavailable`] when the
/// model cannot produce a vector. They never substitute a placeholder.
pub trait Embedder: Send + Sync {
    /// Embed multiple documents for indexing
    ///
    /// Returns exactly one embedding per input, in input order.
    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    ///
    /// Note: Some models (like BGE) use different prompts for queries vs documents.
    /// This method handles that distinction.
    fn embed_query(&mut self, text: &str) -> Result<Embedding>;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

/// Check that `embedding` has exactly `expected` components.
pub fn ensure_dimension(embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

mod bge;
pub use bge::*;
