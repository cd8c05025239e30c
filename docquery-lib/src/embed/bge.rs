use std::borrow::Cow;
use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::debug;

use crate::embed::{ensure_dimension, Embedder, Embedding};
use crate::{Error, Result};

const MODEL_NAME: &str = "BAAI/bge-base-en-v1.5";
const DIMENSION: usize = 768;
const QUERY_PREFIX: &str = "Represent this sentence for searching relevant passages: ";

/// BGE embedder using BAAI/bge-base-en-v1.5.
///
/// Uses fastembed for ONNX-based inference. This model produces 768-dimensional
/// embeddings and supports up to 512 tokens per input.
///
/// Questions get BGE's retrieval instruction prefix by default, so a question
/// that repeats a chunk verbatim lands near that chunk but not at distance 0.
/// [`BgeEmbedder::with_query_prefix`] turns the prefix off, making
/// `embed_query(t)` equal `embed_documents(&[t])[0]`.
pub struct BgeEmbedder {
    model: TextEmbedding,
    query_prefix: bool,
}

impl BgeEmbedder {
    /// Create a new BGE embedder using fastembed's default cache directory.
    ///
    /// Downloads the model on first use (~440MB).
    pub fn new() -> Result<Self> {
        Self::with_options(InitOptions::new(EmbeddingModel::BGEBaseENV15))
    }

    /// Create a new BGE embedder that keeps model files under `cache_dir`.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(
            InitOptions::new(EmbeddingModel::BGEBaseENV15).with_cache_dir(cache_dir.into()),
        )
    }

    fn with_options(opts: InitOptions) -> Result<Self> {
        TextEmbedding::try_new(opts.with_show_download_progress(true))
            .map(|model| Self {
                model,
                query_prefix: true,
            })
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))
    }

    /// Enable or disable the query instruction prefix.
    #[must_use]
    pub fn with_query_prefix(mut self, enabled: bool) -> Self {
        self.query_prefix = enabled;
        self
    }
}

/// Text actually fed to the model for a question.
fn query_input(text: &str, prefixed: bool) -> Cow<'_, str> {
    if prefixed {
        Cow::Owned(format!("{QUERY_PREFIX}{text}"))
    } else {
        Cow::Borrowed(text)
    }
}

impl Embedder for BgeEmbedder {
    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn embed_documents(&mut self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), "embedding documents");
        let embeddings = self
            .model
            .embed(texts, None)
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "model returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        for embedding in &embeddings {
            ensure_dimension(embedding, DIMENSION)?;
        }

        Ok(embeddings)
    }

    fn embed_query(&mut self, text: &str) -> Result<Embedding> {
        let query_text = query_input(text, self.query_prefix);

        let embedding = self
            .model
            .embed(vec![query_text.as_ref()], None)
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::EmbeddingUnavailable("model returned no embeddings".to_string())
            })?;

        ensure_dimension(&embedding, DIMENSION)?;
        Ok(embedding)
    }
}
