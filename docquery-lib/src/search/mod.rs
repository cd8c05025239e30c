//! High-level ingestion and question answering
//!
//! Combines chunker, embedder and store into one API.
//!
//! # Usage
//!
//! ```ignore
//! use docquery_lib::search::SearchEngine;
//!
//! let mut engine = SearchEngine::new(embedder, store);
//! engine.ingest("notes.pdf", &text)?;
//! let results = engine.answer("What is retrieval augmented generation?", 3)?;
//! ```

use tracing::{debug, info, warn};

use crate::chunk::{Chunker, EmbeddedChunk, SentenceChunker};
use crate::embed::{ensure_dimension, Embedder};
use crate::store::{IngestOutcome, InsertReport, SearchResult, VectorStore};
use crate::{Error, Result};

/// Default number of results returned per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Search engine combining chunking, embedding and storage.
pub struct SearchEngine<E: Embedder, S: VectorStore, C: Chunker = SentenceChunker> {
    embedder: E,
    store: S,
    chunker: C,
}

// Constructor for engines with the default sentence chunker
impl<E: Embedder, S: VectorStore> SearchEngine<E, S, SentenceChunker> {
    /// Create a new search engine that chunks at the default size.
    #[must_use]
    pub fn new(embedder: E, store: S) -> Self {
        Self::with_chunker(embedder, store, SentenceChunker::default())
    }
}

impl<E: Embedder, S: VectorStore, C: Chunker> SearchEngine<E, S, C> {
    /// Create a new search engine with a custom chunker.
    #[must_use]
    pub fn with_chunker(embedder: E, store: S, chunker: C) -> Self {
        Self {
            embedder,
            store,
            chunker,
        }
    }

    /// Chunk, embed and store a document's text under `source_id`.
    ///
    /// A source that already has chunks is skipped without embedding
    /// anything; re-ingesting an edited document under the same id is a
    /// no-op. The store performs the final check and the insert as one unit.
    pub fn ingest(&mut self, source_id: &str, text: &str) -> Result<IngestOutcome> {
        if self.store.is_indexed(source_id)? {
            warn!(source_id, "document already indexed, skipping");
            return Ok(IngestOutcome::AlreadyIndexed);
        }

        let texts = self.chunker.chunk(text);
        if texts.is_empty() {
            info!(source_id, "document produced no chunks");
            return Ok(IngestOutcome::Indexed(InsertReport::default()));
        }
        debug!(
            source_id,
            chunks = texts.len(),
            chunker = self.chunker.name(),
            "chunked document"
        );

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_documents(&refs)?;
        if embeddings.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }
        let dimension = self.embedder.dimension();
        for embedding in &embeddings {
            ensure_dimension(embedding, dimension)?;
        }

        let chunks: Vec<EmbeddedChunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(ordinal, (text, embedding))| EmbeddedChunk {
                ordinal,
                text,
                embedding,
            })
            .collect();

        let outcome = self.store.index_document(source_id, &chunks)?;
        match outcome {
            IngestOutcome::Indexed(report) => {
                info!(
                    source_id,
                    inserted = report.inserted,
                    skipped = report.skipped,
                    "indexed document"
                );
            }
            IngestOutcome::AlreadyIndexed => {
                warn!(source_id, "document indexed concurrently, skipping");
            }
        }
        Ok(outcome)
    }

    /// Find the `k` stored chunks closest to `question`.
    ///
    /// Results keep the store's ordering (ascending distance). An empty
    /// store yields an empty result, not an error.
    pub fn answer(&mut self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed_query(question)?;
        let results = self.store.nearest(&query_embedding, k)?;
        debug!(k, hits = results.len(), "answered question");
        Ok(results)
    }

    /// Answer each question in turn, stopping at the first failure.
    pub fn answer_all<Q: AsRef<str>>(
        &mut self,
        questions: &[Q],
        k: usize,
    ) -> Result<Vec<(String, Vec<SearchResult>)>> {
        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            let question = question.as_ref();
            let results = self.answer(question, k)?;
            answers.push((question.to_string(), results));
        }
        info!(questions = answers.len(), "answered question batch");
        Ok(answers)
    }

    /// Returns the number of indexed chunks.
    pub fn len(&self) -> Result<usize> {
        self.store.len()
    }

    /// Returns `true` if no chunks are indexed.
    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }

    /// Returns a reference to the embedder.
    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Returns a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the chunker.
    #[must_use]
    pub fn chunker(&self) -> &C {
        &self.chunker
    }
}
