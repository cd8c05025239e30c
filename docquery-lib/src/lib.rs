//! docquery - document question answering by vector similarity
//!
//! # Architecture
//!
//! ```text
//! Document -> Extract -> Chunker -> Embedder -> Store
//!                                                 |
//! Question -> Embedder -> nearest <---------------+
//!                            |
//!                         Results
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docquery_lib::{embed::BgeEmbedder, search::SearchEngine, store::MemoryStore};
//!
//! let embedder = BgeEmbedder::new()?;
//! let store = MemoryStore::new(768);
//! let mut engine = SearchEngine::new(embedder, store);
//!
//! // Index a document
//! engine.ingest("notes.pdf", &text)?;
//!
//! // Search
//! let results = engine.answer("What is retrieval augmented generation?", 3)?;
//! ```

pub mod chunk;
pub mod embed;
pub mod error;
pub mod extract;
pub mod question;
pub mod search;
pub mod store;

pub use error::{Error, Result};
