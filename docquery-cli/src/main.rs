//! docquery CLI - ingest documents and ask questions about them
//!
//! # Commands
//!
//! ```bash
//! # Chunk a document and show results
//! docquery chunk report.pdf
//!
//! # Index documents into Postgres, then ask
//! docquery ingest report.pdf notes.docx
//! docquery ask "What is retrieval augmented generation?"
//!
//! # Answer every question listed in a document
//! docquery ask-file questions.docx
//!
//! # Demo: index a file in memory and search it (no database)
//! docquery demo report.pdf "who wrote it"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docquery_lib::{
    chunk::{chunk_text, SentenceChunker, DEFAULT_MAX_CHUNK_CHARS},
    embed::{BgeEmbedder, Embedder},
    extract::{extract_file, DocumentExtractor},
    question::extract_questions,
    search::{SearchEngine, DEFAULT_TOP_K},
    store::{IngestOutcome, MemoryStore, PgVectorStore, SearchResult, StoreConfig, VectorStore},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docquery")]
#[command(about = "Ask questions about PDF and DOCX documents")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Embedding model options shared by every command.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Directory for downloaded embedding model files
    #[arg(long, global = true, env = "DOCQUERY_MODEL_CACHE")]
    model_cache: Option<PathBuf>,

    /// Embed questions exactly like chunks, without the retrieval prefix
    #[arg(long, global = true)]
    no_query_prefix: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document and print the chunks
    Chunk {
        /// Input file (.pdf or .docx)
        input: PathBuf,

        /// Maximum chunk length in characters
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
        max_chars: usize,
    },

    /// Print the questions found in a document
    Questions {
        /// Input file (.pdf or .docx)
        input: PathBuf,
    },

    /// Index documents into the Postgres store
    Ingest {
        /// Input files (.pdf or .docx); the file name is the source id
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Maximum chunk length in characters
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
        max_chars: usize,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Answer a question from the Postgres store
    Ask {
        /// Question to answer
        question: String,

        /// Number of results to return
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Answer every question found in a document
    AskFile {
        /// Input file (.pdf or .docx) containing questions, one per line
        input: PathBuf,

        /// Number of results per question
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// List indexed documents
    Sources {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Demo: index a file in memory and search it (all in one command)
    Demo {
        /// Input file to index
        input: PathBuf,

        /// Query to search for
        query: String,

        /// Number of results to return
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,

        /// Maximum chunk length in characters
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
        max_chars: usize,
    },
}

/// Postgres connection settings
#[derive(Args, Debug)]
struct StoreArgs {
    /// Postgres host
    #[arg(long, env = "DOCQUERY_PG_HOST", default_value = "localhost")]
    pg_host: String,

    /// Postgres port
    #[arg(long, env = "DOCQUERY_PG_PORT", default_value_t = 5432)]
    pg_port: u16,

    /// Database name
    #[arg(long, env = "DOCQUERY_PG_DB", default_value = "postgres")]
    pg_db: String,

    /// Database user
    #[arg(long, env = "DOCQUERY_PG_USER", default_value = "postgres")]
    pg_user: String,

    /// Database password
    #[arg(long, env = "DOCQUERY_PG_PASSWORD", default_value = "", hide_env_values = true)]
    pg_password: String,

    /// Schema holding the chunk table
    #[arg(long, env = "DOCQUERY_PG_SCHEMA", default_value = "public")]
    pg_schema: String,

    /// Chunk table name
    #[arg(long, env = "DOCQUERY_PG_TABLE", default_value = "document_chunks")]
    pg_table: String,

    /// Create the vector extension/table automatically if missing
    #[arg(
        long,
        env = "DOCQUERY_PG_PREPARE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pg_prepare: bool,
}

impl From<StoreArgs> for StoreConfig {
    fn from(args: StoreArgs) -> Self {
        StoreConfig {
            host: args.pg_host,
            port: args.pg_port,
            db: args.pg_db,
            user: args.pg_user,
            password: args.pg_password,
            schema: args.pg_schema,
            table: args.pg_table,
            prepare: args.pg_prepare,
        }
    }
}

fn load_text(path: &Path) -> Result<String> {
    extract_file(&DocumentExtractor, path)
        .with_context(|| format!("failed to extract text from {}", path.display()))
}

/// Source id for a document: its file name.
fn source_id_for(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

fn load_embedder(model: &ModelArgs) -> Result<BgeEmbedder> {
    println!("Loading BGE model (first run downloads ~440MB)...");
    let embedder = match &model.model_cache {
        Some(dir) => BgeEmbedder::with_cache_dir(dir),
        None => BgeEmbedder::new(),
    };
    Ok(embedder
        .context("failed to load embedding model")?
        .with_query_prefix(!model.no_query_prefix))
}

fn pg_engine(
    model: &ModelArgs,
    store: StoreArgs,
    max_chars: usize,
) -> Result<SearchEngine<BgeEmbedder, PgVectorStore>> {
    let embedder = load_embedder(model)?;
    let config = StoreConfig::from(store);
    let store = PgVectorStore::connect(&config, embedder.dimension())
        .context("failed to open pgvector store")?;
    Ok(SearchEngine::with_chunker(
        embedder,
        store,
        SentenceChunker::new(max_chars),
    ))
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results: nothing has been indexed yet.\n");
        return;
    }
    for (i, result) in results.iter().enumerate() {
        println!(
            "#{} (distance: {:.4}) {} [chunk {}]",
            i + 1,
            result.distance,
            result.chunk.source_id,
            result.chunk.ordinal
        );
        println!("---");
        let preview: String = result.chunk.text.chars().take(300).collect();
        let ellipsis = if result.chunk.text.chars().count() > 300 { "..." } else { "" };
        println!("{preview}{ellipsis}\n");
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let model = &cli.model;

    match cli.command {
        Commands::Chunk { input, max_chars } => {
            let text = load_text(&input)?;
            let chunks = chunk_text(&text, max_chars);

            println!("Chunked '{}' into {} chunks:\n", input.display(), chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                println!("--- Chunk {} ({} chars) ---", i, chunk.chars().count());
                println!("{chunk}\n");
            }
        }

        Commands::Questions { input } => {
            let text = load_text(&input)?;
            let questions = extract_questions(&text);
            println!("Found {} questions in '{}':", questions.len(), input.display());
            for question in &questions {
                println!("  {question}");
            }
        }

        Commands::Ingest {
            inputs,
            max_chars,
            store,
        } => {
            let mut engine = pg_engine(model, store, max_chars)?;
            for input in &inputs {
                let source_id = source_id_for(input)?;
                if engine.store().is_indexed(&source_id)? {
                    println!("{source_id}: already indexed");
                    continue;
                }
                let text = load_text(input)?;
                let outcome = engine
                    .ingest(&source_id, &text)
                    .with_context(|| format!("failed to ingest {}", input.display()))?;
                match outcome {
                    IngestOutcome::Indexed(report) => println!(
                        "{source_id}: indexed {} chunks (skipped {})",
                        report.inserted, report.skipped
                    ),
                    IngestOutcome::AlreadyIndexed => println!("{source_id}: already indexed"),
                }
            }
            info!(files = inputs.len(), "ingestion finished");
        }

        Commands::Ask { question, k, store } => {
            let mut engine = pg_engine(model, store, DEFAULT_MAX_CHUNK_CHARS)?;
            println!("\nSearching: '{question}' (k={k})\n");
            let results = engine.answer(&question, k).context("failed to answer question")?;
            print_results(&results);
        }

        Commands::AskFile { input, k, store } => {
            let text = load_text(&input)?;
            let questions = extract_questions(&text);
            if questions.is_empty() {
                println!("No questions found in '{}'.", input.display());
                return Ok(());
            }

            let mut engine = pg_engine(model, store, DEFAULT_MAX_CHUNK_CHARS)?;
            let answers = engine
                .answer_all(&questions, k)
                .context("failed to answer questions")?;
            for (question, results) in &answers {
                println!("\n=== {question} ===\n");
                print_results(results);
            }
        }

        Commands::Sources { store } => {
            let config = StoreConfig::from(store);
            // listing needs no embeddings; any positive dimension opens the table
            let store = PgVectorStore::connect(
                &StoreConfig {
                    prepare: false,
                    ..config
                },
                1,
            )
            .context("failed to open pgvector store")?;
            let documents = store.documents()?;
            if documents.is_empty() {
                println!("No documents indexed.");
            }
            for doc in documents {
                println!("{} ({} chunks)", doc.source_id, doc.ordinal_count);
            }
        }

        Commands::Demo {
            input,
            query,
            k,
            max_chars,
        } => {
            // Load and chunk document
            println!("Loading '{}'...", input.display());
            let text = load_text(&input)?;
            let source_id = source_id_for(&input)?;

            let embedder = load_embedder(model)?;
            let store = MemoryStore::new(embedder.dimension());
            let mut engine =
                SearchEngine::with_chunker(embedder, store, SentenceChunker::new(max_chars));

            let outcome = engine.ingest(&source_id, &text)?;
            println!("Done! Indexed {} chunks", outcome.inserted());

            println!("\nSearching: '{query}' (k={k})");
            let results = engine.answer(&query, k)?;

            println!("\n=== Results ===\n");
            print_results(&results);
        }
    }

    Ok(())
}
