use std::fmt;
use std::sync::{Mutex, MutexGuard};

use ::pgvector::Vector;
use postgres::{Client, NoTls, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, EmbeddedChunk, SourceDocument};
use crate::embed::Embedding;
use crate::store::{
    validate_batch, validate_vector, IngestOutcome, InsertReport, SearchResult, VectorStore,
};
use crate::{Error, Result};

/// Connection and layout settings for [`PgVectorStore`].
#[derive(Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
    /// Schema holding the chunk table
    pub schema: String,
    /// Chunk table name
    pub table: String,
    /// Create the extension, table and index on connect if missing
    pub prepare: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            db: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            schema: "public".to_string(),
            table: "document_chunks".to_string(),
            prepare: true,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("prepare", &self.prepare)
            .finish()
    }
}

impl StoreConfig {
    fn pg_config(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.db)
            .user(&self.user);
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

/// Fully-qualified Postgres table name (schema + table).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() {
            return Err(Error::InvalidInput("schema name is required".to_string()));
        }
        if table.trim().is_empty() {
            return Err(Error::InvalidInput("table name is required".to_string()));
        }
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Name of the lookup index on `source_file`.
    pub fn source_index_name(&self) -> String {
        self.index_name("source_file_idx")
    }

    /// Name of the unique index over the chunk key.
    pub fn key_index_name(&self) -> String {
        self.index_name("chunk_key_idx")
    }

    fn index_name(&self, suffix: &str) -> String {
        quote_ident(&format!(
            "{}_{}_{suffix}",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        ))
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

fn sanitize_ident(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

fn create_table_sql(table: &TableName, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            document_text TEXT NOT NULL,
            embedding VECTOR({dims}) NOT NULL,
            source_file TEXT NOT NULL,
            chunk_number INTEGER NOT NULL
        )",
        table.qualified()
    )
}

/// Unique chunk key. The text is indexed through its digest because raw
/// B-tree entries are capped near 2.7 kB and long chunks are kept whole.
const CHUNK_KEY: &str = "md5(document_text), chunk_number, source_file";

fn create_key_index_sql(table: &TableName) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({CHUNK_KEY})",
        table.key_index_name(),
        table.qualified()
    )
}

fn create_source_index_sql(table: &TableName) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (source_file)",
        table.source_index_name(),
        table.qualified()
    )
}

fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (document_text, embedding, source_file, chunk_number) \
            VALUES ($1, $2, $3, $4) \
            ON CONFLICT ({CHUNK_KEY}) DO NOTHING",
        table.qualified()
    )
}

fn exists_sql(table: &TableName) -> String {
    format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE source_file = $1)",
        table.qualified()
    )
}

fn nearest_sql(table: &TableName) -> String {
    format!(
        "SELECT document_text, source_file, chunk_number, embedding, \
            (embedding <=> $1)::REAL AS distance \
            FROM {} ORDER BY distance ASC, id ASC LIMIT $2",
        table.qualified()
    )
}

fn count_sql(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {}", table.qualified())
}

fn documents_sql(table: &TableName) -> String {
    format!(
        "SELECT source_file, COUNT(*) FROM {} GROUP BY source_file ORDER BY MIN(id)",
        table.qualified()
    )
}

fn storage_err(err: postgres::Error) -> Error {
    Error::StorageUnavailable(err.to_string())
}

/// PostgreSQL + pgvector store.
///
/// One table holds every chunk, unique on
/// `(md5(document_text), chunk_number, source_file)`. Each write call runs
/// in a single transaction, so a failed batch leaves no rows behind.
///
/// Writes and reads use separate connections: a query never waits behind an
/// open ingestion transaction.
pub struct PgVectorStore {
    writer: Mutex<Client>,
    reader: Mutex<Client>,
    table: TableName,
    dimension: usize,
}

impl PgVectorStore {
    /// Connect and, if `config.prepare` is set, create the schema objects.
    pub fn connect(config: &StoreConfig, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidInput(
                "embedding dimension must be positive".to_string(),
            ));
        }
        let table = TableName::new(config.schema.clone(), config.table.clone())?;

        let mut writer = open(config)?;
        if config.prepare {
            prepare(&mut writer, &table, dimension)?;
        }
        let reader = open(config)?;
        info!(table = %table.qualified(), dimension, "connected to pgvector store");

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            table,
            dimension,
        })
    }

    /// The table this store reads and writes.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    fn writer(&self) -> Result<MutexGuard<'_, Client>> {
        lock(&self.writer)
    }

    fn reader(&self) -> Result<MutexGuard<'_, Client>> {
        lock(&self.reader)
    }
}

fn open(config: &StoreConfig) -> Result<Client> {
    config.pg_config().connect(NoTls).map_err(|e| {
        Error::StorageUnavailable(format!(
            "failed to connect to Postgres at {}:{}: {e}",
            config.host, config.port
        ))
    })
}

fn lock(client: &Mutex<Client>) -> Result<MutexGuard<'_, Client>> {
    client
        .lock()
        .map_err(|_| Error::StorageUnavailable("connection lock poisoned".to_string()))
}

fn prepare(client: &mut Client, table: &TableName, dims: usize) -> Result<()> {
    client
        .batch_execute("CREATE EXTENSION IF NOT EXISTS vector")
        .map_err(storage_err)?;
    client
        .batch_execute(&create_table_sql(table, dims))
        .map_err(storage_err)?;
    client
        .batch_execute(&create_key_index_sql(table))
        .map_err(storage_err)?;
    client
        .batch_execute(&create_source_index_sql(table))
        .map_err(storage_err)?;
    Ok(())
}

fn insert_rows(
    tx: &mut Transaction<'_>,
    table: &TableName,
    source_id: &str,
    chunks: &[EmbeddedChunk],
) -> Result<InsertReport> {
    let mut report = InsertReport::default();
    if chunks.is_empty() {
        return Ok(report);
    }

    let statement = tx.prepare(&insert_sql(table)).map_err(storage_err)?;
    for chunk in chunks {
        let chunk_number = as_i32(chunk.ordinal)?;
        let vector = Vector::from(chunk.embedding.clone());
        let written = tx
            .execute(&statement, &[&chunk.text, &vector, &source_id, &chunk_number])
            .map_err(|e| {
                Error::StorageUnavailable(format!(
                    "failed to insert chunk {} from {source_id}: {e}",
                    chunk.ordinal
                ))
            })?;
        if written == 0 {
            report.skipped += 1;
        } else {
            report.inserted += 1;
        }
    }
    Ok(report)
}

fn as_i32(ordinal: usize) -> Result<i32> {
    i32::try_from(ordinal)
        .map_err(|_| Error::InvalidInput(format!("chunk ordinal {ordinal} exceeds i32 range")))
}

impl VectorStore for PgVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_indexed(&self, source_id: &str) -> Result<bool> {
        let row = self
            .reader()?
            .query_one(&exists_sql(&self.table), &[&source_id])
            .map_err(storage_err)?;
        Ok(row.get(0))
    }

    fn insert_chunks(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<InsertReport> {
        validate_batch(source_id, chunks, self.dimension)?;

        let mut client = self.writer()?;
        let mut tx = client.transaction().map_err(storage_err)?;
        let report = insert_rows(&mut tx, &self.table, source_id, chunks)?;
        tx.commit().map_err(storage_err)?;

        if report.skipped > 0 {
            warn!(source_id, skipped = report.skipped, "skipped duplicate chunks");
        }
        debug!(source_id, inserted = report.inserted, "inserted chunks");
        Ok(report)
    }

    fn index_document(&self, source_id: &str, chunks: &[EmbeddedChunk]) -> Result<IngestOutcome> {
        validate_batch(source_id, chunks, self.dimension)?;

        let mut client = self.writer()?;
        let mut tx = client.transaction().map_err(storage_err)?;
        // serializes check-then-insert per source across connections
        tx.execute("SELECT pg_advisory_xact_lock(hashtext($1))", &[&source_id])
            .map_err(storage_err)?;

        let exists: bool = tx
            .query_one(&exists_sql(&self.table), &[&source_id])
            .map_err(storage_err)?
            .get(0);
        if exists {
            // dropping the transaction rolls back and releases the lock
            return Ok(IngestOutcome::AlreadyIndexed);
        }

        let report = insert_rows(&mut tx, &self.table, source_id, chunks)?;
        tx.commit().map_err(storage_err)?;
        Ok(IngestOutcome::Indexed(report))
    }

    fn nearest(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>> {
        validate_vector(query, self.dimension)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(k).unwrap_or(i64::MAX);
        let vector = Vector::from(query.clone());
        let rows = self
            .reader()?
            .query(&nearest_sql(&self.table), &[&vector, &limit])
            .map_err(storage_err)?;

        rows.iter()
            .map(|row| {
                let chunk_number: i32 = row.get(2);
                let embedding: Vector = row.get(3);
                Ok(SearchResult {
                    chunk: Chunk {
                        text: row.get(0),
                        source_id: row.get(1),
                        ordinal: usize::try_from(chunk_number).map_err(|_| {
                            Error::StorageUnavailable(format!(
                                "stored chunk_number {chunk_number} is negative"
                            ))
                        })?,
                        embedding: embedding.to_vec(),
                    },
                    distance: row.get(4),
                })
            })
            .collect()
    }

    fn len(&self) -> Result<usize> {
        let row = self
            .reader()?
            .query_one(&count_sql(&self.table), &[])
            .map_err(storage_err)?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as usize)
    }

    fn documents(&self) -> Result<Vec<SourceDocument>> {
        let rows = self
            .reader()?
            .query(&documents_sql(&self.table), &[])
            .map_err(storage_err)?;
        Ok(rows
            .iter()
            .map(|row| {
                let count: i64 = row.get(1);
                SourceDocument {
                    source_id: row.get(0),
                    ordinal_count: count.max(0) as usize,
                }
            })
            .collect())
    }
}
