//! SQLite-based vector store implementation.
//!
//! Distances are computed in Rust over the chunks of a single document, which
//! keeps queries cheap since a document rarely has more than a few hundred chunks.

use super::{rank_by_distance, ChunkRecord, DocumentRecord, SearchResult, VectorStore};
use crate::error::{Result, TmsError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        document_id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        file_path TEXT NOT NULL,
        num_chunks INTEGER NOT NULL,
        total_characters INTEGER NOT NULL,
        uploaded_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        filename TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        total_chunks INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);
"#;

const CHUNK_COLUMNS: &str =
    "id, document_id, filename, chunk_index, total_chunks, content, embedding, indexed_at";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TmsError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let indexed_at: String = row.get(7)?;

        Ok(ChunkRecord {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            document_id: row.get(1)?,
            filename: row.get(2)?,
            chunk_index: row.get(3)?,
            total_chunks: row.get(4)?,
            content: row.get(5)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: Self::parse_timestamp(&indexed_at),
        })
    }

    fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
        let total_characters: i64 = row.get(4)?;
        let uploaded_at: String = row.get(5)?;

        Ok(DocumentRecord {
            document_id: row.get(0)?,
            filename: row.get(1)?,
            file_path: row.get(2)?,
            num_chunks: row.get(3)?,
            total_characters: total_characters.max(0) as u64,
            uploaded_at: Self::parse_timestamp(&uploaded_at),
        })
    }

    fn load_chunks(conn: &Connection, document_id: &str) -> Result<Vec<ChunkRecord>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE document_id = ?1 ORDER BY chunk_index",
            CHUNK_COLUMNS
        ))?;

        let chunks = stmt
            .query_map(params![document_id], Self::chunk_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, record), fields(document_id = %record.document_id))]
    async fn register_document(&self, record: &DocumentRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO documents
            (document_id, filename, file_path, num_chunks, total_characters, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.document_id,
                record.filename,
                record.file_path,
                record.num_chunks,
                record.total_characters as i64,
                record.uploaded_at.to_rfc3339(),
            ],
        )?;

        debug!("Registered document {}", record.document_id);
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                r#"
                SELECT document_id, filename, file_path, num_chunks, total_characters, uploaded_at
                FROM documents WHERE document_id = ?1
                "#,
                params![document_id],
                Self::document_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT document_id, filename, file_path, num_chunks, total_characters, uploaded_at
            FROM documents
            ORDER BY uploaded_at DESC
            "#,
        )?;

        let documents = stmt
            .query_map([], Self::document_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(documents)
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_batch(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO chunks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    CHUNK_COLUMNS
                ),
                params![
                    chunk.id.to_string(),
                    chunk.document_id,
                    chunk.filename,
                    chunk.chunk_index,
                    chunk.total_chunks,
                    chunk.content,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        document_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;
        let chunks = Self::load_chunks(&conn, document_id)?;
        let results = rank_by_distance(chunks, query_embedding, limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        let conn = self.lock()?;
        Self::load_chunks(&conn, document_id)
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![document_id])?;
        tx.execute("DELETE FROM documents WHERE document_id = ?1", params![document_id])?;
        tx.commit()?;

        info!("Deleted {} chunks for document {}", deleted, document_id);
        Ok(deleted)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
