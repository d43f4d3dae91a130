//! In-memory vector store implementation.
//!
//! Useful for testing and short-lived servers.

use super::{rank_by_distance, ChunkRecord, DocumentRecord, SearchResult, VectorStore};
use crate::error::{Result, TmsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    documents: HashMap<String, DocumentRecord>,
    chunks: HashMap<String, Vec<ChunkRecord>>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| TmsError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| TmsError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn register_document(&self, record: &DocumentRecord) -> Result<()> {
        let mut inner = self.write()?;
        inner.documents.insert(record.document_id.clone(), record.clone());
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.read()?.documents.get(document_id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let mut documents: Vec<DocumentRecord> = self.read()?.documents.values().cloned().collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    async fn upsert_batch(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let mut inner = self.write()?;
        for chunk in chunks {
            let entries = inner.chunks.entry(chunk.document_id.clone()).or_default();
            match entries.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => entries.push(chunk.clone()),
            }
        }
        Ok(chunks.len())
    }

    async fn search(
        &self,
        document_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.read()?;
        let chunks = inner.chunks.get(document_id).cloned().unwrap_or_default();
        Ok(rank_by_distance(chunks, query_embedding, limit))
    }

    async fn get_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        let mut chunks = self.read()?.chunks.get(document_id).cloned().unwrap_or_default();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let mut inner = self.write()?;
        inner.documents.remove(document_id);
        Ok(inner.chunks.remove(document_id).map(|c| c.len()).unwrap_or(0))
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.chunks.values().map(Vec::len).sum())
    }
}
