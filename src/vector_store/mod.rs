//! Vector store abstraction for TMS AI.
//!
//! Provides a trait-based interface for different vector database backends.
//! Every query is scoped to a single uploaded document.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded document known to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub document_id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Where the uploaded file is kept on disk.
    pub file_path: String,
    pub num_chunks: u32,
    pub total_characters: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// A chunk of document text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Document this chunk belongs to.
    pub document_id: String,
    /// Original filename of the document.
    pub filename: String,
    /// Position of this chunk in the document (0-based).
    pub chunk_index: u32,
    /// Number of chunks the document was split into.
    pub total_chunks: u32,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl ChunkRecord {
    /// Create a new chunk record.
    pub fn new(
        document_id: String,
        filename: String,
        chunk_index: u32,
        total_chunks: u32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            filename,
            chunk_index,
            total_chunks,
            content,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search hit with its distance to the query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: ChunkRecord,
    /// Normalized L2 distance in [0, 1] (lower is closer).
    pub distance: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Register (or replace) an uploaded document.
    async fn register_document(&self, record: &DocumentRecord) -> Result<()>;

    /// Look up a registered document.
    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>>;

    /// List registered documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>>;

    /// Bulk upsert chunks.
    async fn upsert_batch(&self, chunks: &[ChunkRecord]) -> Result<usize>;

    /// Nearest chunks of one document, closest first.
    async fn search(
        &self,
        document_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// All chunks of a document ordered by chunk index.
    async fn get_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>>;

    /// Remove a document and its chunks, returning the number of chunks removed.
    async fn delete_document(&self, document_id: &str) -> Result<usize>;

    /// Get total chunk count across all documents.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Distance reported for vectors that cannot be compared.
pub const MAX_DISTANCE: f32 = 4.0;

/// Squared L2 distance between two vectors after scaling both to unit length.
///
/// Equals `2 - 2 * cos(a, b)`, so it lies in [0, 4]. Empty, zero-length or
/// mismatched vectors are maximally distant.
pub fn normalized_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return MAX_DISTANCE;
    }

    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return MAX_DISTANCE;
    }

    let squared: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x / norm_a - y / norm_b;
            d * d
        })
        .sum();

    squared.clamp(0.0, MAX_DISTANCE)
}

/// Score and rank chunks against a query, keeping the `limit` closest.
pub(crate) fn rank_by_distance(
    chunks: impl IntoIterator<Item = ChunkRecord>,
    query_embedding: &[f32],
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = chunks
        .into_iter()
        .map(|chunk| {
            let distance = normalized_l2_distance(query_embedding, &chunk.embedding);
            SearchResult { chunk, distance }
        })
        .collect();

    results.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_l2_distance() {
        let a = vec![1.0, 0.0, 0.0];
        assert!(normalized_l2_distance(&a, &[2.0, 0.0, 0.0]).abs() < 0.001);
        assert!((normalized_l2_distance(&a, &[0.0, 1.0, 0.0]) - 2.0).abs() < 0.001);
        assert!((normalized_l2_distance(&a, &[-1.0, 0.0, 0.0]) - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_distance_tracks_cosine() {
        // cos = 0.7 gives 2 - 1.4 = 0.6, i.e. similarity 0.4.
        let a = [1.0, 0.0];
        let b = [0.7, 0.51f32.sqrt()];
        assert!((normalized_l2_distance(&a, &b) - 0.6).abs() < 0.001);
    }

    #[test]
    fn test_degenerate_vectors_are_far() {
        assert_eq!(normalized_l2_distance(&[], &[]), MAX_DISTANCE);
        assert_eq!(normalized_l2_distance(&[0.0, 0.0], &[1.0, 0.0]), MAX_DISTANCE);
        assert_eq!(normalized_l2_distance(&[1.0], &[1.0, 0.0]), MAX_DISTANCE);
    }

    #[test]
    fn test_rank_by_distance_orders_and_truncates() {
        let chunks = vec![
            ChunkRecord::new("d".into(), "f.txt".into(), 0, 3, "far".into(), vec![0.0, 1.0]),
            ChunkRecord::new("d".into(), "f.txt".into(), 1, 3, "near".into(), vec![1.0, 0.1]),
            ChunkRecord::new("d".into(), "f.txt".into(), 2, 3, "exact".into(), vec![1.0, 0.0]),
        ];

        let results = rank_by_distance(chunks, &[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "exact");
        assert_eq!(results[1].chunk.content, "near");
    }
}
