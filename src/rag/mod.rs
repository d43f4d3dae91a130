//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Answers questions about a single uploaded document, scores how well the
//! retrieved context supports the answer and refuses to answer when it does not.

mod confidence;
mod engine;
mod retriever;

pub use confidence::{
    ConfidenceAssessment, ConfidenceCategory, ConfidenceDisplay, ConfidenceScorer,
    GuardrailDecision,
};
pub use engine::{RagEngine, NO_CONTEXT_ANSWER, REFUSAL_ANSWER};
pub use retriever::Retriever;

use crate::chunking::ChunkMetadata;
use crate::vector_store::SearchResult;
use serde::{Deserialize, Serialize};

/// A chunk retrieved for a question.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub content: String,
    /// `1 - distance`, higher is more relevant.
    pub similarity: f32,
    pub metadata: ChunkMetadata,
}

impl From<SearchResult> for RetrievedChunk {
    fn from(result: SearchResult) -> Self {
        let chunk = result.chunk;
        Self {
            content: chunk.content,
            similarity: 1.0 - result.distance,
            metadata: ChunkMetadata {
                document_id: chunk.document_id,
                filename: chunk.filename,
                chunk_index: chunk.chunk_index,
                total_chunks: chunk.total_chunks,
            },
        }
    }
}

/// A source chunk returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    pub similarity_score: f32,
    pub metadata: ChunkMetadata,
}

/// An answer with its confidence and supporting sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub confidence_score: f32,
    pub confidence_category: ConfidenceCategory,
    pub sources: Vec<Source>,
    pub passes_guardrails: bool,
}

/// Format retrieved chunks as prompt context.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Source {}]:\n{}", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::ChunkRecord;

    fn retrieved(content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            similarity: 0.9,
            metadata: ChunkMetadata {
                document_id: "d".into(),
                filename: "f.txt".into(),
                chunk_index: 0,
                total_chunks: 1,
            },
        }
    }

    #[test]
    fn test_format_context() {
        let context = format_context(&[retrieved("Carrier: Swift"), retrieved("Rate: $950")]);
        assert_eq!(
            context,
            "[Source 1]:\nCarrier: Swift\n\n---\n\n[Source 2]:\nRate: $950"
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_retrieved_chunk_from_search_result() {
        let chunk = ChunkRecord::new("doc".into(), "bol.pdf".into(), 2, 5, "Weight: 42,000 lbs".into(), vec![1.0]);
        let retrieved = RetrievedChunk::from(SearchResult { chunk, distance: 0.25 });

        assert!((retrieved.similarity - 0.75).abs() < 1e-6);
        assert_eq!(retrieved.metadata.chunk_index, 2);
        assert_eq!(retrieved.metadata.total_chunks, 5);
        assert_eq!(retrieved.metadata.filename, "bol.pdf");
    }
}
