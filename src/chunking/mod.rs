//! Text chunking for breaking documents into retrievable segments.

mod recursive;

pub use recursive::RecursiveSplitter;

use crate::config::ChunkingSettings;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Separators tried in order: paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A chunk of document text with its position metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Text content of this chunk.
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub filename: String,
    /// Position of the chunk in the document (0-based).
    pub chunk_index: u32,
    pub total_chunks: u32,
}

/// Configuration for chunking. Sizes are in characters.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            ..Self::default()
        }
    }
}

/// Split a document's pages into chunks tagged with document metadata.
///
/// Each page is split on its own, so no chunk spans a page boundary.
/// Chunk indices run across the whole document.
pub fn chunk_document(
    splitter: &RecursiveSplitter,
    pages: &[String],
    document_id: &str,
    filename: &str,
) -> Vec<ContentChunk> {
    let pieces: Vec<String> = pages
        .iter()
        .flat_map(|page| splitter.split_text(page))
        .collect();
    let total_chunks = pieces.len() as u32;

    let chunks: Vec<ContentChunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(idx, content)| ContentChunk {
            content,
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                filename: filename.to_string(),
                chunk_index: idx as u32,
                total_chunks,
            },
        })
        .collect();

    info!("Created {} chunks from document {}", chunks.len(), filename);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_metadata() {
        let splitter = RecursiveSplitter::new(ChunkingConfig {
            chunk_size: 50,
            chunk_overlap: 0,
            ..ChunkingConfig::default()
        });
        let text = "Pickup: 2024-03-01 08:00 at Dallas, TX\n\nDelivery: 2024-03-03 14:00 at Denver, CO";

        let chunks = chunk_document(&splitter, &[text.to_string()], "doc-1", "bol.txt");

        assert_eq!(chunks.len(), 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i as u32);
            assert_eq!(chunk.metadata.total_chunks, 2);
            assert_eq!(chunk.metadata.document_id, "doc-1");
            assert_eq!(chunk.metadata.filename, "bol.txt");
        }
        assert!(chunks[0].content.starts_with("Pickup"));
        assert!(chunks[1].content.starts_with("Delivery"));
    }

    #[test]
    fn test_chunks_do_not_span_pages() {
        let splitter = RecursiveSplitter::new(ChunkingConfig {
            chunk_size: 200,
            chunk_overlap: 20,
            ..ChunkingConfig::default()
        });
        let pages = vec![
            "Shipper: Acme Corp".to_string(),
            "Consignee: Widgets LLC".to_string(),
        ];

        let chunks = chunk_document(&splitter, &pages, "doc-2", "bol.pdf");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Shipper: Acme Corp");
        assert_eq!(chunks[1].content, "Consignee: Widgets LLC");
        assert_eq!(chunks[1].metadata.chunk_index, 1);
        assert_eq!(chunks[1].metadata.total_chunks, 2);
    }

    #[test]
    fn test_config_from_settings() {
        let config = ChunkingConfig::from(&ChunkingSettings {
            chunk_size: 512,
            chunk_overlap: 64,
        });
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 64);
        assert_eq!(config.separators.len(), 5);
    }
}
