//! Document loading and upload validation.
//!
//! Extracts plain text from PDF, DOCX and TXT uploads.

use crate::chunking::ContentChunk;
use crate::error::{Result, TmsError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Detect the format from a filename's extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        match file_extension(filename).as_deref() {
            Some("pdf") => Ok(DocumentFormat::Pdf),
            Some("docx") => Ok(DocumentFormat::Docx),
            Some("txt") => Ok(DocumentFormat::Text),
            Some(other) => Err(TmsError::UnsupportedFileType(format!(".{}", other))),
            None => Err(TmsError::UnsupportedFileType(filename.to_string())),
        }
    }
}

/// Text extracted from an uploaded document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub filename: String,
    pub format: DocumentFormat,
    /// Page texts in order. PDFs yield one entry per non-blank page; other
    /// formats yield a single entry.
    pub pages: Vec<String>,
}

impl LoadedDocument {
    /// Full document text with pages separated by blank lines.
    pub fn text(&self) -> String {
        self.pages.join("\n\n")
    }
}

/// Statistics about a processed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub num_chunks: usize,
    pub total_characters: usize,
    pub avg_chunk_size: usize,
}

impl DocumentStats {
    pub fn from_chunks(chunks: &[ContentChunk]) -> Self {
        let total_characters: usize = chunks.iter().map(|c| c.content.chars().count()).sum();
        Self {
            num_chunks: chunks.len(),
            total_characters,
            avg_chunk_size: total_characters.checked_div(chunks.len()).unwrap_or(0),
        }
    }
}

/// Lowercased extension after the last dot, if any.
fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Check the filename's extension against the allowed list (without dots).
pub fn validate_extension(filename: &str, allowed: &[String]) -> bool {
    match file_extension(filename) {
        Some(ext) => allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// Check an upload size against the limit.
pub fn validate_size(size: usize, max_size: usize) -> bool {
    size <= max_size
}

/// Generate a unique document ID.
pub fn generate_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Load a document from disk.
#[instrument]
pub async fn load_document(path: &Path) -> Result<LoadedDocument> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| TmsError::InvalidInput(format!("Not a file: {}", path.display())))?;

    let data = tokio::fs::read(path).await?;
    load_bytes(&filename, data).await
}

/// Extract text from an uploaded document's bytes.
pub async fn load_bytes(filename: &str, data: Vec<u8>) -> Result<LoadedDocument> {
    let format = DocumentFormat::from_filename(filename)?;

    let pages = match format {
        DocumentFormat::Text => vec![String::from_utf8_lossy(&data).into_owned()],
        DocumentFormat::Pdf => {
            let name = filename.to_string();
            // pdf-extract can panic on malformed input, so it runs on its own task.
            tokio::task::spawn_blocking(move || extract_pdf(&name, &data))
                .await
                .map_err(|e| TmsError::DocumentParse {
                    filename: filename.to_string(),
                    reason: format!("PDF extraction aborted: {}", e),
                })??
        }
        DocumentFormat::Docx => vec![extract_docx(filename, &data)?],
    };

    let pages: Vec<String> = pages
        .into_iter()
        .map(|page| page.replace('\0', ""))
        .filter(|page| !page.trim().is_empty())
        .collect();

    if pages.is_empty() {
        return Err(TmsError::DocumentParse {
            filename: filename.to_string(),
            reason: "No text content could be extracted".to_string(),
        });
    }

    let characters: usize = pages.iter().map(|p| p.chars().count()).sum();
    info!(
        "Loaded {} ({} pages, {} characters)",
        filename,
        pages.len(),
        characters
    );

    Ok(LoadedDocument {
        filename: filename.to_string(),
        format,
        pages,
    })
}

fn extract_pdf(filename: &str, data: &[u8]) -> Result<Vec<String>> {
    let pages =
        pdf_extract::extract_text_from_mem_by_pages(data).map_err(|e| TmsError::DocumentParse {
            filename: filename.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Extracted {} pages from PDF", pages.len());
    Ok(pages.iter().map(|page| clean_pdf_text(page)).collect())
}

/// Trim each line and collapse the blank runs left by the layout engine
/// into single paragraph breaks.
fn clean_pdf_text(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && matches!(lines.last(), None | Some(&"")) {
            continue;
        }
        lines.push(line);
    }
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

fn extract_docx(filename: &str, data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data).map_err(|e| TmsError::DocumentParse {
        filename: filename.to_string(),
        reason: e.to_string(),
    })?;

    let mut content = String::new();

    // Body paragraphs only; text inside tables is not extracted.
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            content.push_str(&t.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["pdf".to_string(), "docx".to_string(), "txt".to_string()]
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("rate_con.pdf", &allowed()));
        assert!(validate_extension("BOL.TXT", &allowed()));
        assert!(validate_extension("archive.tar.docx", &allowed()));
        assert!(!validate_extension("invoice.xlsx", &allowed()));
        assert!(!validate_extension("README", &allowed()));
        assert!(!validate_extension("trailing.", &allowed()));
    }

    #[test]
    fn test_validate_size() {
        assert!(validate_size(10, 10));
        assert!(!validate_size(11, 10));
    }

    #[test]
    fn test_document_ids_are_unique() {
        assert_ne!(generate_document_id(), generate_document_id());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_filename("a.PDF").unwrap(), DocumentFormat::Pdf);
        assert!(matches!(
            DocumentFormat::from_filename("a.csv"),
            Err(TmsError::UnsupportedFileType(_))
        ));
    }

    #[tokio::test]
    async fn test_load_text_document() {
        let doc = load_bytes("load.txt", b"Carrier: Swift\nRate: $1,200".to_vec())
            .await
            .unwrap();
        assert_eq!(doc.format, DocumentFormat::Text);
        assert_eq!(doc.pages, vec!["Carrier: Swift\nRate: $1,200".to_string()]);
        assert_eq!(doc.text(), "Carrier: Swift\nRate: $1,200");
    }

    #[tokio::test]
    async fn test_blank_document_is_rejected() {
        let err = load_bytes("empty.txt", b"  \n\n ".to_vec()).await.unwrap_err();
        assert!(matches!(err, TmsError::DocumentParse { .. }));
    }

    #[test]
    fn test_clean_pdf_text() {
        let raw = "  Rate Confirmation  \n\n\n\n\nCarrier: Swift \n";
        assert_eq!(clean_pdf_text(raw), "Rate Confirmation\n\nCarrier: Swift");
        assert_eq!(clean_pdf_text("\n\nLoad ID: 7\n\n"), "Load ID: 7");
    }

    #[test]
    fn test_pages_joined_for_full_text() {
        let doc = LoadedDocument {
            filename: "bol.pdf".into(),
            format: DocumentFormat::Pdf,
            pages: vec!["Page one".into(), "Page two".into()],
        };
        assert_eq!(doc.text(), "Page one\n\nPage two");
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_a_parse_error() {
        let err = load_bytes("broken.pdf", b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, TmsError::DocumentParse { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_a_parse_error() {
        let err = load_bytes("broken.docx", b"not a zip archive".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, TmsError::DocumentParse { .. }));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tender.txt");
        std::fs::write(&path, "Equipment: 53' Dry Van").unwrap();

        let doc = load_document(&path).await.unwrap();
        assert_eq!(doc.filename, "tender.txt");
        assert!(doc.text().contains("Dry Van"));
    }

    #[test]
    fn test_stats() {
        use crate::chunking::ChunkMetadata;

        let meta = ChunkMetadata {
            document_id: "d".into(),
            filename: "f.txt".into(),
            chunk_index: 0,
            total_chunks: 2,
        };
        let chunks = vec![
            ContentChunk { content: "abcd".into(), metadata: meta.clone() },
            ContentChunk { content: "ef".into(), metadata: meta },
        ];

        let stats = DocumentStats::from_chunks(&chunks);
        assert_eq!(stats.num_chunks, 2);
        assert_eq!(stats.total_characters, 6);
        assert_eq!(stats.avg_chunk_size, 3);
        assert_eq!(DocumentStats::from_chunks(&[]).avg_chunk_size, 0);
    }
}
