//! Pipeline orchestrator for TMS AI.
//!
//! Coordinates the whole process from upload to indexing, and routes
//! questions and extraction requests to the right document.

use crate::chunking::{chunk_document, ChunkingConfig, RecursiveSplitter};
use crate::config::{Prompts, Settings};
use crate::document::{self, DocumentStats};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TmsError};
use crate::extraction::{Extractor, ShipmentData};
use crate::llm::{ChatCompletionModel, CompletionModel};
use crate::rag::{ConfidenceScorer, RagAnswer, RagEngine, Retriever};
use crate::retry::RetryPolicy;
use crate::vector_store::{
    ChunkRecord, DocumentRecord, MemoryVectorStore, SqliteVectorStore, VectorStore,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main orchestrator for the TMS AI pipeline.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    library: DocumentLibrary,
    splitter: RecursiveSplitter,
    rag: RagEngine,
    extractor: Extractor,
    retry: RetryPolicy,
    upload_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator from settings, connecting to the hosted models.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate_values()?;

        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let model: Arc<dyn CompletionModel> = Arc::new(ChatCompletionModel::from_settings(&settings.llm)?);
        let extraction_model: Arc<dyn CompletionModel> =
            Arc::new(ChatCompletionModel::from_settings(&settings.llm)?.with_temperature(0.0));

        info!(
            "Using {} for embeddings and {} for answers",
            settings.embedding.model, settings.llm.model
        );

        let vector_store = open_vector_store(&settings)?;

        Self::build(settings, prompts, embedder, model, extraction_model, vector_store)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn CompletionModel>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        Self::build(settings, prompts, embedder, model.clone(), model, vector_store)
    }

    fn build(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn CompletionModel>,
        extraction_model: Arc<dyn CompletionModel>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let upload_dir = settings.upload_dir();
        std::fs::create_dir_all(&upload_dir)?;

        let retry = RetryPolicy::from(&settings.retry);
        let splitter = RecursiveSplitter::new(ChunkingConfig::from(&settings.chunking));

        let rag = RagEngine::new(
            Retriever::new(embedder.clone(), vector_store.clone()).with_retry(retry),
            model,
        )
        .with_prompts(prompts.clone())
        .with_scorer(ConfidenceScorer::new(settings.confidence.clone()))
        .with_retry(retry)
        .with_top_k(settings.retrieval.top_k);

        let extractor = Extractor::new(
            Retriever::new(embedder.clone(), vector_store.clone()).with_retry(retry),
            extraction_model,
        )
        .with_prompts(prompts)
        .with_retry(retry)
        .with_max_chunks(settings.retrieval.extraction_chunks);

        Ok(Self {
            settings,
            embedder,
            library: DocumentLibrary::new(vector_store.clone()),
            vector_store,
            splitter,
            rag,
            extractor,
            retry,
            upload_dir,
        })
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate, store, chunk, embed and index an uploaded document.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn ingest(&self, filename: &str, data: Vec<u8>) -> Result<UploadResult> {
        let filename = sanitize_filename(filename)?;

        if !document::validate_extension(&filename, &self.settings.upload.allowed_extensions) {
            return Err(TmsError::UnsupportedFileType(format!(
                "{} (allowed: {})",
                filename,
                self.settings.upload.allowed_extensions.join(", ")
            )));
        }

        let max = self.settings.upload.max_file_size;
        if !document::validate_size(data.len(), max) {
            return Err(TmsError::FileTooLarge { size: data.len(), max });
        }

        let document_id = document::generate_document_id();
        let file_path = self.upload_dir.join(format!("{}_{}", document_id, filename));
        tokio::fs::write(&file_path, &data).await?;

        info!("Saved upload {} as {}", filename, document_id);

        match self.index_document(&document_id, &filename, &file_path, data).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Failed to process {}: {}", filename, e);
                if let Err(cleanup) = tokio::fs::remove_file(&file_path).await {
                    warn!("Failed to remove {:?}: {}", file_path, cleanup);
                }
                if let Err(cleanup) = self.vector_store.delete_document(&document_id).await {
                    warn!("Failed to remove partial index for {}: {}", document_id, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn index_document(
        &self,
        document_id: &str,
        filename: &str,
        file_path: &Path,
        data: Vec<u8>,
    ) -> Result<UploadResult> {
        let loaded = document::load_bytes(filename, data).await?;

        let chunks = chunk_document(&self.splitter, &loaded.pages, document_id, filename);
        if chunks.is_empty() {
            return Err(TmsError::DocumentParse {
                filename: filename.to_string(),
                reason: "Document produced no chunks".to_string(),
            });
        }
        let stats = DocumentStats::from_chunks(&chunks);

        info!("Embedding {} chunks...", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .retry
            .run("Document embedding", || self.embedder.embed_batch(&texts))
            .await?;

        if embeddings.len() != chunks.len() {
            return Err(TmsError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                ChunkRecord::new(
                    chunk.metadata.document_id,
                    chunk.metadata.filename,
                    chunk.metadata.chunk_index,
                    chunk.metadata.total_chunks,
                    chunk.content,
                    embedding,
                )
            })
            .collect();

        let indexed = self.vector_store.upsert_batch(&records).await?;
        debug!("Indexed {} chunks", indexed);

        self.vector_store
            .register_document(&DocumentRecord {
                document_id: document_id.to_string(),
                filename: filename.to_string(),
                file_path: file_path.to_string_lossy().to_string(),
                num_chunks: stats.num_chunks as u32,
                total_characters: stats.total_characters as u64,
                uploaded_at: Utc::now(),
            })
            .await?;

        info!(
            "Processed {} into {} chunks ({} characters)",
            filename, stats.num_chunks, stats.total_characters
        );

        Ok(UploadResult {
            document_id: document_id.to_string(),
            filename: filename.to_string(),
            num_chunks: stats.num_chunks,
            stats,
        })
    }

    /// Answer a question about an uploaded document.
    pub async fn ask(&self, document_id: &str, question: &str) -> Result<RagAnswer> {
        self.library.require_document(document_id).await?;
        self.rag.ask(document_id, question).await
    }

    /// Extract shipment data from an uploaded document.
    pub async fn extract(&self, document_id: &str) -> Result<ShipmentData> {
        self.library.require_document(document_id).await?;
        self.extractor.extract(document_id).await
    }

    /// Delete a document, its stored file and its chunks.
    pub async fn delete(&self, document_id: &str) -> Result<usize> {
        self.library.delete(document_id).await
    }

    /// List uploaded documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        self.library.list_documents().await
    }

    /// Look up an uploaded document.
    pub async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        self.library.get_document(document_id).await
    }
}

/// Store-only access to uploaded documents.
///
/// Listing, lookup and deletion never call a hosted model, so this opens
/// without any API keys configured.
#[derive(Clone)]
pub struct DocumentLibrary {
    vector_store: Arc<dyn VectorStore>,
}

impl DocumentLibrary {
    pub fn new(vector_store: Arc<dyn VectorStore>) -> Self {
        Self { vector_store }
    }

    /// Open the configured vector store.
    pub fn open(settings: &Settings) -> Result<Self> {
        settings.validate_values()?;
        Ok(Self::new(open_vector_store(settings)?))
    }

    /// List uploaded documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        self.vector_store.list_documents().await
    }

    /// Look up an uploaded document.
    pub async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        self.vector_store.get_document(document_id).await
    }

    /// Delete a document, its stored file and its chunks.
    #[instrument(skip(self))]
    pub async fn delete(&self, document_id: &str) -> Result<usize> {
        let record = self.require_document(document_id).await?;

        match tokio::fs::remove_file(&record.file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Stored file {} already gone", record.file_path);
            }
            Err(e) => warn!("Failed to remove {}: {}", record.file_path, e),
        }

        let removed = self.vector_store.delete_document(document_id).await?;
        info!("Deleted document {} ({} chunks)", document_id, removed);
        Ok(removed)
    }

    async fn require_document(&self, document_id: &str) -> Result<DocumentRecord> {
        self.vector_store
            .get_document(document_id)
            .await?
            .ok_or_else(|| TmsError::DocumentNotFound(document_id.to_string()))
    }
}

/// Open the vector store named by the settings.
fn open_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(TmsError::Config(format!(
            "Unknown vector store provider: {} (expected sqlite or memory)",
            other
        ))),
    }
}

/// Keep only the final path component of an uploaded filename.
fn sanitize_filename(filename: &str) -> Result<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename).trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(TmsError::InvalidInput(format!("Invalid filename: {:?}", filename)));
    }
    Ok(name.to_string())
}

/// Result of ingesting a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub document_id: String,
    pub filename: String,
    pub num_chunks: usize,
    pub stats: DocumentStats,
}
