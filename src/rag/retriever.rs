//! Retrieval of the chunks most relevant to a query.

use super::RetrievedChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Embeds queries and searches a single document's chunks.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    retry: RetryPolicy,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy for query embeddings.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retrieve the `top_k` chunks of `document_id` closest to `query`.
    #[instrument(skip(self, query))]
    pub async fn retrieve(
        &self,
        document_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_embedding = self
            .retry
            .run("Query embedding", || self.embedder.embed(query))
            .await?;

        let results = self
            .vector_store
            .search(document_id, &query_embedding, top_k)
            .await?;

        debug!("Retrieved {} chunks for document {}", results.len(), document_id);
        Ok(results.into_iter().map(RetrievedChunk::from).collect())
    }
}
