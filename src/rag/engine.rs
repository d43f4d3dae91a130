//! Grounded answer generation with confidence guardrails.

use super::confidence::round3;
use super::{
    format_context, ConfidenceCategory, ConfidenceScorer, GuardrailDecision, RagAnswer,
    RetrievedChunk, Retriever, Source,
};
use crate::config::Prompts;
use crate::error::{Result, TmsError};
use crate::llm::CompletionModel;
use crate::retry::RetryPolicy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer returned when the guardrails reject the retrieved context.
pub const REFUSAL_ANSWER: &str = "I cannot provide a confident answer based on the available context. The information might not be present in the document, or the retrieved content has low relevance to your question.";

/// Answer returned when nothing was retrieved.
pub const NO_CONTEXT_ANSWER: &str = "No relevant information found in the document.";

/// RAG engine for question answering.
pub struct RagEngine {
    retriever: Retriever,
    model: Arc<dyn CompletionModel>,
    scorer: ConfidenceScorer,
    prompts: Prompts,
    retry: RetryPolicy,
    top_k: usize,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(retriever: Retriever, model: Arc<dyn CompletionModel>) -> Self {
        Self {
            retriever,
            model,
            scorer: ConfidenceScorer::default(),
            prompts: Prompts::default(),
            retry: RetryPolicy::default(),
            top_k: 3,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_scorer(mut self, scorer: ConfidenceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Set the retry policy for generation calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Answer a question about one document.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, document_id: &str, question: &str) -> Result<RagAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TmsError::InvalidInput("Question must not be empty".to_string()));
        }

        info!("Processing question for document {}", document_id);

        let chunks = self
            .retriever
            .retrieve(document_id, question, self.top_k)
            .await?;

        if chunks.is_empty() {
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                confidence_score: 0.0,
                confidence_category: ConfidenceCategory::Low,
                sources: Vec::new(),
                passes_guardrails: false,
            });
        }

        let similarities: Vec<f32> = chunks.iter().map(|c| c.similarity).collect();
        let assessment = self.scorer.assess(&similarities);

        let (answer, category, passes_guardrails) = match self.scorer.pre_check(&assessment) {
            GuardrailDecision::Reject(_) => {
                (REFUSAL_ANSWER.to_string(), ConfidenceCategory::Low, false)
            }
            GuardrailDecision::Pass => {
                let answer = self.generate(question, &chunks).await?;
                if self.scorer.post_check(&answer) {
                    (answer, assessment.category, true)
                } else {
                    (answer, ConfidenceCategory::Low, false)
                }
            }
        };

        info!(
            "Answered with confidence {:.3} ({})",
            assessment.confidence, category
        );

        Ok(RagAnswer {
            answer,
            confidence_score: round3(assessment.confidence),
            confidence_category: category,
            sources: chunks.into_iter().map(to_source).collect(),
            passes_guardrails,
        })
    }

    async fn generate(&self, question: &str, chunks: &[RetrievedChunk]) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context(chunks));
        vars.insert("question".to_string(), question.to_string());
        let prompt = Prompts::render(&self.prompts.rag.answer, &vars);

        let answer = self
            .retry
            .run("Answer generation", || self.model.complete(&prompt))
            .await?;

        Ok(answer.trim().to_string())
    }
}

fn to_source(chunk: RetrievedChunk) -> Source {
    Source {
        content: chunk.content,
        similarity_score: round3(chunk.similarity),
        metadata: chunk.metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_retry, ScriptedModel, StubEmbedder};
    use crate::vector_store::{ChunkRecord, MemoryVectorStore, VectorStore};

    async fn store_with_chunks() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert_batch(&[
                ChunkRecord::new("doc".into(), "rc.txt".into(), 0, 2, "Carrier: Swift Transportation".into(), vec![1.0, 0.0]),
                ChunkRecord::new("doc".into(), "rc.txt".into(), 1, 2, "Rate: $1,250.00 USD".into(), vec![1.0, 0.05]),
            ])
            .await
            .unwrap();
        store
    }

    /// Questions about the weather land far from every chunk.
    fn embedder() -> Arc<StubEmbedder> {
        Arc::new(StubEmbedder::new(|text: &str| {
            if text.contains("weather") {
                vec![-1.0, 0.0]
            } else {
                vec![1.0, 0.0]
            }
        }))
    }

    fn engine(store: Arc<MemoryVectorStore>, model: Arc<ScriptedModel>) -> RagEngine {
        let retriever = Retriever::new(embedder(), store).with_retry(fast_retry());
        RagEngine::new(retriever, model).with_retry(fast_retry())
    }

    #[tokio::test]
    async fn test_confident_answer() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("The carrier is Swift Transportation.".into())]));
        let engine = engine(store_with_chunks().await, model.clone());

        let answer = engine.ask("doc", "Who is the carrier?").await.unwrap();

        assert_eq!(answer.answer, "The carrier is Swift Transportation.");
        assert!(answer.passes_guardrails);
        assert_eq!(answer.confidence_category, ConfidenceCategory::High);
        assert!(answer.confidence_score > 0.9);
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].content, "Carrier: Swift Transportation");
        assert_eq!(model.calls(), 1);

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("[Source 1]:\nCarrier: Swift Transportation"));
        assert!(prompt.contains("Question: Who is the carrier?"));
    }

    #[tokio::test]
    async fn test_low_relevance_is_refused_without_calling_model() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = engine(store_with_chunks().await, model.clone());

        let answer = engine.ask("doc", "What will the weather be?").await.unwrap();

        assert_eq!(answer.answer, REFUSAL_ANSWER);
        assert_eq!(answer.confidence_category, ConfidenceCategory::Low);
        assert!(!answer.passes_guardrails);
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_loosely_related_chunks_are_refused() {
        // cos = 0.7 to the question, similarity 1 - (2 - 1.4) = 0.4.
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert_batch(&[
                ChunkRecord::new("doc".into(), "rc.txt".into(), 0, 2, "Equipment: Dry Van".into(), vec![0.7, 0.51f32.sqrt()]),
                ChunkRecord::new("doc".into(), "rc.txt".into(), 1, 2, "Weight: 42,000 lbs".into(), vec![0.7, -(0.51f32.sqrt())]),
            ])
            .await
            .unwrap();
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = engine(store, model.clone());

        let answer = engine.ask("doc", "Who is the carrier?").await.unwrap();

        assert_eq!(answer.answer, REFUSAL_ANSWER);
        assert!(!answer.passes_guardrails);
        assert!((answer.sources[0].similarity_score - 0.4).abs() < 0.002);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_found_answer_is_flagged() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            "The information is not found in the document.".into(),
        )]));
        let engine = engine(store_with_chunks().await, model);

        let answer = engine.ask("doc", "Who is the broker?").await.unwrap();

        assert_eq!(answer.answer, "The information is not found in the document.");
        assert_eq!(answer.confidence_category, ConfidenceCategory::Low);
        assert!(!answer.passes_guardrails);
    }

    #[tokio::test]
    async fn test_rate_limited_generation_is_retried() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(TmsError::RateLimited("429 Too Many Requests".into())),
            Ok("Rate is $1,250.00 USD.".into()),
        ]));
        let engine = engine(store_with_chunks().await, model.clone());

        let answer = engine.ask("doc", "What is the rate?").await.unwrap();

        assert_eq!(answer.answer, "Rate is $1,250.00 USD.");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_generation_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(TmsError::Generation(
            "invalid model".into(),
        ))]));
        let engine = engine(store_with_chunks().await, model.clone());

        let err = engine.ask("doc", "What is the rate?").await.unwrap_err();
        assert!(matches!(err, TmsError::Generation(_)));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_chunks_retrieved() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = engine(Arc::new(MemoryVectorStore::new()), model.clone());

        let answer = engine.ask("missing", "Who is the shipper?").await.unwrap();

        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
        assert_eq!(answer.confidence_score, 0.0);
        assert!(answer.sources.is_empty());
        assert!(!answer.passes_guardrails);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_question_is_invalid() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = engine(store_with_chunks().await, model);

        let err = engine.ask("doc", "   ").await.unwrap_err();
        assert!(matches!(err, TmsError::InvalidInput(_)));
    }
}
