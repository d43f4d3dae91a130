//! Test doubles for the hosted model traits.

use crate::embedding::Embedder;
use crate::error::{Result, TmsError};
use crate::llm::CompletionModel;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Retry policy with millisecond delays.
pub(crate) fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

type EmbedFn = dyn Fn(&str) -> Vec<f32> + Send + Sync;

/// Embedder that maps text to vectors with a closure.
pub(crate) struct StubEmbedder {
    embed_fn: Box<EmbedFn>,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub(crate) fn new(embed_fn: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            embed_fn: Box::new(embed_fn),
            failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn constant(vector: Vec<f32>) -> Self {
        Self::new(move |_| vector.clone())
    }

    /// Fail the first `n` calls with a rate limit error.
    pub(crate) fn failing_first(self, n: usize) -> Self {
        self.failures.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TmsError::RateLimited("429 Too Many Requests".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.check_failure()?;
        Ok((self.embed_fn)(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.check_failure()?;
        Ok(texts.iter().map(|t| (self.embed_fn)(t)).collect())
    }

    fn dimensions(&self) -> usize {
        (self.embed_fn)("").len()
    }
}

/// Completion model that replays queued responses.
///
/// Once the queue is empty every call answers `"ok"`.
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
