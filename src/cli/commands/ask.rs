//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::ConfidenceScorer;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(document_id: &str, question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let scorer = ConfidenceScorer::new(settings.confidence.clone());
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching document...");

    match orchestrator.ask(document_id, question).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.answer);

            let mut display = scorer.display(answer.confidence_score);
            display.category = answer.confidence_category;
            Output::confidence(&display);

            if !answer.passes_guardrails {
                Output::warning("The answer did not pass the confidence guardrails.");
            }

            if !answer.sources.is_empty() {
                Output::header("Sources");
                for (i, source) in answer.sources.iter().enumerate() {
                    Output::source(
                        i + 1,
                        source.metadata.chunk_index,
                        source.similarity_score,
                        &source.content,
                    );
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
