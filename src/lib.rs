//! TMS AI - Logistics Document Question Answering
//!
//! Upload logistics documents (rate confirmations, bills of lading, load
//! tenders), ask questions about them in natural language and extract
//! structured shipment data.
//!
//! # Overview
//!
//! TMS AI allows you to:
//! - Upload PDF, DOCX and TXT documents and index them for retrieval
//! - Ask questions and get grounded answers with sources and a confidence score
//! - Refuse to answer when the retrieved context does not support an answer
//! - Extract shipment fields (shipper, consignee, rate, ...) as JSON
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `document` - Text extraction and upload validation
//! - `chunking` - Recursive character splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `llm` - Completion models
//! - `rag` - Retrieval, confidence scoring and guardrails
//! - `extraction` - Structured shipment extraction
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tms_ai::config::Settings;
//! use tms_ai::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let data = std::fs::read("rate_confirmation.pdf")?;
//!     let upload = orchestrator.ingest("rate_confirmation.pdf", data).await?;
//!
//!     let answer = orchestrator.ask(&upload.document_id, "What is the rate?").await?;
//!     println!("{} ({})", answer.answer, answer.confidence_category);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retry;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TmsError};
