//! Structured shipment data extraction.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::CompletionModel;
use crate::rag::Retriever;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Query used to pull the chunks most likely to hold shipment details.
pub const EXTRACTION_QUERY: &str = "shipment carrier consignee shipper pickup delivery rate";

/// Shipment fields extracted from a logistics document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentData {
    pub shipment_id: Option<String>,
    pub shipper: Option<String>,
    pub consignee: Option<String>,
    pub pickup_datetime: Option<String>,
    pub delivery_datetime: Option<String>,
    pub equipment_type: Option<String>,
    pub mode: Option<String>,
    pub rate: Option<String>,
    pub currency: Option<String>,
    pub weight: Option<String>,
    pub carrier_name: Option<String>,
}

impl ShipmentData {
    /// Field names paired with their values, in display order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 11] {
        [
            ("shipment_id", self.shipment_id.as_deref()),
            ("shipper", self.shipper.as_deref()),
            ("consignee", self.consignee.as_deref()),
            ("pickup_datetime", self.pickup_datetime.as_deref()),
            ("delivery_datetime", self.delivery_datetime.as_deref()),
            ("equipment_type", self.equipment_type.as_deref()),
            ("mode", self.mode.as_deref()),
            ("rate", self.rate.as_deref()),
            ("currency", self.currency.as_deref()),
            ("weight", self.weight.as_deref()),
            ("carrier_name", self.carrier_name.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let field = |name: &str| object.get(name).and_then(value_to_string);
        Self {
            shipment_id: field("shipment_id"),
            shipper: field("shipper"),
            consignee: field("consignee"),
            pickup_datetime: field("pickup_datetime"),
            delivery_datetime: field("delivery_datetime"),
            equipment_type: field("equipment_type"),
            mode: field("mode"),
            rate: field("rate"),
            currency: field("currency"),
            weight: field("weight"),
            carrier_name: field("carrier_name"),
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Nested values are kept as compact JSON.
        other => Some(other.to_string()),
    }
}

/// Strip a surrounding Markdown code fence, optionally tagged `json`.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let body = rest.split("```").next().unwrap_or(rest);
    let body = body
        .strip_prefix("json")
        .or_else(|| body.strip_prefix("JSON"))
        .unwrap_or(body);
    body.trim()
}

/// Parse a model reply into shipment data.
///
/// Replies that do not contain a JSON object yield an empty record.
pub fn parse_response(response: &str) -> ShipmentData {
    let text = strip_code_fence(response);

    let parsed = serde_json::from_str::<Value>(text).or_else(|e| {
        // Fall back to the outermost braces when the model wrapped the JSON in prose.
        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&text[start..=end])
            }
            _ => Err(e),
        }
    });

    match parsed {
        Ok(Value::Object(object)) => ShipmentData::from_object(&object),
        Ok(other) => {
            error!("Expected a JSON object, got: {}", other);
            ShipmentData::default()
        }
        Err(e) => {
            error!("Failed to parse JSON ({}): {}", e, text);
            ShipmentData::default()
        }
    }
}

/// Extracts shipment data from an indexed document.
pub struct Extractor {
    retriever: Retriever,
    model: Arc<dyn CompletionModel>,
    prompts: Prompts,
    retry: RetryPolicy,
    max_chunks: usize,
}

impl Extractor {
    pub fn new(retriever: Retriever, model: Arc<dyn CompletionModel>) -> Self {
        Self {
            retriever,
            model,
            prompts: Prompts::default(),
            retry: RetryPolicy::default(),
            max_chunks: 5,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set how many chunks are fed to the model.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks.max(1);
        self
    }

    /// Extract shipment data from a document.
    #[instrument(skip(self))]
    pub async fn extract(&self, document_id: &str) -> Result<ShipmentData> {
        let chunks = self
            .retriever
            .retrieve(document_id, EXTRACTION_QUERY, self.max_chunks)
            .await?;

        let document_text = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        info!("Extracting structured data from document {}", document_id);

        let mut vars = HashMap::new();
        vars.insert("document_text".to_string(), document_text);
        let prompt = Prompts::render(&self.prompts.extraction.shipment, &vars);

        let response = self
            .retry
            .run("Shipment extraction", || self.model.complete(&prompt))
            .await?;

        debug!("Extraction response: {}", response);

        let data = parse_response(&response);
        info!(
            "Extracted {} of 11 shipment fields from document {}",
            data.fields().iter().filter(|(_, v)| v.is_some()).count(),
            document_id
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TmsError;
    use crate::testing::{fast_retry, ScriptedModel, StubEmbedder};
    use crate::vector_store::{ChunkRecord, MemoryVectorStore, VectorStore};

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_fenced_response() {
        let data = parse_response(
            "```json\n{\"shipment_id\": \"LD-53411\", \"carrier_name\": \"Swift\", \"rate\": null}\n```",
        );
        assert_eq!(data.shipment_id.as_deref(), Some("LD-53411"));
        assert_eq!(data.carrier_name.as_deref(), Some("Swift"));
        assert_eq!(data.rate, None);
    }

    #[test]
    fn test_parse_is_lenient() {
        let data = parse_response(
            r#"{"weight": 42000, "rate": 1250.5, "shipper": "", "mode": " FTL ", "broker": "ignored"}"#,
        );
        assert_eq!(data.weight.as_deref(), Some("42000"));
        assert_eq!(data.rate.as_deref(), Some("1250.5"));
        assert_eq!(data.shipper, None);
        assert_eq!(data.mode.as_deref(), Some("FTL"));
    }

    #[test]
    fn test_parse_json_inside_prose() {
        let data = parse_response("Here is the data:\n{\"currency\": \"USD\"}\nLet me know!");
        assert_eq!(data.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_unparseable_response_is_empty() {
        assert!(parse_response("I could not find any shipment details.").is_empty());
        assert!(parse_response("[1, 2, 3]").is_empty());
    }

    async fn extractor(model: Arc<ScriptedModel>) -> Extractor {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert_batch(&[
                ChunkRecord::new("doc".into(), "bol.txt".into(), 0, 2, "Shipper: Acme Corp".into(), vec![1.0, 0.0]),
                ChunkRecord::new("doc".into(), "bol.txt".into(), 1, 2, "Consignee: Widgets LLC".into(), vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let embedder = Arc::new(StubEmbedder::constant(vec![1.0, 0.0]));
        let retriever = Retriever::new(embedder, store).with_retry(fast_retry());
        Extractor::new(retriever, model).with_retry(fast_retry())
    }

    #[tokio::test]
    async fn test_extract() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"{"shipper": "Acme Corp", "consignee": "Widgets LLC"}"#.into(),
        )]));
        let extractor = extractor(model.clone()).await;

        let data = extractor.extract("doc").await.unwrap();

        assert_eq!(data.shipper.as_deref(), Some("Acme Corp"));
        assert_eq!(data.consignee.as_deref(), Some("Widgets LLC"));
        assert_eq!(data.carrier_name, None);

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("Shipper: Acme Corp\n\nConsignee: Widgets LLC"));
    }

    #[tokio::test]
    async fn test_extract_retries_then_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(TmsError::ServiceUnavailable("503".into())),
            Err(TmsError::ServiceUnavailable("503".into())),
            Err(TmsError::ServiceUnavailable("503".into())),
        ]));
        let extractor = extractor(model.clone()).await;

        let err = extractor.extract("doc").await.unwrap_err();
        assert!(matches!(err, TmsError::ServiceUnavailable(_)));
        assert_eq!(model.calls(), 3);
    }
}
