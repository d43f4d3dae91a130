//! Prompt templates for TMS AI.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Sentence the answer prompt tells the model to use when the context has no answer.
pub const NOT_FOUND_SENTINEL: &str = "The information is not found in the document";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub extraction: ExtractionPrompts,
}

/// Prompts for grounded question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// Template with `{{context}}` and `{{question}}` variables.
    pub answer: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            answer: format!(
                r#"You are a helpful AI assistant for a Transportation Management System (TMS).
Your task is to answer questions about logistics documents accurately and concisely.

IMPORTANT RULES:
1. Answer ONLY based on the provided context below
2. If the context doesn't contain the information, say "{}"
3. Be specific and cite relevant details from the context
4. Keep answers concise and factual
5. Do not make up or infer information not present in the context

Context from document:
{{{{context}}}}

Question: {{{{question}}}}

Answer:"#,
                NOT_FOUND_SENTINEL
            ),
        }
    }
}

/// Prompts for structured shipment extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    /// Template with a `{{document_text}}` variable.
    pub shipment: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            shipment: r#"You are an expert at extracting structured data from logistics documents.

Your task is to extract the following shipment information from the provided document text.
Return ONLY a JSON object with these exact fields. Use null for any field not found in the document.

Required fields:
- shipment_id: Shipment or order ID
- shipper: Name or company shipping the goods
- consignee: Name or company receiving the goods
- pickup_datetime: Scheduled pickup date and time
- delivery_datetime: Scheduled or expected delivery date and time
- equipment_type: Type of equipment (e.g., "53' Dry Van", "Flatbed", "Reefer")
- mode: Transportation mode (e.g., "LTL", "FTL", "Parcel")
- rate: Transportation rate or cost
- currency: Currency for the rate (e.g., "USD", "CAD")
- weight: Total weight of shipment
- carrier_name: Name of the carrier company

IMPORTANT RULES:
1. Extract information EXACTLY as it appears in the document
2. Return valid JSON format only, no additional text
3. Use null for missing fields, not empty strings
4. Preserve original formatting for dates, numbers, and names
5. Do not make assumptions or infer missing data

Document Text:
{{document_text}}

JSON Output:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults with files from `custom_dir` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in one pass over the template, so text
    /// inserted for one variable is never scanned for further placeholders.
    /// Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }
}
