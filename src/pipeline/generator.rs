//! Stage 3: line item generation.
//!
//! One generative call asks for a JSON array of estimate line items. When the
//! response is not parseable JSON, a text line-scanner recovers what it can;
//! when even that yields nothing, a single review-flag item is emitted so the
//! invocation still produces something actionable. Every path funnels through
//! the same normalization pass.

use std::sync::Arc;

use serde_json::Value;

use super::analyzer::BlueprintAnalysis;
use super::parse::{clamp_confidence, coerce_f64, parse_llm_json, LlmJson};
use super::{prompts, PipelineError};
use crate::domain::estimate::{categories, new_item_id, LineItem};
use crate::services::{GenerateRequest, TextGenerator};

/// Unit tokens the text scanner recognizes in a free-form response line.
const SCANNER_UNIT_TOKENS: [&str; 3] = ["ea", "sq ft", "ln ft"];

/// Stage 3: prompt, parse, recover, normalize.
pub struct LineItemGenerator {
    model: Arc<dyn TextGenerator>,
}

impl LineItemGenerator {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    pub async fn generate(
        &self,
        analysis: &BlueprintAnalysis,
        project_context: &Value,
    ) -> Result<Vec<LineItem>, PipelineError> {
        let prompt = prompts::line_items_prompt(&analysis.raw_content, project_context);
        let response = self
            .model
            .generate(GenerateRequest::text(&prompt))
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        let raw_items = match parse_llm_json::<Vec<Value>>(&response) {
            LlmJson::Structured(items) => items,
            LlmJson::Raw(text) => {
                tracing::warn!("Line item response was not a JSON array; scanning text");
                return Ok(scan_text_response(&text, analysis));
            }
        };

        let items = raw_items
            .iter()
            .map(|raw| normalize_item(raw, analysis))
            .collect::<Vec<_>>();

        if items.is_empty() {
            tracing::warn!("Model returned an empty item array; flagging for review");
            return Ok(vec![review_flag_item(analysis)]);
        }

        Ok(items)
    }
}

/// Normalize one loosely-shaped JSON object into a well-formed line item.
/// Missing or malformed fields get the documented defaults.
fn normalize_item(raw: &Value, analysis: &BlueprintAnalysis) -> LineItem {
    let get_str = |key: &str| -> Option<String> {
        raw.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let quantity = coerce_f64(raw.get("quantity"), 1.0);
    let unit_price = coerce_f64(raw.get("unitPrice"), 0.0);
    let confidence = coerce_f64(raw.get("aiConfidence"), 0.7);
    if quantity.defaulted || unit_price.defaulted {
        tracing::debug!(
            quantity_defaulted = quantity.defaulted,
            unit_price_defaulted = unit_price.defaulted,
            "Substituted defaults while normalizing a generated item"
        );
    }

    let notes = get_str("notes").unwrap_or_else(|| provenance_note(analysis));

    LineItem {
        item_id: new_item_id(),
        name: get_str("name").unwrap_or_else(|| "Unnamed Item".to_string()),
        description: get_str("description").unwrap_or_default(),
        quantity: quantity.value,
        unit: get_str("unit").unwrap_or_else(|| "ea".to_string()),
        category: get_str("category").unwrap_or_else(|| categories::GENERAL.to_string()),
        unit_price: unit_price.value,
        line_total: quantity.value * unit_price.value,
        is_ai_generated: true,
        ai_confidence: clamp_confidence(confidence.value),
        material_database_id: get_str("materialDatabaseId"),
        notes,
    }
}

/// Recovery parser for non-JSON responses: keep lines that look like
/// `name - description` with a recognizable unit of measure somewhere on the
/// line, and price them with placeholders.
fn scan_text_response(text: &str, analysis: &BlueprintAnalysis) -> Vec<LineItem> {
    let items: Vec<LineItem> = text
        .lines()
        .filter_map(|line| {
            let lower = line.to_lowercase();
            let has_unit = SCANNER_UNIT_TOKENS.iter().any(|t| lower.contains(t));
            let hyphen = line.find('-')?;
            if !has_unit {
                return None;
            }

            let name = line[..hyphen].trim().trim_start_matches(['*', '•']).trim();
            let description = line[hyphen + 1..].trim();
            if name.is_empty() {
                return None;
            }

            Some(LineItem::generated(
                name,
                description,
                1.0,
                "ea",
                categories::GENERAL,
                100.0,
                0.6,
                provenance_note(analysis),
            ))
        })
        .collect();

    if items.is_empty() {
        return vec![review_flag_item(analysis)];
    }
    items
}

/// The single item emitted when nothing could be recovered from the response.
fn review_flag_item(analysis: &BlueprintAnalysis) -> LineItem {
    LineItem::generated(
        "Blueprint Analysis Review Required",
        "The generated response could not be parsed into line items; a manual takeoff is required.",
        1.0,
        "ea",
        categories::GENERAL,
        0.0,
        0.3,
        provenance_note(analysis),
    )
}

fn provenance_note(analysis: &BlueprintAnalysis) -> String {
    format!(
        "Generated from {} blueprint analysis",
        analysis.blueprint_types.join("/")
    )
}
