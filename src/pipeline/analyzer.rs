//! Stage 2: blueprint analysis.
//!
//! One generative call turns the extracted text plus project context into a
//! structured analysis. A non-JSON response is kept as-is (`Raw`): the
//! later stages tolerate unstructured analysis, so losing structure here is
//! not an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::extraction::{ExtractedContent, ExtractionMeta};
use super::parse::{parse_llm_json, LlmJson};
use super::{prompts, PipelineError};
use crate::services::{GenerateRequest, TextGenerator};

/// Structured analysis fields, as requested from the model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredAnalysis {
    pub blueprint_types: Vec<String>,
    pub scope: Option<Value>,
    pub structural_elements: Option<Value>,
    pub mep_systems: Option<Value>,
    pub finishes: Option<Value>,
    pub site_work: Option<Value>,
    pub estimated_value: Option<f64>,
}

/// Structured vs raw analysis payload. Downstream stages pattern-match on
/// this instead of sniffing fields.
pub type AnalysisPayload = LlmJson<StructuredAnalysis>;

/// Output of the analyzer stage.
#[derive(Debug, Clone)]
pub struct BlueprintAnalysis {
    /// Never empty; backfilled from a keyword scan, `["general"]` at minimum.
    pub blueprint_types: Vec<String>,
    pub payload: AnalysisPayload,
    /// Raw model response, kept for prompt grounding in later stages.
    pub raw_content: String,
    /// Extraction metadata carried through for the validator.
    pub extraction: ExtractionMeta,
}

impl BlueprintAnalysis {
    /// Whether the analysis carries structural-element data (used by the
    /// coverage enhancer's demolition check).
    pub fn has_structural_elements(&self) -> bool {
        matches!(
            &self.payload,
            LlmJson::Structured(s) if s.structural_elements.as_ref().is_some_and(|v| !v.is_null())
        )
    }

    /// Estimated project value, if the model supplied one.
    pub fn estimated_value(&self) -> Option<f64> {
        match &self.payload {
            LlmJson::Structured(s) => s.estimated_value,
            LlmJson::Raw(_) => None,
        }
    }
}

/// Stage 2: single-prompt analysis with deterministic type backfill.
pub struct BlueprintAnalyzer {
    model: Arc<dyn TextGenerator>,
}

impl BlueprintAnalyzer {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    pub async fn analyze(
        &self,
        content: &ExtractedContent,
        project_context: &Value,
    ) -> Result<BlueprintAnalysis, PipelineError> {
        let prompt = prompts::analysis_prompt(&content.text, project_context);
        let response = self
            .model
            .generate(GenerateRequest::text(&prompt))
            .await
            .map_err(|e| PipelineError::Analysis(e.to_string()))?;

        let payload: AnalysisPayload = parse_llm_json(&response);
        if !payload.is_structured() {
            tracing::debug!("Analysis response was not JSON; keeping raw text");
        }

        let mut blueprint_types = match &payload {
            LlmJson::Structured(s) => s.blueprint_types.clone(),
            LlmJson::Raw(_) => Vec::new(),
        };
        if blueprint_types.is_empty() {
            blueprint_types = detect_blueprint_types(&content.text);
        }

        Ok(BlueprintAnalysis {
            blueprint_types,
            payload,
            raw_content: response,
            extraction: content.meta.clone(),
        })
    }
}

/// Deterministic keyword scan over the extracted text. Case-insensitive
/// substring match; always yields at least `["general"]`.
pub fn detect_blueprint_types(text: &str) -> Vec<String> {
    const TERM_SETS: [(&str, &[&str]); 4] = [
        ("architectural", &["architectural", "floor plan", "elevation", "room"]),
        ("structural", &["structural", "foundation", "framing", "beam", "column"]),
        ("mep", &["mechanical", "electrical", "plumbing", "hvac", "mep"]),
        ("civil", &["civil", "site plan", "grading", "drainage"]),
    ];

    let haystack = text.to_lowercase();
    let mut types: Vec<String> = TERM_SETS
        .iter()
        .filter(|(_, terms)| terms.iter().any(|t| haystack.contains(t)))
        .map(|(tag, _)| tag.to_string())
        .collect();

    if types.is_empty() {
        types.push("general".to_string());
    }
    types
}
