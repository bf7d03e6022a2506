//! Stage 4: coverage enhancement.
//!
//! Inspects which cost categories the generated items already cover and
//! synthesizes the conventional missing ones. Strictly best-effort: the only
//! fallible step (the demolition generative call) degrades to deterministic
//! fallback items, so this stage can never fail the pipeline.
//!
//! The checks run in a fixed order because the contingency items are sized
//! off the running subtotal, which includes everything appended before them.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::analyzer::BlueprintAnalysis;
use super::parse::{clamp_confidence, coerce_f64, parse_llm_json, LlmJson};
use super::prompts;
use crate::domain::estimate::{categories, LineItem};
use crate::services::{GenerateRequest, TextGenerator};

/// Default project value used for overhead ratios when the analysis did not
/// estimate one.
const DEFAULT_ESTIMATED_VALUE: f64 = 100_000.0;

/// Stage 4: best-effort category gap filling.
pub struct CoverageEnhancer {
    model: Arc<dyn TextGenerator>,
}

impl CoverageEnhancer {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    /// Returns a superset of `items`: the input items unchanged (apart from a
    /// line total recompute and notes backfill) plus synthesized gap items.
    pub async fn enhance(
        &self,
        mut items: Vec<LineItem>,
        analysis: &BlueprintAnalysis,
    ) -> Vec<LineItem> {
        let present: HashSet<String> = items.iter().map(|i| i.category.clone()).collect();

        if !present.contains(categories::DEMOLITION) && analysis.has_structural_elements() {
            items.extend(self.demolition_items(analysis).await);
        }

        if !present.contains(categories::SITE_PREPARATION) {
            items.extend(site_preparation_items());
        }

        if !present.contains(categories::PROJECT_OVERHEAD) {
            let value = analysis
                .estimated_value()
                .unwrap_or(DEFAULT_ESTIMATED_VALUE);
            items.extend(overhead_items(value));
        }

        if !present.contains(categories::CONTINGENCIES) {
            let subtotal: f64 = items.iter().map(|i| i.line_total).sum();
            items.extend(contingency_items(subtotal));
        }

        for item in &mut items {
            item.recompute_line_total();
            if item.notes.is_empty() {
                item.notes = format!("Auto-generated {} item", item.category);
            }
        }

        items
    }

    /// Ask the model for demolition items; fall back to a fixed pair on any
    /// failure or unusable response.
    async fn demolition_items(&self, analysis: &BlueprintAnalysis) -> Vec<LineItem> {
        let prompt = prompts::demolition_prompt(&analysis.raw_content);
        let response = match self.model.generate(GenerateRequest::text(&prompt)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Demolition generation failed; using fallback items");
                return fallback_demolition_items();
            }
        };

        let raw_items = match parse_llm_json::<Vec<Value>>(&response) {
            LlmJson::Structured(items) if !items.is_empty() => items,
            _ => {
                tracing::warn!("Demolition response unusable; using fallback items");
                return fallback_demolition_items();
            }
        };

        raw_items
            .iter()
            .map(|raw| {
                let get_str = |key: &str| -> Option<String> {
                    raw.get(key)
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                LineItem::generated(
                    get_str("name").unwrap_or_else(|| "Demolition Work".to_string()),
                    get_str("description").unwrap_or_default(),
                    coerce_f64(raw.get("quantity"), 1.0).value,
                    get_str("unit").unwrap_or_else(|| "ea".to_string()),
                    categories::DEMOLITION,
                    coerce_f64(raw.get("unitPrice"), 0.0).value,
                    clamp_confidence(coerce_f64(raw.get("aiConfidence"), 0.7).value),
                    "",
                )
            })
            .collect()
    }
}

fn fallback_demolition_items() -> Vec<LineItem> {
    vec![
        LineItem::generated(
            "Site Demolition and Clearing",
            "Remove existing structures and clear the construction area",
            1.0,
            "ls",
            categories::DEMOLITION,
            5000.0,
            0.6,
            "",
        ),
        LineItem::generated(
            "Construction Waste Disposal",
            "Haul-off and disposal of demolition debris",
            1.0,
            "ls",
            categories::DEMOLITION,
            2000.0,
            0.6,
            "",
        ),
    ]
}

fn site_preparation_items() -> Vec<LineItem> {
    vec![
        LineItem::generated(
            "Site Preparation and Earthwork",
            "Grading, excavation and soil preparation",
            1.0,
            "ls",
            categories::SITE_PREPARATION,
            8000.0,
            0.7,
            "",
        ),
        LineItem::generated(
            "Temporary Utilities",
            "Temporary power and water during construction",
            1.0,
            "ls",
            categories::SITE_PREPARATION,
            3000.0,
            0.7,
            "",
        ),
    ]
}

fn overhead_items(estimated_value: f64) -> Vec<LineItem> {
    vec![
        // The PM figure is carried in quantity with a unit price of 1; the
        // sibling items carry theirs in unitPrice. Both give the same line
        // total, and downstream consumers rely on the existing placement.
        LineItem::generated(
            "Project Management and Supervision",
            "On-site supervision and project coordination",
            estimated_value * 0.08,
            "ls",
            categories::PROJECT_OVERHEAD,
            1.0,
            0.8,
            "",
        ),
        LineItem::generated(
            "Permits and Fees",
            "Building permits and inspection fees",
            1.0,
            "ls",
            categories::PROJECT_OVERHEAD,
            estimated_value * 0.03,
            0.8,
            "",
        ),
        LineItem::generated(
            "Temporary Facilities",
            "Site office, storage and sanitation",
            1.0,
            "ls",
            categories::PROJECT_OVERHEAD,
            estimated_value * 0.02,
            0.8,
            "",
        ),
        LineItem::generated(
            "Safety and Security",
            "Site safety equipment, fencing and signage",
            1.0,
            "ls",
            categories::PROJECT_OVERHEAD,
            estimated_value * 0.02,
            0.8,
            "",
        ),
    ]
}

fn contingency_items(subtotal: f64) -> Vec<LineItem> {
    vec![
        LineItem::generated(
            "Owner Contingency",
            "Reserve for unforeseen conditions and scope changes",
            1.0,
            "ls",
            categories::CONTINGENCIES,
            subtotal * 0.10,
            0.9,
            "",
        ),
        LineItem::generated(
            "Weather Delay Allowance",
            "Allowance for weather-related schedule impacts",
            1.0,
            "ls",
            categories::CONTINGENCIES,
            subtotal * 0.02,
            0.7,
            "",
        ),
    ]
}
