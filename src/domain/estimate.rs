//! Estimate domain types produced by the blueprint extraction pipeline.
//!
//! Field names serialize in camelCase to match the platform-wide wire
//! contract consumed by the web dashboard and mobile clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cost category vocabulary. Open-ended (items may carry any string), but
/// these are the conventional tags the pipeline itself emits and checks.
pub mod categories {
    pub const DEMOLITION: &str = "Demolition";
    pub const SITE_PREPARATION: &str = "Site Preparation";
    pub const FOUNDATION: &str = "Foundation";
    pub const STRUCTURAL: &str = "Structural";
    pub const MEP: &str = "MEP";
    pub const FINISHES: &str = "Finishes";
    pub const SPECIALTIES: &str = "Specialties";
    pub const PROJECT_OVERHEAD: &str = "Project Overhead";
    pub const CONTINGENCIES: &str = "Contingencies";
    pub const GENERAL: &str = "General";

    /// The fixed checklist used for the coverage percentage. Deliberately a
    /// different axis than the coverage enhancer's gap list.
    pub const CORE_COVERAGE: [&str; 4] = [FOUNDATION, STRUCTURAL, MEP, FINISHES];
}

/// One row of a cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_id: String,
    pub name: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub category: String,
    pub unit_price: f64,
    /// Derived: always `quantity * unit_price`.
    pub line_total: f64,
    pub is_ai_generated: bool,
    /// Heuristic trust score in [0, 1].
    pub ai_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_database_id: Option<String>,
    pub notes: String,
}

impl LineItem {
    /// Build a pipeline-generated item with a fresh id and a consistent
    /// line total.
    pub fn generated(
        name: impl Into<String>,
        description: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        category: impl Into<String>,
        unit_price: f64,
        ai_confidence: f64,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            item_id: new_item_id(),
            name: name.into(),
            description: description.into(),
            quantity,
            unit: unit.into(),
            category: category.into(),
            unit_price,
            line_total: quantity * unit_price,
            is_ai_generated: true,
            ai_confidence,
            material_database_id: None,
            notes: notes.into(),
        }
    }

    pub fn recompute_line_total(&mut self) {
        self.line_total = self.quantity * self.unit_price;
    }
}

/// Generate a unique line item id.
pub fn new_item_id() -> String {
    format!("item-{}", Uuid::new_v4())
}

/// Final result of one pipeline invocation. Always well-formed, even when the
/// pipeline degraded to its fallback path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    pub line_items: Vec<LineItem>,
    pub metadata: EstimateMetadata,
    pub summary: EstimateSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateMetadata {
    pub blueprint_types: Vec<String>,
    /// Aggregate confidence over all line items, in [0, 1].
    pub confidence: f64,
    /// Core category coverage, 0–100.
    pub coverage: f64,
    /// Elapsed wall time in milliseconds.
    pub processing_time: f64,
    pub processed_at: DateTime<Utc>,
    pub project_context: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_used: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateSummary {
    pub total_items: usize,
    pub total_value: f64,
    pub categories: Vec<String>,
    #[serde(rename = "requiresPMReview")]
    pub requires_pm_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_review_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_error: Option<bool>,
}
