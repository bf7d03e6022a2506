//! Stage 5: validation and confidence scoring.
//!
//! Recomputes per-item confidence from each item's own base score (the
//! adjustments multiply against the base, never against each other's
//! output across items), normalizes numeric fields, and derives the
//! aggregate confidence and category coverage. Total function: any input,
//! including an empty list, yields a well-formed scored result.

use std::collections::HashMap;

use serde::Serialize;

use super::analyzer::BlueprintAnalysis;
use super::extraction::{ExtractionMeta, VisionConfidence};
use super::parse::clamp_confidence;
use crate::domain::estimate::{categories, LineItem};

/// Confidence bucket counts for the validation summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBuckets {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Scored output of the validation stage.
#[derive(Debug, Clone)]
pub struct ValidatedEstimate {
    pub items: Vec<LineItem>,
    pub average_confidence: f64,
    /// Share of the fixed Foundation/Structural/MEP/Finishes checklist
    /// present in the item list, 0–100.
    pub coverage_percentage: f64,
    pub total_value: f64,
    pub summary: ConfidenceBuckets,
}

/// Validate and score a line item list against its analysis.
pub fn validate(mut items: Vec<LineItem>, analysis: &BlueprintAnalysis) -> ValidatedEstimate {
    let degraded_extraction = matches!(
        analysis.extraction,
        ExtractionMeta::Vision {
            confidence: VisionConfidence::Low,
            ..
        }
    );

    let mut category_counts: HashMap<String, usize> = HashMap::new();
    for item in &items {
        *category_counts.entry(item.category.clone()).or_default() += 1;
    }
    let single_member: Vec<String> = category_counts
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(category, _)| category.clone())
        .collect();

    for item in &mut items {
        let mut confidence = item.ai_confidence;
        if degraded_extraction {
            confidence *= 0.8;
        }
        if single_member.iter().any(|c| c == &item.category) {
            confidence *= 0.9;
        }
        if item.quantity <= 0.0 || item.unit_price <= 0.0 {
            confidence *= 0.5;
        }
        item.ai_confidence = clamp_confidence(confidence);
        item.recompute_line_total();
    }

    let average_confidence = if items.is_empty() {
        0.0
    } else {
        items.iter().map(|i| i.ai_confidence).sum::<f64>() / items.len() as f64
    };

    let covered = categories::CORE_COVERAGE
        .iter()
        .filter(|c| category_counts.contains_key(**c))
        .count();
    let coverage_percentage = covered as f64 / categories::CORE_COVERAGE.len() as f64 * 100.0;

    let total_value = items.iter().map(|i| i.line_total).sum();

    let mut summary = ConfidenceBuckets::default();
    for item in &items {
        if item.ai_confidence >= 0.8 {
            summary.high += 1;
        } else if item.ai_confidence >= 0.5 {
            summary.medium += 1;
        } else {
            summary.low += 1;
        }
    }

    ValidatedEstimate {
        items,
        average_confidence,
        coverage_percentage,
        total_value,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::LlmJson;

    fn analysis_with(meta: ExtractionMeta) -> BlueprintAnalysis {
        BlueprintAnalysis {
            blueprint_types: vec!["general".to_string()],
            payload: LlmJson::Raw(String::new()),
            raw_content: String::new(),
            extraction: meta,
        }
    }

    fn plain_analysis() -> BlueprintAnalysis {
        analysis_with(ExtractionMeta::Cad {
            requires_special_processing: true,
        })
    }

    fn item(category: &str, quantity: f64, price: f64, confidence: f64) -> LineItem {
        LineItem::generated("x", "", quantity, "ea", category, price, confidence, "n")
    }

    #[test]
    fn single_member_category_is_penalized() {
        let validated = validate(
            vec![item("Electrical", 1.0, 500.0, 0.7)],
            &plain_analysis(),
        );
        assert!((validated.items[0].ai_confidence - 0.63).abs() < 1e-9);
    }

    #[test]
    fn multi_member_categories_keep_their_base_confidence() {
        let validated = validate(
            vec![
                item(categories::MEP, 1.0, 500.0, 0.7),
                item(categories::MEP, 2.0, 100.0, 0.9),
            ],
            &plain_analysis(),
        );
        assert_eq!(validated.items[0].ai_confidence, 0.7);
        assert_eq!(validated.items[1].ai_confidence, 0.9);
        // Adjustments are per-item, not cumulative across the list
        assert!((validated.average_confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn degraded_vision_extraction_scales_all_items() {
        let analysis = analysis_with(ExtractionMeta::Vision {
            extracted_by: "vision-ai".to_string(),
            confidence: VisionConfidence::Low,
        });
        let validated = validate(
            vec![
                item(categories::MEP, 1.0, 10.0, 0.5),
                item(categories::MEP, 1.0, 10.0, 1.0),
            ],
            &analysis,
        );
        assert!((validated.items[0].ai_confidence - 0.4).abs() < 1e-9);
        assert!((validated.items[1].ai_confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn medium_vision_extraction_is_not_penalized() {
        let analysis = analysis_with(ExtractionMeta::Vision {
            extracted_by: "vision-ai".to_string(),
            confidence: VisionConfidence::Medium,
        });
        let validated = validate(vec![item(categories::MEP, 1.0, 10.0, 0.5)], &analysis);
        // Only the single-member penalty applies
        assert!((validated.items[0].ai_confidence - 0.45).abs() < 1e-9);
    }

    #[test]
    fn non_positive_quantity_or_price_halves_confidence() {
        let validated = validate(
            vec![
                item(categories::MEP, 0.0, 10.0, 0.8),
                item(categories::MEP, 1.0, -5.0, 0.8),
                item(categories::MEP, 1.0, 10.0, 0.8),
            ],
            &plain_analysis(),
        );
        assert!((validated.items[0].ai_confidence - 0.4).abs() < 1e-9);
        assert!((validated.items[1].ai_confidence - 0.4).abs() < 1e-9);
        assert_eq!(validated.items[2].ai_confidence, 0.8);
    }

    #[test]
    fn coverage_counts_only_the_core_checklist() {
        let none = validate(
            vec![
                item(categories::DEMOLITION, 1.0, 1.0, 0.7),
                item(categories::CONTINGENCIES, 1.0, 1.0, 0.7),
            ],
            &plain_analysis(),
        );
        assert_eq!(none.coverage_percentage, 0.0);

        let all = validate(
            vec![
                item(categories::FOUNDATION, 1.0, 1.0, 0.7),
                item(categories::STRUCTURAL, 1.0, 1.0, 0.7),
                item(categories::MEP, 1.0, 1.0, 0.7),
                item(categories::FINISHES, 1.0, 1.0, 0.7),
            ],
            &plain_analysis(),
        );
        assert_eq!(all.coverage_percentage, 100.0);

        let half = validate(
            vec![
                item(categories::FOUNDATION, 1.0, 1.0, 0.7),
                item(categories::MEP, 1.0, 1.0, 0.7),
            ],
            &plain_analysis(),
        );
        assert_eq!(half.coverage_percentage, 50.0);
    }

    #[test]
    fn total_value_sums_recomputed_line_totals() {
        let mut stale = item(categories::MEP, 4.0, 25.0, 0.7);
        stale.line_total = 0.0;
        let validated = validate(
            vec![stale, item(categories::MEP, 1.0, 100.0, 0.7)],
            &plain_analysis(),
        );
        assert!((validated.total_value - 200.0).abs() < 1e-9);
        assert!(validated
            .items
            .iter()
            .all(|i| (i.line_total - i.quantity * i.unit_price).abs() < 1e-9));
    }

    #[test]
    fn buckets_split_at_point_eight_and_point_five() {
        let validated = validate(
            vec![
                item(categories::MEP, 1.0, 1.0, 0.95),
                item(categories::MEP, 1.0, 1.0, 0.8),
                item(categories::MEP, 1.0, 1.0, 0.6),
                item(categories::MEP, 1.0, 1.0, 0.2),
            ],
            &plain_analysis(),
        );
        assert_eq!(
            validated.summary,
            ConfidenceBuckets {
                high: 2,
                medium: 1,
                low: 1,
            }
        );
    }

    #[test]
    fn empty_input_yields_a_well_formed_result() {
        let validated = validate(vec![], &plain_analysis());
        assert_eq!(validated.average_confidence, 0.0);
        assert_eq!(validated.coverage_percentage, 0.0);
        assert_eq!(validated.total_value, 0.0);
        assert_eq!(validated.summary, ConfidenceBuckets::default());
    }

    #[test]
    fn confidence_stays_clamped() {
        let validated = validate(vec![item(categories::MEP, 0.0, 0.0, 2.0)], &plain_analysis());
        let c = validated.items[0].ai_confidence;
        assert!((0.0..=1.0).contains(&c));
    }
}
