//! Pipeline orchestration.
//!
//! Runs the five stages strictly in sequence. A failure in extraction,
//! analysis or generation aborts the run and routes to the fallback
//! processor; enhancement and validation recover internally and cannot
//! abort. Every invocation, including total failure, returns a well-formed
//! `PipelineResult`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;

use super::analyzer::{detect_blueprint_types, BlueprintAnalysis, BlueprintAnalyzer};
use super::coverage::CoverageEnhancer;
use super::extraction::{TextExtractor, UploadedBlueprint};
use super::generator::LineItemGenerator;
use super::validator::{validate, ValidatedEstimate};
use super::PipelineError;
use crate::domain::estimate::{
    categories, EstimateMetadata, EstimateSummary, LineItem, PipelineResult,
};
use crate::services::{DocxDecode, PdfDecode, TextGenerator};

/// Aggregate confidence below this flags the estimate for PM review.
const PM_REVIEW_THRESHOLD: f64 = 0.8;

/// The Blueprint-to-Estimate pipeline. One instance serves all invocations;
/// each run owns its own intermediate state.
pub struct EstimatePipeline {
    extractor: TextExtractor,
    analyzer: BlueprintAnalyzer,
    generator: LineItemGenerator,
    enhancer: CoverageEnhancer,
}

impl EstimatePipeline {
    pub fn new(
        model: Arc<dyn TextGenerator>,
        pdf: Arc<dyn PdfDecode>,
        docx: Arc<dyn DocxDecode>,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(model.clone(), pdf, docx),
            analyzer: BlueprintAnalyzer::new(model.clone()),
            generator: LineItemGenerator::new(model.clone()),
            enhancer: CoverageEnhancer::new(model),
        }
    }

    /// Run the full pipeline. Never returns an error: failures degrade to
    /// the fallback result.
    pub async fn run(&self, blueprint: &UploadedBlueprint, project_context: &Value) -> PipelineResult {
        let started = Instant::now();

        match self.run_stages(blueprint, project_context).await {
            Ok((analysis, validated)) => {
                tracing::info!(
                    items = validated.items.len(),
                    confidence = validated.average_confidence,
                    coverage = validated.coverage_percentage,
                    "Estimate pipeline completed"
                );
                success_result(analysis, validated, project_context, started)
            }
            Err(error) => {
                tracing::error!(error = %error, "Estimate pipeline failed; building fallback result");
                self.fallback_result(blueprint, project_context, error, started)
                    .await
            }
        }
    }

    async fn run_stages(
        &self,
        blueprint: &UploadedBlueprint,
        project_context: &Value,
    ) -> Result<(BlueprintAnalysis, ValidatedEstimate), PipelineError> {
        let content = self.extractor.extract(blueprint).await?;
        let analysis = self.analyzer.analyze(&content, project_context).await?;
        let items = self.generator.generate(&analysis, project_context).await?;
        let items = self.enhancer.enhance(items, &analysis).await;
        let validated = validate(items, &analysis);
        Ok((analysis, validated))
    }

    /// Fallback processor: a best-effort re-extraction for diagnostics plus
    /// a single manual-review placeholder item.
    async fn fallback_result(
        &self,
        blueprint: &UploadedBlueprint,
        project_context: &Value,
        error: PipelineError,
        started: Instant,
    ) -> PipelineResult {
        let original_error = error.to_string();

        let blueprint_types = match self.extractor.extract(blueprint).await {
            Ok(content) => detect_blueprint_types(&content.text),
            Err(extract_error) => {
                tracing::error!(
                    error = %extract_error,
                    "Fallback extraction also failed; returning system error result"
                );
                return system_error_result(
                    vec![original_error, extract_error.to_string()],
                    project_context,
                    started,
                );
            }
        };

        let item = manual_review_item(&original_error);
        let category = item.category.clone();
        PipelineResult {
            success: false,
            line_items: vec![item],
            metadata: EstimateMetadata {
                blueprint_types,
                confidence: 0.2,
                coverage: 0.0,
                processing_time: elapsed_ms(started),
                processed_at: Utc::now(),
                project_context: project_context.clone(),
                fallback_used: Some(true),
                errors: vec![original_error],
            },
            summary: EstimateSummary {
                total_items: 1,
                total_value: 0.0,
                categories: vec![category],
                requires_pm_review: true,
                manual_review_required: Some(true),
                system_error: None,
            },
        }
    }
}

fn success_result(
    analysis: BlueprintAnalysis,
    validated: ValidatedEstimate,
    project_context: &Value,
    started: Instant,
) -> PipelineResult {
    let requires_pm_review = validated.average_confidence < PM_REVIEW_THRESHOLD;
    PipelineResult {
        success: true,
        metadata: EstimateMetadata {
            blueprint_types: analysis.blueprint_types,
            confidence: validated.average_confidence,
            coverage: validated.coverage_percentage,
            processing_time: elapsed_ms(started),
            processed_at: Utc::now(),
            project_context: project_context.clone(),
            fallback_used: None,
            errors: Vec::new(),
        },
        summary: EstimateSummary {
            total_items: validated.items.len(),
            total_value: validated.total_value,
            categories: distinct_categories(&validated.items),
            requires_pm_review,
            manual_review_required: None,
            system_error: None,
        },
        line_items: validated.items,
    }
}

fn system_error_result(
    errors: Vec<String>,
    project_context: &Value,
    started: Instant,
) -> PipelineResult {
    PipelineResult {
        success: false,
        line_items: Vec::new(),
        metadata: EstimateMetadata {
            blueprint_types: vec!["general".to_string()],
            confidence: 0.0,
            coverage: 0.0,
            processing_time: elapsed_ms(started),
            processed_at: Utc::now(),
            project_context: project_context.clone(),
            fallback_used: Some(true),
            errors,
        },
        summary: EstimateSummary {
            total_items: 0,
            total_value: 0.0,
            categories: Vec::new(),
            requires_pm_review: true,
            manual_review_required: Some(true),
            system_error: Some(true),
        },
    }
}

fn manual_review_item(error: &str) -> LineItem {
    LineItem::generated(
        "Blueprint Manual Review Required",
        "Automated processing could not complete; a project manager must price this blueprint by hand.",
        1.0,
        "ea",
        categories::GENERAL,
        0.0,
        0.2,
        format!("Pipeline error: {error}"),
    )
}

/// Distinct categories in first-appearance order.
fn distinct_categories(items: &[LineItem]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item.category) {
            seen.push(item.category.clone());
        }
    }
    seen
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
