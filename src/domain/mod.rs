//! Domain types for the estimate extraction service.

pub mod estimate;

pub use estimate::{EstimateMetadata, EstimateSummary, LineItem, PipelineResult};
