//! Blueprint-to-Estimate extraction pipeline.
//!
//! Five sequential stages (extract, analyze, generate, enhance, validate),
//! each consuming the previous stage's output plus the shared project
//! context. Extraction, analysis and generation failures are fatal to an
//! invocation and route to the fallback processor; coverage enhancement and
//! validation degrade internally and never abort the pipeline.

pub mod analyzer;
pub mod coverage;
pub mod extraction;
pub mod generator;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod validator;

use thiserror::Error;

pub use analyzer::{AnalysisPayload, BlueprintAnalysis, BlueprintAnalyzer, StructuredAnalysis};
pub use extraction::{ExtractedContent, ExtractionMeta, FileKind, TextExtractor, UploadedBlueprint, VisionConfidence};
pub use orchestrator::EstimatePipeline;
pub use validator::ValidatedEstimate;

/// Fatal stage failures. Any of these aborts the invocation and triggers the
/// fallback processor; the caller still receives a well-formed result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed for {file_type} file: {message}")]
    Extraction { file_type: String, message: String },

    #[error("blueprint analysis failed: {0}")]
    Analysis(String),

    #[error("line item generation failed: {0}")]
    Generation(String),
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fakes shared by the stage tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use crate::services::decoders::{
        DecodeError, DecodedDocx, DecodedPdf, DocxDecode, PdfDecode,
    };
    use crate::services::{GenerateRequest, ModelError, TextGenerator};

    /// Model double that replays a queue of canned responses.
    pub struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<Result<&str, &str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
            }
        }

        pub fn replying(response: &str) -> Self {
            Self::new(vec![Ok(response)])
        }

        pub fn failing(message: &str) -> Self {
            Self::new(vec![Err(message)])
        }
    }

    impl TextGenerator for ScriptedModel {
        fn generate<'a>(
            &'a self,
            _request: GenerateRequest<'a>,
        ) -> BoxFuture<'a, Result<String, ModelError>> {
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("scripted model exhausted".to_string()));
            Box::pin(async move { next.map_err(ModelError::Unavailable) })
        }
    }

    /// PDF decoder double returning fixed text.
    pub struct FixedPdf(pub &'static str);

    impl PdfDecode for FixedPdf {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedPdf, DecodeError> {
            Ok(DecodedPdf {
                text: self.0.to_string(),
                pages: Some(3),
                title: Some("Residence".to_string()),
                author: None,
                created: None,
            })
        }
    }

    /// DOCX decoder double returning fixed text.
    pub struct FixedDocx(pub &'static str);

    impl DocxDecode for FixedDocx {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedDocx, DecodeError> {
            Ok(DecodedDocx {
                text: self.0.to_string(),
                has_images: true,
            })
        }
    }

    /// Decoder double that always fails.
    pub struct BrokenPdf;

    impl PdfDecode for BrokenPdf {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedPdf, DecodeError> {
            Err(DecodeError::Pdf("corrupt xref table".to_string()))
        }
    }
}
