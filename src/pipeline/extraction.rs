//! Stage 1: text extraction.
//!
//! Converts an uploaded blueprint into plain text plus per-format metadata.
//! PDF and DOCX go through the injected decoders; CAD formats get a
//! deliberate diagnostic placeholder (no real DWG/DXF decode exists; the
//! item is routed to manual processing downstream); everything else is
//! treated as an image and sent through the vision model.

use std::sync::Arc;

use serde::Serialize;

use super::{prompts, PipelineError};
use crate::services::{DocxDecode, GenerateRequest, PdfDecode, TextGenerator};

/// Placeholder text returned for CAD uploads.
pub const CAD_PLACEHOLDER: &str = "CAD file detected - manual processing may be required";

/// File type tag from the upload request, parsed case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Cad,
    Other(String),
}

impl FileKind {
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "dwg" | "dxf" => Self::Cad,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Cad => "cad",
            Self::Other(tag) => tag,
        }
    }
}

/// Input artifact: raw bytes plus the declared format.
#[derive(Debug, Clone)]
pub struct UploadedBlueprint {
    pub content: Vec<u8>,
    pub file_kind: FileKind,
}

impl UploadedBlueprint {
    pub fn new(content: Vec<u8>, file_type: &str) -> Self {
        Self {
            content,
            file_kind: FileKind::parse(file_type),
        }
    }
}

/// Confidence tag attached to vision extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionConfidence {
    Low,
    Medium,
    High,
}

/// Per-format extraction metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "source")]
pub enum ExtractionMeta {
    #[serde(rename_all = "camelCase")]
    Pdf {
        title: String,
        author: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        created: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Docx { word_count: usize, has_images: bool },
    #[serde(rename_all = "camelCase")]
    Cad { requires_special_processing: bool },
    #[serde(rename_all = "camelCase")]
    Vision {
        extracted_by: String,
        confidence: VisionConfidence,
    },
}

/// Extracted blueprint content. `text` is always present; unsupported
/// formats carry a diagnostic placeholder rather than nothing.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub pages: Option<u32>,
    pub meta: ExtractionMeta,
}

/// Stage 1 adapter. Dispatches on the declared file type.
pub struct TextExtractor {
    model: Arc<dyn TextGenerator>,
    pdf: Arc<dyn PdfDecode>,
    docx: Arc<dyn DocxDecode>,
}

impl TextExtractor {
    pub fn new(
        model: Arc<dyn TextGenerator>,
        pdf: Arc<dyn PdfDecode>,
        docx: Arc<dyn DocxDecode>,
    ) -> Self {
        Self { model, pdf, docx }
    }

    /// Extract plain text from the uploaded blueprint. Every failure is
    /// wrapped with the file type so the fallback result can report it.
    pub async fn extract(
        &self,
        blueprint: &UploadedBlueprint,
    ) -> Result<ExtractedContent, PipelineError> {
        let result = match &blueprint.file_kind {
            FileKind::Pdf => self.extract_pdf(&blueprint.content),
            FileKind::Docx => self.extract_docx(&blueprint.content),
            FileKind::Cad => Ok(Self::cad_placeholder()),
            FileKind::Other(_) => self.extract_via_vision(&blueprint.content).await,
        };

        result.map_err(|message| {
            tracing::warn!(
                file_type = blueprint.file_kind.tag(),
                error = %message,
                "Blueprint extraction failed"
            );
            PipelineError::Extraction {
                file_type: blueprint.file_kind.tag().to_string(),
                message,
            }
        })
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<ExtractedContent, String> {
        let decoded = self.pdf.decode(bytes).map_err(|e| e.to_string())?;
        Ok(ExtractedContent {
            text: decoded.text,
            pages: decoded.pages,
            meta: ExtractionMeta::Pdf {
                title: decoded.title.unwrap_or_else(|| "Unknown".to_string()),
                author: decoded.author.unwrap_or_else(|| "Unknown".to_string()),
                created: decoded.created,
            },
        })
    }

    fn extract_docx(&self, bytes: &[u8]) -> Result<ExtractedContent, String> {
        let decoded = self.docx.decode(bytes).map_err(|e| e.to_string())?;
        let word_count = decoded.text.split_whitespace().count();
        Ok(ExtractedContent {
            text: decoded.text,
            pages: None,
            meta: ExtractionMeta::Docx {
                word_count,
                has_images: decoded.has_images,
            },
        })
    }

    fn cad_placeholder() -> ExtractedContent {
        ExtractedContent {
            text: CAD_PLACEHOLDER.to_string(),
            pages: None,
            meta: ExtractionMeta::Cad {
                requires_special_processing: true,
            },
        }
    }

    async fn extract_via_vision(&self, bytes: &[u8]) -> Result<ExtractedContent, String> {
        let text = self
            .model
            .generate(GenerateRequest::with_image(
                prompts::VISION_EXTRACTION_PROMPT,
                bytes,
            ))
            .await
            .map_err(|e| e.to_string())?;

        Ok(ExtractedContent {
            text,
            pages: None,
            meta: ExtractionMeta::Vision {
                extracted_by: "vision-ai".to_string(),
                confidence: VisionConfidence::Medium,
            },
        })
    }
}
