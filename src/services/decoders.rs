//! Document format decoders.
//!
//! The pipeline only needs "file bytes in, plain text out"; the concrete
//! decoding libraries live behind these traits so tests (and future formats)
//! can swap them out.

use std::io::{Cursor, Read};

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("pdf decode failed: {0}")]
    Pdf(String),

    #[error("docx decode failed: {0}")]
    Docx(String),
}

/// Decoded PDF document.
#[derive(Debug, Clone, Default)]
pub struct DecodedPdf {
    pub text: String,
    pub pages: Option<u32>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
}

/// Decoded DOCX document.
#[derive(Debug, Clone, Default)]
pub struct DecodedDocx {
    pub text: String,
    pub has_images: bool,
}

pub trait PdfDecode: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedPdf, DecodeError>;
}

pub trait DocxDecode: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedDocx, DecodeError>;
}

/// PDF text extraction backed by the `pdf-extract` crate.
///
/// The crate only yields the text stream; document info metadata is not
/// exposed, so title/author stay `None` and the extraction adapter applies
/// its defaults.
pub struct PdfExtractDecoder;

impl PdfDecode for PdfExtractDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedPdf, DecodeError> {
        let text =
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| DecodeError::Pdf(e.to_string()))?;
        // pdf-extract emits a form feed between pages.
        let pages = Some(text.matches('\u{c}').count() as u32 + 1);
        Ok(DecodedPdf {
            text,
            pages,
            ..Default::default()
        })
    }
}

/// DOCX text extraction: read `word/document.xml` out of the zip archive and
/// strip the WordprocessingML markup. Paragraph ends become newlines; image
/// presence is detected from `word/media/` entries.
pub struct DocxArchiveDecoder {
    tag_pattern: Regex,
}

impl DocxArchiveDecoder {
    pub fn new() -> Self {
        Self {
            tag_pattern: Regex::new(r"<[^>]+>").expect("static regex"),
        }
    }
}

impl Default for DocxArchiveDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxDecode for DocxArchiveDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedDocx, DecodeError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DecodeError::Docx(e.to_string()))?;

        let has_images = archive
            .file_names()
            .any(|name| name.starts_with("word/media/"));

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| DecodeError::Docx(e.to_string()))?
            .read_to_string(&mut xml)
            .map_err(|e| DecodeError::Docx(e.to_string()))?;

        let with_breaks = xml.replace("</w:p>", "\n");
        let stripped = self.tag_pattern.replace_all(&with_breaks, " ");
        let text = stripped
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(DecodedDocx { text, has_images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_fixture(document_xml: &str, with_image: bool) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            if with_image {
                writer.start_file("word/media/image1.png", options).unwrap();
                writer.write_all(b"\x89PNG").unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn docx_decoder_strips_markup_and_splits_paragraphs() {
        let xml = "<w:document><w:body>\
                   <w:p><w:r><w:t>Foundation plan</w:t></w:r></w:p>\
                   <w:p><w:r><w:t>Slab &amp; footings</w:t></w:r></w:p>\
                   </w:body></w:document>";
        let decoded = DocxArchiveDecoder::new().decode(&docx_fixture(xml, false)).unwrap();
        assert_eq!(decoded.text, "Foundation plan\nSlab & footings");
        assert!(!decoded.has_images);
    }

    #[test]
    fn docx_decoder_detects_embedded_images() {
        let xml = "<w:document><w:body><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body></w:document>";
        let decoded = DocxArchiveDecoder::new().decode(&docx_fixture(xml, true)).unwrap();
        assert!(decoded.has_images);
    }

    #[test]
    fn docx_decoder_rejects_non_archives() {
        let err = DocxArchiveDecoder::new().decode(b"not a zip").unwrap_err();
        assert!(matches!(err, DecodeError::Docx(_)));
    }

    #[test]
    fn pdf_decoder_rejects_garbage() {
        let err = PdfExtractDecoder.decode(b"not a pdf").unwrap_err();
        assert!(matches!(err, DecodeError::Pdf(_)));
    }
}
