//! Service layer modules for external integrations.
//!
//! Contains the generative model client and the document format decoders the
//! pipeline is wired up with.

pub mod decoders;
pub mod model_client;

pub use decoders::{DocxArchiveDecoder, DocxDecode, PdfDecode, PdfExtractDecoder};
pub use model_client::{GenerateRequest, ModelClient, ModelError, TextGenerator};
