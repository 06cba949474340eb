//! Extraction adapter implementations.

pub mod pdf_text;
pub mod tika;

use std::sync::Arc;

use pdfq_core::TextExtractor;

use crate::config::{ExtractionConfig, ExtractorBackend};

pub use pdf_text::PdfToTextExtractor;
pub use tika::TikaExtractor;

/// Build the extractor selected by `config.backend`.
pub fn build_extractor(config: &ExtractionConfig) -> Arc<dyn TextExtractor> {
    match config.backend {
        ExtractorBackend::Tika => Arc::new(TikaExtractor::new(config.tika_url.clone())),
        ExtractorBackend::PdfToText => Arc::new(PdfToTextExtractor::new()),
    }
}
