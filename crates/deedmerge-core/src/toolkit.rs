//! Seams to the native document backends.
//!
//! The pipeline needs four things from a PDF library (page count, page
//! text, page rendering, page concatenation) and one thing from an OCR
//! engine (image to text). Both live behind traits so the core crate stays
//! free of native dependencies and the engines can be mocked in tests.

use std::path::Path;

use thiserror::Error;

pub mod mock;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("failed to extract text: {0}")]
    Extraction(String),
    #[error("page {page} out of range ({count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("failed to render page: {0}")]
    Render(String),
    #[error("failed to write document: {0}")]
    Write(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine initialisation failed: {0}")]
    Init(String),
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Trait for PDF document backends.
///
/// Implementors provide the low-level document operations; the cascade and
/// the pairing/verification logic live in [`crate::extract`],
/// [`crate::merge`] and [`crate::verify`].
pub trait PdfToolkit: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, path: &Path) -> Result<usize, BackendError>;

    /// Extract the text content of a single page. `page_index` is 0-based.
    fn page_text(&self, path: &Path, page_index: usize) -> Result<String, BackendError>;

    /// Render a physical page (1-based) to PNG bytes, for OCR.
    fn render_page(&self, path: &Path, page_number: usize) -> Result<Vec<u8>, BackendError>;

    /// Concatenate all pages of `first` followed by all pages of `second`
    /// into a new document at `dest`. Must not touch the sources.
    fn concat(&self, first: &Path, second: &Path, dest: &Path) -> Result<(), BackendError>;
}

/// Trait for text-recognition engines.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in a rendered page image (PNG bytes).
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}
