use std::path::Path;

use mupdf::{Colorspace, Document, DocumentWriter, ImageFormat, Matrix, TextPageFlags};

use deedmerge_core::toolkit::{BackendError, PdfToolkit};

/// Default rendering resolution for the OCR fallback. 200 DPI balances
/// recognition quality against render time on full-page scans.
pub const DEFAULT_RENDER_DPI: u32 = 200;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// MuPDF-based implementation of [`PdfToolkit`].
///
/// mupdf is AGPL-3.0, so it lives in this crate alone and the core
/// pipeline and its tests never link against it.
///
/// Text extraction keeps every block of every page. On scanned
/// certificates the identifier block routinely sits in the page margin,
/// so there is no header or footer exclusion.
pub struct MupdfToolkit {
    /// Rendering resolution used by [`PdfToolkit::render_page`].
    render_dpi: u32,
}

impl Default for MupdfToolkit {
    fn default() -> Self {
        Self {
            render_dpi: DEFAULT_RENDER_DPI,
        }
    }
}

impl MupdfToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendering resolution. Clamped to at least 1 DPI.
    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi.max(1);
        self
    }
}

fn open(path: &Path) -> Result<Document, BackendError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BackendError::Open("invalid path encoding".into()))?;
    Document::open(path_str).map_err(|e| BackendError::Open(e.to_string()))
}

fn count_pages(document: &Document) -> Result<usize, BackendError> {
    let count = document
        .page_count()
        .map_err(|e| BackendError::Extraction(e.to_string()))?;
    Ok(count.max(0) as usize)
}

impl PdfToolkit for MupdfToolkit {
    fn page_count(&self, path: &Path) -> Result<usize, BackendError> {
        count_pages(&open(path)?)
    }

    fn page_text(&self, path: &Path, page_index: usize) -> Result<String, BackendError> {
        let document = open(path)?;
        let count = count_pages(&document)?;
        if page_index >= count {
            return Err(BackendError::PageOutOfRange {
                page: page_index,
                count,
            });
        }

        let page = document
            .load_page(page_index as i32)
            .map_err(|e| BackendError::Extraction(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::Extraction(e.to_string()))?;

        // Block/line iteration to match the reading order a human sees.
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }
        Ok(page_text)
    }

    fn render_page(&self, path: &Path, page_number: usize) -> Result<Vec<u8>, BackendError> {
        let document = open(path)?;
        let count = count_pages(&document)?;
        if page_number == 0 || page_number > count {
            return Err(BackendError::PageOutOfRange {
                page: page_number,
                count,
            });
        }

        let page = document
            .load_page((page_number - 1) as i32)
            .map_err(|e| BackendError::Render(e.to_string()))?;

        let scale = self.render_dpi as f32 / POINTS_PER_INCH;
        let matrix = Matrix::new_scale(scale, scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 0.0, false)
            .map_err(|e| BackendError::Render(e.to_string()))?;

        // mupdf encodes PNG to a file path; round-trip through a temp file.
        let tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(BackendError::Io)?;
        let tmp_path = tmp
            .path()
            .to_str()
            .ok_or_else(|| BackendError::Render("invalid temp path encoding".into()))?;
        pixmap
            .save_as(tmp_path, ImageFormat::PNG)
            .map_err(|e| BackendError::Render(e.to_string()))?;
        std::fs::read(tmp.path()).map_err(BackendError::Io)
    }

    fn concat(&self, first: &Path, second: &Path, dest: &Path) -> Result<(), BackendError> {
        let dest_str = dest
            .to_str()
            .ok_or_else(|| BackendError::Write("invalid path encoding".into()))?;
        let mut writer = DocumentWriter::new(dest_str, "pdf", "")
            .map_err(|e| BackendError::Write(e.to_string()))?;

        for source in [first, second] {
            let document = open(source)?;
            let count = count_pages(&document)?;
            for index in 0..count {
                let page = document
                    .load_page(index as i32)
                    .map_err(|e| BackendError::Extraction(e.to_string()))?;
                let mediabox = page
                    .bounds()
                    .map_err(|e| BackendError::Extraction(e.to_string()))?;
                let device = writer
                    .begin_page(mediabox)
                    .map_err(|e| BackendError::Write(e.to_string()))?;
                page.run(&device, &Matrix::IDENTITY)
                    .map_err(|e| BackendError::Write(e.to_string()))?;
                writer
                    .end_page()
                    .map_err(|e| BackendError::Write(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dpi_is_clamped() {
        let toolkit = MupdfToolkit::new().with_render_dpi(0);
        assert_eq!(toolkit.render_dpi, 1);
    }

    #[test]
    fn test_missing_document_is_an_open_error() {
        let toolkit = MupdfToolkit::new();
        let result = toolkit.page_count(Path::new("/nonexistent/file.pdf"));
        assert!(matches!(result, Err(BackendError::Open(_))));
    }
}
