//! Mock document backends for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BackendError, OcrEngine, OcrError, PdfToolkit};

/// A hand-rolled mock implementing [`PdfToolkit`] for tests.
///
/// Page text is keyed by file name, so one mock serves every document in a
/// test folder. `concat` writes a small marker file at the destination and
/// registers the combined page list under the destination's file name, which
/// lets a merge-then-verify flow run end to end without a PDF library.
pub struct MockToolkit {
    /// file name -> ordered page texts
    pages: Mutex<HashMap<String, Vec<String>>>,
    /// Bytes handed out by `render_page`; `None` simulates render failure.
    render: Option<Vec<u8>>,
    /// When set, `concat` fails with this message and writes nothing.
    concat_error: Option<String>,
    render_calls: AtomicUsize,
    concat_calls: AtomicUsize,
}

impl MockToolkit {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            render: None,
            concat_error: None,
            render_calls: AtomicUsize::new(0),
            concat_calls: AtomicUsize::new(0),
        }
    }

    /// Register the page texts served for `file_name`.
    pub fn with_pages(self, file_name: &str, pages: Vec<&str>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(file_name.to_string(), pages.into_iter().map(String::from).collect());
        self
    }

    /// Make `render_page` succeed with the given bytes. Without this,
    /// rendering fails, simulating a document that cannot be imaged.
    pub fn with_render(mut self, image: Vec<u8>) -> Self {
        self.render = Some(image);
        self
    }

    /// Make `concat` fail with the given message.
    pub fn with_concat_error(mut self, message: &str) -> Self {
        self.concat_error = Some(message.to_string());
        self
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn concat_calls(&self) -> usize {
        self.concat_calls.load(Ordering::SeqCst)
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn pages_for(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        self.pages
            .lock()
            .unwrap()
            .get(&Self::file_name(path))
            .cloned()
            .ok_or_else(|| BackendError::Open(format!("no mock pages for {}", path.display())))
    }
}

impl Default for MockToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfToolkit for MockToolkit {
    fn page_count(&self, path: &Path) -> Result<usize, BackendError> {
        Ok(self.pages_for(path)?.len())
    }

    fn page_text(&self, path: &Path, page_index: usize) -> Result<String, BackendError> {
        let pages = self.pages_for(path)?;
        pages
            .get(page_index)
            .cloned()
            .ok_or(BackendError::PageOutOfRange {
                page: page_index,
                count: pages.len(),
            })
    }

    fn render_page(&self, _path: &Path, _page_number: usize) -> Result<Vec<u8>, BackendError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        self.render
            .clone()
            .ok_or_else(|| BackendError::Render("no image produced".into()))
    }

    fn concat(&self, first: &Path, second: &Path, dest: &Path) -> Result<(), BackendError> {
        self.concat_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.concat_error {
            return Err(BackendError::Write(message.clone()));
        }

        let mut combined = self.pages_for(first)?;
        combined.extend(self.pages_for(second)?);
        std::fs::write(dest, "mock merged document")?;
        self.pages
            .lock()
            .unwrap()
            .insert(Self::file_name(dest), combined);
        Ok(())
    }
}

/// Mock OCR engine returning a fixed text, or failing when none is set.
pub struct MockOcr {
    text: Option<String>,
    calls: AtomicUsize,
}

impl MockOcr {
    pub fn recognizing(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| OcrError::Recognition("mock recognition failure".into()))
    }
}
