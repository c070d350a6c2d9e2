use std::path::{Path, PathBuf};

use deedmerge_core::toolkit::{OcrEngine, OcrError};

/// Default recognition language. Title registry documents are English.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Tesseract-backed [`OcrEngine`] for scanned title plans whose text layer
/// is absent or empty.
///
/// A fresh Tesseract instance is created per call. Recognition happens at
/// most once per document (only when direct extraction found no identifier),
/// so the init cost is irrelevant next to page rendering.
pub struct TesseractOcr {
    tessdata_dir: Option<PathBuf>,
    language: String,
}

impl TesseractOcr {
    /// Use the system tessdata location and [`DEFAULT_LANGUAGE`].
    pub fn new() -> Self {
        Self {
            tessdata_dir: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Point at an explicit tessdata directory. Fails when the traineddata
    /// for the configured language is not present there, so a bad path
    /// surfaces at startup rather than mid-pipeline.
    pub fn with_tessdata_dir(mut self, dir: &Path) -> Result<Self, OcrError> {
        let traineddata = dir.join(format!("{}.traineddata", self.language));
        if !traineddata.exists() {
            return Err(OcrError::Init(format!(
                "no {}.traineddata in {}",
                self.language,
                dir.display()
            )));
        }
        self.tessdata_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let tessdata_str = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| OcrError::Init("invalid tessdata path encoding".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(tessdata_str, Some(&self.language))
            .map_err(|e| OcrError::Init(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image)
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;

        tracing::debug!(chars = text.len(), "ocr pass complete");
        Ok(text)
    }
}
