//! The UPIN extraction cascade.
//!
//! Given one page of a merged document, resolve the UPIN that page claims.
//! Strategies are tried in a fixed order and the first hit wins; later
//! strategies are never consulted once one succeeds. The certificate role
//! only has the primary structured pattern. The title-plan role falls back
//! through a "Parcel No" label, a verbatim cross-reference to the already
//! resolved certificate UPIN, and finally OCR of the rendered page.
//!
//! Extraction is absorbing: toolkit faults, render failures and OCR errors
//! all collapse to "nothing found" so the caller can classify the document
//! instead of aborting the batch.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::toolkit::{OcrEngine, PdfToolkit};
use crate::upin::Upin;

/// Physical page (1-based) rendered for the OCR fallback: the title-plan
/// side of a merged document.
const TITLE_PLAN_PHYSICAL_PAGE: usize = 2;

/// Which side of a merged document a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    Certificate,
    TitlePlan,
}

/// The strategy that produced an extracted UPIN, for diagnosability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Structured reference pattern on the page text.
    Primary,
    /// "Parcel No" label fallback (title plans only).
    ParcelLabel,
    /// The certificate UPIN found verbatim as a whole word in the
    /// title-plan text.
    CrossReference,
    /// Recovered from OCR of the rendered page, by whichever text strategy
    /// matched the recognized text.
    Ocr,
}

/// A successfully resolved UPIN and the strategy that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub upin: Upin,
    pub strategy: Strategy,
}

pub struct IdentifierExtractor<'a> {
    toolkit: &'a dyn PdfToolkit,
    ocr: Option<&'a dyn OcrEngine>,
}

impl<'a> IdentifierExtractor<'a> {
    pub fn new(toolkit: &'a dyn PdfToolkit) -> Self {
        Self { toolkit, ocr: None }
    }

    /// Enable the OCR fallback. Without an engine, the cascade ends after
    /// the cross-reference strategy.
    pub fn with_ocr(mut self, ocr: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Resolve the UPIN claimed by one page of a merged document.
    ///
    /// `page_index` is 0-based. For the title-plan role, `cross_reference`
    /// is the already-resolved certificate UPIN, enabling the
    /// cross-reference fallback.
    pub fn resolve(
        &self,
        path: &Path,
        page_index: usize,
        role: PageRole,
        cross_reference: Option<&Upin>,
    ) -> Option<Extraction> {
        let text = match self.toolkit.page_text(path, page_index) {
            Ok(text) => text,
            Err(err) => {
                debug!(
                    file = %path.display(),
                    page = page_index,
                    error = %err,
                    "page text extraction failed"
                );
                String::new()
            }
        };

        match role {
            PageRole::Certificate => extract_certificate(&text).map(|upin| Extraction {
                upin,
                strategy: Strategy::Primary,
            }),
            PageRole::TitlePlan => self.resolve_title_plan(path, &text, cross_reference),
        }
    }

    fn resolve_title_plan(
        &self,
        path: &Path,
        text: &str,
        cross_reference: Option<&Upin>,
    ) -> Option<Extraction> {
        if let Some(extraction) = title_plan_from_text(text, cross_reference) {
            return Some(extraction);
        }
        self.resolve_by_ocr(path, cross_reference)
    }

    /// Last resort: render the title-plan page and re-run the text
    /// strategies over the recognized text. Render and recognition failures
    /// yield absence, never an error.
    fn resolve_by_ocr(&self, path: &Path, cross_reference: Option<&Upin>) -> Option<Extraction> {
        let ocr = self.ocr?;

        let image = match self.toolkit.render_page(path, TITLE_PLAN_PHYSICAL_PAGE) {
            Ok(image) => image,
            Err(err) => {
                debug!(file = %path.display(), error = %err, "page render failed, skipping OCR");
                return None;
            }
        };

        let recognized = match ocr.recognize(&image) {
            Ok(text) => text,
            Err(err) => {
                debug!(file = %path.display(), error = %err, "recognition failed, skipping OCR");
                return None;
            }
        };

        title_plan_from_text(&recognized, cross_reference).map(|extraction| Extraction {
            strategy: Strategy::Ocr,
            ..extraction
        })
    }
}

/// Collapse whitespace runs to single spaces.
fn normalize(text: &str) -> String {
    static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    WS.replace_all(text, " ").into_owned()
}

/// Certificate-side primary pattern: an optional "Title Number"/"Title No"
/// label, then four slash/hyphen-delimited segments before a final 4-6
/// digit group, which is the UPIN.
fn extract_certificate(text: &str) -> Option<Upin> {
    static CERT_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)(?:Title\s+(?:Number|No)\s*[:\-]?\s*)?\d+\s*[-/]\s*\d+\s*[-/]\s*\d+\s*[-/]\s*\w+\s*[-/]\s*(\d{4,6})\b",
        )
        .unwrap()
    });

    let text = normalize(text);
    CERT_RE.captures(&text).map(|caps| Upin::new(&caps[1]))
}

/// Title-plan text strategies 1-3, in cascade order.
fn title_plan_from_text(text: &str, cross_reference: Option<&Upin>) -> Option<Extraction> {
    let text = normalize(text);

    // Primary: optional "Title Plan No" label, then digits-word-digits with
    // the trailing group as the UPIN.
    static PLAN_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)(?:Title\s+Plan\s+No\s*[:\-]?\s*)?\d{4,6}\s*[-/]\s*\w+\s*[-/]\s*(\d{4,6})\b",
        )
        .unwrap()
    });
    if let Some(caps) = PLAN_RE.captures(&text) {
        return Some(Extraction {
            upin: Upin::new(&caps[1]),
            strategy: Strategy::Primary,
        });
    }

    // Fallback: "Parcel No" label.
    static PARCEL_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)Parcel\s+No\s*[:\-]?\s*(\d{4,6})\b").unwrap());
    if let Some(caps) = PARCEL_RE.captures(&text) {
        return Some(Extraction {
            upin: Upin::new(&caps[1]),
            strategy: Strategy::ParcelLabel,
        });
    }

    // Fallback: the certificate UPIN appearing verbatim as a whole word.
    if let Some(reference) = cross_reference {
        let pattern = format!(r"\b{}\b", regex::escape(reference.as_str()));
        if let Ok(word) = Regex::new(&pattern) {
            if word.is_match(&text) {
                return Some(Extraction {
                    upin: reference.clone(),
                    strategy: Strategy::CrossReference,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::mock::{MockOcr, MockToolkit};
    use std::path::PathBuf;

    fn upin(digits: &str) -> Upin {
        Upin::new(digits)
    }

    // =========================================================================
    // Certificate primary pattern
    // =========================================================================

    #[test]
    fn test_certificate_structured_reference() {
        assert_eq!(
            extract_certificate("1/2/3/AB/5678 Title Number"),
            Some(upin("5678"))
        );
    }

    #[test]
    fn test_certificate_with_label_prefix() {
        assert_eq!(
            extract_certificate("Title Number: 12/34/56/XY/004521"),
            Some(upin("004521"))
        );
        assert_eq!(
            extract_certificate("Title No - 1-2-3-AB-9876"),
            Some(upin("9876"))
        );
    }

    #[test]
    fn test_certificate_case_insensitive_and_whitespace() {
        assert_eq!(
            extract_certificate("title  number\n 1 / 2 / 3 / ab / 5678"),
            Some(upin("5678"))
        );
    }

    #[test]
    fn test_certificate_rejects_short_final_group() {
        assert_eq!(extract_certificate("1/2/3/AB/567"), None);
    }

    #[test]
    fn test_certificate_ignores_title_plan_shapes() {
        assert_eq!(extract_certificate("1234-AB-5678 Title Plan"), None);
        assert_eq!(extract_certificate("Parcel No: 4321"), None);
    }

    // =========================================================================
    // Title-plan text strategies
    // =========================================================================

    #[test]
    fn test_title_plan_structured_reference() {
        let found = title_plan_from_text("1234-AB-5678 Title Plan", None).unwrap();
        assert_eq!(found.upin, upin("5678"));
        assert_eq!(found.strategy, Strategy::Primary);
    }

    #[test]
    fn test_title_plan_with_label_prefix() {
        let found = title_plan_from_text("Title Plan No: 1234/lot/5678", None).unwrap();
        assert_eq!(found.upin, upin("5678"));
        assert_eq!(found.strategy, Strategy::Primary);
    }

    #[test]
    fn test_title_plan_parcel_label_fallback() {
        let found = title_plan_from_text("Survey sheet 3. Parcel No: 4321", None).unwrap();
        assert_eq!(found.upin, upin("4321"));
        assert_eq!(found.strategy, Strategy::ParcelLabel);
    }

    #[test]
    fn test_title_plan_cross_reference_fallback() {
        let cert = upin("9999");
        let found =
            title_plan_from_text("survey notes mention 9999 in passing", Some(&cert)).unwrap();
        assert_eq!(found.upin, cert);
        assert_eq!(found.strategy, Strategy::CrossReference);
    }

    #[test]
    fn test_cross_reference_requires_whole_word() {
        let cert = upin("9999");
        assert_eq!(title_plan_from_text("ref 19999 and 99990", Some(&cert)), None);
    }

    #[test]
    fn test_primary_wins_over_later_strategies() {
        // Text matching both the structured pattern and containing the
        // cross-reference UPIN: the earlier strategy is reported.
        let cert = upin("1111");
        let found =
            title_plan_from_text("1234-AB-5678 and also 1111", Some(&cert)).unwrap();
        assert_eq!(found.upin, upin("5678"));
        assert_eq!(found.strategy, Strategy::Primary);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert_eq!(title_plan_from_text("", None), None);
        assert_eq!(extract_certificate(""), None);
    }

    // =========================================================================
    // Cascade over the toolkit, OCR fallback
    // =========================================================================

    #[test]
    fn test_resolve_certificate_never_uses_ocr() {
        let toolkit = MockToolkit::new().with_pages("doc.pdf", vec!["no patterns here"]);
        let ocr = MockOcr::recognizing("1/2/3/AB/5678");
        let extractor = IdentifierExtractor::new(&toolkit).with_ocr(&ocr);

        let path = PathBuf::from("doc.pdf");
        assert_eq!(extractor.resolve(&path, 0, PageRole::Certificate, None), None);
        assert_eq!(toolkit.render_calls(), 0);
        assert_eq!(ocr.calls(), 0);
    }

    #[test]
    fn test_resolve_title_plan_via_ocr() {
        let toolkit = MockToolkit::new()
            .with_pages("doc.pdf", vec!["blank", "blank"])
            .with_render(vec![1, 2, 3]);
        let ocr = MockOcr::recognizing("Parcel No 7777");
        let extractor = IdentifierExtractor::new(&toolkit).with_ocr(&ocr);

        let path = PathBuf::from("doc.pdf");
        let found = extractor
            .resolve(&path, 1, PageRole::TitlePlan, None)
            .unwrap();
        assert_eq!(found.upin, upin("7777"));
        assert_eq!(found.strategy, Strategy::Ocr);
        assert_eq!(toolkit.render_calls(), 1);
    }

    #[test]
    fn test_ocr_skipped_when_text_strategy_hits() {
        let toolkit = MockToolkit::new()
            .with_pages("doc.pdf", vec!["blank", "1234-AB-5678 Title Plan"])
            .with_render(vec![1, 2, 3]);
        let ocr = MockOcr::recognizing("Parcel No 7777");
        let extractor = IdentifierExtractor::new(&toolkit).with_ocr(&ocr);

        let path = PathBuf::from("doc.pdf");
        let found = extractor
            .resolve(&path, 1, PageRole::TitlePlan, None)
            .unwrap();
        assert_eq!(found.upin, upin("5678"));
        assert_eq!(toolkit.render_calls(), 0);
        assert_eq!(ocr.calls(), 0);
    }

    #[test]
    fn test_render_failure_is_absorbed() {
        // No render bytes configured: render fails, cascade yields absence.
        let toolkit = MockToolkit::new().with_pages("doc.pdf", vec!["blank", "blank"]);
        let ocr = MockOcr::recognizing("Parcel No 7777");
        let extractor = IdentifierExtractor::new(&toolkit).with_ocr(&ocr);

        let path = PathBuf::from("doc.pdf");
        assert_eq!(extractor.resolve(&path, 1, PageRole::TitlePlan, None), None);
        assert_eq!(ocr.calls(), 0);
    }

    #[test]
    fn test_recognition_failure_is_absorbed() {
        let toolkit = MockToolkit::new()
            .with_pages("doc.pdf", vec!["blank", "blank"])
            .with_render(vec![1, 2, 3]);
        let ocr = MockOcr::failing();
        let extractor = IdentifierExtractor::new(&toolkit).with_ocr(&ocr);

        let path = PathBuf::from("doc.pdf");
        assert_eq!(extractor.resolve(&path, 1, PageRole::TitlePlan, None), None);
        assert_eq!(ocr.calls(), 1);
    }

    #[test]
    fn test_missing_page_collapses_to_absence() {
        let toolkit = MockToolkit::new().with_pages("doc.pdf", vec!["only one page"]);
        let extractor = IdentifierExtractor::new(&toolkit);

        let path = PathBuf::from("doc.pdf");
        assert_eq!(extractor.resolve(&path, 1, PageRole::TitlePlan, None), None);
    }

    #[test]
    fn test_ocr_text_can_use_cross_reference() {
        let cert = upin("9999");
        let toolkit = MockToolkit::new()
            .with_pages("doc.pdf", vec!["blank", "blank"])
            .with_render(vec![1]);
        let ocr = MockOcr::recognizing("smudged scan but 9999 survived");
        let extractor = IdentifierExtractor::new(&toolkit).with_ocr(&ocr);

        let path = PathBuf::from("doc.pdf");
        let found = extractor
            .resolve(&path, 1, PageRole::TitlePlan, Some(&cert))
            .unwrap();
        assert_eq!(found.upin, cert);
        assert_eq!(found.strategy, Strategy::Ocr);
    }
}
