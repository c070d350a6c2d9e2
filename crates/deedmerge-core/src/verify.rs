//! Content-based verification of merged documents.
//!
//! Each merged document is a one-shot state machine: resolve the
//! certificate UPIN from page 0, resolve the title-plan UPIN from page 1
//! (with the certificate UPIN available as a cross-reference), then land in
//! exactly one of Verified, Mismatched or Unreadable. Only Verified has a
//! filesystem side effect; the other two leave the file where it is for
//! manual review.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::error::PipelineError;
use crate::extract::{IdentifierExtractor, PageRole};
use crate::index::list_documents;
use crate::progress::{ProgressEvent, ProgressSink, display_name};
use crate::toolkit::{OcrEngine, PdfToolkit};
use crate::upin::Upin;

/// Characters of raw page text dumped per page for unreadable documents.
const PAGE_DUMP_CHARS: usize = 500;

/// Which sides of a merged document failed to yield a UPIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingSides {
    pub certificate: bool,
    pub title_plan: bool,
}

impl MissingSides {
    /// Human-readable enumeration of the failed sides, e.g.
    /// `"certificate UPIN, title plan UPIN"`.
    pub fn describe(&self) -> String {
        let mut sides = Vec::new();
        if self.certificate {
            sides.push("certificate UPIN");
        }
        if self.title_plan {
            sides.push("title plan UPIN");
        }
        sides.join(", ")
    }
}

/// Terminal classification of one merged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Both sides claim the same UPIN.
    Verified(Upin),
    /// Both sides resolved to different UPINs.
    Mismatched { certificate: Upin, title_plan: Upin },
    /// At least one side yielded nothing after the full cascade.
    Unreadable { missing: MissingSides },
}

/// Outcome of one verification pass. A dry run reports the same counts as
/// a real one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub verified_count: usize,
    pub mismatched: Vec<String>,
    pub unreadable: Vec<String>,
}

pub struct VerificationEngine<'a> {
    toolkit: &'a dyn PdfToolkit,
    extractor: IdentifierExtractor<'a>,
}

impl<'a> VerificationEngine<'a> {
    pub fn new(toolkit: &'a dyn PdfToolkit) -> Self {
        Self {
            toolkit,
            extractor: IdentifierExtractor::new(toolkit),
        }
    }

    /// Enable the OCR fallback for title-plan pages.
    pub fn with_ocr(mut self, ocr: &'a dyn OcrEngine) -> Self {
        self.extractor = IdentifierExtractor::new(self.toolkit).with_ocr(ocr);
        self
    }

    /// Classify every merged document in `merged_folder`. Verified files
    /// are copied into `output_folder` (same filename) and their source
    /// deleted; mismatched and unreadable files stay put.
    pub fn verify_all(
        &self,
        merged_folder: &Path,
        output_folder: &Path,
        dry_run: bool,
        progress: ProgressSink,
    ) -> Result<VerifyReport, PipelineError> {
        let files = list_documents(merged_folder)?;

        std::fs::create_dir_all(output_folder).map_err(|source| {
            PipelineError::CreateOutputFolder {
                folder: output_folder.to_path_buf(),
                source,
            }
        })?;

        let mut report = VerifyReport::default();

        for path in files {
            let file_name = display_name(&path);
            match self.classify(&path) {
                VerificationOutcome::Verified(upin) => {
                    progress(ProgressEvent::Verified {
                        file: file_name.clone(),
                        upin,
                    });
                    report.verified_count += 1;
                    if !dry_run {
                        relocate(&path, output_folder, &file_name, progress);
                    }
                }
                VerificationOutcome::Mismatched {
                    certificate,
                    title_plan,
                } => {
                    progress(ProgressEvent::Mismatched {
                        file: file_name.clone(),
                        certificate,
                        title_plan,
                    });
                    report.mismatched.push(file_name);
                }
                VerificationOutcome::Unreadable { missing } => {
                    progress(ProgressEvent::Unreadable {
                        file: file_name.clone(),
                        missing,
                    });
                    self.dump_pages(&path, &file_name, progress);
                    report.unreadable.push(file_name);
                }
            }
        }

        Ok(report)
    }

    /// Classify one merged document. Page 0 carries the certificate claim,
    /// page 1 the title-plan claim.
    pub fn classify(&self, path: &Path) -> VerificationOutcome {
        let certificate = self
            .extractor
            .resolve(path, 0, PageRole::Certificate, None)
            .map(|extraction| extraction.upin);
        let title_plan = self
            .extractor
            .resolve(path, 1, PageRole::TitlePlan, certificate.as_ref())
            .map(|extraction| extraction.upin);

        match (certificate, title_plan) {
            (Some(certificate), Some(title_plan)) => {
                if certificate == title_plan {
                    VerificationOutcome::Verified(certificate)
                } else {
                    VerificationOutcome::Mismatched {
                        certificate,
                        title_plan,
                    }
                }
            }
            (certificate, title_plan) => VerificationOutcome::Unreadable {
                missing: MissingSides {
                    certificate: certificate.is_none(),
                    title_plan: title_plan.is_none(),
                },
            },
        }
    }

    /// Emit the head of each page's raw text so an operator can see what
    /// the cascade was working with.
    fn dump_pages(&self, path: &Path, file_name: &str, progress: ProgressSink) {
        let count = match self.toolkit.page_count(path) {
            Ok(count) => count,
            Err(err) => {
                progress(ProgressEvent::FileError {
                    file: file_name.to_string(),
                    message: format!("debug dump failed: {err}"),
                });
                return;
            }
        };

        for page_index in 0..count {
            let text = self.toolkit.page_text(path, page_index).unwrap_or_default();
            let head: String = text.chars().take(PAGE_DUMP_CHARS).collect();
            progress(ProgressEvent::PageDump {
                file: file_name.to_string(),
                page_index,
                text: head,
            });
        }
    }
}

/// Copy a verified document into the output folder, then delete the source.
/// A failed delete is reported but the copy stands; a failed copy leaves
/// the source in place.
fn relocate(path: &Path, output_folder: &Path, file_name: &str, progress: ProgressSink) {
    let dest = output_folder.join(file_name);
    if let Err(err) = std::fs::copy(path, &dest) {
        warn!(file = %file_name, error = %err, "copy to verified folder failed");
        progress(ProgressEvent::FileError {
            file: file_name.to_string(),
            message: format!("copy failed: {err}"),
        });
        return;
    }

    match std::fs::remove_file(path) {
        Ok(()) => progress(ProgressEvent::SourceDeleted {
            file: file_name.to_string(),
        }),
        Err(err) => {
            warn!(file = %file_name, error = %err, "failed to delete verified source");
            progress(ProgressEvent::FileError {
                file: file_name.to_string(),
                message: format!("delete failed: {err}"),
            });
        }
    }
}
