//! Pairing and merging of certificates with their title plans.
//!
//! Pairing is filename-based: a certificate's trailing digit run is looked
//! up against the title-plan index. Content is not inspected here; that is
//! the verification stage's job.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::error::PipelineError;
use crate::index::{DOC_EXTENSION, index_title_plans, list_documents};
use crate::progress::{ProgressEvent, ProgressSink, display_name};
use crate::toolkit::PdfToolkit;
use crate::upin::FileKey;

/// Why a certificate was left unmerged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No trailing digit run of at least four digits in the filename.
    NoFileKey,
    /// No title plan indexed under the certificate's key.
    NoMatchingPlan,
}

/// Outcome of one merge pass. A dry run reports the same counts as a real
/// one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub merged_count: usize,
    pub skipped: Vec<String>,
}

pub struct MergeCoordinator<'a> {
    toolkit: &'a dyn PdfToolkit,
}

impl<'a> MergeCoordinator<'a> {
    pub fn new(toolkit: &'a dyn PdfToolkit) -> Self {
        Self { toolkit }
    }

    /// Merge every pairable certificate in `cert_folder` with its indexed
    /// title plan, writing `{upin}.pdf` into `output_folder` and deleting
    /// both sources on success. Unpairable certificates are recorded as
    /// skipped and left in place; a failed write is reported and leaves
    /// both sources untouched.
    pub fn merge_all(
        &self,
        cert_folder: &Path,
        plan_folder: &Path,
        output_folder: &Path,
        dry_run: bool,
        progress: ProgressSink,
    ) -> Result<MergeReport, PipelineError> {
        // The index is fully built before any lookup.
        let plans = index_title_plans(plan_folder)?;
        let certificates = list_documents(cert_folder)?;

        std::fs::create_dir_all(output_folder).map_err(|source| {
            PipelineError::CreateOutputFolder {
                folder: output_folder.to_path_buf(),
                source,
            }
        })?;

        let mut report = MergeReport::default();

        for cert_path in certificates {
            let file_name = display_name(&cert_path);

            let Some(key) = FileKey::from_path(&cert_path) else {
                progress(ProgressEvent::MergeSkipped {
                    file: file_name.clone(),
                    reason: SkipReason::NoFileKey,
                });
                report.skipped.push(file_name);
                continue;
            };

            let Some(plan_path) = plans.get(&key) else {
                progress(ProgressEvent::MergeSkipped {
                    file: file_name.clone(),
                    reason: SkipReason::NoMatchingPlan,
                });
                report.skipped.push(file_name);
                continue;
            };

            let output_path = output_folder.join(format!("{key}.{DOC_EXTENSION}"));
            progress(ProgressEvent::Merged {
                certificate: file_name.clone(),
                title_plan: display_name(plan_path),
                output: display_name(&output_path),
            });

            if dry_run {
                report.merged_count += 1;
                continue;
            }

            match self.toolkit.concat(&cert_path, plan_path, &output_path) {
                Ok(()) => {
                    report.merged_count += 1;
                    delete_sources(&cert_path, plan_path, progress);
                }
                Err(err) => {
                    warn!(file = %file_name, error = %err, "merge failed, sources left in place");
                    progress(ProgressEvent::FileError {
                        file: file_name,
                        message: format!("merge failed: {err}"),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Delete both sources of a successfully written merge. A failed delete is
/// reported; the merged output stands either way.
fn delete_sources(cert: &Path, plan: &Path, progress: ProgressSink) {
    for path in [cert, plan] {
        let name = display_name(path);
        match std::fs::remove_file(path) {
            Ok(()) => progress(ProgressEvent::SourceDeleted { file: name }),
            Err(err) => {
                warn!(file = %name, error = %err, "failed to delete merged source");
                progress(ProgressEvent::FileError {
                    file: name,
                    message: format!("delete failed: {err}"),
                });
            }
        }
    }
}
