//! Filename-only cleaning stages that feed the merge step.
//!
//! These inspect names, never content. Certificates come in from the
//! scanner with arbitrary prefixes and suffixes around a `{tlma}-{upin}`
//! core; title plans come in as `{prefix}-{upin}.pdf`. Both stages copy
//! into the output folder under the normalized name and leave the input
//! untouched.

use std::path::Path;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::PipelineError;
use crate::index::{DOC_EXTENSION, list_documents};
use crate::progress::{ProgressEvent, ProgressSink, display_name};

/// Special TLMA code: output names drop the authority prefix and keep the
/// bare digit run.
pub const FALLBACK_TLMA: &str = "fallback";

/// Outcome of one cleaning pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub renamed_count: usize,
    pub fallback_count: usize,
    pub skipped: Vec<String>,
}

/// The `{tlma}-{digits}` core located inside a certificate filename.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CertName {
    tlma: String,
    upin_digits: String,
}

/// Locates `{tlma}-{digits>=4}` in certificate filenames. The pattern is
/// built from runtime input, so it is compiled once per run here rather
/// than per file.
struct CertNameMatcher {
    tlma: String,
    pattern: Option<Regex>,
}

impl CertNameMatcher {
    fn new(tlma_code: &str) -> Self {
        let tlma = tlma_code.replace(' ', "_").to_lowercase();
        let pattern = Regex::new(&format!(r"{}-(\d{{4,}})", regex::escape(&tlma))).ok();
        Self { tlma, pattern }
    }

    /// Spaces are folded to underscores and matching is lowercase, so
    /// scanner artifacts like `Scan TLMA 07-12345 (1).pdf` still parse.
    fn parse(&self, file_name: &str) -> Option<CertName> {
        let name = file_name.replace(' ', "_").to_lowercase();
        let caps = self.pattern.as_ref()?.captures(&name)?;
        Some(CertName {
            tlma: self.tlma.clone(),
            upin_digits: caps[1].to_string(),
        })
    }
}

/// Normalize certificate filenames to `{tlma}-{upin}.pdf` (or `{upin}.pdf`
/// under the `fallback` code). A TLMA code is mandatory; files whose names
/// don't contain it are reported and skipped.
pub fn clean_certificates(
    input_folder: &Path,
    output_folder: &Path,
    tlma_code: &str,
    dry_run: bool,
    progress: ProgressSink,
) -> Result<CleanReport, PipelineError> {
    if tlma_code.trim().is_empty() {
        return Err(PipelineError::MissingTlmaCode);
    }

    let files = list_documents(input_folder)?;
    create_output(output_folder)?;

    let matcher = CertNameMatcher::new(tlma_code);
    let mut report = CleanReport::default();

    for path in files {
        let file_name = display_name(&path);

        let Some(parsed) = matcher.parse(&file_name) else {
            warn!(file = %file_name, tlma = tlma_code, "TLMA code not found in filename");
            progress(ProgressEvent::CleanSkipped {
                file: file_name.clone(),
                reason: format!("TLMA code '{tlma_code}' not found"),
            });
            report.skipped.push(file_name);
            continue;
        };

        let new_name = if parsed.tlma == FALLBACK_TLMA {
            report.fallback_count += 1;
            format!("{}.{DOC_EXTENSION}", parsed.upin_digits)
        } else {
            report.renamed_count += 1;
            format!("{}-{}.{DOC_EXTENSION}", parsed.tlma, parsed.upin_digits)
        };

        progress(ProgressEvent::Renamed {
            from: file_name.clone(),
            to: new_name.clone(),
        });

        if !dry_run {
            copy_as(&path, output_folder, &new_name, &file_name, progress);
        }
    }

    Ok(report)
}

/// Normalize title-plan filenames by stripping everything up to and
/// including the first `-`. Files without a `-` are skipped.
pub fn clean_title_plans(
    input_folder: &Path,
    output_folder: &Path,
    dry_run: bool,
    progress: ProgressSink,
) -> Result<CleanReport, PipelineError> {
    let files = list_documents(input_folder)?;
    create_output(output_folder)?;

    let mut report = CleanReport::default();

    for path in files {
        let file_name = display_name(&path);

        let Some((_, remainder)) = file_name.split_once('-') else {
            progress(ProgressEvent::CleanSkipped {
                file: file_name.clone(),
                reason: "no '-' in filename".into(),
            });
            report.skipped.push(file_name);
            continue;
        };

        let new_name = remainder.trim().to_string();
        report.renamed_count += 1;
        progress(ProgressEvent::Renamed {
            from: file_name.clone(),
            to: new_name.clone(),
        });

        if !dry_run {
            copy_as(&path, output_folder, &new_name, &file_name, progress);
        }
    }

    Ok(report)
}

fn create_output(output_folder: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output_folder).map_err(|source| PipelineError::CreateOutputFolder {
        folder: output_folder.to_path_buf(),
        source,
    })
}

fn copy_as(
    path: &Path,
    output_folder: &Path,
    new_name: &str,
    file_name: &str,
    progress: ProgressSink,
) {
    if let Err(err) = std::fs::copy(path, output_folder.join(new_name)) {
        warn!(file = %file_name, error = %err, "copy failed");
        progress(ProgressEvent::FileError {
            file: file_name.to_string(),
            message: format!("copy failed: {err}"),
        });
    }
}
