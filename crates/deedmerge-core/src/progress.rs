//! Structured progress events.
//!
//! Pipeline stages report through a single injected sink and never branch
//! on whether anyone is listening; the front end decides how to render the
//! stream. Events arrive in execution order, one per occurrence, with no
//! buffering.

use std::path::Path;

use crate::merge::SkipReason;
use crate::upin::Upin;
use crate::verify::MissingSides;

/// Events emitted by the pipeline stages, in execution order.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A cleaning stage produced a new name for a file.
    Renamed { from: String, to: String },
    /// A cleaning stage could not handle a file.
    CleanSkipped { file: String, reason: String },
    /// Two source documents were paired for merging.
    Merged {
        certificate: String,
        title_plan: String,
        output: String,
    },
    /// A certificate was left in place by the merge stage.
    MergeSkipped { file: String, reason: SkipReason },
    /// A merged document passed verification.
    Verified { file: String, upin: Upin },
    /// The two sides of a merged document claim different UPINs.
    Mismatched {
        file: String,
        certificate: Upin,
        title_plan: Upin,
    },
    /// One or both sides yielded no UPIN.
    Unreadable { file: String, missing: MissingSides },
    /// Head of a page's raw text, dumped for an unreadable document.
    PageDump {
        file: String,
        page_index: usize,
        text: String,
    },
    /// A source file was deleted after a successful merge or copy.
    SourceDeleted { file: String },
    /// A per-document error that did not stop the batch.
    FileError { file: String, message: String },
}

/// The injected sink the stages report through.
pub type ProgressSink<'a> = &'a dyn Fn(ProgressEvent);

/// File name for event payloads; falls back to the full path display for
/// pathological names.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
