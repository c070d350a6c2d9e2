//! Core pipeline for pairing and verifying scanned land-registry documents.
//!
//! Each parcel is covered by two scanned documents: a certificate whose
//! first page claims a Unique Parcel Identifier Number (UPIN) through a
//! structured reference, and a title plan whose page claims the same UPIN
//! through a shorter reference or a "Parcel No" label. The pipeline pairs
//! the two by filename, merges them into a single document, and then checks
//! that the merged document's two halves actually claim the same UPIN.
//!
//! Stages, in order:
//!
//! 1. Filename cleaning ([`clean`]): pure name transforms that normalize
//!    scanner output into `{tlma}-{upin}.pdf` / `{upin}.pdf` shapes.
//! 2. Pairing and merging ([`index`], [`merge`]): title plans are indexed
//!    by filename stem, certificates matched by a trailing digit run, and
//!    each pair concatenated into `{upin}.pdf`.
//! 3. Verification ([`verify`], [`extract`]): the content-based extraction
//!    cascade resolves each side's UPIN and classifies the document as
//!    Verified, Mismatched, or Unreadable.
//!
//! PDF access and OCR are behind the [`toolkit`] traits so the heavyweight
//! native backends stay out of this crate.

pub mod clean;
pub mod config_file;
pub mod error;
pub mod extract;
pub mod index;
pub mod merge;
pub mod progress;
pub mod toolkit;
pub mod upin;
pub mod verify;

pub use clean::CleanReport;
pub use error::PipelineError;
pub use extract::{Extraction, IdentifierExtractor, PageRole, Strategy};
pub use merge::{MergeCoordinator, MergeReport, SkipReason};
pub use progress::{ProgressEvent, ProgressSink};
pub use toolkit::{BackendError, OcrEngine, OcrError, PdfToolkit};
pub use upin::{FileKey, Upin};
pub use verify::{MissingSides, VerificationEngine, VerificationOutcome, VerifyReport};
