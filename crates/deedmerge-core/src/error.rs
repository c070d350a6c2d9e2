use std::path::PathBuf;

use thiserror::Error;

/// Fatal, batch-aborting failures.
///
/// Per-document faults never surface here; they become classification
/// outcomes and progress events, and the batch continues.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source folder does not exist: {0}")]
    SourceFolderMissing(PathBuf),
    #[error("failed to list folder {folder}: {source}")]
    ListFolder {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create output folder {folder}: {source}")]
    CreateOutputFolder {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a TLMA code is required and none was supplied")]
    MissingTlmaCode,
}
