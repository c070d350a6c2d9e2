//! Title-plan indexing and folder listing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PipelineError;
use crate::upin::FileKey;

/// Extension of the documents the pipeline handles, matched
/// case-insensitively when listing folders.
pub const DOC_EXTENSION: &str = "pdf";

/// Build the UPIN -> title-plan path mapping for one folder.
///
/// Keys are filename stems, taken verbatim with no pattern matching.
/// Duplicate stems keep the last-listed file; the discarded path stays on
/// disk and the conflict is reported through a warning.
pub fn index_title_plans(folder: &Path) -> Result<BTreeMap<FileKey, PathBuf>, PipelineError> {
    let mut index = BTreeMap::new();

    for path in list_documents(folder)? {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let key = FileKey::from_stem(stem);
        if let Some(previous) = index.insert(key.clone(), path.clone()) {
            warn!(
                key = %key,
                kept = %path.display(),
                discarded = %previous.display(),
                "duplicate title plan stem, keeping last-listed file"
            );
        }
    }

    Ok(index)
}

/// List immediate files in `folder` carrying the document extension, in
/// filesystem listing order (no sort; order is not a correctness
/// dependency).
pub fn list_documents(folder: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !folder.is_dir() {
        return Err(PipelineError::SourceFolderMissing(folder.to_path_buf()));
    }

    let list_err = |source| PipelineError::ListFolder {
        folder: folder.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let path = entry.path();
        if path.is_file() && has_doc_extension(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn has_doc_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(DOC_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"stub").unwrap();
    }

    #[test]
    fn test_index_maps_stem_to_path() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "0045.pdf");
        touch(&dir, "0123.pdf");

        let index = index_title_plans(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get(&FileKey::from_stem("0045")),
            Some(&dir.path().join("0045.pdf"))
        );
    }

    #[test]
    fn test_index_ignores_other_extensions() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "0045.pdf");
        touch(&dir, "notes.txt");
        touch(&dir, "0046.PDF");

        let index = index_title_plans(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains_key(&FileKey::from_stem("0046")));
        assert!(!index.contains_key(&FileKey::from_stem("notes")));
    }

    #[test]
    fn test_index_keeps_stems_verbatim() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "plan-0045.pdf");

        let index = index_title_plans(dir.path()).unwrap();
        // No pattern matching on stems: the dash-prefixed name is its own key.
        assert!(index.contains_key(&FileKey::from_stem("plan-0045")));
        assert!(!index.contains_key(&FileKey::from_stem("0045")));
    }

    #[test]
    fn test_duplicate_stems_keep_one_entry() {
        let dir = TempDir::new().unwrap();
        // Same stem through the case-insensitive extension filter.
        touch(&dir, "0045.pdf");
        touch(&dir, "0045.PDF");

        let index = index_title_plans(dir.path()).unwrap();
        assert_eq!(index.len(), 1);

        // One of the two colliding files won; the other stays on disk.
        let kept = index.get(&FileKey::from_stem("0045")).unwrap();
        let candidates = [dir.path().join("0045.pdf"), dir.path().join("0045.PDF")];
        assert!(candidates.contains(kept));
        assert!(candidates.iter().all(|path| path.exists()));
    }

    #[test]
    fn test_missing_folder_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            index_title_plans(&missing),
            Err(PipelineError::SourceFolderMissing(_))
        ));
    }

    #[test]
    fn test_list_documents_skips_directories() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "0045.pdf");
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = list_documents(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }
}
