//! Identifier newtypes.
//!
//! A parcel identifier shows up in two places with very different levels of
//! trust: as a digit run inside a filename (a cheap lookup key, assigned by
//! the cleaning stage) and as a claim extracted from page content (what
//! verification actually checks). The two are kept as separate types so a
//! filename-derived value can never silently stand in for a verified one.
//!
//! Identifiers are digit strings compared as strings; `0045` and `45` are
//! different parcels.

use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// A content-derived Unique Parcel Identifier Number: the UPIN a document
/// page claims, as resolved by the extraction cascade.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Upin(String);

impl Upin {
    pub fn new(digits: impl Into<String>) -> Self {
        Self(digits.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Upin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A filename-derived lookup key used for pairing. Unverified: it reflects
/// what the cleaning stage put into the name, not what the pages say.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileKey(String);

impl FileKey {
    /// Key a title plan by its filename stem, verbatim.
    pub fn from_stem(stem: &str) -> Self {
        Self(stem.to_string())
    }

    /// Derive a key from a certificate filename: the trailing run of at
    /// least four digits immediately before the extension. Shorter runs
    /// never produce a key.
    pub fn from_path(path: &Path) -> Option<Self> {
        static TRAILING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4,})$").unwrap());

        let stem = path.file_stem()?.to_str()?;
        let caps = TRAILING_DIGITS.captures(stem)?;
        Some(Self(caps[1].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_key_from_trailing_digits() {
        let path = PathBuf::from("ANY123-0045.pdf");
        assert_eq!(FileKey::from_path(&path), Some(FileKey::from_stem("0045")));
    }

    #[test]
    fn test_key_preserves_leading_zeros() {
        let path = PathBuf::from("tlma-000123.pdf");
        assert_eq!(
            FileKey::from_path(&path).unwrap().as_str(),
            "000123"
        );
    }

    #[test]
    fn test_short_digit_run_yields_no_key() {
        let path = PathBuf::from("short-123.pdf");
        assert_eq!(FileKey::from_path(&path), None);
    }

    #[test]
    fn test_no_digits_yields_no_key() {
        let path = PathBuf::from("scan-final.pdf");
        assert_eq!(FileKey::from_path(&path), None);
    }

    #[test]
    fn test_digits_must_be_trailing() {
        // Digits followed by letters are not a trailing run.
        let path = PathBuf::from("1234-copy.pdf");
        assert_eq!(FileKey::from_path(&path), None);
    }

    #[test]
    fn test_upin_equality_is_string_equality() {
        assert_ne!(Upin::new("0045"), Upin::new("45"));
        assert_eq!(Upin::new("5678"), Upin::new("5678"));
    }
}
