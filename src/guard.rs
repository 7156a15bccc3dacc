//! File name validation for the artifact read path.
//!
//! User-supplied names must pass [`FileNameGuard::validate`] before they are
//! joined onto the storage directory.

use crate::error::{Error, Result};
use crate::key::ARTIFACT_EXTENSION;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

/// `<stem>.<extension>`: ASCII word characters and hyphens, one dot.
const SAFE_NAME_PATTERN: &str = r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_]+$";

/// A file name that passed the guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafeName(String);

impl SafeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join onto `dir`. The name has no separators, so the result stays in `dir`.
    pub fn resolve_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates caller-supplied artifact names.
#[derive(Clone, Debug)]
pub struct FileNameGuard {
    pattern: Regex,
}

impl FileNameGuard {
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the name pattern fails to compile.
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(SAFE_NAME_PATTERN)
            .map_err(|e| Error::ConfigError(format!("invalid file name pattern: {}", e)))?;
        Ok(FileNameGuard { pattern })
    }

    /// Normalize `raw` to a `.pdf` name and check its shape.
    ///
    /// A name not ending in `.pdf` gets the suffix appended, so `abc` and
    /// `abc.pdf` name the same artifact.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalFileAccess` for anything but `<stem>.<ext>`
    /// (separators, `..`, whitespace, extra dots, other punctuation).
    pub fn validate(&self, raw: &str) -> Result<SafeName> {
        let suffix = format!(".{}", ARTIFACT_EXTENSION);
        let name = if raw.ends_with(&suffix) {
            raw.to_string()
        } else {
            format!("{}{}", raw, suffix)
        };

        if self.is_safe(&name) {
            Ok(SafeName(name))
        } else {
            warn!("Rejected file name {:?}", raw);
            Err(Error::IllegalFileAccess)
        }
    }

    /// Shape check alone, without normalization.
    pub fn is_safe(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}
