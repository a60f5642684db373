//! Picks the entries of a working directory that belong to one period.

use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use tracing::{error, info};

use crate::error::{Error, Result};

/// Entries matching `{working_directory}/{prefix}-*`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFileSet {
    paths: Vec<PathBuf>,
}

impl SelectedFileSet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl IntoIterator for SelectedFileSet {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

/// Lists files and directories directly under `working_directory` whose
/// name starts with `{prefix}-`. Fails with [`Error::NoMatch`] when there
/// are none.
pub fn select(working_directory: &Path, prefix: &str) -> Result<SelectedFileSet> {
    // Only the trailing `*` may act as a wildcard. An empty directory means
    // the current one, so the pattern stays relative.
    let pattern = Path::new(&Pattern::escape(&working_directory.to_string_lossy()))
        .join(format!("{}-*", Pattern::escape(prefix)))
        .to_string_lossy()
        .into_owned();

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries = glob_with(&pattern, options).map_err(|e| {
        error!(error = %e, pattern = %pattern, "[ARCHIVE][ERROR] Invalid selection pattern");
        Error::io(
            "invalid selection pattern for",
            working_directory,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => {
                let path = e.path().to_path_buf();
                error!(path = %path.display(), "[ARCHIVE][ERROR] Failed to read entry while selecting");
                return Err(Error::io("failed to read", path, e.into()));
            }
        }
    }

    if paths.is_empty() {
        error!(pattern = %pattern, "[ARCHIVE][ERROR] No target files");
        return Err(Error::NoMatch { pattern });
    }

    paths.sort();
    info!(count = paths.len(), pattern = %pattern, "[ARCHIVE] Selected target files");
    for path in &paths {
        info!(path = %path.display(), "[ARCHIVE] Target file");
    }

    Ok(SelectedFileSet { paths })
}
