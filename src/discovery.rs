//! Resolving glob patterns to tailable files.

use std::path::{Path, PathBuf};

use tokio::fs::metadata;

use crate::error::Error;

/// A regular file found by a discovery pass, with its size at that moment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Discovered {
    path: PathBuf,
    size: u64,
}

impl Discovered {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes when the file was found.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_inner(self) -> (PathBuf, u64) {
        (self.path, self.size)
    }
}

/// Expands `pattern` and returns the matching non-directory paths, in glob
/// order.
///
/// A malformed pattern fails the whole call. Entries that cannot be read or
/// stat'ed are logged and skipped; directories are skipped silently. Nothing
/// is cached, so every call globs again.
pub async fn discover(pattern: &str) -> Result<Vec<Discovered>, Error> {
    let entries = glob::glob(pattern).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(path = %e.path().display(), error = %e.error(), "glob error");
                continue;
            }
        };

        let meta = match metadata(&path).await {
            Ok(meta) => meta,
            Err(source) => {
                let err = Error::Metadata { path, source };
                tracing::warn!(error = %err, "skipping path");
                continue;
            }
        };

        if meta.is_dir() {
            continue;
        }

        found.push(Discovered {
            path,
            size: meta.len(),
        });
    }

    Ok(found)
}
