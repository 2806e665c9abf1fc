//! Error types shared by discovery, attachment and line reading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while tailing a set of patterns.
///
/// None of these are fatal to a running aggregator: each one is scoped to the
/// pattern or path that produced it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Failed to stat {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("File removed: {}", .0.display())]
    Removed(PathBuf),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_display() {
        let err = Error::Removed(PathBuf::from("/var/log/app.log"));
        assert_eq!(err.to_string(), "File removed: /var/log/app.log");
    }

    #[test]
    fn test_pattern_display() {
        let source = glob::Pattern::new("[").unwrap_err();
        let err = Error::Pattern {
            pattern: "[".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("Invalid pattern \"[\""));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
