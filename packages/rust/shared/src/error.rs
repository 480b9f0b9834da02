//! Error types for docweave.
//!
//! Library crates use [`DocweaveError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docweave operations.
#[derive(Debug, thiserror::Error)]
pub enum DocweaveError {
    /// A source path does not exist.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Filesystem I/O error with path context.
    #[error("I/O error at {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid line-range specification.
    #[error("invalid range '{input}': {message}")]
    Range { input: String, message: String },

    /// A manifest or live-bundle expansion re-entered a path still
    /// being expanded, or exceeded the nesting ceiling.
    #[error("circular dependency detected: {path} (chain: {})", format_chain(.chain))]
    CircularDependency { path: String, chain: Vec<PathBuf> },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocweaveError>;

impl DocweaveError {
    /// Create a not-found error for a path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    ///
    /// Maps `ErrorKind::NotFound` to the distinguished [`DocweaveError::NotFound`]
    /// variant so callers can match on it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::File { path, source }
        }
    }

    /// Create a range error from the offending sub-spec and a message.
    pub fn range(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Range {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a circular-dependency error from the closing path and the
    /// ordered expansion chain.
    pub fn circular(path: impl Into<String>, chain: Vec<PathBuf>) -> Self {
        Self::CircularDependency {
            path: path.into(),
            chain,
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocweaveError::range("L20-10", "start line after end line");
        assert_eq!(
            err.to_string(),
            "invalid range 'L20-10': start line after end line"
        );

        let err = DocweaveError::config("missing defaults section");
        assert!(err.to_string().contains("missing defaults section"));
    }

    #[test]
    fn io_not_found_maps_to_distinguished_variant() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = DocweaveError::io("/tmp/missing.txt", io);
        assert!(matches!(err, DocweaveError::NotFound { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = DocweaveError::io("/tmp/locked.txt", io);
        assert!(matches!(err, DocweaveError::File { .. }));
    }

    #[test]
    fn circular_error_lists_chain_in_order() {
        let err = DocweaveError::circular(
            "/docs/a.bundle.txt",
            vec![
                PathBuf::from("/docs/a.bundle.txt"),
                PathBuf::from("/docs/b.bundle.txt"),
            ],
        );
        let msg = err.to_string();
        let a = msg.find("a.bundle.txt").unwrap();
        let b = msg.find("b.bundle.txt").unwrap();
        assert!(a < b);
    }
}
