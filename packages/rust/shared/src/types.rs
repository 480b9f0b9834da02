//! Core domain types for the docweave assembly pipeline.
//!
//! All entities here are transient: built during one assembly
//! invocation and discarded afterwards. Nothing is persisted.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{DocweaveError, Result};

/// An inclusive, 1-based line window within a file.
///
/// `end == 0` means "through the last line" (open-ended). Open ends
/// survive resolution so that windows computed from stale line counts
/// stay lenient at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    /// Inclusive end line, or 0 for end-of-file.
    pub end: usize,
}

impl LineRange {
    /// Create a range with validation: `start >= 1`, and `end >= start`
    /// unless `end == 0`.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start < 1 {
            return Err(DocweaveError::range(
                format!("{start}-{end}"),
                "start line must be at least 1",
            ));
        }
        if end != 0 && end < start {
            return Err(DocweaveError::range(
                format!("{start}-{end}"),
                "start line after end line",
            ));
        }
        Ok(Self { start, end })
    }

    /// The range covering an entire file.
    pub fn full() -> Self {
        Self { start: 1, end: 0 }
    }

    /// True if this range is open-ended (runs through EOF).
    pub fn is_open(&self) -> bool {
        self.end == 0
    }

    /// True if this range covers the whole file.
    pub fn is_full_file(&self) -> bool {
        self.start == 1 && self.end == 0
    }

    /// True if the given 1-based line number falls inside this range.
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && (self.end == 0 || line <= self.end)
    }
}

/// Classification of a user-supplied source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    /// Regular file (content extracted directly).
    File,
    /// Directory (expanded to member files).
    Directory,
    /// Glob pattern (expanded to matching files).
    Glob,
    /// Bundle manifest, recognized by the `.bundle.` name convention.
    Bundle,
}

/// A resolved source: the raw token plus its classification.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPath {
    /// The token exactly as the user gave it, range suffix included.
    pub original: String,
    /// Absolute path with symlinks dereferenced (range suffix stripped).
    /// For globs this is the pattern itself made absolute-ish; member
    /// paths carry the real locations.
    pub absolute: PathBuf,
    /// What the token turned out to be.
    pub kind: PathKind,
    /// Expanded member files for directories and globs, alphabetized.
    pub members: Vec<PathBuf>,
}

/// One block of assembled content, in final document order.
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    /// File the content came from.
    pub path: PathBuf,
    /// The resolved line windows that were extracted, declared order.
    pub ranges: Vec<LineRange>,
    /// Extracted (and directive-inlined) text.
    pub text: String,
    /// Manifest through which this block was reached, if any. Lets a
    /// renderer suppress repeated headers for consecutive blocks that
    /// share a source.
    pub provenance: Option<PathBuf>,
}

/// The assembled document: ordered blocks plus any option lines the
/// traversed manifests carried (verbatim, for the consumer to
/// interpret).
#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    pub blocks: Vec<ContentBlock>,
    pub option_lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_validation() {
        assert!(LineRange::new(1, 5).is_ok());
        assert!(LineRange::new(5, 5).is_ok());
        assert!(LineRange::new(3, 0).is_ok()); // open-ended
        assert!(LineRange::new(0, 5).is_err());
        assert!(LineRange::new(5, 3).is_err());
    }

    #[test]
    fn range_contains() {
        let r = LineRange::new(3, 5).unwrap();
        assert!(!r.contains(2));
        assert!(r.contains(3));
        assert!(r.contains(5));
        assert!(!r.contains(6));

        let open = LineRange::new(8, 0).unwrap();
        assert!(open.contains(8));
        assert!(open.contains(10_000));
        assert!(!open.contains(7));
    }

    #[test]
    fn full_file_range() {
        let r = LineRange::full();
        assert!(r.is_full_file());
        assert!(r.is_open());
        let partial = LineRange::new(1, 10).unwrap();
        assert!(!partial.is_full_file());
    }
}
