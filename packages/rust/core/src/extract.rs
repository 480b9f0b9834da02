//! Content extraction: read a file, resolve its declared ranges, and
//! slice out the requested line windows.
//!
//! An [`Extractor`] carries a per-invocation cache so a file referenced
//! several times within one assembly is read from disk only once. The
//! cache tracks the merged union of requested windows per file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use docweave_shared::{DocweaveError, LineRange, Result};

use crate::ranges::{merge_ranges, parse_ranges, split_range_suffix};

/// Extracted content for one file reference.
#[derive(Debug, Clone)]
pub struct FileSlice {
    /// Path with the range suffix stripped.
    pub path: PathBuf,
    /// Resolved ranges (from-end bounds resolved), declared order.
    pub ranges: Vec<LineRange>,
    /// The selected lines joined with `\n`.
    pub text: String,
}

/// Per-file cache entry: the file's lines plus the merged union of all
/// windows requested so far.
#[derive(Debug)]
struct CachedFile {
    lines: Vec<String>,
    windows: Vec<LineRange>,
}

/// Stateful extractor with a per-invocation read cache.
///
/// Construct one per assembly call; never share across invocations.
#[derive(Debug, Default)]
pub struct Extractor {
    cache: HashMap<PathBuf, CachedFile>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract content for a source token with optional range suffix
    /// (e.g. `notes.txt:L5-10,L$1`).
    ///
    /// The file is read once and split into lines; each declared range
    /// is sliced in declared order (overlaps and duplicates preserved)
    /// and the slices are joined with newlines. A start beyond EOF
    /// yields an empty slice for that range rather than an error, since
    /// ranges may have been computed from stale line counts.
    pub fn extract(&mut self, source: &str) -> Result<FileSlice> {
        let (path_str, spec) = split_range_suffix(source);
        let path = PathBuf::from(path_str);

        // Key the cache by canonical path so the same file reached
        // under different spellings is still read only once.
        let key = std::fs::canonicalize(&path).map_err(|e| DocweaveError::io(&path, e))?;
        let entry = self.cached_lines(&key)?;
        let total = entry.lines.len();

        let ranges = match spec {
            Some(spec) => parse_ranges(spec, total)?,
            None => vec![LineRange::full()],
        };

        // Track the merged union of requested windows for this file.
        let mut windows = entry.windows.clone();
        windows.extend_from_slice(&ranges);
        let windows = merge_ranges(&windows);
        let text = slice_ranges(&entry.lines, &ranges);
        self.cache
            .get_mut(&key)
            .expect("entry was just ensured")
            .windows = windows;

        Ok(FileSlice { path, ranges, text })
    }

    fn cached_lines(&mut self, path: &Path) -> Result<&CachedFile> {
        if !self.cache.contains_key(path) {
            let content =
                std::fs::read_to_string(path).map_err(|e| DocweaveError::io(path, e))?;
            let lines: Vec<String> = content.lines().map(str::to_string).collect();
            debug!(path = %path.display(), lines = lines.len(), "read file");
            self.cache.insert(
                path.to_path_buf(),
                CachedFile {
                    lines,
                    windows: Vec::new(),
                },
            );
        } else {
            debug!(path = %path.display(), "read cache hit");
        }
        Ok(&self.cache[path])
    }
}

/// Slice the declared ranges out of the line list, in declared order.
fn slice_ranges(lines: &[String], ranges: &[LineRange]) -> String {
    let mut selected: Vec<&str> = Vec::new();
    for range in ranges {
        selected.extend(slice_range(lines, range));
    }
    selected.join("\n")
}

/// Slice a single range, clamping to the file's actual bounds.
fn slice_range<'a>(lines: &'a [String], range: &LineRange) -> impl Iterator<Item = &'a str> {
    let start = range.start.saturating_sub(1).min(lines.len());
    let end = if range.end == 0 {
        lines.len()
    } else {
        range.end.min(lines.len())
    };
    let end = end.max(start);
    lines[start..end].iter().map(String::as_str)
}
