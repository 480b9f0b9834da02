//! Source classification and expansion.
//!
//! Each user-supplied source token becomes a [`ResolvedPath`]: a file,
//! a directory (expanded to members), a glob pattern (expanded to
//! matches), or a bundle manifest (recognized by name convention).
//!
//! Declared source order is preserved across the whole call; the only
//! alphabetical sorting happens *within* a single directory or glob
//! expansion, where the filesystem offers no natural order.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use docweave_shared::{AssembleOptions, DocweaveError, PathKind, ResolvedPath, Result};

use crate::ranges::split_range_suffix;

/// Base-name substring that marks a file as a bundle manifest.
pub const BUNDLE_MARKER: &str = ".bundle.";

/// True if the path's base name follows the bundle naming convention.
pub fn is_bundle_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains(BUNDLE_MARKER))
        .unwrap_or(false)
}

/// Resolve all source tokens, preserving their declared order.
pub fn resolve_sources(sources: &[String], opts: &AssembleOptions) -> Result<Vec<ResolvedPath>> {
    let mut resolved = Vec::with_capacity(sources.len());
    for source in sources {
        resolved.push(resolve_source(source, opts)?);
    }
    Ok(resolved)
}

/// Resolve one source token.
pub fn resolve_source(source: &str, opts: &AssembleOptions) -> Result<ResolvedPath> {
    let (path_str, _spec) = split_range_suffix(source);

    if path_str.contains(['*', '?', '[']) {
        return resolve_glob(source, path_str, opts);
    }

    // Dereference symlinks before classification; missing paths become
    // the distinguished not-found error.
    let absolute =
        std::fs::canonicalize(path_str).map_err(|e| DocweaveError::io(path_str, e))?;
    let meta = std::fs::metadata(&absolute).map_err(|e| DocweaveError::io(&absolute, e))?;

    if meta.is_dir() {
        let members = expand_directory(&absolute, opts)?;
        debug!(dir = %absolute.display(), members = members.len(), "expanded directory");
        return Ok(ResolvedPath {
            original: source.to_string(),
            absolute,
            kind: PathKind::Directory,
            members,
        });
    }

    let kind = if is_bundle_path(&absolute) {
        PathKind::Bundle
    } else {
        PathKind::File
    };
    Ok(ResolvedPath {
        original: source.to_string(),
        absolute,
        kind,
        members: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Glob expansion
// ---------------------------------------------------------------------------

/// Expand a glob pattern: walk from the longest literal prefix
/// directory, keep matching files that pass the extension filter,
/// sorted alphabetically. Zero matches is an error.
///
/// `*` and `?` never cross `/` (filesystem glob semantics); only `**`
/// descends, so `dir/*.txt` matches direct children of `dir` only.
fn resolve_glob(source: &str, pattern: &str, opts: &AssembleOptions) -> Result<ResolvedPath> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| DocweaveError::config(format!("invalid glob '{pattern}': {e}")))?;
    let matcher = glob.compile_matcher();

    let root = literal_prefix(pattern);
    let mut walker = WalkDir::new(&root).follow_links(true);
    if let Some(depth) = glob_walk_depth(pattern, &root) {
        walker = walker.max_depth(depth);
    }

    let mut members = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            // Unreadable subtrees are skipped, matching platform glob behavior.
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            continue;
        }
        // Relative patterns walk from `.`, whose entries carry a `./`
        // prefix the pattern does not have.
        let candidate = entry.path().strip_prefix("./").unwrap_or(entry.path());
        if matcher.is_match(candidate) && opts.matches_extension(candidate) {
            members.push(candidate.to_path_buf());
        }
    }

    if members.is_empty() {
        return Err(DocweaveError::not_found(pattern));
    }
    members.sort();
    debug!(pattern, matches = members.len(), "expanded glob");

    Ok(ResolvedPath {
        original: source.to_string(),
        absolute: PathBuf::from(pattern),
        kind: PathKind::Glob,
        members,
    })
}

/// The deepest directory prefix of a pattern containing no glob
/// metacharacters. Falls back to `.` for bare patterns like `*.txt`.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[']) {
            break;
        }
        prefix.push(component);
    }
    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else if prefix == Path::new(pattern) {
        // The metacharacters were all in the final component's glob
        // syntax-free prefix; walk its parent.
        prefix.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
    } else {
        prefix
    }
}

/// How deep the walk must go for a pattern without `**`: one level per
/// remaining pattern component. `**` needs an unbounded walk.
fn glob_walk_depth(pattern: &str, root: &Path) -> Option<usize> {
    if pattern.contains("**") {
        return None;
    }
    let total = Path::new(pattern).components().count();
    let prefix = root.components().count();
    Some(total.saturating_sub(prefix).max(1))
}

// ---------------------------------------------------------------------------
// Directory expansion
// ---------------------------------------------------------------------------

/// List a directory's member files, honoring include/exclude patterns.
///
/// Non-recursive by default; recursive when any configured pattern
/// contains `**`. Candidates pass the extension filter, then include
/// patterns (empty = all), then exclude patterns (exclude wins).
/// Members are alphabetized.
fn expand_directory(dir: &Path, opts: &AssembleOptions) -> Result<Vec<PathBuf>> {
    let includes = build_glob_set(&opts.include_patterns)?;
    let excludes = build_glob_set(&opts.exclude_patterns)?;
    let recursive = has_recursive_pattern(opts);

    let mut members = Vec::new();
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1).follow_links(true)
    };

    for entry in walker {
        let entry = entry.map_err(|e| {
            DocweaveError::io(dir, e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("walk error")
            }))
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if !opts.matches_extension(path) {
            continue;
        }
        // Patterns match against the path relative to the listed dir.
        let rel = path.strip_prefix(dir).unwrap_or(path);
        if let Some(ref includes) = includes {
            if !includes.is_match(rel) {
                continue;
            }
        }
        if let Some(ref excludes) = excludes {
            if excludes.is_match(rel) {
                continue;
            }
        }
        members.push(path.to_path_buf());
    }

    members.sort();
    Ok(members)
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| DocweaveError::config(format!("invalid pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| DocweaveError::config(format!("invalid pattern set: {e}")))?;
    Ok(Some(set))
}

/// Recursive traversal is needed only when a pattern can cross
/// directory levels.
fn has_recursive_pattern(opts: &AssembleOptions) -> bool {
    opts.include_patterns
        .iter()
        .chain(opts.exclude_patterns.iter())
        .any(|p| p.contains("**"))
}
