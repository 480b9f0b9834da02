//! Bundle manifest expansion.
//!
//! A bundle is a plain-text manifest (named with `.bundle.`) listing
//! one source per line. Nested bundles expand depth-first in place,
//! so the final entry list reads as if the nested manifest's lines
//! were spliced where its name appeared.
//!
//! Cycle detection tracks the set of manifests currently being
//! expanded; a manifest is released when its expansion returns, so a
//! diamond (two manifests both listing a third) is legal while any
//! cycle is reported with the full inclusion chain.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use docweave_shared::{DocweaveError, Result};

use crate::ranges::split_range_suffix;
use crate::resolver::is_bundle_path;

/// One non-bundle line from a manifest, ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Source token with any range suffix intact, made absolute.
    pub spec: String,
    /// The manifest this entry came from.
    pub provenance: PathBuf,
}

/// The flattened result of expanding one top-level manifest.
#[derive(Debug, Default)]
pub struct BundleExpansion {
    pub entries: Vec<BundleEntry>,
    /// Option lines (starting with `-`) in encounter order, verbatim.
    pub option_lines: Vec<String>,
}

/// Expands bundle manifests, carrying cycle state across nested calls.
///
/// One processor serves one assembly invocation; reuse across
/// invocations would leak no state (the open set empties as each
/// top-level expansion returns) but a fresh processor keeps the
/// inclusion chain honest.
#[derive(Debug, Default)]
pub struct BundleProcessor {
    open: HashSet<PathBuf>,
    chain: Vec<PathBuf>,
}

impl BundleProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a manifest and all bundles it references, depth-first.
    pub fn expand(&mut self, manifest: &Path) -> Result<BundleExpansion> {
        let absolute =
            std::fs::canonicalize(manifest).map_err(|e| DocweaveError::io(manifest, e))?;

        if self.open.contains(&absolute) {
            let mut cycle = self.chain.clone();
            cycle.push(absolute.clone());
            return Err(DocweaveError::circular(
                absolute.display().to_string(),
                cycle,
            ));
        }

        let text =
            std::fs::read_to_string(&absolute).map_err(|e| DocweaveError::io(&absolute, e))?;
        let dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        self.open.insert(absolute.clone());
        self.chain.push(absolute.clone());
        let result = self.expand_lines(&text, &dir, &absolute);
        self.chain.pop();
        self.open.remove(&absolute);
        result
    }

    fn expand_lines(&mut self, text: &str, dir: &Path, manifest: &Path) -> Result<BundleExpansion> {
        let mut expansion = BundleExpansion::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('-') {
                expansion.option_lines.push(line.to_string());
                continue;
            }

            let (path_str, spec) = split_range_suffix(line);
            let path = absolutize(dir, path_str);

            if is_bundle_path(&path) {
                if spec.is_some() {
                    warn!(entry = line, "range suffix on a bundle entry is ignored");
                }
                let nested = self.expand(&path)?;
                expansion.entries.extend(nested.entries);
                expansion.option_lines.extend(nested.option_lines);
                continue;
            }

            let token = match spec {
                Some(spec) => format!("{}:L{spec}", path.display()),
                None => path.display().to_string(),
            };
            expansion.entries.push(BundleEntry {
                spec: token,
                provenance: manifest.to_path_buf(),
            });
        }

        debug!(
            manifest = %manifest.display(),
            entries = expansion.entries.len(),
            options = expansion.option_lines.len(),
            "expanded bundle"
        );
        Ok(expansion)
    }
}

/// Resolve a manifest entry against the manifest's directory. Absolute
/// entries pass through untouched.
fn absolutize(dir: &Path, entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn entry_names(expansion: &BundleExpansion) -> Vec<String> {
        expansion
            .entries
            .iter()
            .map(|e| {
                Path::new(e.spec.split(":L").next().unwrap())
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn comments_blanks_and_options_are_separated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "");
        let manifest = write(
            dir.path(),
            "docs.bundle.txt",
            "# heading\n\n--no-header\na.txt\n  \n--txt-ext rst\n",
        );

        let out = BundleProcessor::new().expand(&manifest).unwrap();
        assert_eq!(entry_names(&out), vec!["a.txt"]);
        assert_eq!(out.option_lines, vec!["--no-header", "--txt-ext rst"]);
    }

    #[test]
    fn relative_entries_resolve_against_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write(dir.path(), "docs.bundle.txt", "notes.txt:L2-5\n");

        let out = BundleProcessor::new().expand(&manifest).unwrap();
        assert_eq!(out.entries.len(), 1);
        let expected = format!(
            "{}:L2-5",
            dir.path().canonicalize().unwrap().join("notes.txt").display()
        );
        assert_eq!(out.entries[0].spec, expected);
        assert_eq!(
            out.entries[0].provenance,
            manifest.canonicalize().unwrap()
        );
    }

    #[test]
    fn nested_bundles_splice_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let outer = write(
            dir.path(),
            "outer.bundle.txt",
            "before.txt\ninner.bundle.txt\nafter.txt\n",
        );
        write(dir.path(), "inner.bundle.txt", "mid1.txt\nmid2.txt\n");

        let out = BundleProcessor::new().expand(&outer).unwrap();
        assert_eq!(
            entry_names(&out),
            vec!["before.txt", "mid1.txt", "mid2.txt", "after.txt"]
        );
        // Nested entries carry the inner manifest as provenance.
        assert!(out.entries[1]
            .provenance
            .to_string_lossy()
            .contains("inner.bundle.txt"));
        assert!(out.entries[0]
            .provenance
            .to_string_lossy()
            .contains("outer.bundle.txt"));
    }

    #[test]
    fn cycle_reports_full_inclusion_chain() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.bundle.txt", "b.bundle.txt\n");
        write(dir.path(), "b.bundle.txt", "a.bundle.txt\n");

        let err = BundleProcessor::new().expand(&a).unwrap_err();
        match err {
            DocweaveError::CircularDependency { chain, .. } => {
                let names: Vec<_> = chain
                    .iter()
                    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                    .collect();
                assert_eq!(
                    names,
                    vec!["a.bundle.txt", "b.bundle.txt", "a.bundle.txt"]
                );
            }
            other => panic!("expected circular dependency, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "loop.bundle.txt", "loop.bundle.txt\n");
        let err = BundleProcessor::new().expand(&a).unwrap_err();
        assert!(matches!(err, DocweaveError::CircularDependency { .. }));
    }

    #[test]
    fn diamond_inclusion_is_legal_and_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let top = write(
            dir.path(),
            "top.bundle.txt",
            "left.bundle.txt\nright.bundle.txt\n",
        );
        write(dir.path(), "left.bundle.txt", "shared.txt\n");
        write(dir.path(), "right.bundle.txt", "shared.txt\n");

        let out = BundleProcessor::new().expand(&top).unwrap();
        assert_eq!(entry_names(&out), vec!["shared.txt", "shared.txt"]);
    }

    #[test]
    fn empty_manifest_expands_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write(dir.path(), "empty.bundle.txt", "");
        let out = BundleProcessor::new().expand(&manifest).unwrap();
        assert!(out.entries.is_empty());
        assert!(out.option_lines.is_empty());
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let err = BundleProcessor::new()
            .expand(Path::new("/no/such/thing.bundle.txt"))
            .unwrap_err();
        assert!(matches!(err, DocweaveError::NotFound { .. }));
    }
}
