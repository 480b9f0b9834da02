//! Live-bundle directives.
//!
//! A document may pull other files into itself inline with
//! `[[file:path]]` or `[[file:path:L10-20]]`. Directives are resolved
//! recursively, with a visited set for cycles and a fixed depth
//! ceiling, and a directive that cannot be satisfied is left on the
//! page untouched rather than failing the whole document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use docweave_shared::{DocweaveError, Result};

use crate::extract::Extractor;
use crate::ranges::split_range_suffix;

/// Nesting ceiling for recursive inlining, independent of the cycle
/// check.
pub const MAX_INLINE_DEPTH: usize = 10;

/// Files whose lowercased name contains one of these are never scanned
/// for directives; documents *about* the syntax keep their examples.
const EXEMPT_NAME_PARTS: [&str; 5] = [
    "readme",
    "changelog",
    "contributing",
    "troubleshooting",
    "license",
];

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[file:([^\]]+)\]\]").unwrap());

/// True if the file's name exempts it from directive scanning.
pub fn is_exempt_filename(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    EXEMPT_NAME_PARTS.iter().any(|part| name.contains(part))
}

/// Replace every satisfiable directive in `text` with the referenced
/// content, resolving relative paths against `base_dir`.
pub fn inline_directives(
    text: &str,
    base_dir: &Path,
    extractor: &mut Extractor,
) -> Result<String> {
    let mut inliner = Inliner {
        extractor,
        open: HashSet::new(),
        chain: Vec::new(),
    };
    inliner.process(text, base_dir, 0)
}

struct Inliner<'a> {
    extractor: &'a mut Extractor,
    /// Directive tokens (absolute path plus range) currently being
    /// inlined; re-entry is a cycle.
    open: HashSet<String>,
    chain: Vec<PathBuf>,
}

impl Inliner<'_> {
    fn process(&mut self, text: &str, base_dir: &Path, depth: usize) -> Result<String> {
        let mut output = String::with_capacity(text.len());
        let mut pos = 0;

        while let Some(m) = DIRECTIVE.find_at(text, pos) {
            output.push_str(&text[pos..m.start()]);
            pos = m.end();

            let token = &text[m.start() + "[[file:".len()..m.end() - "]]".len()];
            let (path_str, spec) = split_range_suffix(token);
            let target = absolutize(base_dir, path_str);
            let key = match spec {
                Some(spec) => format!("{}:L{spec}", target.display()),
                None => target.display().to_string(),
            };

            if self.open.contains(&key) {
                let mut cycle = self.chain.clone();
                cycle.push(target.clone());
                return Err(DocweaveError::circular(
                    target.display().to_string(),
                    cycle,
                ));
            }
            if depth >= MAX_INLINE_DEPTH {
                let mut cycle = self.chain.clone();
                cycle.push(target.clone());
                return Err(DocweaveError::circular(
                    format!("{} (nesting deeper than {MAX_INLINE_DEPTH})", target.display()),
                    cycle,
                ));
            }

            let slice = match self.extractor.extract(&key) {
                Ok(slice) => slice,
                // A broken reference stays on the page; the document
                // still assembles.
                Err(e) => {
                    warn!(directive = m.as_str(), error = %e, "leaving directive verbatim");
                    output.push_str(m.as_str());
                    continue;
                }
            };
            let body = slice.text;
            let nested_dir = target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base_dir.to_path_buf());

            self.open.insert(key.clone());
            self.chain.push(target);
            let inlined = self.process(&body, &nested_dir, depth + 1);
            self.chain.pop();
            self.open.remove(&key);

            // The inserted text was fully processed by the recursive
            // call; scanning resumes after the directive it replaced.
            output.push_str(&inlined?);
            debug!(directive = m.as_str(), "inlined");
        }

        output.push_str(&text[pos..]);
        Ok(output)
    }
}

fn absolutize(base_dir: &Path, entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
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

    fn inline(dir: &Path, text: &str) -> Result<String> {
        let mut ex = Extractor::new();
        inline_directives(text, dir, &mut ex)
    }

    #[test]
    fn exempt_filenames() {
        assert!(is_exempt_filename(Path::new("/docs/README.md")));
        assert!(is_exempt_filename(Path::new("Changelog.txt")));
        assert!(is_exempt_filename(Path::new("api-troubleshooting.md")));
        assert!(is_exempt_filename(Path::new("LICENSE")));
        assert!(!is_exempt_filename(Path::new("guide.md")));
    }

    #[test]
    fn text_without_directives_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let text = "plain text, [single brackets], [[not-a-directive]]";
        assert_eq!(inline(dir.path(), text).unwrap(), text);
    }

    #[test]
    fn simple_directive_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "quote.txt", "hi");
        let out = inline(dir.path(), "before [[file:quote.txt]] after").unwrap();
        assert_eq!(out, "before hi after");
    }

    #[test]
    fn directive_with_range() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "body.txt", "one\ntwo\nthree\nfour");
        let out = inline(dir.path(), "[[file:body.txt:L2-3]]").unwrap();
        assert_eq!(out, "two\nthree");
    }

    #[test]
    fn nested_directives_resolve_against_their_own_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write(dir.path(), "sub/leaf.txt", "leaf");
        write(dir.path(), "sub/mid.txt", "<[[file:leaf.txt]]>");
        let out = inline(dir.path(), "[[file:sub/mid.txt]]").unwrap();
        assert_eq!(out, "<leaf>");
    }

    #[test]
    fn sibling_repeats_are_legal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "quote.txt", "hi");
        let out = inline(dir.path(), "[[file:quote.txt]] [[file:quote.txt]]").unwrap();
        assert_eq!(out, "hi hi");
    }

    #[test]
    fn cycle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "A [[file:b.txt]]");
        write(dir.path(), "b.txt", "B [[file:a.txt]]");
        let err = inline(dir.path(), "[[file:a.txt]]").unwrap_err();
        assert!(matches!(err, DocweaveError::CircularDependency { .. }));
    }

    #[test]
    fn same_file_different_ranges_is_not_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src.txt", "l1\nl2\nl3");
        write(dir.path(), "host.txt", "[[file:src.txt:L3]]");
        let out = inline(dir.path(), "[[file:src.txt:L1]] [[file:host.txt]]").unwrap();
        assert_eq!(out, "l1 l3");
    }

    #[test]
    fn depth_ceiling_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d12.txt", "bottom");
        for i in (1..12).rev() {
            write(
                dir.path(),
                &format!("d{i}.txt"),
                &format!("[[file:d{}.txt]]", i + 1),
            );
        }
        let err = inline(dir.path(), "[[file:d1.txt]]").unwrap_err();
        assert!(matches!(err, DocweaveError::CircularDependency { .. }));
    }

    #[test]
    fn deep_but_legal_nesting_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d5.txt", "bottom");
        for i in (1..5).rev() {
            write(
                dir.path(),
                &format!("d{i}.txt"),
                &format!("[[file:d{}.txt]]", i + 1),
            );
        }
        let out = inline(dir.path(), "[[file:d1.txt]]").unwrap();
        assert_eq!(out, "bottom");
    }

    #[test]
    fn missing_target_left_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let out = inline(dir.path(), "keep [[file:ghost.txt]] going").unwrap();
        assert_eq!(out, "keep [[file:ghost.txt]] going");
    }

    #[test]
    fn bad_range_left_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src.txt", "a\nb");
        let out = inline(dir.path(), "[[file:src.txt:L9-2]]").unwrap();
        assert_eq!(out, "[[file:src.txt:L9-2]]");
    }

    #[test]
    fn unterminated_directive_left_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "quote.txt", "hi");
        let out = inline(dir.path(), "broken [[file:quote.txt and more").unwrap();
        assert_eq!(out, "broken [[file:quote.txt and more");
    }

    #[test]
    fn inserted_text_is_not_rescanned_at_host_level() {
        let dir = tempfile::tempdir().unwrap();
        // The leaf's unsatisfiable directive survives one pass intact.
        write(dir.path(), "leaf.txt", "[[file:ghost.txt]]");
        let out = inline(dir.path(), "[[file:leaf.txt]] tail").unwrap();
        assert_eq!(out, "[[file:ghost.txt]] tail");
    }
}
