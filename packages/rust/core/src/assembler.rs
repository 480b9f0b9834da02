//! Top-level document assembly.
//!
//! Ties the pipeline together: resolve each source token, flatten
//! directories, globs and bundles into a single ordered list of file
//! specs, extract every spec's content, then resolve live-bundle
//! directives inside each block. Declared source order is the document
//! order; the first error aborts the whole run.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use docweave_shared::{Assembly, AssembleOptions, ContentBlock, LineRange, PathKind, Result};

use crate::bundle::BundleProcessor;
use crate::extract::Extractor;
use crate::inline::{inline_directives, is_exempt_filename};
use crate::ranges::split_range_suffix;
use crate::resolver::{is_bundle_path, resolve_sources};

/// One flattened file spec awaiting extraction.
#[derive(Debug)]
struct FlatEntry {
    /// Source token, range suffix intact.
    spec: String,
    /// Manifest that contributed this entry, if any.
    provenance: Option<PathBuf>,
}

/// Assemble the document described by `sources`.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn assemble(sources: &[String], opts: &AssembleOptions) -> Result<Assembly> {
    let (entries, option_lines) = flatten(sources, opts)?;
    debug!(entries = entries.len(), "flattened sources");

    let mut extractor = Extractor::new();
    let mut blocks = Vec::with_capacity(entries.len());
    for entry in entries {
        let slice = extractor.extract(&entry.spec)?;
        let text = if is_exempt_filename(&slice.path) {
            slice.text
        } else {
            let base_dir = slice
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            inline_directives(&slice.text, &base_dir, &mut extractor)?
        };
        blocks.push(ContentBlock {
            path: slice.path,
            ranges: slice.ranges,
            text,
            provenance: entry.provenance,
        });
    }

    Ok(Assembly {
        blocks,
        option_lines,
    })
}

/// Resolve and flatten sources into extraction order: direct files keep
/// their token, directory and glob members splice in alphabetized,
/// bundles expand depth-first.
fn flatten(
    sources: &[String],
    opts: &AssembleOptions,
) -> Result<(Vec<FlatEntry>, Vec<String>)> {
    let resolved = resolve_sources(sources, opts)?;
    let mut bundles = BundleProcessor::new();
    let mut entries = Vec::new();
    let mut option_lines = Vec::new();

    for info in resolved {
        match info.kind {
            PathKind::File => {
                // Keep the user's range suffix, swap in the
                // dereferenced path.
                let (_, spec) = split_range_suffix(&info.original);
                let token = match spec {
                    Some(spec) => format!("{}:L{spec}", info.absolute.display()),
                    None => info.absolute.display().to_string(),
                };
                entries.push(FlatEntry {
                    spec: token,
                    provenance: None,
                });
            }
            PathKind::Directory | PathKind::Glob => {
                for member in info.members {
                    // Manifests reached through an expansion expand
                    // too; only their entries become blocks.
                    if is_bundle_path(&member) {
                        let expansion = bundles.expand(&member)?;
                        for entry in expansion.entries {
                            entries.push(FlatEntry {
                                spec: entry.spec,
                                provenance: Some(entry.provenance),
                            });
                        }
                        option_lines.extend(expansion.option_lines);
                    } else {
                        entries.push(FlatEntry {
                            spec: member.display().to_string(),
                            provenance: None,
                        });
                    }
                }
            }
            PathKind::Bundle => {
                let expansion = bundles.expand(&info.absolute)?;
                for entry in expansion.entries {
                    entries.push(FlatEntry {
                        spec: entry.spec,
                        provenance: Some(entry.provenance),
                    });
                }
                option_lines.extend(expansion.option_lines);
            }
        }
    }

    Ok((entries, option_lines))
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// What an assembly *would* include, without building the document.
#[derive(Debug, serde::Serialize)]
pub struct DryRunReport {
    pub entries: Vec<DryRunEntry>,
    pub option_lines: Vec<String>,
    /// Sum of the per-entry line counts.
    pub total_lines: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct DryRunEntry {
    pub path: PathBuf,
    /// Resolved line windows; a single full-file range for plain specs.
    pub ranges: Vec<LineRange>,
    /// Lines this entry contributes to the document.
    pub lines: usize,
    pub provenance: Option<PathBuf>,
}

/// Resolve and flatten sources, verifying every entry is extractable,
/// but discard the content.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn dry_run(sources: &[String], opts: &AssembleOptions) -> Result<DryRunReport> {
    let (flat, option_lines) = flatten(sources, opts)?;

    let mut extractor = Extractor::new();
    let mut entries = Vec::with_capacity(flat.len());
    for entry in flat {
        let slice = extractor.extract(&entry.spec)?;
        let lines = if slice.text.is_empty() {
            0
        } else {
            slice.text.lines().count()
        };
        entries.push(DryRunEntry {
            path: slice.path,
            ranges: slice.ranges,
            lines,
            provenance: entry.provenance,
        });
    }

    let total_lines = entries.iter().map(|e| e.lines).sum();
    Ok(DryRunReport {
        entries,
        option_lines,
        total_lines,
    })
}
