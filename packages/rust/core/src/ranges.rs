//! Line-range suffix parsing and range merging.
//!
//! A source token may carry a range suffix after the reserved `:L`
//! marker: `file.txt:L5`, `file.txt:L10-20`, `file.txt:L8-` (open),
//! `file.txt:L$3-$1` (from-end bounds, `$1` = last line). Multiple
//! comma-separated sub-specs are allowed and extracted in declared
//! order.

use docweave_shared::{DocweaveError, LineRange, Result};

/// Reserved marker separating a path from its range suffix.
const RANGE_MARKER: &str = ":L";

/// Split a source token into path and optional range spec.
///
/// Splits on the *last* `:L` occurrence so drive-letter paths like
/// `C:\notes.txt` survive. The returned spec excludes the marker's
/// colon but keeps the leading `L` stripped: `"file.txt:L10-20"`
/// yields `("file.txt", Some("10-20"))`.
pub fn split_range_suffix(source: &str) -> (&str, Option<&str>) {
    match source.rfind(RANGE_MARKER) {
        // `:L` at position 0 would leave an empty path; treat as no suffix.
        Some(idx) if idx > 0 => (&source[..idx], Some(&source[idx + RANGE_MARKER.len()..])),
        _ => (source, None),
    }
}

/// One bound of a sub-spec before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    /// Literal 1-based line number.
    Line(usize),
    /// k-th line from the end; `FromEnd(1)` is the last line.
    FromEnd(usize),
}

impl Bound {
    /// Resolve against the file's total line count. From-end bounds may
    /// compute to zero or negative on short files; the caller decides
    /// whether to clamp.
    fn resolve(self, total: usize) -> isize {
        match self {
            Bound::Line(n) => n as isize,
            Bound::FromEnd(k) => total as isize - k as isize + 1,
        }
    }
}

/// Parse a full comma-separated range spec against a known line count.
///
/// Each sub-spec may carry a redundant leading `L` (`"1,L3-4,L$1"` is
/// accepted), matching how suffixes are written in manifests. Returned
/// ranges are in declared order; overlaps and duplicates are preserved.
pub fn parse_ranges(spec: &str, total_lines: usize) -> Result<Vec<LineRange>> {
    if spec.trim().is_empty() {
        return Err(DocweaveError::range(spec, "empty range spec"));
    }

    let mut ranges = Vec::new();
    for raw in spec.split(',') {
        let part = raw.trim();
        let part = part.strip_prefix('L').unwrap_or(part);
        if part.is_empty() {
            return Err(DocweaveError::range(raw, "empty range sub-spec"));
        }
        ranges.push(parse_sub_spec(part, total_lines)?);
    }
    Ok(ranges)
}

/// Parse one sub-spec (`n`, `$k`, `n-m`, `n-`, `$k-$j`, `n-$k`).
fn parse_sub_spec(part: &str, total: usize) -> Result<LineRange> {
    // `$` may appear inside a bound, so split only on `-` separators
    // that are not leading (a leading `-` is simply invalid grammar).
    if let Some(sep) = part.find('-') {
        let (start_str, rest) = part.split_at(sep);
        let end_str = &rest[1..];
        if end_str.contains('-') {
            return Err(DocweaveError::range(part, "too many '-' separators"));
        }

        let start = parse_bound(start_str, part)?;
        let start = resolve_start(start, total);

        let end = if end_str.is_empty() {
            // Open-ended: keep the EOF marker so stale line counts stay
            // lenient at extraction time.
            0
        } else {
            let bound = parse_bound(end_str, part)?;
            let resolved = bound.resolve(total);
            if resolved < 1 {
                // An empty file has no last line to anchor on; fall back
                // to an open range so extraction yields empty text.
                if total == 0 && matches!(bound, Bound::FromEnd(_)) {
                    0
                } else {
                    return Err(DocweaveError::range(
                        part,
                        format!("end bound resolves below line 1 (file has {total} lines)"),
                    ));
                }
            } else {
                resolved as usize
            }
        };

        if end != 0 && start > end {
            return Err(DocweaveError::range(part, "start line after end line"));
        }
        LineRange::new(start, end)
    } else {
        match parse_bound(part, part)? {
            Bound::Line(n) => LineRange::new(n, n),
            // A bare `$k` means "the last k lines".
            bound @ Bound::FromEnd(_) => {
                let start = resolve_start(bound, total);
                let end = total.max(start);
                LineRange::new(start, end)
            }
        }
    }
}

/// Resolve a start bound, clamping from-end underflow to line 1.
fn resolve_start(bound: Bound, total: usize) -> usize {
    bound.resolve(total).max(1) as usize
}

/// Parse a single bound: a decimal line number or `$k`.
fn parse_bound(text: &str, context: &str) -> Result<Bound> {
    if let Some(k_str) = text.strip_prefix('$') {
        let k: usize = k_str
            .parse()
            .map_err(|_| DocweaveError::range(context, format!("invalid from-end bound '${k_str}'")))?;
        if k == 0 {
            return Err(DocweaveError::range(context, "$0 is not a valid line"));
        }
        Ok(Bound::FromEnd(k))
    } else {
        let n: usize = text
            .parse()
            .map_err(|_| DocweaveError::range(context, format!("invalid line number '{text}'")))?;
        if n == 0 {
            return Err(DocweaveError::range(context, "line numbers start at 1"));
        }
        Ok(Bound::Line(n))
    }
}

/// Coalesce overlapping or adjacent ranges into a minimal disjoint
/// sorted set.
///
/// Adjacency counts (`1-3` and `4-6` merge to `1-6`), and an open
/// range absorbs everything at or after its start. Idempotent and
/// independent of input order. Used only to avoid duplicate reads;
/// never applied to document output.
pub fn merge_ranges(ranges: &[LineRange]) -> Vec<LineRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<LineRange> = vec![sorted[0]];
    for next in &sorted[1..] {
        let cur = merged.last_mut().expect("merged is non-empty");
        if cur.is_open() {
            // Everything after an open range is already covered.
            break;
        }
        if next.start <= cur.end + 1 {
            if next.is_open() {
                cur.end = 0;
            } else {
                cur.end = cur.end.max(next.end);
            }
        } else {
            merged.push(*next);
        }
    }
    merged
}
