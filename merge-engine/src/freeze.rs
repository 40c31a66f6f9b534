//! Freeze Region Model (`spec.md` §4.3): a user-designated span of
//! destination source, bracketed by `<freeze_token>:freeze` /
//! `<freeze_token>:unfreeze` marker comments, that the merge must preserve
//! byte-for-byte and never descend into. A top-level `:freeze` with no
//! matching `:unfreeze` is also valid and reaches to end of file; the same
//! marker left unclosed inside a nested container is a structure error.
//!
//! Freeze regions are detected as a standalone pass over comment-only
//! lines, before the node tree is even consulted for matching, because a
//! malformed freeze structure (`MergeError::InvalidFreezeStructure`) must
//! fail the merge outright rather than surface as a partial result.

use crate::error::{MergeError, NodeSummary};
use crate::node::Node;
use crate::source::{LineRange, SourceBuffer};

/// A validated freeze region: the full line range from its `:freeze`
/// marker to its matching `:unfreeze` marker, inclusive, and its 1-based
/// position among all freeze regions in the file (its signature, per
/// `signature.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeRegion {
    pub range: LineRange,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Copy)]
enum MarkerLine {
    Freeze(usize),
    Unfreeze(usize),
}

/// A marker line is top level when it carries no leading indentation. Used
/// only to decide what an *unclosed* `:freeze` means (`spec.md` §3, §4.3):
/// at top level it's a valid region reaching to end of file, nested inside
/// any container it's a structure error. This is a line-level proxy —
/// freeze detection runs before the node tree exists — but it's exactly the
/// signal the spec describes, since every statement this engine recognizes
/// starts its body on its own indented line.
fn is_top_level_marker(buffer: &SourceBuffer, line: usize) -> bool {
    let text = buffer.line(line);
    !text.starts_with(' ') && !text.starts_with('\t')
}

/// Scans every comment-only line in the buffer for freeze markers and
/// pairs them into regions. Rejects unpaired or nested markers. An
/// unclosed `:freeze` is valid only when it sits at top level, in which
/// case the region runs to end of file.
pub fn detect_freeze_regions(
    buffer: &SourceBuffer,
    freeze_token: &str,
) -> Result<Vec<FreezeRegion>, MergeError> {
    use crate::comment::{freeze_marker_kind as marker_kind, FreezeMarkerKind};

    let mut markers = Vec::new();
    for line in 1..=buffer.line_count() {
        let text = buffer.line(line);
        let trimmed = text.trim();
        if !trimmed.starts_with('#') {
            continue;
        }
        match marker_kind(trimmed, freeze_token) {
            Some(FreezeMarkerKind::Freeze) => markers.push(MarkerLine::Freeze(line)),
            Some(FreezeMarkerKind::Unfreeze) => markers.push(MarkerLine::Unfreeze(line)),
            None => {}
        }
    }

    let mut regions = Vec::new();
    let mut open: Option<usize> = None;
    let mut ordinal = 0usize;

    for marker in markers {
        match marker {
            MarkerLine::Freeze(line) => {
                if let Some(open_line) = open {
                    return Err(MergeError::InvalidFreezeStructure {
                        message: format!(
                            "nested {freeze_token}:freeze at line {line}; the region opened at \
                             line {open_line} has no matching unfreeze before it"
                        ),
                        start_line: open_line,
                        end_line: line,
                        offending_nodes: vec![NodeSummary {
                            range: LineRange::single(line),
                            description: "nested freeze marker".to_string(),
                        }],
                    });
                }
                open = Some(line);
            }
            MarkerLine::Unfreeze(line) => {
                let Some(open_line) = open.take() else {
                    return Err(MergeError::InvalidFreezeStructure {
                        message: format!(
                            "{freeze_token}:unfreeze at line {line} has no matching freeze marker"
                        ),
                        start_line: line,
                        end_line: line,
                        offending_nodes: vec![NodeSummary {
                            range: LineRange::single(line),
                            description: "unpaired unfreeze marker".to_string(),
                        }],
                    });
                };
                ordinal += 1;
                regions.push(FreezeRegion { range: LineRange::new(open_line, line), ordinal });
            }
        }
    }

    if let Some(open_line) = open {
        if is_top_level_marker(buffer, open_line) {
            ordinal += 1;
            regions.push(FreezeRegion { range: LineRange::new(open_line, buffer.line_count()), ordinal });
        } else {
            return Err(MergeError::InvalidFreezeStructure {
                message: format!(
                    "{freeze_token}:freeze at line {open_line} is nested and never closed by a matching unfreeze"
                ),
                start_line: open_line,
                end_line: buffer.line_count(),
                offending_nodes: vec![NodeSummary {
                    range: LineRange::single(open_line),
                    description: "unclosed nested freeze marker".to_string(),
                }],
            });
        }
    }

    Ok(regions)
}

/// Verifies that no parsed top-level statement crosses a freeze region
/// boundary: a statement must be either fully inside a region or fully
/// outside every region. A statement that starts inside and ends outside
/// (or vice versa) means the user's markers don't align with statement
/// boundaries and the merge cannot proceed safely.
pub fn validate_no_partial_overlap(
    regions: &[FreezeRegion],
    statements: &[Node],
) -> Result<(), MergeError> {
    for region in regions {
        for stmt in statements {
            let stmt_range = stmt.full_range();
            let overlaps = stmt_range.overlaps(&region.range);
            let enclosed = region.range.encloses(&stmt_range);
            if overlaps && !enclosed && !stmt_range.encloses(&region.range) {
                return Err(MergeError::InvalidFreezeStructure {
                    message: format!(
                        "statement at lines {}-{} partially overlaps freeze region at lines {}-{}",
                        stmt_range.start, stmt_range.end, region.range.start, region.range.end
                    ),
                    start_line: region.range.start,
                    end_line: region.range.end,
                    offending_nodes: vec![NodeSummary {
                        range: stmt_range,
                        description: format!("{} node", stmt.kind.tag()),
                    }],
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_simple_freeze_block() {
        let buf = SourceBuffer::new(
            "a = 1\n# prism-merge:freeze\nb = 2\n# prism-merge:unfreeze\nc = 3\n",
        );
        let regions = detect_freeze_regions(&buf, "prism-merge").unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].range, LineRange::new(2, 4));
        assert_eq!(regions[0].ordinal, 1);
    }

    #[test]
    fn rejects_unpaired_unfreeze() {
        let buf = SourceBuffer::new("# prism-merge:unfreeze\n");
        let err = detect_freeze_regions(&buf, "prism-merge").unwrap_err();
        assert!(matches!(err, MergeError::InvalidFreezeStructure { .. }));
    }

    #[test]
    fn unclosed_top_level_freeze_extends_to_end_of_file() {
        let buf = SourceBuffer::new("# prism-merge:freeze\na = 1\n");
        let regions = detect_freeze_regions(&buf, "prism-merge").unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].range, LineRange::new(1, buf.line_count()));
    }

    #[test]
    fn rejects_unclosed_nested_freeze() {
        let buf = SourceBuffer::new("if cond\n  # prism-merge:freeze\n  a = 1\nend\n");
        let err = detect_freeze_regions(&buf, "prism-merge").unwrap_err();
        assert!(matches!(err, MergeError::InvalidFreezeStructure { .. }));
    }

    #[test]
    fn rejects_nested_freeze() {
        let buf = SourceBuffer::new(
            "# prism-merge:freeze\n# prism-merge:freeze\na = 1\n# prism-merge:unfreeze\n",
        );
        let err = detect_freeze_regions(&buf, "prism-merge").unwrap_err();
        assert!(matches!(err, MergeError::InvalidFreezeStructure { .. }));
    }

    #[test]
    fn assigns_sequential_ordinals_to_multiple_regions() {
        let buf = SourceBuffer::new(
            "# prism-merge:freeze\na = 1\n# prism-merge:unfreeze\nb = 2\n# prism-merge:freeze\nc = 3\n# prism-merge:unfreeze\n",
        );
        let regions = detect_freeze_regions(&buf, "prism-merge").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].ordinal, 1);
        assert_eq!(regions[1].ordinal, 2);
    }
}
