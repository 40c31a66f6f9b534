//! Anchor Discovery (`spec.md` §4.6): finds the pairs of template/destination
//! items we're confident describe "the same thing", in four passes of
//! decreasing confidence. Everything between two consecutive anchors (or
//! before the first / after the last) becomes a `Boundary` for the
//! Boundary Resolver (`resolver.rs`) to reconcile.

use std::collections::HashMap;
use std::ops::Range;

use crate::analysis::FileAnalysis;
use crate::signature::Signature;

/// How an anchor was discovered, kept for diagnostics and tests; matching
/// behavior doesn't depend on it once the anchor exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    WholeFile,
    Signature,
    ExactLine,
}

/// A confirmed pairing between one template item and one destination item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub template_index: usize,
    pub destination_index: usize,
    pub kind: AnchorKind,
}

/// A maximal unanchored span on both sides, to be resolved independently.
/// Either range may be empty (template-only or destination-only gap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub template_range: Range<usize>,
    pub destination_range: Range<usize>,
}

/// Runs all four discovery passes and returns anchors sorted by template
/// index. Freeze regions anchor for free in the signature pass: each
/// region's `Signature::FreezeRegion { ordinal }` is unique within a file
/// by construction, so a template/destination pair with matching ordinals
/// anchors exactly like any other uniquely-signed node.
pub fn discover_anchors(template: &FileAnalysis, destination: &FileAnalysis) -> Vec<Anchor> {
    // Pass 1: whole-file shortcut. Identical files anchor start-to-start
    // and end-to-end; nothing else to discover.
    if template.buffer.text() == destination.buffer.text() && !template.items.is_empty() {
        let mut anchors = Vec::new();
        for i in 0..template.items.len().min(destination.items.len()) {
            anchors.push(Anchor { template_index: i, destination_index: i, kind: AnchorKind::WholeFile });
        }
        return anchors;
    }

    let mut anchors = signature_anchors(template, destination);

    let mut anchored_template: Vec<bool> = vec![false; template.items.len()];
    let mut anchored_destination: Vec<bool> = vec![false; destination.items.len()];
    for a in &anchors {
        anchored_template[a.template_index] = true;
        anchored_destination[a.destination_index] = true;
    }

    anchors.extend(exact_line_anchors(template, destination, &anchored_template, &anchored_destination));
    anchors.sort_by_key(|a| a.template_index);
    anchors
}

/// Pass 2: a signature that occurs exactly once in the template and
/// exactly once in the destination anchors those two occurrences.
/// Signatures that repeat on either side are left for the boundary
/// resolver's own matching, since position alone can't disambiguate them.
fn signature_anchors(template: &FileAnalysis, destination: &FileAnalysis) -> Vec<Anchor> {
    let tmpl_counts = count_signatures(&template.signatures);
    let dest_counts = count_signatures(&destination.signatures);

    let mut dest_index_by_sig: HashMap<&Signature, usize> = HashMap::new();
    for (i, sig) in destination.signatures.iter().enumerate() {
        if dest_counts.get(sig) == Some(&1) {
            dest_index_by_sig.insert(sig, i);
        }
    }

    let mut anchors = Vec::new();
    for (i, sig) in template.signatures.iter().enumerate() {
        if tmpl_counts.get(sig) != Some(&1) {
            continue;
        }
        if let Some(&j) = dest_index_by_sig.get(sig) {
            anchors.push(Anchor { template_index: i, destination_index: j, kind: AnchorKind::Signature });
        }
    }
    anchors
}

fn count_signatures(sigs: &[Signature]) -> HashMap<&Signature, usize> {
    let mut counts = HashMap::new();
    for sig in sigs {
        *counts.entry(sig).or_insert(0) += 1;
    }
    counts
}

/// Pass 3: among items neither side has anchored yet, an identical raw
/// text block (comments, body, and all) anchors by position — the
/// longest common subsequence of remaining items, via `similar`'s generic
/// diff over item text rather than individual source lines.
fn exact_line_anchors(
    template: &FileAnalysis,
    destination: &FileAnalysis,
    anchored_template: &[bool],
    anchored_destination: &[bool],
) -> Vec<Anchor> {
    let tmpl_remaining: Vec<usize> = (0..template.items.len()).filter(|&i| !anchored_template[i]).collect();
    let dest_remaining: Vec<usize> = (0..destination.items.len()).filter(|&i| !anchored_destination[i]).collect();

    let tmpl_blocks: Vec<String> =
        tmpl_remaining.iter().map(|&i| template.buffer.lines_text(template.items[i].range())).collect();
    let dest_blocks: Vec<String> =
        dest_remaining.iter().map(|&i| destination.buffer.lines_text(destination.items[i].range())).collect();
    let tmpl_refs: Vec<&str> = tmpl_blocks.iter().map(String::as_str).collect();
    let dest_refs: Vec<&str> = dest_blocks.iter().map(String::as_str).collect();

    let diff = similar::TextDiff::from_slices(&tmpl_refs, &dest_refs);

    let mut anchors = Vec::new();
    for op in diff.ops() {
        if let similar::DiffOp::Equal { old_index, new_index, len } = *op {
            for k in 0..len {
                anchors.push(Anchor {
                    template_index: tmpl_remaining[old_index + k],
                    destination_index: dest_remaining[new_index + k],
                    kind: AnchorKind::ExactLine,
                });
            }
        }
    }
    anchors
}

/// Splits the space between (and around) a sorted anchor list into
/// boundaries, one per gap.
pub fn compute_boundaries(anchors: &[Anchor], template_len: usize, destination_len: usize) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    let mut tmpl_cursor = 0;
    let mut dest_cursor = 0;

    for anchor in anchors {
        if anchor.template_index > tmpl_cursor || anchor.destination_index > dest_cursor {
            boundaries.push(Boundary {
                template_range: tmpl_cursor..anchor.template_index,
                destination_range: dest_cursor..anchor.destination_index,
            });
        }
        tmpl_cursor = anchor.template_index + 1;
        dest_cursor = anchor.destination_index + 1;
    }

    if tmpl_cursor < template_len || dest_cursor < destination_len {
        boundaries.push(Boundary {
            template_range: tmpl_cursor..template_len,
            destination_range: dest_cursor..destination_len,
        });
    }

    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Role;

    fn analyze(src: &str) -> FileAnalysis {
        FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap()
    }

    #[test]
    fn identical_files_anchor_whole_file() {
        let src = "def foo\nend\n";
        let t = analyze(src);
        let d = analyze(src);
        let anchors = discover_anchors(&t, &d);
        assert!(anchors.iter().all(|a| a.kind == AnchorKind::WholeFile));
        assert_eq!(anchors.len(), t.items.len());
    }

    #[test]
    fn unique_signature_anchors_across_reordering() {
        let t = analyze("def foo\nend\n\ndef bar\nend\n");
        let d = analyze("def bar\nend\n\ndef foo\nend\n");
        let anchors = discover_anchors(&t, &d);
        assert_eq!(anchors.len(), 2);
        let foo_anchor = anchors.iter().find(|a| a.template_index == 0).unwrap();
        assert_eq!(foo_anchor.destination_index, 1);
    }

    #[test]
    fn boundaries_cover_gaps_around_anchors() {
        let t = analyze("def foo\nend\n");
        let d = analyze("def foo\nend\n\ndef extra\nend\n");
        let anchors = discover_anchors(&t, &d);
        let boundaries = compute_boundaries(&anchors, t.items.len(), d.items.len());
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].template_range, 1..1);
        assert_eq!(boundaries[0].destination_range, 1..2);
    }
}
