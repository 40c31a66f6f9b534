//! Boundary Resolver (`spec.md` §4.5): reconciles the gap between two
//! adjacent anchors by matching nodes by signature (falling back to match
//! refiners for residuals), applying the preference policy, and
//! respecting the blank-line discipline. A destination node that is
//! frozen-on-node (`spec.md` §4.3) always wins its matched pair, regardless
//! of preference.

use std::collections::{HashMap, HashSet};

use crate::analysis::{FileAnalysis, TopLevelItem};
use crate::anchor::Boundary;
use crate::merge_result::{Decision, LineProvenance, MergeResult};
use crate::options::{MergeOptions, Side};
use crate::refiners::greedy_consume;
use crate::signature::Signature;
use crate::source::LineRange;

pub fn resolve_boundary(
    boundary: &Boundary,
    template: &FileAnalysis,
    destination: &FileAnalysis,
    options: &MergeOptions,
    result: &mut MergeResult,
) {
    let t_empty = boundary.template_range.is_empty();
    let d_empty = boundary.destination_range.is_empty();

    if t_empty && d_empty {
        return;
    }
    if t_empty {
        for di in boundary.destination_range.clone() {
            emit_item_verbatim(destination, di, Decision::KeptDestination, result);
        }
        return;
    }
    if d_empty {
        if options.add_template_only_nodes {
            for ti in boundary.template_range.clone() {
                emit_item_verbatim(template, ti, Decision::KeptTemplate, result);
            }
        }
        return;
    }

    resolve_both_sides(boundary, template, destination, options, result);
}

fn emit_item_verbatim(analysis: &FileAnalysis, idx: usize, decision: Decision, result: &mut MergeResult) {
    let item = &analysis.items[idx];
    let range = item.range();
    let text = analysis.buffer.lines_text(range);
    push_with_blank_guard(result, &text, decision, Some(range.start));
}

/// Pushes a text block line by line, never letting the accumulated output
/// grow a run of 3+ consecutive blank lines (`spec.md` §8, invariant 5).
fn push_with_blank_guard(result: &mut MergeResult, text: &str, decision: Decision, start_line: Option<usize>) {
    for (offset, line) in text.lines().enumerate() {
        if line.trim().is_empty() && result.trailing_blank_run() >= 2 {
            continue;
        }
        result.push_line(
            line.to_string(),
            LineProvenance {
                decision,
                template_line: if matches!(decision, Decision::KeptTemplate | Decision::Replaced) {
                    start_line.map(|l| l + offset)
                } else {
                    None
                },
                destination_line: if matches!(decision, Decision::KeptDestination | Decision::FreezeBlock | Decision::Appended) {
                    start_line.map(|l| l + offset)
                } else {
                    None
                },
            },
        );
    }
}

fn resolve_both_sides(
    boundary: &Boundary,
    template: &FileAnalysis,
    destination: &FileAnalysis,
    options: &MergeOptions,
    result: &mut MergeResult,
) {
    let mut dest_matched: HashSet<usize> = HashSet::new();

    // Step 1: destination freeze regions emit first, verbatim.
    for di in boundary.destination_range.clone() {
        if let TopLevelItem::Freeze(region) = &destination.items[di] {
            let text = destination.buffer.lines_text(region.range);
            push_with_blank_guard(result, &text, Decision::FreezeBlock, Some(region.range.start));
            dest_matched.insert(di);
        }
    }

    // Step 2: destination signature -> indices map, excluding freeze regions.
    let mut dest_sig_map: HashMap<&Signature, Vec<usize>> = HashMap::new();
    for di in boundary.destination_range.clone() {
        if dest_matched.contains(&di) {
            continue;
        }
        dest_sig_map.entry(&destination.signatures[di]).or_default().push(di);
    }

    // Step 3: match refiners over residual template/destination statements.
    let tmpl_residual: Vec<(usize, &TopLevelItem)> =
        boundary.template_range.clone().map(|i| (i, &template.items[i])).collect();
    let dest_residual: Vec<(usize, &TopLevelItem)> = boundary
        .destination_range
        .clone()
        .filter(|di| !dest_matched.contains(di))
        .map(|i| (i, &destination.items[i]))
        .collect();

    let mut refiner_map: HashMap<usize, usize> = HashMap::new();
    let mut refiner_used_t: HashSet<usize> = HashSet::new();
    let mut refiner_used_d: HashSet<usize> = HashSet::new();
    for refiner in &options.match_refiners {
        let remaining_t: Vec<(usize, &TopLevelItem)> =
            tmpl_residual.iter().filter(|(i, _)| !refiner_used_t.contains(i)).cloned().collect();
        let remaining_d: Vec<(usize, &TopLevelItem)> =
            dest_residual.iter().filter(|(i, _)| !refiner_used_d.contains(i)).cloned().collect();
        let candidates = refiner.candidates(&remaining_t, &remaining_d);
        for accepted in greedy_consume(candidates) {
            refiner_map.insert(accepted.template_index, accepted.destination_index);
            refiner_used_t.insert(accepted.template_index);
            refiner_used_d.insert(accepted.destination_index);
        }
    }

    // Step 4: walk template items in order, filling gaps between matched
    // nodes with any free-floating (unattached) source text.
    let mut cursor_line = if boundary.template_range.start > 0 {
        template.items[boundary.template_range.start - 1].range().end + 1
    } else {
        1
    };

    for ti in boundary.template_range.clone() {
        let t_item = &template.items[ti];
        let t_node = match t_item.as_statement() {
            Some(n) => n,
            None => continue, // a freeze region never occurs on the template side of a boundary
        };
        let t_range = t_item.range();

        if t_range.start > cursor_line {
            emit_free_floating(template, cursor_line, t_range.start - 1, result);
        }

        let sig = &template.signatures[ti];
        let matched_d = dest_sig_map
            .get(sig)
            .and_then(|candidates| candidates.iter().find(|d| !dest_matched.contains(d)).copied())
            .or_else(|| refiner_map.get(&ti).copied().filter(|d| !dest_matched.contains(d)));

        match matched_d {
            Some(di) => {
                let d_node = destination.items[di]
                    .as_statement()
                    .expect("signature and refiner maps never pair a freeze region");
                let merge_type = t_node.merge_type.as_deref().or(d_node.merge_type.as_deref());
                let side = if d_node.is_frozen_on_node(&options.freeze_token) {
                    Side::Destination
                } else {
                    options.preference.resolve(merge_type)
                };
                match side {
                    Side::Template => emit_item_verbatim(template, ti, Decision::Replaced, result),
                    Side::Destination => emit_item_verbatim(destination, di, Decision::KeptDestination, result),
                }
                dest_matched.insert(di);
            }
            None => {
                if options.add_template_only_nodes {
                    emit_item_verbatim(template, ti, Decision::KeptTemplate, result);
                }
                // otherwise: drop T and its leading comments entirely
            }
        }

        cursor_line = t_range.end + 1;
    }

    let template_boundary_end =
        if boundary.template_range.end > 0 { template.items[boundary.template_range.end - 1].range().end } else { 0 };
    if cursor_line <= template_boundary_end {
        emit_free_floating(template, cursor_line, template_boundary_end, result);
    }

    // Step 6: append every destination item never matched, in order.
    for di in boundary.destination_range.clone() {
        if dest_matched.contains(&di) {
            continue;
        }
        if result.line_count() > 0 && result.trailing_blank_run() == 0 {
            result.push_line(
                String::new(),
                LineProvenance { decision: Decision::Appended, template_line: None, destination_line: None },
            );
        }
        emit_item_verbatim(destination, di, Decision::Appended, result);
        dest_matched.insert(di);
    }
}

/// Emits free-floating lines (blank lines, or comments/stray text not
/// attached to any node as a leading comment) between two line numbers.
/// Shared with the orchestrator, which uses it to preserve the textual gap
/// between two directly-anchored, adjacent top-level items.
pub(crate) fn emit_free_floating(analysis: &FileAnalysis, start: usize, end: usize, result: &mut MergeResult) {
    if start > end {
        return;
    }
    let text = analysis.buffer.lines_text(LineRange::new(start, end));
    push_with_blank_guard(result, &text, Decision::KeptTemplate, Some(start));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{compute_boundaries, discover_anchors};
    use crate::parser::Role;

    fn analyze(src: &str) -> FileAnalysis {
        FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap()
    }

    fn run_boundary(t_src: &str, d_src: &str, options: &MergeOptions) -> MergeResult {
        let t = analyze(t_src);
        let d = analyze(d_src);
        let anchors = discover_anchors(&t, &d);
        let boundaries = compute_boundaries(&anchors, t.items.len(), d.items.len());
        let mut result = MergeResult::new();
        for b in &boundaries {
            resolve_boundary(b, &t, &d, options, &mut result);
        }
        result
    }

    #[test]
    fn template_only_node_dropped_by_default() {
        let t_src = "def foo\nend\n\ndef extra\nend\n";
        let d_src = "def foo\nend\n";
        let options = MergeOptions::default();
        let text = run_boundary(t_src, d_src, &options).into_text();
        assert!(!text.contains("extra"));
    }

    #[test]
    fn template_only_node_kept_when_enabled() {
        let t_src = "def foo\nend\n\ndef extra\nend\n";
        let d_src = "def foo\nend\n";
        let mut options = MergeOptions::default();
        options.add_template_only_nodes = true;
        let text = run_boundary(t_src, d_src, &options).into_text();
        assert!(text.contains("extra"));
    }

    #[test]
    fn destination_only_node_appended() {
        let t_src = "def foo\nend\n";
        let d_src = "def foo\nend\n\ndef custom\nend\n";
        let options = MergeOptions::default();
        let text = run_boundary(t_src, d_src, &options).into_text();
        assert!(text.contains("custom"));
    }

    #[test]
    fn never_emits_three_consecutive_blank_lines() {
        let t_src = "a = 1\n\n\n\n\nb = 2\n";
        let d_src = "a = 1\nb = 2\n";
        let options = MergeOptions::default();
        let text = run_boundary(t_src, d_src, &options).into_text();
        assert!(!text.contains("\n\n\n\n"));
    }
}
