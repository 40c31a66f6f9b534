//! SmartMerger (`spec.md` §4.4, §4.7): the recursive orchestrator that ties
//! File Analysis, Anchor Discovery, and the Boundary Resolver together into
//! one merge, descending into matched compound nodes when it's safe to.

use crate::analysis::{FileAnalysis, TopLevelItem};
use crate::anchor::{discover_anchors, Anchor, AnchorKind};
use crate::error::MergeError;
use crate::merge_result::{Decision, MergeResult};
use crate::node::{Node, NodeKind};
use crate::options::{MergeOptions, Side};
use crate::parser::Role;
use crate::resolver::resolve_boundary;
use crate::source::LineRange;

/// Runs one merge from the top. The public entry point the crate root
/// (`lib.rs`) exposes to callers; recursion re-enters through `run` at
/// `depth + 1`.
pub fn merge(template_src: &str, destination_src: &str, options: &MergeOptions) -> Result<MergeResult, MergeError> {
    run(template_src, destination_src, options, 0)
}

fn run(template_src: &str, destination_src: &str, options: &MergeOptions, depth: usize) -> Result<MergeResult, MergeError> {
    let generator = options.signature_generator;
    let typing = options.node_typing;
    let template = FileAnalysis::analyze_typed(template_src, Role::Template, &options.freeze_token, generator, typing)?;
    let destination =
        FileAnalysis::analyze_typed(destination_src, Role::Destination, &options.freeze_token, generator, typing)?;

    let anchors = discover_anchors(&template, &destination);

    let mut result = MergeResult::new();
    let mut tmpl_cursor = 0;
    let mut dest_cursor = 0;

    for anchor in &anchors {
        if anchor.template_index > tmpl_cursor || anchor.destination_index > dest_cursor {
            let boundary = crate::anchor::Boundary {
                template_range: tmpl_cursor..anchor.template_index,
                destination_range: dest_cursor..anchor.destination_index,
            };
            resolve_boundary(&boundary, &template, &destination, options, &mut result);
        }

        // Even when the index gap above is empty (this anchor directly
        // follows the previous one on both sides), the template may still
        // have blank or free-floating lines between them that no item's own
        // range covers — preserve those too (`spec.md` §1, "blank-line
        // spacing").
        let prev_end =
            if anchor.template_index > 0 { template.items[anchor.template_index - 1].range().end } else { 0 };
        let anchor_start = template.items[anchor.template_index].range().start;
        if prev_end + 1 < anchor_start {
            crate::resolver::emit_free_floating(&template, prev_end + 1, anchor_start - 1, &mut result);
        }

        emit_anchor(anchor, &template, &destination, options, depth, &mut result)?;
        tmpl_cursor = anchor.template_index + 1;
        dest_cursor = anchor.destination_index + 1;
    }

    if tmpl_cursor < template.items.len() || dest_cursor < destination.items.len() {
        let boundary = crate::anchor::Boundary {
            template_range: tmpl_cursor..template.items.len(),
            destination_range: dest_cursor..destination.items.len(),
        };
        resolve_boundary(&boundary, &template, &destination, options, &mut result);
    }

    Ok(result)
}

fn emit_anchor(
    anchor: &Anchor,
    template: &FileAnalysis,
    destination: &FileAnalysis,
    options: &MergeOptions,
    depth: usize,
    result: &mut MergeResult,
) -> Result<(), MergeError> {
    let t_item = &template.items[anchor.template_index];
    let d_item = &destination.items[anchor.destination_index];

    match (t_item, d_item) {
        (TopLevelItem::Freeze(_), TopLevelItem::Freeze(region)) => {
            let text = destination.buffer.lines_text(region.range);
            result.push_lines(&text, Decision::FreezeBlock, None, Some(region.range.start));
            Ok(())
        }
        (TopLevelItem::Statement(_), TopLevelItem::Statement(_)) => {
            if matches!(anchor.kind, AnchorKind::WholeFile | AnchorKind::ExactLine) {
                let range = t_item.range();
                let text = template.buffer.lines_text(range);
                result.push_lines(&text, Decision::KeptTemplate, Some(range.start), None);
                return Ok(());
            }

            let t_node = t_item.as_statement().expect("matched above");
            let d_node = d_item.as_statement().expect("matched above");

            if recursively_mergeable(t_node, d_node, depth, options) {
                recursive_body_merge(t_node, d_node, template, destination, options, depth, result)
            } else {
                let merge_type = t_node.merge_type.as_deref().or(d_node.merge_type.as_deref());
                let side = if d_node.is_frozen_on_node(&options.freeze_token) {
                    Side::Destination
                } else {
                    options.preference.resolve(merge_type)
                };
                match side {
                    Side::Template => {
                        let range = t_item.range();
                        let text = template.buffer.lines_text(range);
                        result.push_lines(&text, Decision::Replaced, Some(range.start), None);
                    }
                    Side::Destination => {
                        let range = d_item.range();
                        let text = destination.buffer.lines_text(range);
                        result.push_lines(&text, Decision::KeptDestination, None, Some(range.start));
                    }
                }
                Ok(())
            }
        }
        // A freeze region's signature only ever equals another freeze
        // region's (`Signature::FreezeRegion` carries no other meaning),
        // so a well-formed anchor never mixes a freeze item with a plain
        // statement.
        _ => unreachable!("freeze regions and statements never share a signature"),
    }
}

/// The recursive mergeability predicate (`spec.md` §4.4): both sides must
/// be the same recursion-candidate kind, below the configured depth limit,
/// and each must contain at least one statement that isn't itself opaque
/// (`NodeKind::Other`) — otherwise there's nothing structural to gain by
/// descending.
fn recursively_mergeable(t: &Node, d: &Node, depth: usize, options: &MergeOptions) -> bool {
    if let Some(max_depth) = options.max_recursion_depth {
        if depth >= max_depth {
            return false;
        }
    }
    if !t.kind.is_recursion_candidate() || !d.kind.is_recursion_candidate() {
        return false;
    }
    if t.kind.tag() != d.kind.tag() {
        return false;
    }
    has_mergeable_statement(t) && has_mergeable_statement(d)
}

fn has_mergeable_statement(node: &Node) -> bool {
    node.body
        .as_ref()
        .is_some_and(|body| body.iter().any(|stmt| !matches!(stmt.kind, NodeKind::Other { .. })))
}

/// Recursive Body Merge (`spec.md` §4.7): extracts each side's body as its
/// own source text, re-enters the orchestrator one level deeper, and
/// reassembles leading comments, opening line, merged body, and closing
/// line around the recursive result.
fn recursive_body_merge(
    t: &Node,
    d: &Node,
    template: &FileAnalysis,
    destination: &FileAnalysis,
    options: &MergeOptions,
    depth: usize,
    result: &mut MergeResult,
) -> Result<(), MergeError> {
    let merge_type = t.merge_type.as_deref().or(d.merge_type.as_deref());
    let side = options.preference.resolve(merge_type);

    let t_open = t.block_open_line.unwrap_or(t.range.start);
    let d_open = d.block_open_line.unwrap_or(d.range.start);

    match side {
        Side::Template if !t.leading_comments.is_empty() => {
            let first = t.leading_comments.first().unwrap().line;
            let last = t.leading_comments.last().unwrap().line;
            let text = template.buffer.lines_text(LineRange::new(first, last));
            result.push_lines(&text, Decision::Replaced, Some(first), None);
        }
        _ => {
            if !d.leading_comments.is_empty() {
                let first = d.leading_comments.first().unwrap().line;
                let last = d.leading_comments.last().unwrap().line;
                let text = destination.buffer.lines_text(LineRange::new(first, last));
                result.push_lines(&text, Decision::KeptDestination, None, Some(first));
            }
        }
    }

    match side {
        Side::Template => {
            result.push_lines(template.buffer.line(t_open), Decision::Replaced, Some(t_open), None);
        }
        Side::Destination => {
            result.push_lines(destination.buffer.line(d_open), Decision::KeptDestination, None, Some(d_open));
        }
    }

    let t_body_start = t_open + 1;
    let t_body_end = t.body.as_ref().and_then(|b| b.last()).map(|n| n.full_range().end).unwrap_or(t_open);
    let t_body_text = if t_body_end >= t_body_start {
        template.buffer.lines_text(LineRange::new(t_body_start, t_body_end))
    } else {
        String::new()
    };

    let d_body_start = d_open + 1;
    let d_body_end = d.body.as_ref().and_then(|b| b.last()).map(|n| n.full_range().end).unwrap_or(d_open);
    let d_body_text = if d_body_end >= d_body_start {
        destination.buffer.lines_text(LineRange::new(d_body_start, d_body_end))
    } else {
        String::new()
    };

    let child = run(&format!("{t_body_text}\n"), &format!("{d_body_text}\n"), options, depth + 1)?;
    result.extend_with_offset(child, t_body_start.saturating_sub(1), d_body_start.saturating_sub(1));

    match side {
        Side::Template => {
            result.push_lines(template.buffer.line(t.range.end), Decision::Replaced, Some(t.range.end), None);
        }
        Side::Destination => {
            result.push_lines(destination.buffer.line(d.range.end), Decision::KeptDestination, None, Some(d.range.end));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_files_round_trip_unchanged() {
        let src = "def foo\n  1\nend\n";
        let options = MergeOptions::default();
        let result = merge(src, src, &options).unwrap();
        assert_eq!(result.into_text(), src);
    }

    #[test]
    fn destination_customization_wins_by_default() {
        let template = "def greet\n  puts \"hello\"\nend\n";
        let destination = "def greet\n  puts \"hi there\"\nend\n";
        let options = MergeOptions::default();
        let result = merge(template, destination, &options).unwrap();
        assert!(result.into_text().contains("hi there"));
    }

    #[test]
    fn freeze_region_is_preserved_verbatim() {
        let template = "class Widget\n  def render\n    1\n  end\nend\n";
        let destination =
            "class Widget\n  # prism-merge:freeze\n  def render\n    2\n  end\n  # prism-merge:unfreeze\nend\n";
        let options = MergeOptions::default();
        let result = merge(template, destination, &options).unwrap();
        assert!(result.into_text().contains("2"));
    }

    #[test]
    fn recurses_into_matching_class_bodies() {
        let template = "class Widget\n  def render\n    1\n  end\nend\n";
        let destination = "class Widget\n  def render\n    2\n  end\n\n  def extra\n    3\n  end\nend\n";
        let options = MergeOptions::default();
        let result = merge(template, destination, &options).unwrap();
        let text = result.into_text();
        assert!(text.contains("def render"));
        assert!(text.contains("def extra"));
        assert!(text.contains("end\nend\n") || text.trim_end().ends_with("end"));
    }

    #[test]
    fn blank_line_between_adjacent_anchored_items_is_preserved() {
        let src = "VERSION = \"2.0.0\"\n\ndef greet(n)\n  puts \"Hello, #{n}\"\nend\n";
        let options = MergeOptions::default();
        let result = merge(src, src, &options).unwrap();
        assert_eq!(result.into_text(), src);
    }

    #[test]
    fn template_only_method_is_dropped_without_add_template_only_nodes() {
        let template = "def keep\nend\n\ndef drop_me\nend\n";
        let destination = "def keep\nend\n";
        let options = MergeOptions::default();
        let result = merge(template, destination, &options).unwrap();
        assert!(!result.into_text().contains("drop_me"));
    }
}
