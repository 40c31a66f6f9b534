//! Tree-sitter CST parsing and lowering into the Node model (`node.rs`).
//!
//! We parse with `tree-sitter-ruby`, then walk the resulting concrete
//! syntax tree once, lowering each top-level and nested statement into a
//! `Node` and attaching its leading/trailing comments. Tree-sitter's own
//! node-kind strings (`"method"`, `"if"`, `"class"`, …) are an
//! implementation detail of this module only; everything downstream works
//! against the closed `NodeKind` enum. Any grammar node this module
//! doesn't recognize lowers to `NodeKind::Other`.

use crate::comment::Comment;
use crate::error::{MergeError, ParseDiagnostic};
use crate::node::{ConditionalKeyword, FirstArgValue, LoopVariant, Node, NodeKind};
use crate::source::{LineRange, SourceBuffer};

/// Parses Ruby source into a top-level statement sequence plus the source
/// buffer it was lowered from. Standalone comment lines are not included
/// in the returned statements — those are consumed separately by
/// `freeze.rs` and by this module's own comment-attachment pass.
pub fn parse_source(text: &str, role: Role) -> Result<(SourceBuffer, Vec<Node>), MergeError> {
    let buffer = SourceBuffer::new(text);

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_ruby::LANGUAGE.into())
        .expect("tree-sitter-ruby grammar is statically linked and always loads");

    let tree = parser.parse(text, None).ok_or_else(|| {
        make_parse_error(
            role,
            text.to_string(),
            vec![ParseDiagnostic { line: 1, message: "tree-sitter returned no tree".to_string() }],
        )
    })?;

    let root = tree.root_node();
    let diagnostics = collect_error_diagnostics(&root, text.as_bytes());
    if !diagnostics.is_empty() {
        return Err(make_parse_error(role, text.to_string(), diagnostics));
    }

    let bytes = text.as_bytes();
    let mut cursor = root.walk();
    let top_level: Vec<tree_sitter::Node> = root.children(&mut cursor).collect();

    let statements = lower_siblings(&top_level, bytes);
    Ok((buffer, statements))
}

/// Which side a parse failure occurred on, so the caller can raise the
/// right `MergeError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Template,
    Destination,
}

fn make_parse_error(role: Role, content: String, diagnostics: Vec<ParseDiagnostic>) -> MergeError {
    match role {
        Role::Template => MergeError::TemplateParseError { content, diagnostics },
        Role::Destination => MergeError::DestinationParseError { content, diagnostics },
    }
}

fn collect_error_diagnostics(node: &tree_sitter::Node, src: &[u8]) -> Vec<ParseDiagnostic> {
    let mut out = Vec::new();
    walk_errors(node, src, &mut out);
    out
}

fn walk_errors(node: &tree_sitter::Node, src: &[u8], out: &mut Vec<ParseDiagnostic>) {
    if node.is_error() || node.is_missing() {
        let line = node.start_position().row + 1;
        let text = node.utf8_text(src).unwrap_or("").trim();
        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            format!("unexpected `{text}`")
        };
        out.push(ParseDiagnostic { line, message });
        return; // don't descend into an already-reported error subtree
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_errors(&child, src, out);
    }
}

/// Lowers a flat sequence of tree-sitter siblings (the children of
/// `program` or of a statement-bearing body node) into `Node`s, attaching
/// comments as it goes. Comment nodes themselves never become `Node`s;
/// they are folded into the `leading_comments`/`trailing_comments` of the
/// statement they sit next to.
fn lower_siblings(siblings: &[tree_sitter::Node], src: &[u8]) -> Vec<Node> {
    let mut pending_comments: Vec<Comment> = Vec::new();
    let mut statements: Vec<Node> = Vec::new();

    for ts_node in siblings {
        if ts_node.kind() == "comment" {
            let line = ts_node.start_position().row + 1;
            let text = ts_node.utf8_text(src).unwrap_or("").to_string();
            pending_comments.push(Comment::new(text, line));
            continue;
        }

        let start_line = ts_node.start_position().row + 1;

        // A comment on the same line as the previous statement's closing
        // line is trailing on that statement, not leading on this one.
        if let Some(prev) = statements.last_mut() {
            let mut trailing = Vec::new();
            pending_comments.retain(|c| {
                if c.line == prev.range.end {
                    trailing.push(c.clone());
                    false
                } else {
                    true
                }
            });
            prev.trailing_comments.extend(trailing);
        }

        let leading = std::mem::take(&mut pending_comments)
            .into_iter()
            .filter(|c| c.line < start_line)
            .collect::<Vec<_>>();

        if let Some(node) = lower_node(ts_node, src) {
            statements.push(node.with_leading_comments(leading));
        }
    }

    if let Some(last) = statements.last_mut() {
        let mut trailing = Vec::new();
        pending_comments.retain(|c| {
            if c.line == last.range.end {
                trailing.push(c.clone());
                false
            } else {
                true
            }
        });
        last.trailing_comments.extend(trailing);
    }

    statements
}

fn text_of<'a>(node: &tree_sitter::Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn range_of(node: &tree_sitter::Node) -> LineRange {
    LineRange::new(node.start_position().row + 1, node.end_position().row + 1)
}

fn child_by_field<'t>(node: &tree_sitter::Node<'t>, field: &str) -> Option<tree_sitter::Node<'t>> {
    node.child_by_field_name(field)
}

fn body_children<'t>(node: &tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    let body = child_by_field(node, "body").unwrap_or(*node);
    let mut cursor = body.walk();
    body.children(&mut cursor).collect()
}

fn lower_body(node: &tree_sitter::Node, src: &[u8]) -> Vec<Node> {
    let children = body_children(node);
    lower_siblings(&children, src)
}

fn method_params(node: &tree_sitter::Node, src: &[u8]) -> Vec<String> {
    let Some(params) = child_by_field(node, "parameters") else { return Vec::new() };
    let mut cursor = params.walk();
    params
        .children(&mut cursor)
        .filter(|c| c.kind() != "(" && c.kind() != ")" && c.kind() != ",")
        .map(|p| {
            // identifier | optional_parameter | splat_parameter | hash_splat_parameter
            // | block_parameter | keyword_parameter, all carry the bare name as
            // their first identifier-like child (or are one themselves).
            if p.child_count() == 0 {
                text_of(&p, src).to_string()
            } else {
                child_by_field(&p, "name")
                    .map(|n| text_of(&n, src).to_string())
                    .unwrap_or_else(|| text_of(&p, src).to_string())
            }
        })
        .collect()
}

fn constant_path_text(node: &tree_sitter::Node, src: &[u8]) -> String {
    text_of(node, src).trim().to_string()
}

fn has_block_child(node: &tree_sitter::Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| matches!(c.kind(), "block" | "do_block"))
}

fn lower_node(node: &tree_sitter::Node, src: &[u8]) -> Option<Node> {
    let range = range_of(node);
    let kind = match node.kind() {
        "method" | "singleton_method" => {
            let name = child_by_field(node, "name").map(|n| text_of(&n, src).to_string()).unwrap_or_default();
            let params = method_params(node, src);
            return Some(Node::new(NodeKind::Method { name, params }, range).with_body(lower_body(node, src)));
        }
        "class" => {
            let path = child_by_field(node, "name").map(|n| constant_path_text(&n, src)).unwrap_or_default();
            return Some(Node::new(NodeKind::Class { path }, range).with_body(lower_body(node, src)));
        }
        "module" => {
            let path = child_by_field(node, "name").map(|n| constant_path_text(&n, src)).unwrap_or_default();
            return Some(Node::new(NodeKind::Module { path }, range).with_body(lower_body(node, src)));
        }
        "singleton_class" => {
            let target = child_by_field(node, "value")
                .map(|n| text_of(&n, src).to_string())
                .unwrap_or_else(|| "self".to_string());
            return Some(Node::new(NodeKind::SingletonClass { target }, range).with_body(lower_body(node, src)));
        }
        "assignment" | "operator_assignment" => {
            let lhs = child_by_field(node, "left")?;
            return lower_assignment(&lhs, src, range);
        }
        "multiple_assignment" => NodeKind::MultiAssign,
        "if" | "unless" => {
            let keyword = if node.kind() == "if" { ConditionalKeyword::If } else { ConditionalKeyword::Unless };
            let condition = child_by_field(node, "condition").map(|n| text_of(&n, src).trim().to_string()).unwrap_or_default();
            return Some(Node::new(NodeKind::Conditional { keyword, condition }, range).with_body(lower_body(node, src)));
        }
        "case" => {
            let predicate = child_by_field(node, "value").map(|n| text_of(&n, src).trim().to_string()).unwrap_or_default();
            return Some(Node::new(NodeKind::Case { predicate }, range).with_body(lower_body(node, src)));
        }
        "case_match" => {
            let predicate = child_by_field(node, "value").map(|n| text_of(&n, src).trim().to_string()).unwrap_or_default();
            return Some(Node::new(NodeKind::CaseMatch { predicate }, range).with_body(lower_body(node, src)));
        }
        "while" | "until" => {
            let condition = child_by_field(node, "condition").map(|n| text_of(&n, src).trim().to_string()).unwrap_or_default();
            let variant = if node.kind() == "while" {
                LoopVariant::While { condition }
            } else {
                LoopVariant::Until { condition }
            };
            return Some(Node::new(NodeKind::Loop(variant), range).with_body(lower_body(node, src)));
        }
        "for" => {
            let index = child_by_field(node, "pattern").map(|n| text_of(&n, src).trim().to_string()).unwrap_or_default();
            let collection = child_by_field(node, "value").map(|n| text_of(&n, src).trim().to_string()).unwrap_or_default();
            return Some(Node::new(NodeKind::Loop(LoopVariant::For { index, collection }), range).with_body(lower_body(node, src)));
        }
        "begin" => {
            let first_inner_source = first_inner_statement_text(node, src);
            return Some(Node::new(NodeKind::BeginRescue { first_inner_source }, range).with_body(lower_body(node, src)));
        }
        "call" | "method_call" => {
            let name = child_by_field(node, "method").map(|n| text_of(&n, src).to_string()).unwrap_or_default();
            let receiver = child_by_field(node, "receiver").map(|n| text_of(&n, src).to_string());
            let first_arg = child_by_field(node, "arguments").and_then(|args| {
                let mut cursor = args.walk();
                args.children(&mut cursor)
                    .find(|c| !matches!(c.kind(), "(" | ")" | ","))
                    .map(|a| first_arg_value(&a, src))
            });
            let has_block = has_block_child(node);
            let mut n = Node::new(NodeKind::Call { name, receiver, first_arg, has_block }, range);
            if has_block {
                n = n.with_body(lower_body(node, src));
            }
            return Some(n);
        }
        "super" | "zsuper" => {
            return Some(Node::new(NodeKind::Super { has_block: has_block_child(node) }, range));
        }
        "lambda" => {
            let params = child_by_field(node, "parameters").map(|n| text_of(&n, src).to_string()).unwrap_or_default();
            return Some(Node::new(NodeKind::Lambda { params }, range).with_body(lower_body(node, src)));
        }
        "pre_execution" => NodeKind::PreExec,
        "post_execution" => NodeKind::PostExec,
        "parenthesized_statements" => {
            let first_inner_source = first_inner_statement_text(node, src);
            return Some(Node::new(NodeKind::Parens { first_inner_source }, range).with_body(lower_body(node, src)));
        }
        "interpolation" => {
            let inner_source = text_of(node, src).trim().to_string();
            NodeKind::EmbeddedStmt { inner_source }
        }
        other => NodeKind::Other { tag: other.to_string() },
    };

    Some(Node::new(kind, range))
}

/// The first non-comment child's source text, truncated to 30 characters
/// per the Signature Engine's `BeginRescue`/`Parens` identity (`spec.md`
/// §4.2).
fn first_inner_statement_text(node: &tree_sitter::Node, src: &[u8]) -> String {
    let children = body_children(node);
    let first = children.iter().find(|c| c.kind() != "comment");
    match first {
        Some(n) => crate::node::truncate_signature_text(text_of(n, src).trim()),
        None => String::new(),
    }
}

fn lower_assignment(lhs: &tree_sitter::Node, src: &[u8], range: LineRange) -> Option<Node> {
    let kind = match lhs.kind() {
        "constant" | "scope_resolution" => NodeKind::ConstantAssign { target: text_of(lhs, src).to_string() },
        "identifier" => NodeKind::LocalAssign { name: text_of(lhs, src).to_string() },
        "instance_variable" => NodeKind::InstanceAssign { name: text_of(lhs, src).to_string() },
        "class_variable" => NodeKind::ClassVarAssign { name: text_of(lhs, src).to_string() },
        "global_variable" => NodeKind::GlobalAssign { name: text_of(lhs, src).to_string() },
        _ => NodeKind::Other { tag: "assignment".to_string() },
    };
    Some(Node::new(kind, range))
}

fn first_arg_value(node: &tree_sitter::Node, src: &[u8]) -> FirstArgValue {
    match node.kind() {
        "string" => {
            let text = text_of(node, src);
            FirstArgValue::Str(text.trim_matches(|c| c == '"' || c == '\'').to_string())
        }
        "simple_symbol" | "symbol" => FirstArgValue::Sym(text_of(node, src).trim_start_matches(':').to_string()),
        _ => FirstArgValue::Source(text_of(node, src).trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_level_method() {
        let (_, stmts) = parse_source("def foo(a, b)\n  a + b\nend\n", Role::Template).unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0].kind {
            NodeKind::Method { name, params } => {
                assert_eq!(name, "foo");
                assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected Method, got {other:?}"),
        }
    }

    #[test]
    fn attaches_leading_comment() {
        let (_, stmts) = parse_source("# explains foo\ndef foo\nend\n", Role::Template).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].leading_comments.len(), 1);
    }

    #[test]
    fn parses_class_with_path() {
        let (_, stmts) = parse_source("class Foo::Bar\nend\n", Role::Template).unwrap();
        match &stmts[0].kind {
            NodeKind::Class { path } => assert_eq!(path, "Foo::Bar"),
            other => panic!("expected Class, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_syntax_reports_diagnostics() {
        let err = parse_source("def foo(\n", Role::Template).unwrap_err();
        assert!(matches!(err, MergeError::TemplateParseError { .. }));
    }

    #[test]
    fn call_with_do_block_recurses_into_body() {
        let (_, stmts) = parse_source("items.each do |i|\n  puts i\nend\n", Role::Template).unwrap();
        match &stmts[0].kind {
            NodeKind::Call { has_block, .. } => assert!(has_block),
            other => panic!("expected Call, got {other:?}"),
        }
        assert!(stmts[0].body.is_some());
    }
}
