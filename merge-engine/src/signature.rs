//! Signature Engine (`spec.md` §4.2): structural identity independent of a
//! node's body or surrounding whitespace. Two nodes with equal signatures
//! are considered "the same declaration" for matching purposes even when
//! their bodies differ completely.
//!
//! `Signature` is a closed enum rather than an open trait object so that
//! equality, hashing, and exhaustive matching all stay free — the same
//! choice made for `NodeKind` (Design Notes §9).

use crate::node::{ConditionalKeyword, FirstArgValue, LoopVariant, Node, NodeKind};

/// Structural identity of a node, independent of its body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    Method { name: String, params: Vec<String> },
    Class { path: String },
    Module { path: String },
    SingletonClass { target: String },
    ConstantAssign { target: String },
    LocalAssign { name: String },
    InstanceAssign { name: String },
    ClassVarAssign { name: String },
    GlobalAssign { name: String },
    MultiAssign,
    Conditional { keyword: ConditionalKeyword, condition: String },
    Case { predicate: String },
    CaseMatch { predicate: String },
    Loop(LoopVariant),
    BeginRescue { first_inner_source: String },
    /// A setter call (`name` ends in `=`): identity ignores the assigned
    /// value, keying only on receiver and block presence (`:call` vs
    /// `:call_with_block`, `spec.md` §4.2).
    CallSetter { name: String, receiver: Option<String>, has_block: bool },
    /// Any other call: identity includes the first argument's value and
    /// block presence.
    Call { name: String, receiver: Option<String>, first_arg: Option<FirstArgValue>, has_block: bool },
    Super { has_block: bool },
    Lambda { params: String },
    PreExec { start_line: usize },
    PostExec { start_line: usize },
    Parens { first_inner_source: String },
    EmbeddedStmt { inner_source: String },
    /// Identity of a freeze region: its 1-based position among all freeze
    /// regions in the file. Regions never match across a differing
    /// ordinal (`spec.md` §4.3).
    FreezeRegion { ordinal: usize },
    /// Fallback for anything outside the closed kind set: identity is the
    /// kind tag plus normalized (whitespace-stripped) source text.
    Other { tag: String, normalized_text: String },
}

/// What a custom signature generator decided for one node.
pub enum SignatureOutcome {
    /// Final signature; skip the default algorithm entirely.
    Explicit(Signature),
    /// Defer to the default algorithm for this node.
    Fallthrough,
    /// Override the default-computed signature for this node only, while
    /// still letting the caller treat it as having gone through the
    /// default pipeline (distinguished from `Explicit` for generators that
    /// compose: a `Substitute` may still be re-substituted by an outer
    /// generator, an `Explicit` may not).
    Substitute(Signature),
}

/// A pluggable override of signature derivation (`spec.md` §6,
/// `signature_generator` option). Consulted before the default algorithm;
/// the default always runs for nodes the generator declines.
pub trait SignatureGenerator {
    fn signature(&self, node: &Node, freeze_ordinal: Option<usize>) -> SignatureOutcome;
}

/// Computes a node's signature, consulting an optional custom generator
/// first and falling through to the default kind-keyed derivation.
pub fn compute_signature(
    node: &Node,
    freeze_ordinal: Option<usize>,
    generator: Option<&dyn SignatureGenerator>,
) -> Signature {
    if let Some(gen) = generator {
        match gen.signature(node, freeze_ordinal) {
            SignatureOutcome::Explicit(sig) | SignatureOutcome::Substitute(sig) => return sig,
            SignatureOutcome::Fallthrough => {}
        }
    }
    default_signature(node, freeze_ordinal)
}

fn default_signature(node: &Node, freeze_ordinal: Option<usize>) -> Signature {
    if let Some(ordinal) = freeze_ordinal {
        return Signature::FreezeRegion { ordinal };
    }
    match &node.kind {
        NodeKind::Method { name, params } => {
            Signature::Method { name: name.clone(), params: params.clone() }
        }
        NodeKind::Class { path } => Signature::Class { path: path.clone() },
        NodeKind::Module { path } => Signature::Module { path: path.clone() },
        NodeKind::SingletonClass { target } => Signature::SingletonClass { target: target.clone() },
        NodeKind::ConstantAssign { target } => Signature::ConstantAssign { target: target.clone() },
        NodeKind::LocalAssign { name } => Signature::LocalAssign { name: name.clone() },
        NodeKind::InstanceAssign { name } => Signature::InstanceAssign { name: name.clone() },
        NodeKind::ClassVarAssign { name } => Signature::ClassVarAssign { name: name.clone() },
        NodeKind::GlobalAssign { name } => Signature::GlobalAssign { name: name.clone() },
        NodeKind::MultiAssign => Signature::MultiAssign,
        NodeKind::Conditional { keyword, condition } => {
            Signature::Conditional { keyword: *keyword, condition: condition.clone() }
        }
        NodeKind::Case { predicate } => Signature::Case { predicate: predicate.clone() },
        NodeKind::CaseMatch { predicate } => Signature::CaseMatch { predicate: predicate.clone() },
        NodeKind::Loop(variant) => Signature::Loop(variant.clone()),
        NodeKind::BeginRescue { first_inner_source } => {
            Signature::BeginRescue { first_inner_source: first_inner_source.clone() }
        }
        NodeKind::Call { name, receiver, has_block, .. } if name.ends_with('=') => {
            Signature::CallSetter { name: name.clone(), receiver: receiver.clone(), has_block: *has_block }
        }
        NodeKind::Call { name, receiver, first_arg, has_block } => Signature::Call {
            name: name.clone(),
            receiver: receiver.clone(),
            first_arg: first_arg.clone(),
            has_block: *has_block,
        },
        NodeKind::Super { has_block } => Signature::Super { has_block: *has_block },
        NodeKind::Lambda { params } => Signature::Lambda { params: params.clone() },
        NodeKind::PreExec => Signature::PreExec { start_line: node.range.start },
        NodeKind::PostExec => Signature::PostExec { start_line: node.range.start },
        NodeKind::Parens { first_inner_source } => {
            Signature::Parens { first_inner_source: first_inner_source.clone() }
        }
        NodeKind::EmbeddedStmt { inner_source } => {
            Signature::EmbeddedStmt { inner_source: inner_source.clone() }
        }
        NodeKind::Other { tag } => Signature::Other {
            tag: tag.clone(),
            normalized_text: String::new(), // filled in by the caller, which has buffer access
        },
    }
}

/// `Other` signatures need the source buffer to normalize text, which this
/// module doesn't have access to; callers that hit `NodeKind::Other` should
/// use this to fill in the text after calling `compute_signature`.
pub fn with_other_text(sig: Signature, normalized_text: String) -> Signature {
    match sig {
        Signature::Other { tag, .. } => Signature::Other { tag, normalized_text },
        other => other,
    }
}

/// A mapping from a node's kind tag (`NodeKind::tag`) to a user-facing
/// "merge type" label, assigned onto `Node::merge_type` as a post-parse
/// pass (`spec.md` §4.4, Glossary "Merge type"). Absent entries leave
/// `merge_type` unset and fall back to the default preference.
pub trait NodeTyping {
    fn merge_type_for(&self, node: &Node) -> Option<String>;
}

/// The default typing: a node's merge type is simply its kind tag, so the
/// `preference` option's `by_type` table can be keyed directly on
/// `NodeKind::tag()` without requiring a custom typing at all.
pub struct DefaultNodeTyping;

impl NodeTyping for DefaultNodeTyping {
    fn merge_type_for(&self, node: &Node) -> Option<String> {
        Some(node.kind.tag().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LineRange;

    fn method(name: &str, params: &[&str]) -> Node {
        Node::new(
            NodeKind::Method {
                name: name.to_string(),
                params: params.iter().map(|s| s.to_string()).collect(),
            },
            LineRange::new(1, 3),
        )
    }

    #[test]
    fn same_name_and_params_produce_equal_signatures() {
        let a = compute_signature(&method("foo", &["x", "y"]), None, None);
        let b = compute_signature(&method("foo", &["x", "y"]), None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn renamed_param_changes_signature() {
        let a = compute_signature(&method("foo", &["x"]), None, None);
        let b = compute_signature(&method("foo", &["y"]), None, None);
        assert_ne!(a, b);
    }

    #[test]
    fn freeze_ordinal_takes_priority_over_kind() {
        let node = method("foo", &[]);
        let sig = compute_signature(&node, Some(2), None);
        assert_eq!(sig, Signature::FreezeRegion { ordinal: 2 });
    }

    #[test]
    fn call_signature_distinguishes_block_presence() {
        let call = |has_block| {
            Node::new(
                NodeKind::Call { name: "foo".to_string(), receiver: None, first_arg: None, has_block },
                LineRange::new(1, 1),
            )
        };
        let without_block = compute_signature(&call(false), None, None);
        let with_block = compute_signature(&call(true), None, None);
        assert_ne!(without_block, with_block);
    }

    #[test]
    fn setter_signature_distinguishes_block_presence() {
        let setter = |has_block| {
            Node::new(
                NodeKind::Call { name: "foo=".to_string(), receiver: None, first_arg: None, has_block },
                LineRange::new(1, 1),
            )
        };
        let without_block = compute_signature(&setter(false), None, None);
        let with_block = compute_signature(&setter(true), None, None);
        assert_ne!(without_block, with_block);
    }

    #[test]
    fn default_typing_uses_kind_tag() {
        let node = method("foo", &[]);
        assert_eq!(DefaultNodeTyping.merge_type_for(&node).as_deref(), Some("def"));
    }
}
