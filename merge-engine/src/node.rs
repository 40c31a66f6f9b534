//! The Node model (`spec.md` §3): a variant discriminated by kind, carrying
//! a source range, leading/trailing comments, and — for compound kinds — a
//! body statement sequence.
//!
//! `NodeKind` is a closed Rust enum with per-variant payloads rather than an
//! open class hierarchy, per Design Notes §9. Every payload that the
//! Signature Engine (`signature.rs`) needs (condition text, constant path,
//! parameter names, …) is captured here at parse time so that matching
//! never needs to re-slice the source buffer.

pub use crate::source::LineRange;
use crate::comment::Comment;

/// The value of a call's first argument, used by the Call signature
/// (`spec.md` §4.2): the unescaped string for a string literal, the
/// interned symbol name for a symbol literal, otherwise the raw source
/// slice of the argument expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FirstArgValue {
    Str(String),
    Sym(String),
    Source(String),
}

/// `while`/`until`/`for` loop variants (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoopVariant {
    While { condition: String },
    Until { condition: String },
    For { index: String, collection: String },
}

/// `if`/`unless` (`spec.md` calls both "Conditional").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionalKeyword {
    If,
    Unless,
}

/// The closed set of node kinds relevant to this merge engine
/// (`spec.md` §3). Anything else lowers to `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
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
    Call {
        name: String,
        receiver: Option<String>,
        first_arg: Option<FirstArgValue>,
        has_block: bool,
    },
    Super { has_block: bool },
    Lambda { params: String },
    PreExec,
    PostExec,
    Parens { first_inner_source: String },
    EmbeddedStmt { inner_source: String },
    Other { tag: String },
}

/// Truncates a source slice to the first 30 characters, as the Signature
/// Engine does for `BeginRescue` and `Parens` identity (`spec.md` §4.2).
pub fn truncate_signature_text(s: &str) -> String {
    s.chars().take(30).collect()
}

impl NodeKind {
    /// A short, stable tag used as a `node_typing` map key and as the
    /// `Other` signature's `kind_tag_string`.
    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Method { .. } => "def",
            NodeKind::Class { .. } => "class",
            NodeKind::Module { .. } => "module",
            NodeKind::SingletonClass { .. } => "singleton_class",
            NodeKind::ConstantAssign { .. } => "const",
            NodeKind::LocalAssign { .. } => "local_assign",
            NodeKind::InstanceAssign { .. } => "instance_assign",
            NodeKind::ClassVarAssign { .. } => "class_var_assign",
            NodeKind::GlobalAssign { .. } => "global_assign",
            NodeKind::MultiAssign => "multi_assign",
            NodeKind::Conditional { keyword: ConditionalKeyword::If, .. } => "if",
            NodeKind::Conditional { keyword: ConditionalKeyword::Unless, .. } => "unless",
            NodeKind::Case { .. } => "case",
            NodeKind::CaseMatch { .. } => "case_match",
            NodeKind::Loop(LoopVariant::While { .. }) => "while",
            NodeKind::Loop(LoopVariant::Until { .. }) => "until",
            NodeKind::Loop(LoopVariant::For { .. }) => "for",
            NodeKind::BeginRescue { .. } => "begin",
            NodeKind::Call { has_block: true, .. } => "call_with_block",
            NodeKind::Call { has_block: false, .. } => "call",
            NodeKind::Super { .. } => "super",
            NodeKind::Lambda { .. } => "lambda",
            NodeKind::PreExec => "pre_execution",
            NodeKind::PostExec => "post_execution",
            NodeKind::Parens { .. } => "parens",
            NodeKind::EmbeddedStmt { .. } => "embedded",
            NodeKind::Other { tag } => tag,
        }
    }

    /// Kinds whose body is a candidate for the recursive mergeability
    /// predicate (`spec.md` §4.4): Class, Module, SingletonClass, and
    /// Call-with-block. All other compound kinds (BeginRescue, Case,
    /// CaseMatch, Loop, Lambda) carry a body for reconstruction purposes
    /// but are never recursed into.
    pub fn is_recursion_candidate(&self) -> bool {
        matches!(
            self,
            NodeKind::Class { .. } | NodeKind::Module { .. } | NodeKind::SingletonClass { .. }
        ) || matches!(self, NodeKind::Call { has_block: true, .. })
    }

    /// Whether this kind carries a nested body sequence at all.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            NodeKind::Method { .. }
                | NodeKind::Class { .. }
                | NodeKind::Module { .. }
                | NodeKind::SingletonClass { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::Case { .. }
                | NodeKind::CaseMatch { .. }
                | NodeKind::Loop(_)
                | NodeKind::BeginRescue { .. }
                | NodeKind::Lambda { .. }
                | NodeKind::Parens { .. }
                | NodeKind::EmbeddedStmt { .. }
        ) || matches!(self, NodeKind::Call { has_block: true, .. })
    }
}

/// A parsed syntax node: kind, range, comments, and (for compound kinds) a
/// body statement sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: LineRange,
    pub leading_comments: Vec<Comment>,
    pub trailing_comments: Vec<Comment>,
    pub body: Option<Vec<Node>>,
    /// Set post-hoc by a `node_typing` transform; used to look up a
    /// per-merge-type preference (`spec.md` §4.4, Glossary "Merge type").
    pub merge_type: Option<String>,
    /// For Call-with-block nodes: the 1-based line the block opens on
    /// (e.g. the `do` line), which may differ from `range.start` when the
    /// call's arguments span multiple lines. Used by the recursive body
    /// merge (`spec.md` §4.7) to slice exactly the block body.
    pub block_open_line: Option<usize>,
}

impl Node {
    pub fn new(kind: NodeKind, range: LineRange) -> Self {
        Self {
            kind,
            range,
            leading_comments: Vec::new(),
            trailing_comments: Vec::new(),
            body: None,
            merge_type: None,
            block_open_line: None,
        }
    }

    pub fn with_body(mut self, body: Vec<Node>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_leading_comments(mut self, comments: Vec<Comment>) -> Self {
        self.leading_comments = comments;
        self
    }

    /// A node is frozen-on-node (`spec.md` §4.3) when a `:freeze` marker
    /// appears in its leading comments. Rides with the node through
    /// matching regardless of preference policy.
    pub fn is_frozen_on_node(&self, freeze_token: &str) -> bool {
        use crate::comment::FreezeMarkerKind;
        self.leading_comments
            .iter()
            .any(|c| c.is_freeze_marker(freeze_token) == Some(FreezeMarkerKind::Freeze))
    }

    /// The full range this node occupies including its leading comments,
    /// used when emitting or skipping a node as a unit.
    pub fn full_range(&self) -> LineRange {
        match self.leading_comments.first() {
            Some(c) => LineRange::new(c.line.min(self.range.start), self.range.end),
            None => self.range,
        }
    }
}
