//! Error kinds surfaced at the merge engine's boundary.
//!
//! Following the teacher's split between library errors (`thiserror`, used
//! by `tinyclaw-inference`) and CLI errors (`anyhow`, used by
//! `tinyclaw-cli`), every error the core can raise is a closed, typed
//! variant here. There are no recoverable errors inside a merge: the engine
//! either produces a complete result or returns one of these.

use std::fmt;

use crate::source::LineRange;

/// A line range plus a short description, used to summarize the node(s)
/// a freeze-structure error involves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub range: LineRange,
    pub description: String,
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (lines {}-{})", self.description, self.range.start, self.range.end)
    }
}

/// Parser diagnostics: tree-sitter reports syntax errors as ERROR/MISSING
/// nodes rather than a single message, so we collect one entry per site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Every fatal condition the engine can raise. All three kinds are fatal;
/// the engine never partially succeeds.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// The template source failed to parse.
    #[error("template failed to parse: {}", summarize(.diagnostics))]
    TemplateParseError {
        content: String,
        diagnostics: Vec<ParseDiagnostic>,
    },

    /// The destination source failed to parse.
    #[error("destination failed to parse: {}", summarize(.diagnostics))]
    DestinationParseError {
        content: String,
        diagnostics: Vec<ParseDiagnostic>,
    },

    /// A freeze region is malformed: unpaired `:unfreeze`, nested `:freeze`,
    /// an unpaired `:freeze` inside a nested container, or a statement that
    /// partially overlaps a freeze region.
    #[error("invalid freeze structure at lines {start_line}-{end_line}: {message}")]
    InvalidFreezeStructure {
        message: String,
        start_line: usize,
        end_line: usize,
        offending_nodes: Vec<NodeSummary>,
    },
}

fn summarize(diagnostics: &[ParseDiagnostic]) -> String {
    if diagnostics.is_empty() {
        return "no diagnostics reported".to_string();
    }
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type MergeOutcome<T> = Result<T, MergeError>;
