//! # prism-merge-core
//!
//! A structural three-way-less merge engine for Ruby source: given a
//! *template* (the canonical upstream file) and a *destination* (a
//! customized downstream copy), produces a merged source that respects
//! structural identity rather than line position, honors user-designated
//! freeze regions, and stays idempotent under repeated re-merging.
//!
//! ## Pipeline
//!
//! 1. **File Analysis** (`analysis`, `parser`, `freeze`, `signature`) —
//!    parses a file into a top-level sequence of statements and freeze
//!    regions, each carrying a computed structural signature.
//! 2. **Anchor Discovery** (`anchor`) — finds template/destination pairs
//!    confident enough to treat as "the same thing" (identical files,
//!    unique signatures, identical text blocks), splitting everything else
//!    into boundaries.
//! 3. **SmartMerger** (`orchestrator`) — walks the anchor/boundary
//!    timeline, recursing into matched compound nodes (classes, modules,
//!    singleton classes, calls with a block) when it's safe to.
//! 4. **Boundary Resolver** (`resolver`) — reconciles one boundary at a
//!    time: freeze regions first, then signature matches, then residual
//!    fuzzy matches from the configured **Match Refiners** (`refiners`).
//!
//! The engine itself is synchronous and does no I/O; callers own reading
//! source files and writing the merged result.
//!
//! ## Example
//!
//! ```rust
//! use prism_merge_core::{merge, MergeOptions};
//!
//! let template = "def greet\n  puts \"hello\"\nend\n";
//! let destination = "def greet\n  puts \"hi there\"\nend\n";
//!
//! let result = merge(template, destination, &MergeOptions::default()).unwrap();
//! assert!(result.into_text().contains("hi there"));
//! ```

pub mod analysis;
pub mod anchor;
pub mod comment;
pub mod error;
pub mod freeze;
pub mod merge_result;
pub mod node;
pub mod options;
pub mod orchestrator;
pub mod parser;
pub mod refiners;
pub mod resolver;
pub mod signature;
pub mod source;

pub use error::{MergeError, MergeOutcome, NodeSummary, ParseDiagnostic};
pub use merge_result::{Decision, LineProvenance, MergeResult};
pub use options::{MergeOptions, Preference, Side};
pub use refiners::{MatchRefiner, MethodMatchRefiner, RefinedMatch};
pub use signature::{DefaultNodeTyping, NodeTyping, Signature, SignatureGenerator};

/// Merges `destination` against `template` and returns the merged source
/// plus its full per-line provenance (`spec.md` §4.4, §6).
pub fn merge(template_src: &str, destination_src: &str, options: &MergeOptions) -> Result<MergeResult, MergeError> {
    orchestrator::merge(template_src, destination_src, options)
}

/// Convenience wrapper over [`merge`] for callers who only want the merged
/// text, discarding provenance.
pub fn merge_text(template_src: &str, destination_src: &str, options: &MergeOptions) -> Result<String, MergeError> {
    merge(template_src, destination_src, options).map(MergeResult::into_text)
}
