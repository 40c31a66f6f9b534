//! Merge options (`spec.md` §6): the knobs that drive both the
//! Orchestrator and the Boundary Resolver. Split into its own module so
//! `orchestrator.rs` and `resolver.rs` can share it without either owning
//! the other.

use std::collections::HashMap;

use crate::refiners::MatchRefiner;
use crate::signature::{NodeTyping, SignatureGenerator};

/// Which side wins a signature match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Template,
    Destination,
}

/// The `preference` option: a global default, or a default plus per-
/// merge-type overrides.
#[derive(Debug, Clone)]
pub enum Preference {
    Global(Side),
    ByType { default: Side, overrides: HashMap<String, Side> },
}

impl Default for Preference {
    fn default() -> Self {
        Preference::Global(Side::Destination)
    }
}

impl Preference {
    pub fn resolve(&self, merge_type: Option<&str>) -> Side {
        match self {
            Preference::Global(side) => *side,
            Preference::ByType { default, overrides } => {
                merge_type.and_then(|t| overrides.get(t)).copied().unwrap_or(*default)
            }
        }
    }
}

/// All configurable behavior for one `merge` call (`spec.md` §6).
pub struct MergeOptions<'a> {
    pub preference: Preference,
    pub add_template_only_nodes: bool,
    pub freeze_token: String,
    pub max_recursion_depth: Option<usize>,
    pub signature_generator: Option<&'a dyn SignatureGenerator>,
    pub node_typing: Option<&'a dyn NodeTyping>,
    pub match_refiners: Vec<Box<dyn MatchRefiner>>,
}

impl<'a> Default for MergeOptions<'a> {
    fn default() -> Self {
        Self {
            preference: Preference::default(),
            add_template_only_nodes: false,
            freeze_token: "prism-merge".to_string(),
            max_recursion_depth: None,
            signature_generator: None,
            node_typing: None,
            match_refiners: Vec::new(),
        }
    }
}
