//! File Analysis (`spec.md` §4.1): turns one source file into the
//! sequence the rest of the engine operates on — top-level statements
//! interleaved with freeze regions, each carrying its computed signature.

use crate::error::MergeError;
use crate::freeze::{detect_freeze_regions, validate_no_partial_overlap, FreezeRegion};
use crate::node::Node;
use crate::parser::{parse_source, Role};
use crate::signature::{compute_signature, with_other_text, NodeTyping, Signature, SignatureGenerator};
use crate::source::{LineRange, SourceBuffer};

/// A top-level entry in a file: either an ordinary statement or a frozen
/// region. Regions absorb every statement they enclose, so a statement
/// never appears both on its own and inside a region.
#[derive(Debug, Clone)]
pub enum TopLevelItem {
    Statement(Node),
    Freeze(FreezeRegion),
}

impl TopLevelItem {
    pub fn range(&self) -> LineRange {
        match self {
            TopLevelItem::Statement(n) => n.full_range(),
            TopLevelItem::Freeze(r) => r.range,
        }
    }

    pub fn as_statement(&self) -> Option<&Node> {
        match self {
            TopLevelItem::Statement(n) => Some(n),
            TopLevelItem::Freeze(_) => None,
        }
    }
}

/// The complete analysis of one source file.
pub struct FileAnalysis {
    pub buffer: SourceBuffer,
    /// Top-level items, sorted by starting line, with frozen statements
    /// already folded into their enclosing `Freeze` entry.
    pub items: Vec<TopLevelItem>,
    /// Parallel to `items`: the computed signature of each entry (a
    /// `Signature::FreezeRegion` for `Freeze` items).
    pub signatures: Vec<Signature>,
}

impl FileAnalysis {
    pub fn analyze(
        text: &str,
        role: Role,
        freeze_token: &str,
        generator: Option<&dyn SignatureGenerator>,
    ) -> Result<Self, MergeError> {
        Self::analyze_typed(text, role, freeze_token, generator, None)
    }

    pub fn analyze_typed(
        text: &str,
        role: Role,
        freeze_token: &str,
        generator: Option<&dyn SignatureGenerator>,
        typing: Option<&dyn NodeTyping>,
    ) -> Result<Self, MergeError> {
        let (buffer, mut statements) = parse_source(text, role)?;
        let regions = detect_freeze_regions(&buffer, freeze_token)?;
        validate_no_partial_overlap(&regions, &statements)?;

        if let Some(typing) = typing {
            for stmt in &mut statements {
                stmt.merge_type = typing.merge_type_for(stmt);
            }
        }

        let mut kept_statements: Vec<Node> = Vec::new();
        for stmt in statements {
            let enclosed = regions.iter().any(|r| r.range.encloses(&stmt.full_range()));
            if !enclosed {
                kept_statements.push(stmt);
            }
        }

        let mut items: Vec<TopLevelItem> = Vec::new();
        for region in &regions {
            // A region a statement's own full range encompasses (the marker
            // sits in that statement's leading comments but closes before
            // the statement ends, e.g. an adjacent `:freeze`/`:unfreeze`
            // pair) rides with that node as frozen-on-node (`spec.md` §4.3)
            // instead of also existing as its own item — otherwise the
            // region's lines would be emitted twice.
            let absorbed_by_node = kept_statements.iter().any(|s| s.full_range().encloses(&region.range));
            if !absorbed_by_node {
                items.push(TopLevelItem::Freeze(region.clone()));
            }
        }
        for stmt in kept_statements {
            items.push(TopLevelItem::Statement(stmt));
        }
        items.sort_by_key(|item| item.range().start);

        let signatures = items
            .iter()
            .map(|item| match item {
                TopLevelItem::Freeze(region) => Signature::FreezeRegion { ordinal: region.ordinal },
                TopLevelItem::Statement(node) => {
                    let sig = compute_signature(node, None, generator);
                    if let Signature::Other { .. } = &sig {
                        let normalized = buffer.normalized_line(node.range.start);
                        with_other_text(sig, normalized)
                    } else {
                        sig
                    }
                }
            })
            .collect();

        Ok(Self { buffer, items, signatures })
    }

    pub fn freeze_regions(&self) -> impl Iterator<Item = &FreezeRegion> {
        self.items.iter().filter_map(|item| match item {
            TopLevelItem::Freeze(r) => Some(r),
            TopLevelItem::Statement(_) => None,
        })
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freezes_absorb_enclosed_statements() {
        let src = "a = 1\n# prism-merge:freeze\nb = 2\n# prism-merge:unfreeze\nc = 3\n";
        let analysis = FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap();
        assert_eq!(analysis.items.len(), 3); // a=1, freeze-region, c=3
        assert!(matches!(analysis.items[1], TopLevelItem::Freeze(_)));
    }

    #[test]
    fn adjacent_freeze_pair_rides_with_node_instead_of_its_own_item() {
        let src = "# prism-merge:freeze\n# prism-merge:unfreeze\ndef m\n  \"D\"\nend\n";
        let analysis = FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap();
        assert_eq!(analysis.items.len(), 1);
        let node = analysis.items[0].as_statement().unwrap();
        assert!(node.is_frozen_on_node("prism-merge"));
    }

    #[test]
    fn signatures_align_with_items() {
        let src = "def foo\nend\n";
        let analysis = FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap();
        assert_eq!(analysis.items.len(), analysis.signatures.len());
    }

    #[test]
    fn invalid_freeze_structure_is_rejected() {
        let src = "def foo\n  # prism-merge:freeze\n  a = 1\nend\n";
        let err = FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap_err();
        assert!(matches!(err, MergeError::InvalidFreezeStructure { .. }));
    }

    #[test]
    fn unclosed_top_level_freeze_is_valid_and_extends_to_eof() {
        let src = "# prism-merge:freeze\na = 1\n";
        let analysis = FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap();
        assert_eq!(analysis.items.len(), 1);
        assert!(matches!(analysis.items[0], TopLevelItem::Freeze(_)));
    }
}
