//! Comments: text + line, categorized lazily into magic / freeze-marker /
//! regular. Magic directives are never special-cased during merge — they
//! are just leading comments — but freeze markers drive the Freeze Region
//! Model (`freeze.rs`).

use std::sync::LazyLock;

/// A single-line comment attached to a node as leading or trailing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Full comment text including the leading `#`.
    pub text: String,
    /// 1-based source line.
    pub line: usize,
}

/// Which side of a freeze pair a marker comment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreezeMarkerKind {
    Freeze,
    Unfreeze,
}

/// The three comment categories from `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentCategory {
    /// Matches one of a small, fixed set of directive patterns
    /// (`frozen_string_literal`, encoding, rubocop, sorbet `typed`, …).
    Magic,
    /// Matches `<token>:freeze` or `<token>:unfreeze`.
    FreezeMarker(FreezeMarkerKind),
    Regular,
}

/// The fixed set of magic-comment directive patterns. These are never
/// special-cased by the merge itself — they categorize as `Magic` purely so
/// callers inspecting comments can tell directives from prose — but they
/// still ride along as ordinary leading comments during merge.
static MAGIC_PATTERNS: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    [
        r"(?i)^#\s*frozen_string_literal:\s*(true|false)\s*$",
        r"(?i)^#\s*-\*-\s*(?:en)?coding:\s*\S+.*-\*-\s*$",
        r"(?i)^#\s*(?:en)?coding:\s*\S+\s*$",
        r"(?i)^#\s*rubocop\s*:\s*(disable|enable|todo)\b",
        r"(?i)^#\s*typed:\s*\w+\s*$",
        r"(?i)^#\s*warn_indent:\s*(true|false)\s*$",
        r"(?i)^#\s*shareable_constant_value:\s*\w+\s*$",
    ]
    .iter()
    .map(|p| regex::Regex::new(p).expect("static magic-comment pattern is valid"))
    .collect()
});

impl Comment {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self { text: text.into(), line }
    }

    /// Categorize this comment given the configured freeze token.
    pub fn categorize(&self, freeze_token: &str) -> CommentCategory {
        if let Some(kind) = freeze_marker_kind(&self.text, freeze_token) {
            return CommentCategory::FreezeMarker(kind);
        }
        if MAGIC_PATTERNS.iter().any(|re| re.is_match(&self.text)) {
            return CommentCategory::Magic;
        }
        CommentCategory::Regular
    }

    pub fn is_freeze_marker(&self, freeze_token: &str) -> Option<FreezeMarkerKind> {
        freeze_marker_kind(&self.text, freeze_token)
    }
}

/// A single-line comment whose content, after stripping the leading `#` and
/// surrounding whitespace, matches case-insensitively `<token>:freeze` or
/// `<token>:unfreeze` (`spec.md` §6, "Freeze marker grammar").
pub(crate) fn freeze_marker_kind(text: &str, freeze_token: &str) -> Option<FreezeMarkerKind> {
    let stripped = text.trim_start_matches('#').trim();
    let lower = stripped.to_ascii_lowercase();
    let token_lower = freeze_token.to_ascii_lowercase();

    let unfreeze_marker = format!("{token_lower}:unfreeze");
    if lower == unfreeze_marker {
        return Some(FreezeMarkerKind::Unfreeze);
    }
    let freeze_marker = format!("{token_lower}:freeze");
    if lower == freeze_marker {
        return Some(FreezeMarkerKind::Freeze);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_freeze_and_unfreeze_markers() {
        let freeze = Comment::new("# prism-merge:freeze", 3);
        let unfreeze = Comment::new("# PRISM-MERGE:UNFREEZE", 10);
        assert_eq!(freeze.is_freeze_marker("prism-merge"), Some(FreezeMarkerKind::Freeze));
        assert_eq!(unfreeze.is_freeze_marker("prism-merge"), Some(FreezeMarkerKind::Unfreeze));
    }

    #[test]
    fn respects_custom_freeze_token() {
        let c = Comment::new("# custom-lock:freeze", 1);
        assert_eq!(c.is_freeze_marker("custom-lock"), Some(FreezeMarkerKind::Freeze));
        assert_eq!(c.is_freeze_marker("prism-merge"), None);
    }

    #[test]
    fn categorizes_magic_comments() {
        let c = Comment::new("# frozen_string_literal: true", 1);
        assert_eq!(c.categorize("prism-merge"), CommentCategory::Magic);
    }

    #[test]
    fn categorizes_regular_comments() {
        let c = Comment::new("# explains the next method", 5);
        assert_eq!(c.categorize("prism-merge"), CommentCategory::Regular);
    }

    #[test]
    fn freeze_marker_takes_priority_over_magic_lookalikes() {
        // Shouldn't realistically collide, but freeze-marker check runs first either way.
        let c = Comment::new("# prism-merge:freeze", 1);
        assert!(matches!(c.categorize("prism-merge"), CommentCategory::FreezeMarker(_)));
    }
}
