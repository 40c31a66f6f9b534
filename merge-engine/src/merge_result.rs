//! The merge's output: the merged text plus, optionally, a per-line
//! provenance trail and decision tally (`spec.md` §4.4, §6, §8).

use std::collections::HashMap;
use std::fmt;

/// Why one output line exists, and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The line is unchanged or preferred from the template.
    KeptTemplate,
    /// The line is preferred from the destination's customization.
    KeptDestination,
    /// The destination's version replaced the template's at this spot.
    Replaced,
    /// A template-only node was appended per `add_template_only_nodes`.
    Appended,
    /// The line sits inside a frozen destination region.
    FreezeBlock,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Decision::KeptTemplate => "kept_template",
            Decision::KeptDestination => "kept_destination",
            Decision::Replaced => "replaced",
            Decision::Appended => "appended",
            Decision::FreezeBlock => "freeze_block",
        };
        f.write_str(label)
    }
}

/// Provenance of a single output line: which decision produced it, and
/// which source line(s) it traces back to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LineProvenance {
    pub decision: Decision,
    pub template_line: Option<usize>,
    pub destination_line: Option<usize>,
}

/// Accumulates merged output line by line; turns into the final string
/// and (on request) a full provenance trail plus decision tally.
#[derive(Debug, Default)]
pub struct MergeResult {
    lines: Vec<String>,
    provenance: Vec<LineProvenance>,
}

impl MergeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, text: impl Into<String>, provenance: LineProvenance) {
        self.lines.push(text.into());
        self.provenance.push(provenance);
    }

    pub fn push_lines(&mut self, text: &str, decision: Decision, template_line: Option<usize>, destination_line: Option<usize>) {
        for (offset, line) in text.lines().enumerate() {
            self.push_line(
                line.to_string(),
                LineProvenance {
                    decision,
                    template_line: template_line.map(|l| l + offset),
                    destination_line: destination_line.map(|l| l + offset),
                },
            );
        }
    }

    /// The number of trailing blank lines currently at the end of the
    /// accumulated output, used by the boundary resolver to enforce the
    /// "no 3+ consecutive blank lines" invariant (`spec.md` §8).
    pub fn trailing_blank_run(&self) -> usize {
        self.lines.iter().rev().take_while(|l| l.trim().is_empty()).count()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn provenance(&self) -> &[LineProvenance] {
        &self.provenance
    }

    /// Tally of how many output lines came from each decision kind.
    pub fn decision_tally(&self) -> HashMap<Decision, usize> {
        let mut tally = HashMap::new();
        for p in &self.provenance {
            *tally.entry(p.decision).or_insert(0) += 1;
        }
        tally
    }

    /// Appends another `MergeResult` (typically a recursive body merge's
    /// output) onto this one, shifting its line-provenance numbers by the
    /// given offsets so they read as absolute lines in the outer file
    /// rather than relative lines within the extracted body substring
    /// (`spec.md` §4.7).
    pub fn extend_with_offset(&mut self, other: MergeResult, template_offset: usize, destination_offset: usize) {
        for (line, provenance) in other.lines.into_iter().zip(other.provenance.into_iter()) {
            self.push_line(
                line,
                LineProvenance {
                    decision: provenance.decision,
                    template_line: provenance.template_line.map(|l| l + template_offset),
                    destination_line: provenance.destination_line.map(|l| l + destination_offset),
                },
            );
        }
    }

    pub fn into_text(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_lines_splits_multiline_blocks_with_incrementing_provenance() {
        let mut result = MergeResult::new();
        result.push_lines("a\nb\nc", Decision::KeptTemplate, Some(10), None);
        assert_eq!(result.line_count(), 3);
        assert_eq!(result.provenance()[2].template_line, Some(12));
    }

    #[test]
    fn decision_tally_counts_each_kind() {
        let mut result = MergeResult::new();
        result.push_lines("a\nb", Decision::KeptTemplate, Some(1), None);
        result.push_lines("c", Decision::KeptDestination, None, Some(1));
        let tally = result.decision_tally();
        assert_eq!(tally[&Decision::KeptTemplate], 2);
        assert_eq!(tally[&Decision::KeptDestination], 1);
    }

    #[test]
    fn trailing_blank_run_counts_consecutive_blanks() {
        let mut result = MergeResult::new();
        result.push_lines("a\n\n\n", Decision::KeptTemplate, Some(1), None);
        assert_eq!(result.trailing_blank_run(), 2);
    }

    #[test]
    fn into_text_joins_with_trailing_newline() {
        let mut result = MergeResult::new();
        result.push_lines("a\nb", Decision::KeptTemplate, Some(1), None);
        assert_eq!(result.into_text(), "a\nb\n");
    }
}
