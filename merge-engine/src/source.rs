//! Source Buffer: an immutable byte sequence plus a 1-based line index.
//!
//! Every other entity in the engine refers to source by line range or byte
//! range into one of these; no entity owns a copy of the text it doesn't
//! need.

/// An inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "line range start {start} > end {end}");
        Self { start, end }
    }

    pub fn single(line: usize) -> Self {
        Self { start: line, end: line }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false // a LineRange always spans at least one line; emptiness is modeled as Option<LineRange>
    }

    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }

    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// `other` is fully inside `self`.
    pub fn encloses(&self, other: &LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn union(&self, other: &LineRange) -> LineRange {
        LineRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// An immutable source text plus a byte-offset index for each line.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    /// `line_starts[i]` is the byte offset where 1-based line `i + 1` begins.
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_byte_range(&self, line: usize) -> (usize, usize) {
        let idx = line.saturating_sub(1);
        let start = self.line_starts.get(idx).copied().unwrap_or(self.text.len());
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.text.len());
        (start.min(self.text.len()), end.min(self.text.len()).max(start.min(self.text.len())))
    }

    /// Raw text of a single 1-based line, without the trailing newline.
    pub fn line(&self, line: usize) -> &str {
        let (start, end) = self.line_byte_range(line);
        self.text[start..end].trim_end_matches('\r')
    }

    /// Raw text of an inclusive 1-based line range, joined with `\n`,
    /// without a trailing newline.
    pub fn lines_text(&self, range: LineRange) -> String {
        (range.start..=range.end.min(self.line_count()))
            .map(|l| self.line(l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Normalized (whitespace-stripped) text of a single line, used for
    /// exact-line anchor matching and freeze-region signature derivation.
    pub fn normalized_line(&self, line: usize) -> String {
        self.line(line).trim().to_string()
    }

    pub fn byte_offset_of_line_start(&self, line: usize) -> usize {
        self.line_byte_range(line).0
    }

    pub fn line_of_byte_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx, // idx is the count of starts <= offset... partition_point semantics
        }
    }

    pub fn is_blank_line(&self, line: usize) -> bool {
        self.line(line).trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ranges_are_one_based_inclusive() {
        let buf = SourceBuffer::new("a\nb\nc\n");
        assert_eq!(buf.line_count(), 4); // trailing empty line after last \n
        assert_eq!(buf.line(1), "a");
        assert_eq!(buf.line(2), "b");
        assert_eq!(buf.line(3), "c");
        assert_eq!(buf.line(4), "");
    }

    #[test]
    fn lines_text_joins_with_newline_and_no_trailing() {
        let buf = SourceBuffer::new("one\ntwo\nthree\n");
        assert_eq!(buf.lines_text(LineRange::new(1, 2)), "one\ntwo");
    }

    #[test]
    fn normalized_line_strips_whitespace() {
        let buf = SourceBuffer::new("  def foo  \n");
        assert_eq!(buf.normalized_line(1), "def foo");
    }

    #[test]
    fn range_overlap_and_enclosure() {
        let a = LineRange::new(2, 5);
        let b = LineRange::new(4, 8);
        let c = LineRange::new(3, 4);
        assert!(a.overlaps(&b));
        assert!(a.encloses(&c));
        assert!(!b.encloses(&c));
    }
}
