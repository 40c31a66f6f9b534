//! Cross-module invariants from `spec.md` §8 that don't belong to any
//! single unit.

use prism_merge_core::{merge, MergeOptions};

#[test]
fn idempotence_merge_of_merge_equals_merge() {
    let template = "class Widget\n  VERSION = \"2\"\n\n  def render\n    \"T\"\n  end\nend\n";
    let destination =
        "class Widget\n  VERSION = \"1\"\n\n  def render\n    \"D\"\n  end\n\n  def extra\n    1\n  end\nend\n";

    let options = MergeOptions::default();
    let once = merge(template, destination, &options).unwrap().into_text();
    let twice = merge(template, &once, &options).unwrap().into_text();

    assert_eq!(once, twice);
}

#[test]
fn freeze_region_bytes_are_contiguous_and_verbatim() {
    let template = "a = 1\nb = 2\n";
    let destination = "a = 1\n# prism-merge:freeze\nb = 99  # weird spacing\n# prism-merge:unfreeze\n";

    let options = MergeOptions::default();
    let text = merge(template, destination, &options).unwrap().into_text();

    let frozen_block = "# prism-merge:freeze\nb = 99  # weird spacing\n# prism-merge:unfreeze";
    assert!(text.contains(frozen_block));
    assert_eq!(text.matches("prism-merge:freeze").count(), 1);
    assert_eq!(text.matches("prism-merge:unfreeze").count(), 1);
}

#[test]
fn no_three_consecutive_blank_lines_in_output() {
    let template = "a = 1\n\n\n\n\n\nb = 2\n";
    let destination = "a = 1\nb = 2\n\nc = 3\n";

    let options = MergeOptions::default();
    let text = merge(template, destination, &options).unwrap().into_text();

    assert!(!text.contains("\n\n\n\n"));
}

#[test]
fn decision_tally_sums_to_line_count() {
    let template = "a = 1\ndef extra\nend\n";
    let destination = "a = 2\n\ndef custom\nend\n";

    let options = MergeOptions::default();
    let result = merge(template, destination, &options).unwrap();
    let total: usize = result.decision_tally().values().sum();

    assert_eq!(total, result.line_count());
}

#[test]
fn provenance_sets_exactly_one_side_for_non_recursive_lines() {
    let template = "a = 1\nb = 2\n";
    let destination = "a = 9\nb = 2\nc = 3\n";

    let options = MergeOptions::default();
    let result = merge(template, destination, &options).unwrap();

    for provenance in result.provenance() {
        let sides_set = provenance.template_line.is_some() as u8 + provenance.destination_line.is_some() as u8;
        assert_eq!(sides_set, 1, "{provenance:?} should set exactly one side for a flat (non-recursive) merge");
    }
}
