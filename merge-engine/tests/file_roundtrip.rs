//! Exercises the engine against real files on disk rather than in-memory
//! strings, since `FileAnalysis` reads whatever text a caller hands it and
//! callers are expected to be reading actual template/destination files.

use std::io::Write;

use prism_merge_core::{merge, MergeOptions};
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn merges_template_and_destination_read_from_disk() {
    let template = write_temp("VERSION = \"2.0.0\"\n\ndef greet\n  puts \"hi\"\nend\n");
    let destination = write_temp("VERSION = \"1.0.0\"\n\ndef greet\n  puts \"hi\"\nend\n\ndef extra\nend\n");

    let template_src = std::fs::read_to_string(template.path()).unwrap();
    let destination_src = std::fs::read_to_string(destination.path()).unwrap();

    let result = merge(&template_src, &destination_src, &MergeOptions::default()).unwrap();
    let text = result.into_text();

    assert!(text.contains("VERSION = \"1.0.0\""));
    assert!(text.contains("def extra"));
}
