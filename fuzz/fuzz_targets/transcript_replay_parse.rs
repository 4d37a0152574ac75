#![no_main]

use libfuzzer_sys::fuzz_target;
use tau_transcript::parse_transcript_text;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let report = parse_transcript_text(&input);
    let non_blank_lines = input.lines().filter(|line| !line.trim().is_empty()).count();
    assert_eq!(report.records.len() + report.skipped_lines(), non_blank_lines);
    assert!(report.records.iter().all(|record| record.contains_key("role")));
});
