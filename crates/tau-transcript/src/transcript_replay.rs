//! Transcript replay for session resume.
use std::{fs, path::Path};

use serde_json::Value;
use tau_ai::Message;

use crate::{TranscriptError, TranscriptRecord};

/// Public struct `TranscriptParseReport` used across Tau components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptParseReport {
    pub records: Vec<TranscriptRecord>,
    pub blank_lines: usize,
    pub invalid_lines: usize,
    pub non_record_lines: usize,
    pub missing_role_lines: usize,
}

impl TranscriptParseReport {
    /// Non-blank lines that did not yield a record.
    pub fn skipped_lines(&self) -> usize {
        self.invalid_lines + self.non_record_lines + self.missing_role_lines
    }
}

/// Parses transcript text line by line, keeping only JSON objects with a `role` key.
///
/// Malformed lines are counted and skipped; ordering of the surviving records is preserved.
pub fn parse_transcript_text(text: &str) -> TranscriptParseReport {
    let mut report = TranscriptParseReport::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            report.blank_lines += 1;
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) if record.contains_key("role") => {
                report.records.push(record)
            }
            Ok(Value::Object(_)) => report.missing_role_lines += 1,
            Ok(_) => report.non_record_lines += 1,
            Err(_) => report.invalid_lines += 1,
        }
    }
    report
}

/// Reads every valid record from the transcript at `path`.
///
/// Invalid UTF-8 left by a torn write is replaced rather than failing the read.
pub fn read_transcript(path: &Path) -> Result<Vec<TranscriptRecord>, TranscriptError> {
    let raw = fs::read(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let report = parse_transcript_text(&String::from_utf8_lossy(&raw));
    if report.skipped_lines() > 0 {
        tracing::warn!(
            path = %path.display(),
            invalid_lines = report.invalid_lines,
            non_record_lines = report.non_record_lines,
            missing_role_lines = report.missing_role_lines,
            "skipped malformed transcript lines during replay"
        );
    }
    Ok(report.records)
}

/// Reads the transcript at `path` and decodes it into typed messages.
pub fn replay_messages(path: &Path) -> Result<Vec<Message>, TranscriptError> {
    let records = read_transcript(path)?;
    let mut messages = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match Message::from_record(Value::Object(record)) {
            Ok(message) => messages.push(message),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    record_index = index,
                    error = %error,
                    "skipped undecodable transcript record"
                );
            }
        }
    }
    Ok(messages)
}
