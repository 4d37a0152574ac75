//! Whole-file transcript snapshots written through an atomic replace.
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tau_core::write_bytes_atomic;

use crate::{TranscriptError, TranscriptRecord};

/// Public struct `TranscriptWriteReport` used across Tau components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptWriteReport {
    pub path: PathBuf,
    pub records_written: usize,
    pub bytes_written: usize,
}

/// On-disk state of a session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptPresence {
    Missing,
    Empty,
    Populated { lines: usize },
}

pub fn transcript_path(session_dir: &Path, file_name: &str) -> PathBuf {
    session_dir.join(file_name)
}

/// Encodes records as compact JSON lines, each terminated by `\n`.
pub fn encode_transcript_lines(records: &[TranscriptRecord]) -> Result<String, TranscriptError> {
    let mut content = String::new();
    for record in records {
        content.push_str(&serde_json::to_string(record)?);
        content.push('\n');
    }
    Ok(content)
}

/// Replaces the transcript in `session_dir` with `records`.
///
/// `session_dir` and its ancestors are created when missing. An empty slice
/// leaves an existing zero-length file.
pub fn write_transcript(
    session_dir: &Path,
    file_name: &str,
    records: &[TranscriptRecord],
) -> Result<TranscriptWriteReport, TranscriptError> {
    let path = transcript_path(session_dir, file_name);
    let content = encode_transcript_lines(records)?;
    write_bytes_atomic(&path, content.as_bytes()).map_err(|error| TranscriptError::Persist {
        path: path.clone(),
        reason: format!("{error:#}"),
    })?;
    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        bytes = content.len(),
        "transcript snapshot written"
    );
    Ok(TranscriptWriteReport {
        path,
        records_written: records.len(),
        bytes_written: content.len(),
    })
}

/// Runs [`write_transcript`] on the blocking pool.
pub(crate) async fn write_transcript_off_thread(
    session_dir: PathBuf,
    file_name: String,
    records: Vec<TranscriptRecord>,
) -> Result<TranscriptWriteReport, TranscriptError> {
    tokio::task::spawn_blocking(move || write_transcript(&session_dir, &file_name, &records))
        .await
        .map_err(|error| TranscriptError::Task(error.to_string()))?
}

pub fn inspect_transcript(
    session_dir: &Path,
    file_name: &str,
) -> Result<TranscriptPresence, TranscriptError> {
    let path = transcript_path(session_dir, file_name);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Ok(TranscriptPresence::Missing)
        }
        Err(source) => return Err(TranscriptError::Read { path, source }),
    };
    if raw.is_empty() {
        return Ok(TranscriptPresence::Empty);
    }
    let lines = String::from_utf8_lossy(&raw)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count();
    Ok(TranscriptPresence::Populated { lines })
}
