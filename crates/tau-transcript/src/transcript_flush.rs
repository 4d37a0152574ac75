//! End-of-turn transcript checkpoint.
use std::path::Path;

use crate::{
    transcript_hooks::HookOutcome,
    transcript_normalizer::MessageNormalizer,
    transcript_source::SessionMessageSource,
    transcript_trigger::{run_best_effort, BestEffort},
    transcript_writer::{write_transcript_off_thread, TranscriptWriteReport},
    TranscriptError,
};

/// Writes the current transcript unconditionally, once per completed turn.
///
/// An empty live list performs no I/O so a missing log stays missing. Failures
/// are logged and never reach the caller.
pub async fn flush_transcript(
    session_id: &str,
    session_dir: &Path,
    file_name: &str,
    source: &dyn SessionMessageSource,
    normalizer: &MessageNormalizer,
) -> HookOutcome {
    let flush = flush_once(session_dir, file_name, source, normalizer);
    if let BestEffort::Completed(Some(report)) =
        run_best_effort("end_of_turn_flush", session_id, flush).await
    {
        tracing::debug!(
            session_id,
            path = %report.path.display(),
            records = report.records_written,
            "end-of-turn transcript flush completed"
        );
    }
    HookOutcome::Continue
}

async fn flush_once(
    session_dir: &Path,
    file_name: &str,
    source: &dyn SessionMessageSource,
    normalizer: &MessageNormalizer,
) -> Result<Option<TranscriptWriteReport>, TranscriptError> {
    let messages = source.snapshot_messages().await?;
    if messages.is_empty() {
        return Ok(None);
    }
    let records = normalizer.normalize_all(&messages)?;
    let report =
        write_transcript_off_thread(session_dir.to_path_buf(), file_name.to_string(), records)
            .await?;
    Ok(Some(report))
}
