//! Count-debounced transcript save hook and the best-effort boundary shared with the flush.
use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::{
    transcript_hooks::{HookOutcome, LifecycleEvent, LifecycleHook},
    transcript_normalizer::MessageNormalizer,
    transcript_source::SessionMessageSource,
    transcript_writer::{write_transcript_off_thread, TranscriptWriteReport},
    TranscriptError,
};

/// Result of one guarded transcript operation.
#[derive(Debug)]
pub(crate) enum BestEffort<T> {
    Completed(T),
    /// The runtime exposes no message query capability; nothing was attempted.
    Unavailable,
    Failed,
}

/// Awaits `operation`, converting errors and panics into log lines.
pub(crate) async fn run_best_effort<T, F>(
    operation: &'static str,
    session_id: &str,
    future: F,
) -> BestEffort<T>
where
    F: Future<Output = Result<T, TranscriptError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => BestEffort::Completed(value),
        Ok(Err(error)) if error.is_source_unavailable() => {
            tracing::debug!(
                operation,
                session_id,
                "no message query capability; transcript save skipped"
            );
            BestEffort::Unavailable
        }
        Ok(Err(error)) => {
            tracing::warn!(
                operation,
                session_id,
                error = %error,
                "transcript save failed; session continues without this checkpoint"
            );
            BestEffort::Failed
        }
        Err(panic) => {
            tracing::warn!(
                operation,
                session_id,
                panic = %panic_message(panic.as_ref()),
                "transcript save panicked; session continues without this checkpoint"
            );
            BestEffort::Failed
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

#[derive(Debug)]
enum SaveOutcome {
    Unchanged,
    Written(TranscriptWriteReport),
}

#[derive(Debug, Default)]
struct TranscriptSaveMetricsInner {
    invocations: AtomicU64,
    writes: AtomicU64,
    skipped_unchanged: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time counters for one [`TranscriptSaveTrigger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptSaveMetrics {
    pub invocations: u64,
    pub writes: u64,
    pub skipped_unchanged: u64,
    pub failures: u64,
    pub last_saved_count: usize,
}

/// Lifecycle hook that rewrites the transcript whenever the live message count grows.
///
/// One instance serves both registered events of a session so its
/// `last_saved_count` reflects every save regardless of which event fired.
/// The count is claimed before writing; a failed write is not retried by this
/// hook until the list grows again, the end-of-turn flush covers that gap.
pub struct TranscriptSaveTrigger {
    session_id: String,
    session_dir: PathBuf,
    file_name: String,
    source: Arc<dyn SessionMessageSource>,
    normalizer: MessageNormalizer,
    last_saved_count: AtomicUsize,
    metrics: TranscriptSaveMetricsInner,
}

impl TranscriptSaveTrigger {
    pub fn new(
        session_id: impl Into<String>,
        session_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        source: Arc<dyn SessionMessageSource>,
        normalizer: MessageNormalizer,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            session_dir: session_dir.into(),
            file_name: file_name.into(),
            source,
            normalizer,
            last_saved_count: AtomicUsize::new(0),
            metrics: TranscriptSaveMetricsInner::default(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn last_saved_count(&self) -> usize {
        self.last_saved_count.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> TranscriptSaveMetrics {
        TranscriptSaveMetrics {
            invocations: self.metrics.invocations.load(Ordering::Relaxed),
            writes: self.metrics.writes.load(Ordering::Relaxed),
            skipped_unchanged: self.metrics.skipped_unchanged.load(Ordering::Relaxed),
            failures: self.metrics.failures.load(Ordering::Relaxed),
            last_saved_count: self.last_saved_count(),
        }
    }

    /// Runs one debounced save. Never fails; always returns [`HookOutcome::Continue`].
    pub async fn save(&self) -> HookOutcome {
        self.metrics.invocations.fetch_add(1, Ordering::Relaxed);
        match run_best_effort("debounced_save", &self.session_id, self.save_if_grown()).await {
            BestEffort::Completed(SaveOutcome::Written(report)) => {
                self.metrics.writes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    session_id = %self.session_id,
                    records = report.records_written,
                    bytes = report.bytes_written,
                    "debounced transcript save completed"
                );
            }
            BestEffort::Completed(SaveOutcome::Unchanged) => {
                self.metrics.skipped_unchanged.fetch_add(1, Ordering::Relaxed);
            }
            BestEffort::Unavailable => {}
            BestEffort::Failed => {
                self.metrics.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        HookOutcome::Continue
    }

    async fn save_if_grown(&self) -> Result<SaveOutcome, TranscriptError> {
        let messages = self.source.snapshot_messages().await?;
        let count = messages.len();
        if !self.claim_count(count) {
            return Ok(SaveOutcome::Unchanged);
        }

        let records = self.normalizer.normalize_all(&messages)?;
        let report =
            write_transcript_off_thread(self.session_dir.clone(), self.file_name.clone(), records)
                .await?;
        Ok(SaveOutcome::Written(report))
    }

    /// Records `count` as saved when it exceeds the previous count.
    fn claim_count(&self, count: usize) -> bool {
        self.last_saved_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                (count > last).then_some(count)
            })
            .is_ok()
    }
}

#[async_trait]
impl LifecycleHook for TranscriptSaveTrigger {
    async fn on_event(&self, event: &LifecycleEvent) -> HookOutcome {
        tracing::trace!(
            session_id = %self.session_id,
            event = %event.kind,
            "transcript save hook invoked"
        );
        self.save().await
    }
}
