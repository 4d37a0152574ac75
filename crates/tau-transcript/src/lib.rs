//! Durable session transcript log for long-running agent sessions.
//!
//! The runtime owns the live message list. This crate snapshots the persistable
//! subset of it into `transcript.jsonl` inside the session directory, either from
//! lifecycle hooks (debounced by message count) or from the end-of-turn flush,
//! and replays that file when a session is resumed.
//!
//! Every write replaces the whole file through a temp file and rename. Nothing
//! in the write path is allowed to fail the session: errors and panics are
//! logged and converted into [`HookOutcome::Continue`].
use std::path::PathBuf;

use thiserror::Error;

mod session_transcript;
mod transcript_config;
mod transcript_flush;
mod transcript_hooks;
mod transcript_normalizer;
mod transcript_replay;
mod transcript_source;
mod transcript_trigger;
mod transcript_writer;

pub use session_transcript::{SessionTranscript, TRANSCRIPT_HOOK_EVENTS};
pub use transcript_config::{
    validate_transcript_file_name, TranscriptConfig, TranscriptConfigError,
    TRANSCRIPT_ENABLED_ENV, TRANSCRIPT_FILE_ENV, TRANSCRIPT_HOOK_PRIORITY_ENV,
};
pub use transcript_flush::flush_transcript;
pub use transcript_hooks::{
    DispatchReport, HookDispatcher, HookOutcome, HookRegistration, HookRegistrationError,
    LifecycleEvent, LifecycleEventKind, LifecycleHook, LifecycleHookRegistry,
    AUDIT_HOOK_PRIORITY, LIVE_STREAM_HOOK_PRIORITY, TRANSCRIPT_HOOK_PRIORITY,
};
pub use transcript_normalizer::{MessageNormalizer, MessageSanitizer, SanitizeError};
pub use transcript_replay::{
    parse_transcript_text, read_transcript, replay_messages, TranscriptParseReport,
};
pub use transcript_source::{MessageSourceError, SessionMessageSource};
pub use transcript_trigger::{TranscriptSaveMetrics, TranscriptSaveTrigger};
pub use transcript_writer::{
    encode_transcript_lines, inspect_transcript, transcript_path, write_transcript,
    TranscriptPresence, TranscriptWriteReport,
};

/// File name of the transcript log inside a session directory.
pub const DEFAULT_TRANSCRIPT_FILE_NAME: &str = "transcript.jsonl";

/// One persisted transcript line: a JSON object carrying at least `role`.
pub type TranscriptRecord = serde_json::Map<String, serde_json::Value>;

/// Enumerates supported `TranscriptError` values.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error(transparent)]
    Source(#[from] MessageSourceError),
    #[error("sanitizer rejected {role} message: {source}")]
    Sanitize {
        role: &'static str,
        #[source]
        source: SanitizeError,
    },
    #[error("{role} message did not encode to a JSON object")]
    NonObjectRecord { role: &'static str },
    #[error("failed to encode transcript record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to persist transcript {}: {reason}", .path.display())]
    Persist { path: PathBuf, reason: String },
    #[error("failed to read transcript {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transcript write task did not complete: {0}")]
    Task(String),
}

impl TranscriptError {
    /// True when the runtime simply has no message query capability for this session.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::Source(MessageSourceError::Unavailable))
    }
}
