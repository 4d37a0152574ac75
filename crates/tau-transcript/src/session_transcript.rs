//! Per-session wiring of the save trigger, end-of-turn flush, and resume replay.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tau_ai::Message;

use crate::{
    transcript_config::TranscriptConfig,
    transcript_flush::flush_transcript,
    transcript_hooks::{
        HookOutcome, HookRegistration, LifecycleEventKind, LifecycleHook, LifecycleHookRegistry,
    },
    transcript_normalizer::MessageNormalizer,
    transcript_replay::replay_messages,
    transcript_source::SessionMessageSource,
    transcript_trigger::TranscriptSaveTrigger,
    transcript_writer::transcript_path,
    TranscriptError,
};

/// Events the shared save trigger is registered for, with their registration names.
pub const TRANSCRIPT_HOOK_EVENTS: [(LifecycleEventKind, &str); 2] = [
    (
        LifecycleEventKind::PostToolExecution,
        "transcript.post_tool_execution",
    ),
    (
        LifecycleEventKind::OrchestrationTurnEnd,
        "transcript.orchestration_turn_end",
    ),
];

/// Public struct `SessionTranscript` used across Tau components.
///
/// Owns the single [`TranscriptSaveTrigger`] of a session.
pub struct SessionTranscript {
    session_id: String,
    session_dir: PathBuf,
    config: TranscriptConfig,
    source: Arc<dyn SessionMessageSource>,
    normalizer: MessageNormalizer,
    trigger: Arc<TranscriptSaveTrigger>,
}

impl SessionTranscript {
    pub fn new(
        session_id: impl Into<String>,
        session_dir: impl Into<PathBuf>,
        source: Arc<dyn SessionMessageSource>,
        normalizer: MessageNormalizer,
        config: TranscriptConfig,
    ) -> Self {
        let session_id = session_id.into();
        let session_dir = session_dir.into();
        let trigger = Arc::new(TranscriptSaveTrigger::new(
            session_id.clone(),
            session_dir.clone(),
            config.file_name.clone(),
            Arc::clone(&source),
            normalizer.clone(),
        ));
        Self {
            session_id,
            session_dir,
            config,
            source,
            normalizer,
            trigger,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn config(&self) -> &TranscriptConfig {
        &self.config
    }

    pub fn transcript_path(&self) -> PathBuf {
        transcript_path(&self.session_dir, &self.config.file_name)
    }

    pub fn trigger(&self) -> Arc<TranscriptSaveTrigger> {
        Arc::clone(&self.trigger)
    }

    /// Registers the shared save trigger for every event in [`TRANSCRIPT_HOOK_EVENTS`].
    ///
    /// Registration errors are logged at debug and never fail session start.
    /// Returns the trigger when at least one registration succeeded.
    pub fn attach(
        &self,
        registry: &mut dyn LifecycleHookRegistry,
    ) -> Option<Arc<TranscriptSaveTrigger>> {
        if !self.config.enabled {
            tracing::debug!(
                session_id = %self.session_id,
                "transcript persistence disabled; hooks not registered"
            );
            return None;
        }

        let hook: Arc<dyn LifecycleHook> = self.trigger();
        let mut registered = 0usize;
        for (event, name) in TRANSCRIPT_HOOK_EVENTS {
            let registration = HookRegistration {
                event,
                priority: self.config.hook_priority,
                name: name.to_string(),
                hook: Arc::clone(&hook),
            };
            match registry.register(registration) {
                Ok(()) => registered += 1,
                Err(error) => {
                    tracing::debug!(
                        session_id = %self.session_id,
                        event = %event,
                        error = %error,
                        "transcript hook registration failed; continuing without it"
                    );
                }
            }
        }
        (registered > 0).then(|| self.trigger())
    }

    /// End-of-turn checkpoint; see [`flush_transcript`].
    pub async fn flush_turn(&self) -> HookOutcome {
        if !self.config.enabled {
            return HookOutcome::Continue;
        }
        flush_transcript(
            &self.session_id,
            &self.session_dir,
            &self.config.file_name,
            self.source.as_ref(),
            &self.normalizer,
        )
        .await
    }

    /// Replays the persisted transcript; `Ok(None)` when the session has no log yet.
    pub fn load_messages(&self) -> Result<Option<Vec<Message>>, TranscriptError> {
        match replay_messages(&self.transcript_path()) {
            Ok(messages) => Ok(Some(messages)),
            Err(TranscriptError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}
