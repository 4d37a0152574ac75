//! Lifecycle hook contract between the runtime's event dispatcher and its consumers.
//!
//! [`HookDispatcher`] is an in-process implementation of the registry used by
//! embedders without their own dispatcher and by tests.
use std::{fmt, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Live-streaming consumers run before transcript persistence.
pub const LIVE_STREAM_HOOK_PRIORITY: i32 = 100;
/// Transcript persistence priority.
pub const TRANSCRIPT_HOOK_PRIORITY: i32 = 500;
/// Terminal audit/tracing consumers run after transcript persistence.
pub const AUDIT_HOOK_PRIORITY: i32 = 900;

/// Enumerates supported `LifecycleEventKind` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    PostToolExecution,
    OrchestrationTurnEnd,
}

impl LifecycleEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PostToolExecution => "post_tool_execution",
            Self::OrchestrationTurnEnd => "orchestration_turn_end",
        }
    }
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public struct `LifecycleEvent` used across Tau components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub session_id: String,
    #[serde(default)]
    pub payload: Value,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleEventKind, session_id: impl Into<String>) -> Self {
        Self {
            kind,
            session_id: session_id.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Signal returned by a hook to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    /// Skip the remaining lower-priority hooks for this event.
    Halt,
}

/// Trait contract for `LifecycleHook` behavior.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent) -> HookOutcome;
}

/// Public struct `HookRegistration` used across Tau components.
#[derive(Clone)]
pub struct HookRegistration {
    pub event: LifecycleEventKind,
    pub priority: i32,
    pub name: String,
    pub hook: Arc<dyn LifecycleHook>,
}

impl fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistration")
            .field("event", &self.event)
            .field("priority", &self.priority)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Enumerates supported `HookRegistrationError` values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookRegistrationError {
    #[error("hook registry is closed")]
    Closed,
    #[error("hook registration name cannot be empty")]
    EmptyName,
    #[error("hook '{name}' is already registered for {event}")]
    DuplicateName {
        event: LifecycleEventKind,
        name: String,
    },
    #[error("hook registry unavailable: {0}")]
    Unavailable(String),
}

/// Registration surface of a lifecycle event dispatcher.
pub trait LifecycleHookRegistry {
    fn register(&mut self, registration: HookRegistration) -> Result<(), HookRegistrationError>;
}

/// Public struct `DispatchReport` used across Tau components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub panicked: usize,
    pub halted_by: Option<String>,
}

/// Priority-ordered in-process dispatcher.
///
/// Hooks run in ascending `priority`; equal priorities keep registration order.
#[derive(Default)]
pub struct HookDispatcher {
    hooks: Vec<HookRegistration>,
    closed: bool,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects all later registrations.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Returns hook names registered for `event` in dispatch order.
    pub fn registered_names(&self, event: LifecycleEventKind) -> Vec<String> {
        self.hooks
            .iter()
            .filter(|registration| registration.event == event)
            .map(|registration| registration.name.clone())
            .collect()
    }

    /// Runs every hook registered for `event.kind`, isolating panics.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        for registration in self
            .hooks
            .iter()
            .filter(|registration| registration.event == event.kind)
        {
            report.invoked += 1;
            let outcome = AssertUnwindSafe(registration.hook.on_event(event))
                .catch_unwind()
                .await;
            match outcome {
                Ok(HookOutcome::Continue) => {}
                Ok(HookOutcome::Halt) => {
                    report.halted_by = Some(registration.name.clone());
                    break;
                }
                Err(_) => {
                    report.panicked += 1;
                    tracing::warn!(
                        hook = %registration.name,
                        event = %event.kind,
                        session_id = %event.session_id,
                        "lifecycle hook panicked; continuing dispatch"
                    );
                }
            }
        }
        report
    }
}

impl LifecycleHookRegistry for HookDispatcher {
    fn register(&mut self, registration: HookRegistration) -> Result<(), HookRegistrationError> {
        if self.closed {
            return Err(HookRegistrationError::Closed);
        }
        if registration.name.trim().is_empty() {
            return Err(HookRegistrationError::EmptyName);
        }
        let duplicate = self.hooks.iter().any(|existing| {
            existing.event == registration.event && existing.name == registration.name
        });
        if duplicate {
            return Err(HookRegistrationError::DuplicateName {
                event: registration.event,
                name: registration.name,
            });
        }

        let index = self
            .hooks
            .partition_point(|existing| existing.priority <= registration.priority);
        tracing::debug!(
            hook = %registration.name,
            event = %registration.event,
            priority = registration.priority,
            "registered lifecycle hook"
        );
        self.hooks.insert(index, registration);
        Ok(())
    }
}
