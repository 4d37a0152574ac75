use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use serde_json::json;
use tau_ai::{Message, MessageRole, ToolCall};
use tau_transcript::{
    HookDispatcher, HookOutcome, HookRegistration, LifecycleEvent, LifecycleEventKind,
    LifecycleHook, LifecycleHookRegistry, MessageNormalizer, MessageSanitizer,
    MessageSourceError, SanitizeError, SessionMessageSource, SessionTranscript,
    TranscriptConfig, TranscriptRecord, AUDIT_HOOK_PRIORITY, LIVE_STREAM_HOOK_PRIORITY,
};
use tokio::sync::Mutex as AsyncMutex;

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(1);

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct IsolatedWorkspace {
    root: PathBuf,
}

impl IsolatedWorkspace {
    fn new(label: &str) -> Self {
        let tick = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let count = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "tau-transcript-{label}-{}-{tick}-{count}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("must create isolated workspace root");
        Self { root }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join("sessions").join(session_id)
    }
}

impl Drop for IsolatedWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// Stand-in for the agent runtime's in-memory context.
#[derive(Default)]
struct ScriptedRuntime {
    messages: AsyncMutex<Vec<Message>>,
}

impl ScriptedRuntime {
    async fn push(&self, message: Message) {
        self.messages.lock().await.push(message);
    }

    async fn seed(&self, messages: Vec<Message>) {
        self.messages.lock().await.extend(messages);
    }
}

#[async_trait]
impl SessionMessageSource for ScriptedRuntime {
    async fn snapshot_messages(&self) -> Result<Vec<Message>, MessageSourceError> {
        Ok(self.messages.lock().await.clone())
    }
}

/// Canonicalizer that omits `null` fields, as generic provider sanitizers do.
struct CompactingSanitizer;

impl MessageSanitizer for CompactingSanitizer {
    fn sanitize(&self, message: &Message) -> Result<TranscriptRecord, SanitizeError> {
        match serde_json::to_value(message) {
            Ok(serde_json::Value::Object(mut record)) => {
                record.retain(|_, value| !value.is_null());
                Ok(record)
            }
            Ok(_) => Err(SanitizeError("message did not encode to an object".to_string())),
            Err(error) => Err(SanitizeError(error.to_string())),
        }
    }
}

/// Observes the transcript file at dispatch time to verify hook ordering.
struct FileProbe {
    path: PathBuf,
    seen_lines: AsyncMutex<Vec<Option<usize>>>,
}

impl FileProbe {
    fn new(path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            path,
            seen_lines: AsyncMutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LifecycleHook for FileProbe {
    async fn on_event(&self, _event: &LifecycleEvent) -> HookOutcome {
        let lines = fs::read_to_string(&self.path)
            .ok()
            .map(|raw| raw.lines().count());
        self.seen_lines.lock().await.push(lines);
        HookOutcome::Continue
    }
}

fn transcript_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("transcript should exist")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn integration_tool_turn_persists_and_resumes_identical_history() {
    init_test_tracing();
    let workspace = IsolatedWorkspace::new("tool-turn");
    let session_dir = workspace.session_dir("s-100");
    let runtime = Arc::new(ScriptedRuntime::default());
    runtime.push(Message::system("You are a helpful coding assistant.")).await;

    let transcript = SessionTranscript::new(
        "s-100",
        &session_dir,
        runtime.clone(),
        MessageNormalizer::with_sanitizer(Arc::new(CompactingSanitizer)),
        TranscriptConfig::default(),
    );
    let mut dispatcher = HookDispatcher::new();
    let streamed = FileProbe::new(transcript.transcript_path());
    let audited = FileProbe::new(transcript.transcript_path());
    dispatcher
        .register(HookRegistration {
            event: LifecycleEventKind::PostToolExecution,
            priority: LIVE_STREAM_HOOK_PRIORITY,
            name: "stream.post_tool_execution".to_string(),
            hook: streamed.clone(),
        })
        .expect("register stream hook");
    dispatcher
        .register(HookRegistration {
            event: LifecycleEventKind::PostToolExecution,
            priority: AUDIT_HOOK_PRIORITY,
            name: "audit.post_tool_execution".to_string(),
            hook: audited.clone(),
        })
        .expect("register audit hook");
    let trigger = transcript
        .attach(&mut dispatcher)
        .expect("transcript hooks should register");

    runtime.push(Message::user("hello")).await;
    runtime
        .push(Message::assistant_tool_calls(vec![ToolCall::new(
            "c1",
            "read",
            json!({ "path": "README.md" }),
        )]))
        .await;
    runtime.push(Message::tool_result("c1", "ok")).await;
    let report = dispatcher
        .dispatch(
            &LifecycleEvent::new(LifecycleEventKind::PostToolExecution, "s-100")
                .with_payload(json!({ "tool_call_id": "c1" })),
        )
        .await;
    assert_eq!(report.invoked, 3);
    assert_eq!(report.panicked, 0);
    assert_eq!(*streamed.seen_lines.lock().await, vec![None]);
    assert_eq!(*audited.seen_lines.lock().await, vec![Some(3)]);

    runtime.push(Message::assistant_text("done")).await;
    dispatcher
        .dispatch(&LifecycleEvent::new(
            LifecycleEventKind::OrchestrationTurnEnd,
            "s-100",
        ))
        .await;
    assert_eq!(transcript.flush_turn().await, HookOutcome::Continue);

    let metrics = trigger.metrics();
    assert_eq!(metrics.writes, 2);
    assert_eq!(metrics.failures, 0);
    assert_eq!(metrics.last_saved_count, 5);

    let lines = transcript_lines(&transcript.transcript_path());
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains(r#""role":"user""#));
    assert!(lines[1].contains(r#""content":null"#), "{}", lines[1]);
    assert!(lines[2].contains(r#""tool_call_id":"c1""#));
    assert!(lines[3].contains(r#""content":"done""#));

    // Process restart: fresh binding, fresh trigger state.
    let resumed_runtime = Arc::new(ScriptedRuntime::default());
    let resumed = SessionTranscript::new(
        "s-100",
        &session_dir,
        resumed_runtime.clone(),
        MessageNormalizer::passthrough(),
        TranscriptConfig::default(),
    );
    let restored = resumed
        .load_messages()
        .expect("replay should succeed")
        .expect("transcript should exist");
    assert_eq!(
        restored,
        vec![
            Message::user("hello"),
            Message::assistant_tool_calls(vec![ToolCall::new(
                "c1",
                "read",
                json!({ "path": "README.md" }),
            )]),
            Message::tool_result("c1", "ok"),
            Message::assistant_text("done"),
        ]
    );
    assert!(restored[1].has_absent_content());
    assert_eq!(resumed.trigger().last_saved_count(), 0);

    resumed_runtime
        .seed(
            std::iter::once(Message::system("You are a helpful coding assistant."))
                .chain(restored)
                .collect(),
        )
        .await;
    resumed.trigger().save().await;
    assert_eq!(resumed.trigger().metrics().writes, 1);
    assert_eq!(transcript_lines(&resumed.transcript_path()), lines);
}

#[tokio::test]
async fn integration_session_without_persistable_turns_keeps_log_missing() {
    init_test_tracing();
    let workspace = IsolatedWorkspace::new("empty");
    let session_dir = workspace.session_dir("s-200");
    let runtime = Arc::new(ScriptedRuntime::default());
    let transcript = SessionTranscript::new(
        "s-200",
        &session_dir,
        runtime.clone(),
        MessageNormalizer::passthrough(),
        TranscriptConfig::default(),
    );

    assert_eq!(transcript.flush_turn().await, HookOutcome::Continue);
    assert_eq!(transcript.load_messages().expect("load"), None);
    assert!(!session_dir.exists());

    runtime.push(Message::developer("workspace context")).await;
    transcript.flush_turn().await;
    assert_eq!(transcript.load_messages().expect("load"), Some(Vec::new()));
}

#[tokio::test]
async fn integration_unicode_history_survives_restart() {
    init_test_tracing();
    let workspace = IsolatedWorkspace::new("unicode");
    let session_dir = workspace.session_dir("s-300");
    let runtime = Arc::new(ScriptedRuntime::default());
    let text = "Grüße, 世界! 👋🏽 naïve café";
    runtime.push(Message::user(text)).await;
    runtime.push(Message::assistant_text(text)).await;

    let transcript = SessionTranscript::new(
        "s-300",
        &session_dir,
        runtime.clone(),
        MessageNormalizer::passthrough(),
        TranscriptConfig::default(),
    );
    transcript.trigger().save().await;

    let raw = fs::read_to_string(transcript.transcript_path()).expect("read");
    assert!(raw.contains(text));
    let restored = transcript
        .load_messages()
        .expect("load")
        .expect("transcript exists");
    assert_eq!(
        restored
            .iter()
            .map(|message| (message.role(), message.text_content()))
            .collect::<Vec<_>>(),
        vec![
            (MessageRole::User, Some(text)),
            (MessageRole::Assistant, Some(text)),
        ]
    );
}

#[test]
fn integration_registry_failure_does_not_block_session_start() {
    struct RefusingRegistry;

    impl LifecycleHookRegistry for RefusingRegistry {
        fn register(
            &mut self,
            _registration: HookRegistration,
        ) -> Result<(), tau_transcript::HookRegistrationError> {
            Err(tau_transcript::HookRegistrationError::Unavailable(
                "event dispatcher offline".to_string(),
            ))
        }
    }

    let workspace = IsolatedWorkspace::new("registry");
    let transcript = SessionTranscript::new(
        "s-400",
        workspace.session_dir("s-400"),
        Arc::new(ScriptedRuntime::default()),
        MessageNormalizer::passthrough(),
        TranscriptConfig::default(),
    );
    assert!(transcript.attach(&mut RefusingRegistry).is_none());
}
