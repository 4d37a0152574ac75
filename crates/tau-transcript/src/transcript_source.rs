//! Runtime capability for querying a session's live message list.
use async_trait::async_trait;
use tau_ai::Message;
use thiserror::Error;

/// Enumerates supported `MessageSourceError` values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageSourceError {
    /// The session has no message query capability (uninitialized or unusual session).
    #[error("message query capability is unavailable for this session")]
    Unavailable,
    #[error("message query failed: {0}")]
    Query(String),
}

/// Runtime capability that yields the live, ordered message list of one session.
///
/// Implementations return a snapshot copy; the transcript never mutates the
/// runtime's list.
#[async_trait]
pub trait SessionMessageSource: Send + Sync {
    async fn snapshot_messages(&self) -> Result<Vec<Message>, MessageSourceError>;
}
