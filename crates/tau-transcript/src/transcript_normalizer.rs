//! Persistence filter and canonical record shape for transcript messages.
use std::{fmt, sync::Arc};

use serde_json::Value;
use tau_ai::Message;
use thiserror::Error;

use crate::{TranscriptError, TranscriptRecord};

/// Error returned by an externally supplied [`MessageSanitizer`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SanitizeError(pub String);

/// Single-message canonicalization supplied by the deployment.
///
/// A sanitizer may drop keys it considers empty, including an absent assistant
/// `content`; [`MessageNormalizer`] restores that key afterwards.
pub trait MessageSanitizer: Send + Sync {
    fn sanitize(&self, message: &Message) -> Result<TranscriptRecord, SanitizeError>;
}

/// Decides which messages are persisted and shapes each into a [`TranscriptRecord`].
#[derive(Clone, Default)]
pub struct MessageNormalizer {
    sanitizer: Option<Arc<dyn MessageSanitizer>>,
}

impl fmt::Debug for MessageNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageNormalizer")
            .field("sanitizer", &self.sanitizer.is_some())
            .finish()
    }
}

impl MessageNormalizer {
    /// Normalizer that serializes messages in their own shape.
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn with_sanitizer(sanitizer: Arc<dyn MessageSanitizer>) -> Self {
        Self {
            sanitizer: Some(sanitizer),
        }
    }

    pub fn has_sanitizer(&self) -> bool {
        self.sanitizer.is_some()
    }

    /// Returns `Ok(None)` for messages that must not be persisted.
    pub fn normalize(
        &self,
        message: &Message,
    ) -> Result<Option<TranscriptRecord>, TranscriptError> {
        let role = message.role();
        if role.is_administrative() {
            return Ok(None);
        }

        let mut record = match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(message).map_err(|source| {
                TranscriptError::Sanitize {
                    role: role.as_str(),
                    source,
                }
            })?,
            None => match serde_json::to_value(message)? {
                Value::Object(record) => record,
                _ => {
                    return Err(TranscriptError::NonObjectRecord {
                        role: role.as_str(),
                    })
                }
            },
        };

        // Providers reject assistant tool-call turns without a `content` key.
        if message.has_absent_content() && !record.contains_key("content") {
            record.insert("content".to_string(), Value::Null);
        }
        Ok(Some(record))
    }

    /// Normalizes a message list in order, dropping non-persistable entries.
    pub fn normalize_all(
        &self,
        messages: &[Message],
    ) -> Result<Vec<TranscriptRecord>, TranscriptError> {
        let mut records = Vec::with_capacity(messages.len());
        for message in messages {
            if let Some(record) = self.normalize(message)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
