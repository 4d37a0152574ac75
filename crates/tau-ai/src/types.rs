use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    System,
    Developer,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// Returns the wire name used in the `role` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Developer => "developer",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    /// Returns true for instruction/context-injection roles the runtime can rebuild on its own.
    pub fn is_administrative(self) -> bool {
        matches!(self, Self::System | Self::Developer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Public struct `ToolCall` used across Tau components.
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One conversation entry, tagged by `role`.
///
/// Assistant `content` is an explicit `Option`: `None` serializes as `"content": null`,
/// which is not the same message as `"content": ""`.
///
/// # Examples
///
/// ```
/// use tau_ai::{Message, ToolCall};
///
/// let message = Message::assistant_tool_calls(vec![ToolCall::new(
///     "c1",
///     "read",
///     serde_json::json!({ "path": "README.md" }),
/// )]);
/// let encoded = serde_json::to_value(&message).expect("encode");
/// assert!(encoded["content"].is_null());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    Developer {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::System {
            content: text.into(),
        }
    }

    pub fn developer(text: impl Into<String>) -> Self {
        Self::Developer {
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: text.into(),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: None,
            tool_calls,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: text.into(),
        }
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Self::System { .. } => MessageRole::System,
            Self::Developer { .. } => MessageRole::Developer,
            Self::User { .. } => MessageRole::User,
            Self::Assistant { .. } => MessageRole::Assistant,
            Self::Tool { .. } => MessageRole::Tool,
        }
    }

    /// Returns the text body, or `None` for an assistant message without content.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::System { content }
            | Self::Developer { content }
            | Self::User { content }
            | Self::Tool { content, .. } => Some(content.as_str()),
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// True when this is an assistant message whose content is explicitly absent.
    pub fn has_absent_content(&self) -> bool {
        matches!(self, Self::Assistant { content: None, .. })
    }

    /// Decodes one JSON record into a message.
    pub fn from_record(record: Value) -> Result<Self, MessageDecodeError> {
        let role = record
            .get("role")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(MessageDecodeError::MissingRole)?;
        serde_json::from_value(record)
            .map_err(|source| MessageDecodeError::Invalid { role, source })
    }
}

/// Enumerates supported `MessageDecodeError` values.
#[derive(Debug, Error)]
pub enum MessageDecodeError {
    #[error("message record is missing a string 'role' field")]
    MissingRole,
    #[error("message record with role '{role}' is invalid: {source}")]
    Invalid {
        role: String,
        #[source]
        source: serde_json::Error,
    },
}
