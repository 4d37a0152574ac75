//! Conversation message model shared by Tau session components.
mod types;

pub use types::{Message, MessageDecodeError, MessageRole, ToolCall};
