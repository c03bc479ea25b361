use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::message::MessageId;

pub type PartId = Uuid;

/// Lifecycle status of a message part.
///
/// `Pending` covers parts announced but not yet streamed (e.g. a tool call
/// whose arguments are still arriving); `Running` covers a tool call whose
/// result has not yet arrived; `Completed`/`Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl PartStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PartStatus::Completed | PartStatus::Error)
    }
}

/// The seven part kinds a message is built out of, driven directly by the
/// event alphabet in `agentflow_types::event::ModelEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum PartContent {
    Text(TextPart),
    Reasoning(ReasoningPart),
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
    File(FilePart),
    StepStart(StepMarker),
    StepFinish(StepMarker),
}

impl PartContent {
    pub fn kind(&self) -> &'static str {
        match self {
            PartContent::Text(_) => "text",
            PartContent::Reasoning(_) => "reasoning",
            PartContent::ToolCall(_) => "tool_call",
            PartContent::ToolResult(_) => "tool_result",
            PartContent::File(_) => "file",
            PartContent::StepStart(_) => "step_start",
            PartContent::StepFinish(_) => "step_finish",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub call_id: String,
    pub output: Value,
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePart {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMarker {
    pub step_index: u32,
}

/// One ordered piece of a message's content.
///
/// `order` is assigned by the Stream Processor in arrival order and is
/// stable once assigned; it is the basis for reconstructing a message's
/// rendered form from its parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    pub id: PartId,
    pub message_id: MessageId,
    pub order: u32,
    pub status: PartStatus,
    pub content: PartContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessagePart {
    pub fn new(message_id: MessageId, order: u32, content: PartContent) -> Self {
        let now = Utc::now();
        let status = match &content {
            PartContent::ToolCall(_) => PartStatus::Running,
            _ => PartStatus::Pending,
        };
        Self {
            id: Uuid::new_v4(),
            message_id,
            order,
            status,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_part_starts_running() {
        let part = MessagePart::new(
            Uuid::new_v4(),
            0,
            PartContent::ToolCall(ToolCallPart {
                call_id: "call_1".to_string(),
                tool_name: "Read".to_string(),
                arguments: serde_json::json!({"path": "a.rs"}),
            }),
        );
        assert_eq!(part.status, PartStatus::Running);
        assert_eq!(part.content.kind(), "tool_call");
    }

    #[test]
    fn text_part_starts_pending() {
        let part = MessagePart::new(
            Uuid::new_v4(),
            0,
            PartContent::Text(TextPart {
                text: "hello".to_string(),
            }),
        );
        assert_eq!(part.status, PartStatus::Pending);
    }

    #[test]
    fn terminal_statuses() {
        assert!(PartStatus::Completed.is_terminal());
        assert!(PartStatus::Error.is_terminal());
        assert!(!PartStatus::Pending.is_terminal());
        assert!(!PartStatus::Running.is_terminal());
    }
}
