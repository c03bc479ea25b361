use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::SessionId;
use super::vendor::FinishReason;

pub type MessageId = Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// `{errorType, errorMessage}` recorded on a message that did not reach a
/// natural finish (spec.md §3, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageError {
    pub error_type: String,
    pub error_message: String,
}

/// Terminal fields set exactly once, by the Stream Processor's `finish`
/// handling or an error path (spec.md §3, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCompletion {
    pub finish_reason: FinishReason,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// One turn-level exchange within a session: a user message or the
/// assistant's response to one, materialized incrementally by the Stream
/// Processor as its parts arrive.
///
/// Vendor, model, and agent are recorded at creation time and never
/// change afterwards, even if the session's defaults change later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: Role,
    pub parent_message_id: Option<MessageId>,
    pub vendor: String,
    pub model: String,
    pub agent_name: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub completion: Option<MessageCompletion>,
    pub error: Option<MessageError>,
}

impl Message {
    pub fn new(
        session_id: SessionId,
        role: Role,
        parent_message_id: Option<MessageId>,
        vendor: impl Into<String>,
        model: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role,
            parent_message_id,
            vendor: vendor.into(),
            model: model.into(),
            agent_name: agent_name.into(),
            created_at: Utc::now(),
            finished_at: None,
            completion: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn complete(&mut self, completion: MessageCompletion) {
        self.finished_at = Some(Utc::now());
        self.completion = Some(completion);
    }

    pub fn set_error(&mut self, error_type: impl Into<String>, error_message: impl Into<String>) {
        self.finished_at = Some(Utc::now());
        self.error = Some(MessageError {
            error_type: error_type.into(),
            error_message: error_message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_is_unfinished() {
        let msg = Message::new(Uuid::new_v4(), Role::Assistant, None, "anthropic", "claude-sonnet-4", "general");
        assert!(!msg.is_finished());
        assert!(msg.completion.is_none());
    }

    #[test]
    fn complete_sets_finished_and_completion() {
        let mut msg = Message::new(Uuid::new_v4(), Role::Assistant, None, "anthropic", "claude-sonnet-4", "general");
        msg.complete(MessageCompletion {
            finish_reason: FinishReason::Stop,
            input_tokens: 4,
            output_tokens: 2,
            cost: 0.000_042,
        });
        assert!(msg.is_finished());
        assert!(msg.error.is_none());
    }

    #[test]
    fn set_error_marks_finished_without_completion() {
        let mut msg = Message::new(Uuid::new_v4(), Role::Assistant, None, "anthropic", "claude-sonnet-4", "general");
        msg.set_error("Cancelled", "turn cancelled");
        assert!(msg.is_finished());
        assert!(msg.completion.is_none());
        assert_eq!(msg.error.unwrap().error_type, "Cancelled");
    }
}
