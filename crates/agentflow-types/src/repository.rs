//! Narrow repository interfaces the core consumes against the external
//! relational store (spec.md §1 Deliberately out of scope, §6 Repository
//! interface). No production implementation lives in this workspace;
//! `agentflow-testing` supplies an in-memory one for tests.

use async_trait::async_trait;

use crate::domain::{
    Credential, Message, MessageId, MessagePart, PartId, PartStatus, Session, SessionId, UserId,
};
use crate::error::Result;

/// Fields `sessions.updateStats` may increment. `None` leaves a field
/// untouched; present fields are added to the stored aggregate, never
/// overwritten (spec.md §3 Session, §5 ordering guarantees).
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStatsDelta {
    pub message_count: Option<u64>,
    pub cost: Option<f64>,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_or_throw(&self, id: SessionId) -> Result<Session>;
    async fn create(&self, session: Session) -> Result<()>;
    async fn update_stats(&self, id: SessionId, delta: SessionStatsDelta) -> Result<()>;
}

/// Terminal fields set once on a completed assistant message, as passed to
/// `MessageRepository::complete`. Distinct from `domain::MessageCompletion`,
/// which is the typed form stored on the in-memory `Message` itself.
#[derive(Debug, Clone)]
pub struct MessageCompletionInput {
    pub finish_reason: String,
    pub cost: f64,
    pub tokens_input: u64,
    pub tokens_output: u64,
}

#[derive(Debug, Clone)]
pub struct MessageErrorInfo {
    pub error_type: String,
    pub message: String,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<()>;
    async fn complete(&self, id: MessageId, completion: MessageCompletionInput) -> Result<()>;
    async fn set_error(&self, id: MessageId, error: MessageErrorInfo) -> Result<()>;
    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Message>>;
}

#[async_trait]
pub trait MessagePartRepository: Send + Sync {
    async fn create(&self, part: MessagePart) -> Result<()>;
    async fn list_by_message(&self, message_id: MessageId) -> Result<Vec<MessagePart>>;
    async fn update_content(&self, id: PartId, content: crate::domain::PartContent) -> Result<()>;
    async fn update_tool_status(&self, id: PartId, status: PartStatus) -> Result<()>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn list(&self, user_id: &UserId) -> Result<Vec<(String, Credential)>>;
    async fn get(&self, user_id: &UserId, vendor: &str) -> Result<Option<Credential>>;
    async fn update(&self, user_id: &UserId, vendor: &str, credential: Credential) -> Result<()>;
}
