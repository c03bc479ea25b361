//! In-memory implementations of the four repository traits
//! (`agentflow_types::repository`), backed by `DashMap` rather than a
//! database — what a test suite wires up in place of the production store
//! the orchestration core never implements itself (spec.md §1 Deliberately
//! out of scope, §6 Repository interface).

use std::sync::Arc;

use agentflow_types::{
    Credential, CoreError, CredentialRepository, Message, MessageCompletionInput, MessageErrorInfo,
    MessageId, MessagePart, MessagePartRepository, MessageRepository, PartContent, PartId,
    PartStatus, Result, Session, SessionId, SessionRepository, SessionStatsDelta, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<DashMap<SessionId, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(&id).map(|entry| entry.clone())
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get_or_throw(&self, id: SessionId) -> Result<Session> {
        self.sessions.get(&id).map(|entry| entry.clone()).ok_or(CoreError::SessionNotFound(id))
    }

    async fn create(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn update_stats(&self, id: SessionId, delta: SessionStatsDelta) -> Result<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            if let Some(count) = delta.message_count {
                session.message_count += count;
            }
            if let Some(cost) = delta.cost {
                session.total_cost += cost;
            }
            if let Some(input) = delta.tokens_input {
                session.total_input_tokens += input;
            }
            if let Some(output) = delta.tokens_output {
                session.total_output_tokens += output;
            }
            session.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageRepository {
    messages: Arc<DashMap<MessageId, Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.messages.get(&id).map(|entry| entry.clone())
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<()> {
        self.messages.insert(message.id, message);
        Ok(())
    }

    async fn complete(&self, id: MessageId, completion: MessageCompletionInput) -> Result<()> {
        if let Some(mut message) = self.messages.get_mut(&id) {
            message.complete(agentflow_types::MessageCompletion {
                finish_reason: agentflow_types::FinishReason::normalize(&completion.finish_reason),
                input_tokens: completion.tokens_input,
                output_tokens: completion.tokens_output,
                cost: completion.cost,
            });
        }
        Ok(())
    }

    async fn set_error(&self, id: MessageId, error: MessageErrorInfo) -> Result<()> {
        if let Some(mut message) = self.messages.get_mut(&id) {
            message.set_error(error.error_type, error.message);
        }
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Message>> {
        let mut found: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.session_id == session_id)
            .map(|entry| entry.clone())
            .collect();
        found.sort_by_key(|message| message.created_at);
        Ok(found)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMessagePartRepository {
    parts: Arc<DashMap<PartId, MessagePart>>,
}

impl InMemoryMessagePartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePartRepository for InMemoryMessagePartRepository {
    async fn create(&self, part: MessagePart) -> Result<()> {
        self.parts.insert(part.id, part);
        Ok(())
    }

    async fn list_by_message(&self, message_id: MessageId) -> Result<Vec<MessagePart>> {
        let mut found: Vec<MessagePart> = self
            .parts
            .iter()
            .filter(|entry| entry.message_id == message_id)
            .map(|entry| entry.clone())
            .collect();
        found.sort_by_key(|part| part.order);
        Ok(found)
    }

    async fn update_content(&self, id: PartId, content: PartContent) -> Result<()> {
        if let Some(mut part) = self.parts.get_mut(&id) {
            part.content = content;
            part.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_tool_status(&self, id: PartId, status: PartStatus) -> Result<()> {
        if let Some(mut part) = self.parts.get_mut(&id) {
            part.status = status;
            part.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialRepository {
    credentials: Arc<DashMap<(UserId, String), Credential>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, user_id: impl Into<UserId>, vendor: impl Into<String>, credential: Credential) {
        self.credentials.insert((user_id.into(), vendor.into()), credential);
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn list(&self, user_id: &UserId) -> Result<Vec<(String, Credential)>> {
        Ok(self
            .credentials
            .iter()
            .filter(|entry| &entry.key().0 == user_id)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect())
    }

    async fn get(&self, user_id: &UserId, vendor: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.get(&(user_id.clone(), vendor.to_string())).map(|entry| entry.clone()))
    }

    async fn update(&self, user_id: &UserId, vendor: &str, credential: Credential) -> Result<()> {
        self.credentials.insert((user_id.clone(), vendor.to_string()), credential);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_types::{Role, TextPart};
    use uuid::Uuid;

    #[tokio::test]
    async fn session_get_or_throw_errors_when_missing() {
        let repo = InMemorySessionRepository::new();
        let result = repo.get_or_throw(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CoreError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn session_update_stats_accumulates() {
        let repo = InMemorySessionRepository::new();
        let session = Session::new(Uuid::new_v4(), "general", "anthropic", "claude-sonnet-4", None);
        let id = session.id;
        repo.create(session).await.unwrap();
        repo.update_stats(id, SessionStatsDelta { message_count: Some(2), cost: Some(0.01), tokens_input: Some(10), tokens_output: Some(5) }).await.unwrap();
        repo.update_stats(id, SessionStatsDelta { cost: Some(0.02), ..Default::default() }).await.unwrap();
        let session = repo.get_or_throw(id).await.unwrap();
        assert_eq!(session.message_count, 2);
        assert!((session.total_cost - 0.03).abs() < 1e-9);
    }

    #[tokio::test]
    async fn message_list_by_session_is_ordered_by_creation() {
        let repo = InMemoryMessageRepository::new();
        let session_id = Uuid::new_v4();
        let first = Message::new(session_id, Role::User, None, "anthropic", "claude-sonnet-4", "general");
        let second = Message::new(session_id, Role::Assistant, Some(first.id), "anthropic", "claude-sonnet-4", "general");
        repo.create(first.clone()).await.unwrap();
        repo.create(second.clone()).await.unwrap();
        let listed = repo.list_by_session(session_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn part_repository_round_trips_content_updates() {
        let repo = InMemoryMessagePartRepository::new();
        let message_id = Uuid::new_v4();
        let part = MessagePart::new(message_id, 0, PartContent::Text(TextPart { text: "a".to_string() }));
        let part_id = part.id;
        repo.create(part).await.unwrap();
        repo.update_content(part_id, PartContent::Text(TextPart { text: "ab".to_string() })).await.unwrap();
        let listed = repo.list_by_message(message_id).await.unwrap();
        match &listed[0].content {
            PartContent::Text(text) => assert_eq!(text.text, "ab"),
            _ => panic!("expected text part"),
        }
    }

    #[tokio::test]
    async fn credential_repository_update_then_get() {
        let repo = InMemoryCredentialRepository::new();
        repo.update(&"user-1".to_string(), "anthropic", Credential::ApiKey("sk-1".to_string())).await.unwrap();
        let fetched = repo.get(&"user-1".to_string(), "anthropic").await.unwrap();
        assert!(matches!(fetched, Some(Credential::ApiKey(key)) if key == "sk-1"));
    }
}
