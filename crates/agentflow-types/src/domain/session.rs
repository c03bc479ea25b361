use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::ProjectId;

pub type SessionId = Uuid;

/// Lifecycle state of a session.
///
/// A session becomes `Closed` once its owner calls close; it is never
/// reopened. `Idle` distinguishes "no turn currently running" from
/// `Active`, which a caller may use to decide whether a new turn can start
/// immediately or must wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Idle,
    Closed,
}

/// A single conversation with an agent.
///
/// Owns the running aggregate token/cost counters. Per spec.md §9, these
/// counters are only ever incremented from the Stream Processor's `finish`
/// handling (see `agentflow_engine::stream_processor`); no other module
/// exposes a public method that mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub project_id: ProjectId,
    pub agent_name: String,
    pub default_vendor: String,
    pub default_model: String,
    pub parent_session_id: Option<SessionId>,
    pub title: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost: f64,
}

impl Session {
    pub fn new(
        project_id: ProjectId,
        agent_name: impl Into<String>,
        default_vendor: impl Into<String>,
        default_model: impl Into<String>,
        parent_session_id: Option<SessionId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            agent_name: agent_name.into(),
            default_vendor: default_vendor.into(),
            default_model: default_model.into(),
            parent_session_id,
            title: None,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            message_count: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cost: 0.0,
        }
    }

    pub fn is_subagent(&self) -> bool {
        self.parent_session_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(parent: Option<SessionId>) -> Session {
        Session::new(Uuid::new_v4(), "general", "anthropic", "claude-sonnet-4", parent)
    }

    #[test]
    fn new_session_starts_active_with_zeroed_counters() {
        let session = sample(None);
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.total_input_tokens, 0);
        assert_eq!(session.total_output_tokens, 0);
        assert_eq!(session.total_cost, 0.0);
        assert!(!session.is_subagent());
    }

    #[test]
    fn subagent_session_records_parent() {
        let parent = sample(None);
        let child = Session::new(parent.project_id, "explore", "anthropic", "claude-sonnet-4", Some(parent.id));
        assert!(child.is_subagent());
        assert_eq!(child.parent_session_id, Some(parent.id));
    }
}
