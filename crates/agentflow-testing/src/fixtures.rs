//! Builders for quickly constructing valid domain objects in tests,
//! grounded on the `sample(...)` helpers each domain module already
//! defines for its own `#[cfg(test)]` block (see `agentflow_types::domain`)
//! — lifted here so orchestrator- and engine-level tests don't each
//! reinvent them.

use std::path::PathBuf;
use std::sync::Arc;

use agentflow_types::{AgentDefinition, AgentMode, ProjectId, Session, TurnRequest, UserId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub fn sample_session(project_id: ProjectId) -> Session {
    Session::new(project_id, "general", "anthropic", "claude-sonnet-4", None)
}

pub fn sample_agent_definition(name: impl Into<String>) -> AgentDefinition {
    AgentDefinition {
        name: name.into(),
        mode: AgentMode::Primary,
        description: Some("a test agent".to_string()),
        hidden: false,
        default_vendor: Some("anthropic".to_string()),
        default_model: Some("claude-sonnet-4".to_string()),
        temperature: None,
        top_p: None,
        step_ceiling: Some(10),
        prompt_fragment: Some("You are a test agent.".to_string()),
        tools: Vec::new(),
        built_in: false,
    }
}

/// Builds a `TurnRequest` against the given session, with a no-op observer
/// and a fresh cancellation token a test can cancel independently.
pub fn sample_turn_request(project_id: ProjectId, session_id: Uuid, user_id: impl Into<UserId>, utterance: impl Into<String>) -> TurnRequest {
    TurnRequest {
        project_id,
        project_root: PathBuf::from("/tmp/agentflow-test-project"),
        session_id,
        user_id: user_id.into(),
        can_execute_code: false,
        utterance: utterance.into(),
        vendor: None,
        model: None,
        credential: "sk-test".to_string(),
        agent_name: None,
        prompt_override: None,
        step_ceiling_override: None,
        temperature_override: None,
        tool_allow_list: None,
        cancellation: CancellationToken::new(),
        observer: Arc::new(|_event| {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_session_has_no_parent() {
        let session = sample_session(Uuid::new_v4());
        assert!(!session.is_subagent());
    }

    #[test]
    fn sample_agent_definition_has_no_declared_tools() {
        let agent = sample_agent_definition("general");
        assert!(agent.tools.is_empty());
        assert_eq!(agent.mode, AgentMode::Primary);
    }

    #[test]
    fn sample_turn_request_carries_given_utterance() {
        let request = sample_turn_request(Uuid::new_v4(), Uuid::new_v4(), "user-1", "hello");
        assert_eq!(request.utterance, "hello");
        assert!(!request.cancellation.is_cancelled());
    }
}
