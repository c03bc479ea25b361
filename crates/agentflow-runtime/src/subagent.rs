//! The Sub-Agent Runner (spec.md §4.6): owns the lifecycle of child turns
//! spawned via the *task* tool — creating a child session, running a
//! restricted orchestration with no further *task* tool, and optionally
//! detaching into a background task keyed by child-session id.
//!
//! Grounded on the teacher's `WorkspaceSupervisor`/`SessionStreamer`
//! "spawn a worker, forward results over a channel, clean up on exit"
//! shape (`agtrace-runtime::runtime::supervisor`), translated from
//! `std::thread` + `mpsc::channel` into `tokio::spawn` + `tokio::sync::watch`
//! so a `resume` call can await a still-running child's eventual result
//! without re-spawning it.

use std::path::PathBuf;
use std::sync::Arc;

use agentflow_types::{
    BroadcastEvent, FinishReason, MessagePartRepository, PartContent, ProjectId, Session,
    SessionId, SessionRepository, TurnRequest, UserId,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::agent_registry::AgentRegistry;
use crate::error::Result;
use crate::orchestrator::Orchestrator;

/// Everything a spawned sub-agent needs to know about the turn that is
/// spawning it (spec.md §4.6 step 3-4).
#[derive(Clone)]
pub struct ParentContext {
    pub project_id: ProjectId,
    pub project_root: PathBuf,
    pub parent_session_id: SessionId,
    pub user_id: UserId,
    pub can_execute_code: bool,
    pub vendor: String,
    pub model: String,
    pub credential: String,
    pub cancellation: CancellationToken,
    pub observer: Arc<dyn Fn(BroadcastEvent) + Send + Sync>,
}

/// An optional vendor/model override nested in the *task* tool's
/// parameters (spec.md §4.6, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct TaskModelOverride {
    pub vendor: Option<String>,
    pub model: Option<String>,
}

/// Validated *task* tool parameters (spec.md §4.6, §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParams {
    pub subagent_type: String,
    pub description: String,
    pub prompt: String,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub model: Option<TaskModelOverride>,
    #[serde(default)]
    pub run_in_background: bool,
    #[serde(default)]
    pub resume: Option<SessionId>,
}

/// What a completed (or just-launched) sub-agent reports back to the
/// calling tool (spec.md §4.6 step 6).
#[derive(Debug, Clone, Serialize)]
pub struct SubAgentResult {
    pub session_id: SessionId,
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubAgentResult {
    fn failed(session_id: SessionId, error: impl Into<String>) -> Self {
        Self {
            session_id,
            success: false,
            response: String::new(),
            input_tokens: None,
            output_tokens: None,
            cost: None,
            error: Some(error.into()),
        }
    }
}

/// The interceptor a turn's *task* tool dispatches into, so `Orchestrator`
/// never needs an `Arc<SubAgentRunner>` field — breaking what would
/// otherwise be an `Orchestrator` <-> `SubAgentRunner` reference cycle.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, ctx: ParentContext, params: TaskParams) -> agentflow_types::Result<Value>;
}

struct BackgroundEntry {
    cancellation: CancellationToken,
    result: watch::Receiver<Option<SubAgentResult>>,
}

impl Clone for BackgroundEntry {
    fn clone(&self) -> Self {
        Self {
            cancellation: self.cancellation.clone(),
            result: self.result.clone(),
        }
    }
}

/// The process-wide registry of in-flight background sub-agents, keyed by
/// child-session id (spec.md §3 Background Task, §4.6, §5 Shared resources).
#[derive(Clone, Default)]
pub struct BackgroundRegistry {
    tasks: Arc<DashMap<SessionId, BackgroundEntry>>,
}

impl BackgroundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<SessionId> {
        self.tasks.iter().map(|entry| *entry.key()).collect()
    }

    /// `None` if nothing is tracked under this id (already finished, or
    /// never existed). Present entries let a caller await the eventual
    /// result without re-spawning (spec.md §4.6 step 1).
    fn get(&self, id: SessionId) -> Option<BackgroundEntry> {
        self.tasks.get(&id).map(|entry| entry.clone())
    }

    /// Cancels a live background task. Idempotent: a second call on the
    /// same id (already removed by the first) returns `false` (spec.md §4.6
    /// "Cancellation races are safe").
    pub fn cancel(&self, id: SessionId) -> bool {
        match self.tasks.remove(&id) {
            Some((_, entry)) => {
                entry.cancellation.cancel();
                true
            }
            None => false,
        }
    }
}

/// Owns sub-agent spawning and supervision (spec.md §4.6).
pub struct SubAgentRunner {
    orchestrator: Arc<Orchestrator>,
    agents: Arc<AgentRegistry>,
    sessions: Arc<dyn SessionRepository>,
    parts: Arc<dyn MessagePartRepository>,
    background: BackgroundRegistry,
}

impl SubAgentRunner {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        agents: Arc<AgentRegistry>,
        sessions: Arc<dyn SessionRepository>,
        parts: Arc<dyn MessagePartRepository>,
    ) -> Self {
        Self {
            orchestrator,
            agents,
            sessions,
            parts,
            background: BackgroundRegistry::new(),
        }
    }

    pub fn background(&self) -> &BackgroundRegistry {
        &self.background
    }

    #[instrument(skip(self, ctx, params), fields(subagent_type = %params.subagent_type, background = params.run_in_background))]
    async fn spawn(&self, ctx: ParentContext, params: TaskParams) -> Result<SubAgentResult> {
        // Step 1: resume a still-live background task instead of spawning
        // a duplicate.
        if let Some(resume_id) = params.resume {
            if let Some(entry) = self.background.get(resume_id) {
                let mut rx = entry.result;
                loop {
                    if let Some(result) = rx.borrow().clone() {
                        return Ok(result);
                    }
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        }

        // Step 2: resolve the named agent; a miss is a structured error
        // result, not an aborted parent turn.
        let Some(agent) = self.agents.resolve(&params.subagent_type) else {
            let placeholder = Uuid::new_v4();
            warn!(agent = %params.subagent_type, "sub-agent type not found");
            return Ok(SubAgentResult::failed(
                placeholder,
                format!("agent not found: {}", params.subagent_type),
            ));
        };

        // Step 3: create the child session, parented by the caller's.
        let vendor = params
            .model
            .as_ref()
            .and_then(|m| m.vendor.clone())
            .or_else(|| agent.default_vendor.clone())
            .unwrap_or_else(|| ctx.vendor.clone());
        let model = params
            .model
            .as_ref()
            .and_then(|m| m.model.clone())
            .or_else(|| agent.default_model.clone())
            .unwrap_or_else(|| ctx.model.clone());

        let mut child_session = Session::new(ctx.project_id, agent.name.clone(), vendor.clone(), model.clone(), Some(ctx.parent_session_id));
        child_session.title = Some(params.description.clone());
        let child_session_id = child_session.id;
        self.sessions.create(child_session).await.map_err(crate::error::Error::Core)?;

        info!(child_session_id = %child_session_id, agent = %agent.name, "spawning sub-agent");

        // Step 4: the child's turn request strips the `task` tool
        // regardless of what the agent itself declares (recursion guard).
        let mut tool_allow_list = agent.tools.clone();
        tool_allow_list.retain(|name| name != "task");
        let tool_allow_list = if agent.tools.is_empty() { None } else { Some(tool_allow_list) };

        let child_request = TurnRequest {
            project_id: ctx.project_id,
            project_root: ctx.project_root.clone(),
            session_id: child_session_id,
            user_id: ctx.user_id.clone(),
            can_execute_code: ctx.can_execute_code,
            utterance: params.prompt.clone(),
            vendor: Some(vendor),
            model: Some(model),
            credential: ctx.credential.clone(),
            agent_name: Some(agent.name.clone()),
            prompt_override: None,
            step_ceiling_override: params.max_turns.or(agent.step_ceiling),
            temperature_override: None,
            tool_allow_list,
            cancellation: if params.run_in_background {
                CancellationToken::new()
            } else {
                ctx.cancellation.clone()
            },
            observer: ctx.observer.clone(),
        };

        if params.run_in_background {
            // Step 5: launch detached, return immediately.
            let cancellation = child_request.cancellation.clone();
            let (tx, rx) = watch::channel(None);
            self.background.tasks.insert(
                child_session_id,
                BackgroundEntry {
                    cancellation,
                    result: rx,
                },
            );

            let orchestrator = self.orchestrator.clone();
            let parts_repo = self.parts.clone();
            let background = self.background.clone();
            tokio::spawn(async move {
                let result = run_child_turn(orchestrator, parts_repo, child_request).await;
                let _ = tx.send(Some(result));
                background.tasks.remove(&child_session_id);
            });

            return Ok(SubAgentResult {
                session_id: child_session_id,
                success: true,
                response: "started in background".to_string(),
                input_tokens: None,
                output_tokens: None,
                cost: None,
                error: None,
            });
        }

        // Step 6: synchronous sub-agent execution inherits the parent's
        // cancellation token (spec.md §5 Sub-agent cancellation).
        Ok(run_child_turn(self.orchestrator.clone(), self.parts.clone(), child_request).await)
    }
}

async fn run_child_turn(
    orchestrator: Arc<Orchestrator>,
    parts: Arc<dyn MessagePartRepository>,
    request: TurnRequest,
) -> SubAgentResult {
    let session_id = request.session_id;
    match orchestrator.run(request, None).await {
        Ok(turn_result) => {
            let message_parts = parts.list_by_message(turn_result.assistant_message_id).await.unwrap_or_default();
            let response = agentflow_engine::flatten_message_text(&message_parts);
            let had_tool_error = message_parts.iter().any(|part| {
                matches!(&part.content, PartContent::ToolResult(result) if result.is_error)
            });
            SubAgentResult {
                session_id,
                success: turn_result.finish_reason != FinishReason::Error,
                response,
                input_tokens: Some(turn_result.input_tokens),
                output_tokens: Some(turn_result.output_tokens),
                cost: Some(turn_result.cost),
                error: if had_tool_error {
                    Some("one or more tool invocations failed".to_string())
                } else {
                    None
                },
            }
        }
        Err(err) => SubAgentResult::failed(session_id, err.to_string()),
    }
}

#[async_trait]
impl TaskDispatcher for SubAgentRunner {
    async fn dispatch(&self, ctx: ParentContext, params: TaskParams) -> agentflow_types::Result<Value> {
        let result = self.spawn(ctx, params).await.map_err(agentflow_types::CoreError::from)?;
        Ok(serde_json::to_value(result).unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_cancel_is_a_no_op_after_first() {
        let registry = BackgroundRegistry::new();
        let id = Uuid::new_v4();
        let (_tx, rx) = watch::channel(None);
        registry.tasks.insert(
            id,
            BackgroundEntry {
                cancellation: CancellationToken::new(),
                result: rx,
            },
        );
        assert!(registry.cancel(id));
        assert!(!registry.cancel(id));
    }

    #[test]
    fn background_list_reflects_live_entries() {
        let registry = BackgroundRegistry::new();
        let id = Uuid::new_v4();
        let (_tx, rx) = watch::channel(None);
        registry.tasks.insert(
            id,
            BackgroundEntry {
                cancellation: CancellationToken::new(),
                result: rx,
            },
        );
        assert_eq!(registry.list(), vec![id]);
        registry.cancel(id);
        assert!(registry.list().is_empty());
    }

    fn sample_runner() -> SubAgentRunner {
        use agentflow_providers::{CredentialResolver, ProviderRegistry};
        use agentflow_testing::{
            InMemoryCredentialRepository, InMemoryMessagePartRepository, InMemoryMessageRepository,
            InMemorySessionRepository, StubToolRegistry,
        };

        let providers = Arc::new(ProviderRegistry::new());
        let credentials = Arc::new(CredentialResolver::new(Arc::new(InMemoryCredentialRepository::new())));
        let agents = Arc::new(AgentRegistry::new());
        let tools = Arc::new(StubToolRegistry::new(Vec::<String>::new()));
        let sessions: Arc<dyn SessionRepository> = Arc::new(InMemorySessionRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let parts: Arc<dyn MessagePartRepository> = Arc::new(InMemoryMessagePartRepository::new());

        let orchestrator = Arc::new(Orchestrator::new(
            providers,
            credentials,
            agents.clone(),
            tools,
            sessions.clone(),
            messages,
            parts.clone(),
        ));
        SubAgentRunner::new(orchestrator, agents, sessions, parts)
    }

    fn sample_parent_ctx() -> ParentContext {
        ParentContext {
            project_id: Uuid::new_v4(),
            project_root: PathBuf::from("/tmp/agentflow-test-project"),
            parent_session_id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            can_execute_code: false,
            vendor: "anthropic".to_string(),
            model: "claude-sonnet-4".to_string(),
            credential: "sk-test".to_string(),
            cancellation: CancellationToken::new(),
            observer: Arc::new(|_event| {}),
        }
    }

    #[tokio::test]
    async fn spawn_reports_a_failed_result_for_an_unknown_subagent_type() {
        let runner = sample_runner();
        let result = runner
            .spawn(
                sample_parent_ctx(),
                TaskParams {
                    subagent_type: "no-such-agent".to_string(),
                    description: "investigate".to_string(),
                    prompt: "look into this".to_string(),
                    max_turns: None,
                    model: None,
                    run_in_background: false,
                    resume: None,
                },
            )
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("no-such-agent"));
    }

    #[tokio::test]
    async fn dispatch_serializes_the_failed_result_as_json() {
        let runner = sample_runner();
        let value = runner
            .dispatch(
                sample_parent_ctx(),
                TaskParams {
                    subagent_type: "no-such-agent".to_string(),
                    description: "investigate".to_string(),
                    prompt: "look into this".to_string(),
                    max_turns: None,
                    model: None,
                    run_in_background: false,
                    resume: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(value.get("success").and_then(Value::as_bool), Some(false));
    }
}
