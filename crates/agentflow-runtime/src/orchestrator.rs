//! The Orchestrator (spec.md §4.4): drives one turn end to end — resolves
//! the effective agent/vendor/model/step-ceiling, persists the user
//! message, rebuilds the dialogue, binds tools, builds the system prompt,
//! and feeds a model adapter's event stream through the Stream Processor
//! until a terminal event.
//!
//! Grounded on `other_examples` cortex-engine's `Orchestrator::process_turn`
//! (resolve settings, build context, call model, drive tool loop, persist
//! result) — adapted here since the adapter itself (not this struct) now
//! owns the inner tool-call loop (`agentflow_providers::run_agentic_loop`),
//! so this turn loop only ever consumes ONE top-level `Finish`.

use std::sync::Arc;

use agentflow_providers::{CredentialResolver, ModelAdapter, ProviderRegistry, ToolSpec};
use agentflow_types::{
    AgentDefinition, BroadcastEvent, Credential, CoreError, Message, MessagePart,
    MessagePartRepository, MessageRepository, OAuthTokens, PartContent, Role, Session,
    SessionRepository, TextPart, ToolBinding, ToolExecutionContext, ToolRegistry, TurnRequest,
    TurnResult,
};
use futures::StreamExt;
use tracing::instrument;

use crate::agent_registry::AgentRegistry;
use crate::error::{Error, Result};
use crate::subagent::{ParentContext, TaskDispatcher};
use crate::task_tool::{TaskToolBinding, TASK_TOOL_NAME};

/// Used when neither the request, the agent, nor the session says
/// otherwise (spec.md §4.4 step 3).
pub const DEFAULT_STEP_CEILING: u32 = 10;

fn resolve_vendor(request: &TurnRequest, agent: &AgentDefinition, session: &Session) -> String {
    request
        .vendor
        .clone()
        .or_else(|| agent.default_vendor.clone())
        .unwrap_or_else(|| session.default_vendor.clone())
}

fn resolve_model(request: &TurnRequest, agent: &AgentDefinition, session: &Session) -> String {
    request
        .model
        .clone()
        .or_else(|| agent.default_model.clone())
        .unwrap_or_else(|| session.default_model.clone())
}

fn resolve_step_ceiling(request: &TurnRequest, agent: &AgentDefinition) -> u32 {
    request
        .step_ceiling_override
        .or(agent.step_ceiling)
        .unwrap_or(DEFAULT_STEP_CEILING)
}

/// Whether the `task` tool may be bound for this turn: the agent must not
/// have excluded it from a non-empty declared tool set, and any caller-side
/// `tool_allow_list` restriction (used by the Sub-Agent Runner to strip it
/// from child turns) must not exclude it either.
fn task_tool_allowed(agent: &AgentDefinition, tool_allow_list: &Option<Vec<String>>) -> bool {
    let agent_allows = agent.tools.is_empty() || agent.tools.iter().any(|t| t == TASK_TOOL_NAME);
    let request_allows = tool_allow_list
        .as_ref()
        .map(|allow| allow.iter().any(|t| t == TASK_TOOL_NAME))
        .unwrap_or(true);
    agent_allows && request_allows
}

fn binding_to_tool_spec(binding: Arc<dyn ToolBinding>) -> ToolSpec {
    let name = binding.name().to_string();
    let description = binding.description().to_string();
    let input_schema = binding.input_schema();
    let callable = binding.clone();
    ToolSpec {
        name,
        description,
        input_schema,
        execute: Arc::new(move |input| {
            let callable = callable.clone();
            Box::pin(async move {
                callable
                    .invoke(input)
                    .await
                    .map_err(|err| agentflow_providers::Error::ModelAdapter(err.to_string()))
            })
        }),
    }
}

pub struct Orchestrator {
    providers: Arc<ProviderRegistry>,
    credentials: Arc<CredentialResolver>,
    agents: Arc<AgentRegistry>,
    tools: Arc<dyn ToolRegistry>,
    sessions: Arc<dyn SessionRepository>,
    messages: Arc<dyn MessageRepository>,
    parts: Arc<dyn MessagePartRepository>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        providers: Arc<ProviderRegistry>,
        credentials: Arc<CredentialResolver>,
        agents: Arc<AgentRegistry>,
        tools: Arc<dyn ToolRegistry>,
        sessions: Arc<dyn SessionRepository>,
        messages: Arc<dyn MessageRepository>,
        parts: Arc<dyn MessagePartRepository>,
    ) -> Self {
        Self {
            providers,
            credentials,
            agents,
            tools,
            sessions,
            messages,
            parts,
        }
    }

    /// Drives one turn (spec.md §4.4). `task_dispatch` is `None` for a
    /// sub-agent's own turn — passing it through would let a sub-agent spawn
    /// further sub-agents, which spec.md §4.6 forbids.
    #[instrument(skip(self, request, task_dispatch), fields(session_id = %request.session_id))]
    pub async fn run(&self, request: TurnRequest, task_dispatch: Option<Arc<dyn TaskDispatcher>>) -> Result<TurnResult> {
        // Step 1-2: resolve session and agent.
        let session = self.sessions.get_or_throw(request.session_id).await.map_err(Error::Core)?;
        let agent_name = request.agent_name.clone().unwrap_or_else(|| session.agent_name.clone());
        let agent = self
            .agents
            .resolve(&agent_name)
            .ok_or_else(|| Error::Core(CoreError::AgentNotFound(agent_name.clone())))?;

        // Step 3: effective settings.
        let vendor = resolve_vendor(&request, &agent, &session);
        let model = resolve_model(&request, &agent, &session);
        let step_ceiling = resolve_step_ceiling(&request, &agent);
        let temperature = request.temperature_override.or(agent.temperature);

        // Step 4: persist the user message and its single text part.
        let user_message = Message::new(session.id, Role::User, None, vendor.clone(), model.clone(), agent.name.clone());
        let user_message_id = user_message.id;
        self.messages.create(user_message).await.map_err(Error::Core)?;
        let user_part = MessagePart::new(user_message_id, 0, PartContent::Text(TextPart { text: request.utterance.clone() }));
        self.parts.create(user_part).await.map_err(Error::Core)?;
        (request.observer)(BroadcastEvent::MessageCreated {
            session_id: session.id,
            message_id: user_message_id,
        });

        // Step 5: rebuild the dialogue from the session's full history,
        // including the user message just created. The raw utterance
        // argument stands in for that message's persisted parts (step 6).
        let history = self.messages.list_by_session(session.id).await.map_err(Error::Core)?;
        let mut parts_by_message = Vec::with_capacity(history.len());
        for message in &history {
            let message_parts = self.parts.list_by_message(message.id).await.map_err(Error::Core)?;
            parts_by_message.push((message.clone(), message_parts));
        }
        let dialogue = agentflow_engine::rebuild_dialogue(&parts_by_message, &request.utterance);

        // Step 6: resolve the model adapter. `anthropic-oauth` routes
        // through the resolver-aware constructor; every other vendor wraps
        // the request's credential as a static API key.
        let adapter: Arc<dyn ModelAdapter> = if vendor == "anthropic-oauth" {
            let tokens: OAuthTokens = serde_json::from_str(&request.credential).map_err(|err| {
                Error::Core(CoreError::InvalidCredential {
                    vendor: vendor.clone(),
                    reason: err.to_string(),
                })
            })?;
            self.providers.create_oauth_adapter(&model, request.user_id.clone(), self.credentials.clone(), tokens)
        } else {
            let credential = Credential::ApiKey(request.credential.clone());
            self.providers
                .create_model_adapter(&vendor, &model, &credential)
                .await
                .map_err(Error::Provider)?
        };

        // Step 7: create the assistant message up front so tool bindings
        // can be scoped to it.
        let assistant_message = Message::new(session.id, Role::Assistant, Some(user_message_id), vendor.clone(), model.clone(), agent.name.clone());
        let assistant_message_id = assistant_message.id;
        self.messages.create(assistant_message).await.map_err(Error::Core)?;
        (request.observer)(BroadcastEvent::MessageCreated {
            session_id: session.id,
            message_id: assistant_message_id,
        });

        // Step 8: resolve and bind the turn's active tool set.
        let tool_ctx = ToolExecutionContext {
            project_id: request.project_id,
            project_root: request.project_root.clone(),
            session_id: session.id,
            assistant_message_id,
            user_id: request.user_id.clone(),
            cancellation: request.cancellation.clone(),
        };
        let mut candidate_names = agent.resolve_tools(&self.tools.known_tool_names());
        if let Some(allow) = &request.tool_allow_list {
            candidate_names.retain(|name| allow.contains(name));
        }
        let bindings = self.tools.bind(&candidate_names, tool_ctx);
        let mut tool_specs: Vec<ToolSpec> = bindings
            .into_iter()
            .filter(|binding| request.can_execute_code || !binding.requires_code_execution())
            .map(binding_to_tool_spec)
            .collect();

        if let Some(dispatcher) = &task_dispatch {
            if task_tool_allowed(&agent, &request.tool_allow_list) {
                let parent_ctx = ParentContext {
                    project_id: request.project_id,
                    project_root: request.project_root.clone(),
                    parent_session_id: session.id,
                    user_id: request.user_id.clone(),
                    can_execute_code: request.can_execute_code,
                    vendor: vendor.clone(),
                    model: model.clone(),
                    credential: request.credential.clone(),
                    cancellation: request.cancellation.clone(),
                    observer: request.observer.clone(),
                };
                let binding = Arc::new(TaskToolBinding::new(parent_ctx, dispatcher.clone()));
                tool_specs.push(binding_to_tool_spec(binding));
            }
        }

        // Step 9: system prompt.
        let sections = agentflow_engine::PromptSections {
            project_context: None,
            skill_summaries: Vec::new(),
            agent_prompt: agent.prompt_fragment.clone().unwrap_or_default(),
            extra_instructions: request.prompt_override.clone(),
        };
        let system_prompt = agentflow_engine::assemble_system_prompt(&sections);

        // Step 10: call the model.
        let stream_request = agentflow_providers::StreamRequest {
            system: system_prompt,
            messages: dialogue,
            tools: tool_specs,
            stop_when_step_count: step_ceiling,
            temperature,
            top_p: agent.top_p,
            cancellation: request.cancellation.clone(),
        };
        let mut stream = adapter.stream_text(stream_request).await.map_err(Error::Provider)?;

        // Step 11: drive the stream through the Stream Processor until a
        // terminal event.
        let mut processor = agentflow_engine::StreamProcessor::new(
            assistant_message_id,
            session.id,
            vendor.clone(),
            model.clone(),
            self.parts.clone(),
            self.messages.clone(),
            self.sessions.clone(),
            self.providers.clone(),
            request.observer.clone(),
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = request.cancellation.cancelled() => {
                    processor.mark_cancelled().await.map_err(Error::Engine)?;
                    return Err(Error::Core(CoreError::Cancelled));
                }
                next = stream.next() => next,
            };
            let Some(event) = event else {
                processor.mark_cancelled().await.map_err(Error::Engine)?;
                return Err(Error::Core(CoreError::ModelAdapterError(
                    "model stream ended without a terminal event".to_string(),
                )));
            };
            let event = event.map_err(Error::Provider)?;
            match processor.process(event).await.map_err(Error::Engine)? {
                agentflow_engine::ProcessOutcome::Continue => continue,
                agentflow_engine::ProcessOutcome::Finished {
                    finish_reason,
                    input_tokens,
                    output_tokens,
                    cost,
                } => {
                    return Ok(TurnResult {
                        assistant_message_id,
                        finish_reason,
                        input_tokens,
                        output_tokens,
                        cost,
                    });
                }
                agentflow_engine::ProcessOutcome::Errored { error_type, message } => {
                    return Err(Error::Core(CoreError::ModelAdapterError(format!("{error_type}: {message}"))));
                }
            }
        }
    }
}
