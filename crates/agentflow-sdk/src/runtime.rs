//! `Runtime`: the facade that wires the Provider Registry, Credential
//! Resolver, Agent Registry, Orchestrator, and Sub-Agent Runner into one
//! entry point (spec.md §1, §4.4 [AMBIENT]). Grounded on the teacher's
//! `agtrace_sdk::Client`, which likewise wraps one `Arc<agtrace_runtime::AgTrace>`
//! and exposes thin delegating methods rather than re-implementing
//! anything itself.

use std::path::PathBuf;
use std::sync::Arc;

use agentflow_providers::{CredentialResolver, ProviderRegistry};
use agentflow_runtime::{
    AgentRegistry, BackgroundRegistry, Orchestrator, SubAgentRunner, TaskDispatcher,
};
use agentflow_types::{
    CredentialRepository, MessagePartRepository, MessageRepository, SessionRepository,
    ToolRegistry, TurnRequest, TurnResult,
};

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};

/// Builds a `Runtime` from a config plus the external interfaces the host
/// application supplies (spec.md §1 Deliberately out of scope, §6 External
/// interfaces) — this crate never constructs a default `ToolRegistry` or
/// repository implementation itself.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    tools: Option<Arc<dyn ToolRegistry>>,
    sessions: Option<Arc<dyn SessionRepository>>,
    messages: Option<Arc<dyn MessageRepository>>,
    parts: Option<Arc<dyn MessagePartRepository>>,
    credential_repository: Option<Arc<dyn CredentialRepository>>,
    project_root: Option<PathBuf>,
}

impl RuntimeBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            tools: None,
            sessions: None,
            messages: None,
            parts: None,
            credential_repository: None,
            project_root: None,
        }
    }

    pub fn tools(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn sessions(mut self, sessions: Arc<dyn SessionRepository>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn messages(mut self, messages: Arc<dyn MessageRepository>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn parts(mut self, parts: Arc<dyn MessagePartRepository>) -> Self {
        self.parts = Some(parts);
        self
    }

    pub fn credential_repository(mut self, repository: Arc<dyn CredentialRepository>) -> Self {
        self.credential_repository = Some(repository);
        self
    }

    /// When set, `.agentflow/agents/*.toml` under this root are loaded into
    /// the Agent Registry alongside the built-ins (spec.md §4.3).
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let tools = self.tools.ok_or_else(|| Error::Config("RuntimeBuilder requires a tool registry".to_string()))?;
        let sessions = self.sessions.ok_or_else(|| Error::Config("RuntimeBuilder requires a session repository".to_string()))?;
        let messages = self.messages.ok_or_else(|| Error::Config("RuntimeBuilder requires a message repository".to_string()))?;
        let parts = self.parts.ok_or_else(|| Error::Config("RuntimeBuilder requires a message part repository".to_string()))?;
        let credential_repository = self
            .credential_repository
            .ok_or_else(|| Error::Config("RuntimeBuilder requires a credential repository".to_string()))?;

        let providers = Arc::new(ProviderRegistry::new());
        let mut credentials = CredentialResolver::new(credential_repository);
        for (vendor, endpoint) in &self.config.oauth_endpoints {
            credentials = credentials.with_oauth_endpoint(
                vendor.clone(),
                agentflow_providers::OAuthEndpoint {
                    token_url: endpoint.token_url.clone(),
                    client_id: endpoint.client_id.clone(),
                },
            );
        }
        let credentials = Arc::new(credentials);

        let mut agents = AgentRegistry::new();
        if let Some(project_root) = &self.project_root {
            agents.load_project_agents(project_root);
        }
        let agents = Arc::new(agents);

        let orchestrator = Arc::new(Orchestrator::new(
            providers,
            credentials,
            agents.clone(),
            tools,
            sessions.clone(),
            messages,
            parts.clone(),
        ));
        let subagents = Arc::new(SubAgentRunner::new(orchestrator.clone(), agents.clone(), sessions, parts));

        Ok(Runtime { config: self.config, agents, orchestrator, subagents })
    }
}

/// The public entry point: `Runtime::builder(config)...build()` then
/// `runtime.run(request)` for each turn.
pub struct Runtime {
    config: RuntimeConfig,
    agents: Arc<AgentRegistry>,
    orchestrator: Arc<Orchestrator>,
    subagents: Arc<SubAgentRunner>,
}

impl Runtime {
    pub fn builder(config: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// The in-flight background sub-agents spawned via the `task` tool
    /// (spec.md §4.6); exposed so a caller can list or cancel them from
    /// outside a turn.
    pub fn background(&self) -> &BackgroundRegistry {
        self.subagents.background()
    }

    /// Drives one turn to completion (spec.md §4.4). The `task` tool is
    /// always offered to this turn (subject to the usual agent/permission
    /// gating) since top-level calls are never themselves sub-agent turns —
    /// only the Sub-Agent Runner passes `None` when recursing.
    pub async fn run(&self, request: TurnRequest) -> Result<TurnResult> {
        let dispatcher: Arc<dyn TaskDispatcher> = self.subagents.clone();
        Ok(self.orchestrator.run(request, Some(dispatcher)).await?)
    }
}
