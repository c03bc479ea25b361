use serde::{Deserialize, Serialize};

/// Whether an agent definition may be addressed directly by a caller
/// (`Primary`), only spawned as a child via the Sub-Agent Runner
/// (`Subagent`), or either (`All`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    Primary,
    Subagent,
    All,
}

/// A named agent configuration: system prompt fragment, default
/// vendor/model, allowed tools, and the step ceiling the Orchestrator
/// enforces for it (spec.md §3 Agent Definition).
///
/// Resolved by the Agent Registry from either a built-in definition or a
/// project-scoped `.agentflow/agents/*.toml` file (§4.3); project-scoped
/// definitions take precedence over built-ins of the same name, except for
/// reserved (built-in) names, which cannot be overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub mode: AgentMode,
    pub description: Option<String>,
    pub hidden: bool,
    pub default_vendor: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub step_ceiling: Option<u32>,
    pub prompt_fragment: Option<String>,
    pub tools: Vec<String>,
    pub built_in: bool,
}

impl AgentDefinition {
    /// Intersects the agent's declared tool set with the tools a registry
    /// currently exposes, preserving the agent's declared order. An agent
    /// that declares no tools gets the full registry set (spec.md §4.3
    /// Tool resolution rule).
    pub fn resolve_tools(&self, registry_tools: &[String]) -> Vec<String> {
        if self.tools.is_empty() {
            return registry_tools.to_vec();
        }
        self.tools
            .iter()
            .filter(|tool| registry_tools.iter().any(|r| r == *tool))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AgentDefinition {
        AgentDefinition {
            name: "general".to_string(),
            mode: AgentMode::Primary,
            description: Some("primary coding agent".to_string()),
            hidden: false,
            default_vendor: Some("anthropic".to_string()),
            default_model: Some("claude-sonnet-4".to_string()),
            temperature: None,
            top_p: None,
            step_ceiling: Some(10),
            prompt_fragment: Some("You are a coding assistant.".to_string()),
            tools: vec!["read".to_string(), "write".to_string(), "bash".to_string()],
            built_in: true,
        }
    }

    #[test]
    fn resolve_tools_intersects_and_preserves_order() {
        let agent = sample();
        let registry = vec!["bash".to_string(), "read".to_string()];
        assert_eq!(agent.resolve_tools(&registry), vec!["read", "bash"]);
    }

    #[test]
    fn resolve_tools_excludes_unpermitted() {
        let agent = sample();
        let registry = vec!["read".to_string()];
        assert_eq!(agent.resolve_tools(&registry), vec!["read"]);
    }

    #[test]
    fn no_declared_tools_returns_full_registry() {
        let mut agent = sample();
        agent.tools = vec![];
        let registry = vec!["read".to_string(), "write".to_string()];
        assert_eq!(agent.resolve_tools(&registry), registry);
    }
}
