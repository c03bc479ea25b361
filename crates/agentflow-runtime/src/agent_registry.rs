//! The Agent Registry (spec.md §4.3): resolves an agent definition by
//! name from built-in or project-local sources and intersects its
//! declared tools against whatever a `ToolRegistry` currently exposes.

use std::collections::HashMap;
use std::path::Path;

use agentflow_types::{AgentDefinition, AgentMode};
use tracing::warn;

use crate::error::Result;

const BUILT_IN_GENERAL: &str = "general";
const BUILT_IN_EXPLORE: &str = "explore";

fn built_in_general() -> AgentDefinition {
    AgentDefinition {
        name: BUILT_IN_GENERAL.to_string(),
        mode: AgentMode::Primary,
        description: Some("Primary coding agent with full tool access.".to_string()),
        hidden: false,
        default_vendor: None,
        default_model: None,
        temperature: None,
        top_p: None,
        step_ceiling: Some(10),
        prompt_fragment: Some(
            "You are a careful, capable coding assistant. Use tools to inspect and modify \
             the project rather than guessing at its contents."
                .to_string(),
        ),
        tools: Vec::new(),
        built_in: true,
    }
}

fn built_in_explore() -> AgentDefinition {
    AgentDefinition {
        name: BUILT_IN_EXPLORE.to_string(),
        mode: AgentMode::Subagent,
        description: Some("Read-only exploration sub-agent.".to_string()),
        hidden: false,
        default_vendor: None,
        default_model: None,
        temperature: None,
        top_p: None,
        step_ceiling: Some(6),
        prompt_fragment: Some(
            "You investigate the project and report findings. You cannot modify files \
             or run commands."
                .to_string(),
        ),
        tools: vec!["read".to_string(), "grep".to_string(), "glob".to_string()],
        built_in: true,
    }
}

/// Resolves agent definitions by name (spec.md §3 Agent Definition, §4.3).
///
/// Lookup order is built-in first, then project-scoped. Built-in names are
/// reserved: a project-local file declaring one is logged and skipped, it
/// never shadows the built-in (spec.md §4.3 "Reserved names").
pub struct AgentRegistry {
    built_ins: HashMap<String, AgentDefinition>,
    project_defined: HashMap<String, AgentDefinition>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        let mut built_ins = HashMap::new();
        built_ins.insert(BUILT_IN_GENERAL.to_string(), built_in_general());
        built_ins.insert(BUILT_IN_EXPLORE.to_string(), built_in_explore());
        Self {
            built_ins,
            project_defined: HashMap::new(),
        }
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.built_ins.contains_key(name)
    }

    /// Loads every `*.toml` file in `<project_root>/.agentflow/agents/` as
    /// one `AgentDefinition` each (spec.md §4.3 [SUPPLEMENT]). A malformed
    /// file, or one reusing a reserved built-in name, is logged via
    /// `tracing::warn!` and skipped rather than failing construction.
    pub fn load_project_agents(&mut self, project_root: &Path) {
        let dir = agentflow_core::project_agents_dir(project_root);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match self.load_one(&path) {
                Ok(agent) => {
                    if self.is_reserved(&agent.name) {
                        warn!(path = %path.display(), name = %agent.name, "agent name is reserved, skipping project definition");
                        continue;
                    }
                    self.project_defined.insert(agent.name.clone(), agent);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to load agent definition, skipping");
                }
            }
        }
    }

    fn load_one(&self, path: &Path) -> Result<AgentDefinition> {
        let content = std::fs::read_to_string(path).map_err(|err| crate::error::Error::AgentDefinitionParse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| crate::error::Error::AgentDefinitionParse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
    }

    /// Resolves an agent by name: built-in table first, then project-scoped
    /// definitions (spec.md §4.3).
    pub fn resolve(&self, name: &str) -> Option<AgentDefinition> {
        self.built_ins
            .get(name)
            .or_else(|| self.project_defined.get(name))
            .cloned()
    }

    pub fn list(&self) -> Vec<AgentDefinition> {
        self.built_ins
            .values()
            .chain(self.project_defined.values())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_built_in_agents() {
        let registry = AgentRegistry::new();
        assert!(registry.resolve("general").is_some());
        assert!(registry.resolve("explore").is_some());
        assert!(registry.resolve("made-up").is_none());
    }

    #[test]
    fn explore_agent_never_declares_task_tool() {
        let registry = AgentRegistry::new();
        let explore = registry.resolve("explore").unwrap();
        assert!(!explore.tools.iter().any(|t| t == "task"));
    }

    #[test]
    fn resolving_same_name_twice_is_semantically_equal() {
        let registry = AgentRegistry::new();
        let a = registry.resolve("general").unwrap();
        let b = registry.resolve("general").unwrap();
        assert_eq!(a.name, b.name);
        assert_eq!(a.step_ceiling, b.step_ceiling);
        assert_eq!(a.tools, b.tools);
    }

    #[test]
    fn project_definition_loads_from_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let agents_dir = tmp.path().join(".agentflow").join("agents");
        std::fs::create_dir_all(&agents_dir).unwrap();
        let mut file = std::fs::File::create(agents_dir.join("reviewer.toml")).unwrap();
        write!(
            file,
            r#"
            name = "reviewer"
            mode = "subagent"
            hidden = false
            tools = ["read", "grep"]
            built_in = false
            "#
        )
        .unwrap();

        let mut registry = AgentRegistry::new();
        registry.load_project_agents(tmp.path());
        let reviewer = registry.resolve("reviewer").expect("reviewer agent to load");
        assert_eq!(reviewer.mode, AgentMode::Subagent);
        assert_eq!(reviewer.tools, vec!["read".to_string(), "grep".to_string()]);
    }

    #[test]
    fn project_definition_cannot_override_reserved_name() {
        let tmp = tempfile::tempdir().unwrap();
        let agents_dir = tmp.path().join(".agentflow").join("agents");
        std::fs::create_dir_all(&agents_dir).unwrap();
        let mut file = std::fs::File::create(agents_dir.join("general.toml")).unwrap();
        write!(
            file,
            r#"
            name = "general"
            mode = "primary"
            hidden = false
            tools = []
            built_in = false
            "#
        )
        .unwrap();

        let mut registry = AgentRegistry::new();
        registry.load_project_agents(tmp.path());
        let general = registry.resolve("general").unwrap();
        assert!(general.built_in);
    }

    #[test]
    fn malformed_project_definition_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let agents_dir = tmp.path().join(".agentflow").join("agents");
        std::fs::create_dir_all(&agents_dir).unwrap();
        std::fs::write(agents_dir.join("broken.toml"), "not = [valid toml").unwrap();

        let mut registry = AgentRegistry::new();
        registry.load_project_agents(tmp.path());
        assert!(registry.resolve("broken").is_none());
    }

    #[test]
    fn missing_agents_dir_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = AgentRegistry::new();
        registry.load_project_agents(tmp.path());
        assert_eq!(registry.list().len(), 2);
    }
}
