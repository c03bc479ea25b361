//! `RuntimeConfig` (spec.md §1 [AMBIENT] Configuration): timeouts, default
//! step ceilings, and per-vendor OAuth endpoints, loadable from a `toml`
//! file. Grounded on the teacher's `agtrace-runtime::config::Config`
//! (same `load`/`load_from`/`save`/`default_path` shape, `toml` + `serde`),
//! adapted from "which provider log directories are enabled" to "which
//! turn-level defaults and OAuth endpoints the Runtime should use".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-vendor OAuth token endpoint, mirrored into
/// `agentflow_providers::CredentialResolver::with_oauth_endpoint` at
/// `Runtime` construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthEndpointConfig {
    pub token_url: String,
    pub client_id: String,
}

/// Runtime-wide defaults the Orchestrator falls back to when a request,
/// agent, and session all leave a setting unspecified (spec.md §4.4 step
/// 3), plus the OAuth endpoint table the Credential Resolver needs for
/// `anthropic-oauth` (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_step_ceiling")]
    pub default_step_ceiling: u32,
    #[serde(default = "default_sub_agent_step_ceiling")]
    pub default_sub_agent_step_ceiling: u32,
    /// Hard wall-clock limit on one turn, enforced by the caller around
    /// `Runtime::run` (the Orchestrator itself has no internal timeout;
    /// it only reacts to `CancellationToken`).
    #[serde(default)]
    pub turn_timeout_secs: Option<u64>,
    #[serde(default)]
    pub oauth_endpoints: HashMap<String, OAuthEndpointConfig>,
}

fn default_step_ceiling() -> u32 {
    agentflow_runtime::DEFAULT_STEP_CEILING
}

fn default_sub_agent_step_ceiling() -> u32 {
    6
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_step_ceiling: default_step_ceiling(),
            default_sub_agent_step_ceiling: default_sub_agent_step_ceiling(),
            turn_timeout_secs: None,
            oauth_endpoints: HashMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(agentflow_core::resolve_state_dir(None)
            .map_err(|err| crate::error::Error::Config(err.to_string()))?
            .join("config.toml"))
    }

    pub fn with_oauth_endpoint(mut self, vendor: impl Into<String>, endpoint: OAuthEndpointConfig) -> Self {
        self.oauth_endpoints.insert(vendor.into(), endpoint);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_has_the_orchestrator_hard_default_step_ceiling() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_step_ceiling, agentflow_runtime::DEFAULT_STEP_CEILING);
        assert!(config.oauth_endpoints.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = RuntimeConfig::default().with_oauth_endpoint(
            "anthropic-oauth",
            OAuthEndpointConfig { token_url: "https://example.test/token".to_string(), client_id: "client-1".to_string() },
        );
        config.save_to(&path).unwrap();

        let loaded = RuntimeConfig::load_from(&path).unwrap();
        assert_eq!(loaded.default_step_ceiling, config.default_step_ceiling);
        assert!(loaded.oauth_endpoints.contains_key("anthropic-oauth"));
    }

    #[test]
    fn load_from_missing_path_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = RuntimeConfig::load_from(&path).unwrap();
        assert_eq!(config.default_step_ceiling, RuntimeConfig::default().default_step_ceiling);
    }
}
