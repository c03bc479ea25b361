//! Fake `ToolBinding`/`ToolRegistry` implementations for exercising the
//! tool-calling path in orchestrator and stream-processor tests without a
//! real Tool Registry (spec.md §6 Tool binding interface; spec.md §1
//! Deliberately out of scope — no production tool lives in this
//! workspace).

use std::sync::Arc;

use agentflow_types::{CoreError, Result, ToolBinding, ToolExecutionContext, ToolRegistry};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Echoes its `input` back as `{"echoed": input}`, unless `input.fail` is
/// `true`, in which case it returns a `ToolInvocationError`. Lets a test
/// drive both the success and failure branches of a tool call through the
/// Stream Processor.
#[derive(Debug, Clone)]
pub struct EchoToolBinding {
    name: String,
    requires_code_execution: bool,
}

impl EchoToolBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), requires_code_execution: false }
    }

    pub fn requiring_code_execution(name: impl Into<String>) -> Self {
        Self { name: name.into(), requires_code_execution: true }
    }
}

#[async_trait]
impl ToolBinding for EchoToolBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "echoes its input back, for tests"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "additionalProperties": true })
    }

    fn requires_code_execution(&self) -> bool {
        self.requires_code_execution
    }

    async fn invoke(&self, input: Value) -> Result<Value> {
        if input.get("fail").and_then(Value::as_bool).unwrap_or(false) {
            return Err(CoreError::ToolInvocationError {
                tool: self.name.clone(),
                message: "EchoToolBinding asked to fail".to_string(),
            });
        }
        Ok(json!({ "echoed": input }))
    }
}

/// A `ToolRegistry` over a fixed set of bindings supplied at construction,
/// ignoring `ToolExecutionContext` — tests that need a context-sensitive
/// fake should implement `ToolRegistry` directly instead.
#[derive(Clone)]
pub struct StubToolRegistry {
    names: Vec<String>,
    requires_code_execution: Vec<String>,
}

impl StubToolRegistry {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { names: names.into_iter().map(Into::into).collect(), requires_code_execution: Vec::new() }
    }

    /// Marks the given already-registered names as requiring the caller's
    /// code-execution permission.
    pub fn with_code_execution_required(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.requires_code_execution = names.into_iter().map(Into::into).collect();
        self
    }
}

impl ToolRegistry for StubToolRegistry {
    fn known_tool_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn bind(&self, names: &[String], _ctx: ToolExecutionContext) -> Vec<Arc<dyn ToolBinding>> {
        names
            .iter()
            .filter(|name| self.names.contains(name))
            .map(|name| {
                let binding = if self.requires_code_execution.contains(name) {
                    EchoToolBinding::requiring_code_execution(name.clone())
                } else {
                    EchoToolBinding::new(name.clone())
                };
                Arc::new(binding) as Arc<dyn ToolBinding>
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn sample_ctx() -> ToolExecutionContext {
        ToolExecutionContext {
            project_id: Uuid::new_v4(),
            project_root: PathBuf::from("/tmp/project"),
            session_id: Uuid::new_v4(),
            assistant_message_id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn echo_tool_echoes_input() {
        let tool = EchoToolBinding::new("read");
        let result = tool.invoke(json!({"path": "a.rs"})).await.unwrap();
        assert_eq!(result, json!({"echoed": {"path": "a.rs"}}));
    }

    #[tokio::test]
    async fn echo_tool_fails_on_request() {
        let tool = EchoToolBinding::new("read");
        let result = tool.invoke(json!({"fail": true})).await;
        assert!(matches!(result, Err(CoreError::ToolInvocationError { .. })));
    }

    #[test]
    fn stub_registry_binds_only_known_names() {
        let registry = StubToolRegistry::new(["read", "grep"]);
        let bound = registry.bind(&["read".to_string(), "unknown".to_string()], sample_ctx());
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].name(), "read");
    }

    #[test]
    fn stub_registry_marks_requested_tools_as_requiring_code_execution() {
        let registry = StubToolRegistry::new(["bash"]).with_code_execution_required(["bash"]);
        let bound = registry.bind(&["bash".to_string()], sample_ctx());
        assert!(bound[0].requires_code_execution());
    }
}
