//! Tool binding interface (spec.md §6): each binding carries a name, an
//! input schema, and an `invoke(input, toolContext) -> output` callable.
//! No production tool implementations live in this workspace (spec.md §1
//! Deliberately out of scope) — `agentflow-testing` supplies recording
//! fakes for tests, and `agentflow-runtime` consumes whatever `ToolRegistry`
//! a caller wires up.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ToolExecutionContext;
use crate::error::Result;

/// One callable tool binding passed to the model adapter, bound to a
/// specific turn's execution context (spec.md §4.4 step 8).
#[async_trait]
pub trait ToolBinding: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;

    /// Whether this tool requires the caller's code-execution permission
    /// flag to be set before it may be bound into a turn's active tool set
    /// (spec.md §4.4 step 7, e.g. shell, long-running services).
    fn requires_code_execution(&self) -> bool {
        false
    }

    async fn invoke(&self, input: Value) -> Result<Value>;
}

impl fmt::Debug for dyn ToolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBinding").field("name", &self.name()).finish()
    }
}

/// The external Tool Registry (spec.md §2, §6): turns a filtered list of
/// tool names plus an execution context into a set of callable tool
/// bindings. The core never constructs tool implementations itself —
/// it only ever asks a `ToolRegistry` to bind names it has already
/// resolved via the Agent Registry and permission gating.
pub trait ToolRegistry: Send + Sync {
    /// The full set of tool names this registry currently knows how to
    /// bind, used by the Agent Registry's tool-resolution rule (spec.md
    /// §4.3) to intersect against an agent's declared tools.
    fn known_tool_names(&self) -> Vec<String>;

    /// Binds the given names against one turn's execution context.
    /// Unknown names are silently skipped — the caller has already
    /// intersected against `known_tool_names`.
    fn bind(&self, names: &[String], ctx: ToolExecutionContext) -> Vec<Arc<dyn ToolBinding>>;
}
