//! The built-in `task` tool binding (spec.md §4.6, §6): the one tool whose
//! implementation lives inside this workspace rather than an external tool
//! registry, since it IS the Sub-Agent Runner's front door. Bound into a
//! turn's active tool set by the Orchestrator whenever a `TaskDispatcher`
//! was supplied and the resolved agent may use it.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::subagent::{ParentContext, TaskDispatcher, TaskParams};

pub const TASK_TOOL_NAME: &str = "task";

pub fn task_tool_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "subagentType": {
                "type": "string",
                "description": "Name of the agent definition to run as a sub-agent."
            },
            "description": {
                "type": "string",
                "description": "Short human-readable summary of what this sub-agent is doing."
            },
            "prompt": {
                "type": "string",
                "description": "The task to hand to the sub-agent."
            },
            "maxTurns": {
                "type": "integer",
                "description": "Overrides the sub-agent's step ceiling for this run."
            },
            "model": {
                "type": "object",
                "properties": {
                    "vendor": {"type": "string"},
                    "model": {"type": "string"}
                }
            },
            "runInBackground": {
                "type": "boolean",
                "description": "Detach the sub-agent instead of waiting for it to finish."
            },
            "resume": {
                "type": "string",
                "description": "Session id of a previously started background sub-agent to await instead of spawning a new one."
            }
        },
        "required": ["subagentType", "description", "prompt"]
    })
}

pub struct TaskToolBinding {
    parent: ParentContext,
    dispatcher: std::sync::Arc<dyn TaskDispatcher>,
}

impl TaskToolBinding {
    pub fn new(parent: ParentContext, dispatcher: std::sync::Arc<dyn TaskDispatcher>) -> Self {
        Self { parent, dispatcher }
    }
}

#[async_trait]
impl agentflow_types::ToolBinding for TaskToolBinding {
    fn name(&self) -> &str {
        TASK_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Launch a sub-agent to carry out a delegated task, optionally in the background."
    }

    fn input_schema(&self) -> Value {
        task_tool_input_schema()
    }

    async fn invoke(&self, input: Value) -> agentflow_types::Result<Value> {
        let params: TaskParams = serde_json::from_value(input).map_err(|err| {
            agentflow_types::CoreError::ToolInvocationError {
                tool: TASK_TOOL_NAME.to_string(),
                message: format!("invalid task parameters: {err}"),
            }
        })?;
        self.dispatcher.dispatch(self.parent.clone(), params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_core_fields() {
        let schema = task_tool_input_schema();
        let required = schema.get("required").unwrap().as_array().unwrap();
        assert!(required.iter().any(|v| v == "subagentType"));
        assert!(required.iter().any(|v| v == "description"));
        assert!(required.iter().any(|v| v == "prompt"));
    }
}
