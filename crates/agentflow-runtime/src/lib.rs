//! Orchestrator, Sub-Agent Runner, and Agent Registry (spec.md §4.3, §4.4,
//! §4.6): the turn-driving core that sits on top of `agentflow-types`,
//! `agentflow-providers`, and `agentflow-engine`.

pub mod agent_registry;
pub mod error;
pub mod orchestrator;
pub mod subagent;
pub mod task_tool;

pub use agent_registry::AgentRegistry;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, DEFAULT_STEP_CEILING};
pub use subagent::{BackgroundRegistry, ParentContext, SubAgentResult, SubAgentRunner, TaskDispatcher, TaskModelOverride, TaskParams};
pub use task_tool::{task_tool_input_schema, TaskToolBinding, TASK_TOOL_NAME};
