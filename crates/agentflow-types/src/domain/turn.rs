use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::message::MessageId;
use super::project::{ProjectId, UserId};
use super::session::SessionId;
use super::vendor::FinishReason;

/// Inputs to one call to the Orchestrator's `run` (spec.md §4.4).
#[derive(Clone)]
pub struct TurnRequest {
    pub project_id: ProjectId,
    pub project_root: PathBuf,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub can_execute_code: bool,
    pub utterance: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub credential: String,
    pub agent_name: Option<String>,
    pub prompt_override: Option<String>,
    pub step_ceiling_override: Option<u32>,
    pub temperature_override: Option<f32>,
    pub tool_allow_list: Option<Vec<String>>,
    pub cancellation: CancellationToken,
    pub observer: Arc<dyn Fn(crate::event::BroadcastEvent) + Send + Sync>,
}

/// Result returned by a completed turn (spec.md §3, §4.4).
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub assistant_message_id: MessageId,
    pub finish_reason: FinishReason,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// Context handed to every tool binding's `invoke` (spec.md §4.4 step 8,
/// §6 Tool binding interface).
#[derive(Clone)]
pub struct ToolExecutionContext {
    pub project_id: ProjectId,
    pub project_root: PathBuf,
    pub session_id: SessionId,
    pub assistant_message_id: MessageId,
    pub user_id: UserId,
    pub cancellation: CancellationToken,
}
