//! The two event alphabets the orchestration core speaks (spec.md §4.5, §6).
//!
//! `ModelEvent` is what a streaming model adapter yields; the Stream
//! Processor consumes it and, in reaction, emits `BroadcastEvent`s to the
//! project's event bus. The two are related but not identical: broadcast
//! events additionally carry the persisted part id once one was created,
//! and streaming progress events (`tool-input-start`/`tool-input-delta`)
//! pass through without a part.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{MessageId, PartId, SessionId};

/// One incremental unit emitted by a streaming model adapter
/// (`agentflow_providers::ModelAdapter::stream_text`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ModelEvent {
    TextDelta { step: u32, delta: String },
    ReasoningDelta { step: u32, delta: String },
    ToolInputStart { step: u32, call_id: String, tool_name: String },
    ToolInputDelta { step: u32, call_id: String, delta: String },
    ToolCall { step: u32, call_id: String, tool_name: String, arguments: Value },
    ToolResult { step: u32, call_id: String, output: Value, is_error: bool },
    StepStart { step: u32 },
    StepFinish { step: u32 },
    Finish { finish_reason: String, input_tokens: u64, output_tokens: u64 },
    Error { error_type: String, message: String },
}

/// What the Stream Processor broadcasts on the project event bus
/// (spec.md §6 Event bus interface). Best-effort delivery: publish
/// failures never abort turn processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    MessageCreated { session_id: SessionId, message_id: MessageId },
    TextDelta { message_id: MessageId, part_id: PartId, delta: String },
    ReasoningDelta { message_id: MessageId, part_id: PartId, delta: String },
    ToolCallStart { message_id: MessageId, call_id: String, tool_name: String },
    ToolCall { message_id: MessageId, part_id: PartId, call_id: String, tool_name: String, arguments: Value },
    ToolResult { message_id: MessageId, part_id: PartId, call_id: String, output: Value, is_error: bool },
    StepStart { message_id: MessageId, part_id: PartId, step: u32 },
    StepFinish { message_id: MessageId, part_id: PartId, step: u32 },
    Finish { message_id: MessageId, finish_reason: String, input_tokens: u64, output_tokens: u64 },
    Error { message_id: MessageId, error_type: String, message: String },
}
