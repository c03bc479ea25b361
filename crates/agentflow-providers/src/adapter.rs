//! The model adapter contract (spec.md §6 Model adapter interface).

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use agentflow_types::ModelEvent;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// One message in the dialogue handed to `stream_text`/`generate_text`,
/// already flattened from persisted parts (spec.md §4.4 step 6).
#[derive(Debug, Clone)]
pub struct DialogueMessage {
    pub role: &'static str,
    pub content: String,
}

/// The callable half of a tool binding, adapted from a
/// `agentflow_types::ToolBinding` into the shape the per-vendor agentic
/// loop driver can call without depending on the binding trait object's
/// async-trait machinery directly.
pub type ToolExecuteFn =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

/// A tool binding's shape as seen by the model adapter: name, JSON Schema
/// input shape, and the callable itself (spec.md §6 Tool binding
/// interface). `stream_text` calls `execute` directly when a vendor's
/// stop reason indicates a tool call, since the agentic loop (call, run
/// tools, call again) must complete inside one `stream_text` invocation —
/// the Stream Processor treats any `ModelEvent::Finish` as turn-terminal.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub execute: ToolExecuteFn,
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Inputs to one streaming call (spec.md §6).
pub struct StreamRequest {
    pub system: String,
    pub messages: Vec<DialogueMessage>,
    pub tools: Vec<ToolSpec>,
    pub stop_when_step_count: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub cancellation: CancellationToken,
}

pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent>> + Send>>;

/// Non-streaming counterpart; present for parity with the source SDK but
/// not used by the core turn driver (spec.md §6).
pub struct GenerateRequest {
    pub system: String,
    pub messages: Vec<DialogueMessage>,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A vendor-specific, credential-bound streaming model. Built by the
/// Provider Registry's `create_model_adapter` (spec.md §4.1).
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn vendor(&self) -> &str;
    fn model(&self) -> &str;

    async fn stream_text(&self, request: StreamRequest) -> Result<ModelEventStream>;

    async fn generate_text(&self, request: GenerateRequest) -> Result<GenerateResponse>;
}
