//! Anthropic Messages API streaming adapter.

use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use serde_json::{json, Value};

use agentflow_types::ModelEvent;

use crate::adapter::{
    DialogueMessage, GenerateRequest, GenerateResponse, ModelAdapter, ModelEventStream,
    StreamRequest, ToolSpec,
};
use crate::agentic::{run_agentic_loop, StepCaller, StepFuture, WireTurn};
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The plain API-key adapter. `AnthropicOAuthAdapter` (§anthropic_oauth)
/// wraps this with bearer-token refresh instead of an `x-api-key` header.
pub struct AnthropicAdapter {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl AnthropicAdapter {
    pub fn new(http: reqwest::Client, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Builds the wire request body shared by the keyed and OAuth adapters,
/// appending any tool-use rounds accumulated by the agentic loop driver
/// after the turn's original messages.
pub(crate) fn build_anthropic_body(model: &str, request: &StreamRequest, history: &[WireTurn]) -> Value {
    let mut messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    append_wire_turns(&mut messages, history);
    json!({
        "model": model,
        "system": request.system,
        "messages": messages,
        "tools": request.tools.iter().map(tool_spec_to_wire).collect::<Vec<_>>(),
        "max_tokens": 8192,
        "temperature": request.temperature,
        "top_p": request.top_p,
        "stream": true,
    })
}

/// Anthropic groups one step's tool calls into a single assistant message
/// of `tool_use` blocks, followed by a single user message of matching
/// `tool_result` blocks.
fn append_wire_turns(messages: &mut Vec<Value>, history: &[WireTurn]) {
    let mut tool_use_blocks = Vec::new();
    let mut tool_result_blocks = Vec::new();
    for turn in history {
        match turn {
            WireTurn::AssistantToolCall { call_id, tool_name, arguments } => {
                tool_use_blocks.push(json!({
                    "type": "tool_use",
                    "id": call_id,
                    "name": tool_name,
                    "input": arguments,
                }));
            }
            WireTurn::ToolResult { call_id, output, is_error, .. } => {
                tool_result_blocks.push(json!({
                    "type": "tool_result",
                    "tool_use_id": call_id,
                    "content": output.to_string(),
                    "is_error": is_error,
                }));
            }
        }
    }
    if !tool_use_blocks.is_empty() {
        messages.push(json!({"role": "assistant", "content": tool_use_blocks}));
    }
    if !tool_result_blocks.is_empty() {
        messages.push(json!({"role": "user", "content": tool_result_blocks}));
    }
}

fn tool_spec_to_wire(tool: &ToolSpec) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

/// One streamed call against the Anthropic Messages API, reused by both
/// the `stream_text` loop and `AnthropicOAuthAdapter`.
pub(crate) struct AnthropicStepCaller {
    pub http: reqwest::Client,
    pub base_url: String,
    pub model: String,
    pub auth_header: (&'static str, String),
    pub system: String,
    pub messages: Vec<DialogueMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl StepCaller for AnthropicStepCaller {
    fn call_step(&self, history: &[WireTurn]) -> StepFuture<'_> {
        let history = history.to_vec();
        Box::pin(async move {
            let request = StreamRequest {
                system: self.system.clone(),
                messages: self.messages.clone(),
                tools: self.tools.clone(),
                stop_when_step_count: 0,
                temperature: self.temperature,
                top_p: self.top_p,
                cancellation: tokio_util::sync::CancellationToken::new(),
            };
            let body = build_anthropic_body(&self.model, &request, &history);
            let response = self
                .http
                .post(format!("{}/messages", self.base_url))
                .header(self.auth_header.0, self.auth_header.1.clone())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Error::ModelAdapter(format!(
                    "anthropic returned status {}",
                    response.status()
                )));
            }
            Ok(sse_to_model_events(response))
        })
    }
}

/// Turns a raw Anthropic SSE stream into the normalised `ModelEvent`
/// alphabet (spec.md §4.5). Step boundaries are driven by Anthropic's
/// `content_block_start`/`content_block_stop` pairs within one message.
pub(crate) fn sse_to_model_events(
    response: reqwest::Response,
) -> ModelEventStream {
    let step = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let pending_tool_name: std::sync::Arc<std::sync::Mutex<Option<(String, String)>>> =
        std::sync::Arc::new(std::sync::Mutex::new(None));

    let byte_stream = response.bytes_stream().map(|r| r.map_err(std::io::Error::other));
    let events = byte_stream.eventsource().filter_map(move |event| {
        let step = step.clone();
        let pending_tool_name = pending_tool_name.clone();
        async move {
            let event = match event {
                Ok(e) => e,
                Err(err) => {
                    return Some(Err(Error::ModelAdapter(format!("sse decode error: {err}"))));
                }
            };
            if event.data == "[DONE]" {
                return None;
            }
            let payload: Value = match serde_json::from_str(&event.data) {
                Ok(v) => v,
                Err(err) => return Some(Err(Error::Json(err))),
            };
            Some(Ok(map_anthropic_event(payload, &step, &pending_tool_name)))
        }
    });

    Box::pin(events.filter_map(|r| async move {
        match r {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }))
}

fn map_anthropic_event(
    payload: Value,
    step: &std::sync::atomic::AtomicU32,
    pending_tool_name: &std::sync::Mutex<Option<(String, String)>>,
) -> Option<ModelEvent> {
    use std::sync::atomic::Ordering;

    let event_type = payload.get("type")?.as_str()?;
    match event_type {
        "message_start" => {
            step.store(0, Ordering::SeqCst);
            Some(ModelEvent::StepStart { step: 0 })
        }
        "content_block_start" => {
            let block = payload.get("content_block")?;
            if block.get("type")?.as_str()? == "tool_use" {
                let call_id = block.get("id")?.as_str()?.to_string();
                let tool_name = block.get("name")?.as_str()?.to_string();
                *pending_tool_name.lock().unwrap() = Some((call_id.clone(), tool_name.clone()));
                return Some(ModelEvent::ToolInputStart {
                    step: step.load(Ordering::SeqCst),
                    call_id,
                    tool_name,
                });
            }
            None
        }
        "content_block_delta" => {
            let delta = payload.get("delta")?;
            match delta.get("type")?.as_str()? {
                "text_delta" => Some(ModelEvent::TextDelta {
                    step: step.load(Ordering::SeqCst),
                    delta: delta.get("text")?.as_str()?.to_string(),
                }),
                "thinking_delta" => Some(ModelEvent::ReasoningDelta {
                    step: step.load(Ordering::SeqCst),
                    delta: delta.get("thinking")?.as_str()?.to_string(),
                }),
                "input_json_delta" => {
                    let (call_id, _tool_name) = pending_tool_name.lock().unwrap().clone()?;
                    Some(ModelEvent::ToolInputDelta {
                        step: step.load(Ordering::SeqCst),
                        call_id,
                        delta: delta.get("partial_json")?.as_str().unwrap_or_default().to_string(),
                    })
                }
                _ => None,
            }
        }
        "content_block_stop" => None,
        "message_delta" => {
            let stop_reason = payload
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(|v| v.as_str());
            let usage = payload.get("usage");
            let output_tokens = usage.and_then(|u| u.get("output_tokens")).and_then(|v| v.as_u64()).unwrap_or(0);
            let input_tokens = usage.and_then(|u| u.get("input_tokens")).and_then(|v| v.as_u64()).unwrap_or(0);
            stop_reason.map(|reason| ModelEvent::Finish {
                finish_reason: reason.to_string(),
                input_tokens,
                output_tokens,
            })
        }
        "message_stop" => Some(ModelEvent::StepFinish {
            step: step.load(Ordering::SeqCst),
        }),
        "error" => {
            let err = payload.get("error")?;
            Some(ModelEvent::Error {
                error_type: err.get("type")?.as_str().unwrap_or("unknown").to_string(),
                message: err.get("message")?.as_str().unwrap_or_default().to_string(),
            })
        }
        _ => None,
    }
}

#[async_trait]
impl ModelAdapter for AnthropicAdapter {
    fn vendor(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_text(&self, request: StreamRequest) -> Result<ModelEventStream> {
        let caller = Arc::new(AnthropicStepCaller {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            auth_header: ("x-api-key", self.api_key.clone()),
            system: request.system,
            messages: request.messages,
            tools: request.tools.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
        });
        let max_steps = request.stop_when_step_count.max(1);
        Ok(run_agentic_loop(caller, request.tools, max_steps, request.cancellation))
    }

    async fn generate_text(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let messages: Vec<DialogueMessage> = request.messages;
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model,
                "system": request.system,
                "messages": messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
                "max_tokens": 8192,
                "stream": false,
            }))
            .send()
            .await?;
        let body: Value = response.json().await?;
        let text = body
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| blocks.first())
            .and_then(|block| block.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let usage = body.get("usage");
        Ok(GenerateResponse {
            text,
            input_tokens: usage.and_then(|u| u.get("input_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: usage.and_then(|u| u.get("output_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
        })
    }
}
