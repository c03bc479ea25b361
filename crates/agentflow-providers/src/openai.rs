//! OpenAI-compatible chat-completions streaming adapter. Also used as the
//! base for `ollama` (same wire shape, local base URL, no API key).

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

pub struct OpenAiAdapter {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    vendor_id: &'static str,
}

impl OpenAiAdapter {
    pub fn new(http: reqwest::Client, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: Some(api_key.into()),
            vendor_id: "openai",
        }
    }

    /// `ollama` reuses the OpenAI wire format against a local server with
    /// no authentication (spec.md §4.1 self-hosted models).
    pub fn ollama(http: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            vendor_id: "ollama",
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn tool_spec_to_wire(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

/// Builds the wire request body for one step, appending any tool-use
/// rounds accumulated by the agentic loop driver. OpenAI represents a
/// step's tool calls as one `assistant` message with a `tool_calls` array,
/// followed by one `tool` message per call carrying its result.
fn build_openai_body(
    model: &str,
    base: &StreamRequest,
    history: &[WireTurn],
    stream: bool,
) -> Value {
    let mut messages: Vec<Value> = std::iter::once(json!({"role": "system", "content": base.system}))
        .chain(base.messages.iter().map(|m| json!({"role": m.role, "content": m.content})))
        .collect();
    append_wire_turns(&mut messages, history);
    json!({
        "model": model,
        "messages": messages,
        "tools": base.tools.iter().map(tool_spec_to_wire).collect::<Vec<_>>(),
        "temperature": base.temperature,
        "top_p": base.top_p,
        "stream": stream,
    })
}

fn append_wire_turns(messages: &mut Vec<Value>, history: &[WireTurn]) {
    let mut tool_calls = Vec::new();
    for turn in history {
        if let WireTurn::AssistantToolCall { call_id, tool_name, arguments } = turn {
            tool_calls.push(json!({
                "id": call_id,
                "type": "function",
                "function": {
                    "name": tool_name,
                    "arguments": arguments.to_string(),
                }
            }));
        }
    }
    if !tool_calls.is_empty() {
        messages.push(json!({"role": "assistant", "content": Value::Null, "tool_calls": tool_calls}));
    }
    for turn in history {
        if let WireTurn::ToolResult { call_id, output, .. } = turn {
            messages.push(json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": output.to_string(),
            }));
        }
    }
}

struct OpenAiStepCaller {
    http: reqwest::Client,
    chat_url: String,
    model: String,
    api_key: Option<String>,
    system: String,
    messages: Vec<DialogueMessage>,
    tools: Vec<ToolSpec>,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl StepCaller for OpenAiStepCaller {
    fn call_step(&self, history: &[WireTurn]) -> StepFuture<'_> {
        let history = history.to_vec();
        Box::pin(async move {
            let base = StreamRequest {
                system: self.system.clone(),
                messages: self.messages.clone(),
                tools: self.tools.clone(),
                stop_when_step_count: 0,
                temperature: self.temperature,
                top_p: self.top_p,
                cancellation: tokio_util::sync::CancellationToken::new(),
            };
            let body = build_openai_body(&self.model, &base, &history, true);
            let mut builder = self.http.post(&self.chat_url).json(&body);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }
            let response = builder.send().await?;
            if !response.status().is_success() {
                return Err(Error::ModelAdapter(format!(
                    "openai-compatible endpoint returned status {}",
                    response.status()
                )));
            }
            Ok(decode_sse(response))
        })
    }
}

/// Decodes one step's SSE byte stream into the normalised event alphabet.
fn decode_sse(response: reqwest::Response) -> ModelEventStream {
    let step = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let byte_stream = response.bytes_stream().map(|r| r.map_err(std::io::Error::other));
    let events = byte_stream.eventsource().filter_map(move |event| {
        let step = step.clone();
        async move {
            let event = match event {
                Ok(e) => e,
                Err(err) => return Some(Err(Error::ModelAdapter(format!("sse decode error: {err}")))),
            };
            if event.data == "[DONE]" {
                return Some(Ok(ModelEvent::StepFinish { step: step.load(std::sync::atomic::Ordering::SeqCst) }));
            }
            let payload: Value = match serde_json::from_str(&event.data) {
                Ok(v) => v,
                Err(err) => return Some(Err(Error::Json(err))),
            };
            map_openai_chunk(payload, &step).map(Ok)
        }
    });
    Box::pin(events.filter_map(|r: Result<Option<ModelEvent>>| async move {
        match r {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }))
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn vendor(&self) -> &str {
        self.vendor_id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_text(&self, request: StreamRequest) -> Result<ModelEventStream> {
        let caller = Arc::new(OpenAiStepCaller {
            http: self.http.clone(),
            chat_url: self.chat_url(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
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
        let mut builder = self.http.post(self.chat_url()).json(&json!({
            "model": self.model,
            "messages": std::iter::once(json!({"role": "system", "content": request.system}))
                .chain(request.messages.iter().map(|m| json!({"role": m.role, "content": m.content})))
                .collect::<Vec<_>>(),
            "stream": false,
        }));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let body: Value = response.json().await?;
        let text = body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let usage = body.get("usage");
        Ok(GenerateResponse {
            text,
            input_tokens: usage.and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: usage.and_then(|u| u.get("completion_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
        })
    }
}

fn map_openai_chunk(payload: Value, step: &std::sync::atomic::AtomicU32) -> Option<ModelEvent> {
    use std::sync::atomic::Ordering;

    let choice = payload.get("choices")?.as_array()?.first()?;
    let delta = choice.get("delta")?;

    if let Some(content) = delta.get("content").and_then(|v| v.as_str())
        && !content.is_empty()
    {
        return Some(ModelEvent::TextDelta {
            step: step.load(Ordering::SeqCst),
            delta: content.to_string(),
        });
    }

    if let Some(tool_calls) = delta.get("tool_calls").and_then(|v| v.as_array())
        && let Some(call) = tool_calls.first()
    {
        let call_id = call.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let function = call.get("function")?;
        if let Some(name) = function.get("name").and_then(|v| v.as_str()) {
            return Some(ModelEvent::ToolInputStart {
                step: step.load(Ordering::SeqCst),
                call_id,
                tool_name: name.to_string(),
            });
        }
        if let Some(args) = function.get("arguments").and_then(|v| v.as_str()) {
            return Some(ModelEvent::ToolInputDelta {
                step: step.load(Ordering::SeqCst),
                call_id,
                delta: args.to_string(),
            });
        }
    }

    if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
        let usage = payload.get("usage");
        return Some(ModelEvent::Finish {
            finish_reason: reason.to_string(),
            input_tokens: usage.and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: usage.and_then(|u| u.get("completion_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_chunk_maps_correctly() {
        let step = std::sync::atomic::AtomicU32::new(0);
        let payload = json!({"choices": [{"delta": {"content": "hi"}}]});
        let event = map_openai_chunk(payload, &step).unwrap();
        matches!(event, ModelEvent::TextDelta { .. });
    }

    #[test]
    fn finish_reason_chunk_maps_to_finish_event() {
        let step = std::sync::atomic::AtomicU32::new(0);
        let payload = json!({"choices": [{"delta": {}, "finish_reason": "stop"}], "usage": {"prompt_tokens": 3, "completion_tokens": 1}});
        let event = map_openai_chunk(payload, &step).unwrap();
        match event {
            ModelEvent::Finish { finish_reason, input_tokens, output_tokens } => {
                assert_eq!(finish_reason, "stop");
                assert_eq!(input_tokens, 3);
                assert_eq!(output_tokens, 1);
            }
            _ => panic!("expected finish"),
        }
    }
}
