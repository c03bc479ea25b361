//! The multi-step agentic loop shared by every streaming adapter: call the
//! model, and whenever it stops to use a tool, run the tool and call the
//! model again with the result appended to history — until it stops for a
//! reason other than tool use or the step ceiling is reached.
//!
//! This lives below the vendor adapters rather than above them because the
//! Stream Processor (agentflow-engine) treats any `ModelEvent::Finish` as
//! the end of the message (spec.md §4.5). A vendor's "stopped to call a
//! tool" pause is therefore never allowed to surface as a top-level
//! `Finish` — the loop swallows it, runs the tool, and keeps going inside
//! one `stream_text` call. Only the terminal step's `Finish` reaches the
//! caller. Grounded on `other_examples` cortex-engine's `Orchestrator::
//! process_turn` call/execute-tools/loop shape, adapted down to the single
//! streamed event alphabet adapters in this crate produce.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use agentflow_types::{FinishReason, ModelEvent};
use futures::stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::adapter::{ModelEventStream, ToolSpec};
use crate::error::Result;

/// One prior tool-use round, expressed independently of any vendor's wire
/// format. Each adapter's `StepCaller` turns a slice of these into its own
/// request body shape when building the next call.
#[derive(Debug, Clone)]
pub enum WireTurn {
    AssistantToolCall { call_id: String, tool_name: String, arguments: serde_json::Value },
    ToolResult { call_id: String, tool_name: String, output: serde_json::Value, is_error: bool },
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelEventStream>> + Send + 'a>>;

/// Performs one model call given the tool-use history accumulated so far
/// and returns the raw per-step event stream, terminated by exactly one
/// `ModelEvent::Finish` carrying that step's stop reason.
pub trait StepCaller: Send + Sync {
    fn call_step(&self, extra_history: &[WireTurn]) -> StepFuture<'_>;
}

/// Drives `caller` through as many steps as the model requests tool calls,
/// up to `max_steps`, executing `tools` in between and emitting a single
/// flattened event stream with exactly one terminal `Finish`.
pub fn run_agentic_loop(
    caller: Arc<dyn StepCaller>,
    tools: Vec<ToolSpec>,
    max_steps: u32,
    cancellation: CancellationToken,
) -> ModelEventStream {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        let tool_table: HashMap<String, ToolSpec> =
            tools.into_iter().map(|t| (t.name.clone(), t)).collect();
        let mut history: Vec<WireTurn> = Vec::new();
        let mut steps_taken: u32 = 0;

        loop {
            if cancellation.is_cancelled() {
                let _ = tx.send(Ok(ModelEvent::Error {
                    error_type: "cancelled".to_string(),
                    message: "turn cancelled".to_string(),
                }));
                return;
            }

            let mut step_events = match caller.call_step(&history).await {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return;
                }
            };

            let mut pending: HashMap<String, (String, String)> = HashMap::new();
            let mut terminal: Option<(String, u64, u64)> = None;

            while let Some(event) = step_events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        let _ = tx.send(Err(err));
                        return;
                    }
                };
                match event {
                    ModelEvent::ToolInputStart { ref call_id, ref tool_name, .. } => {
                        pending.insert(call_id.clone(), (tool_name.clone(), String::new()));
                        let _ = tx.send(Ok(event));
                    }
                    ModelEvent::ToolInputDelta { ref call_id, ref delta, .. } => {
                        if let Some((_, buf)) = pending.get_mut(call_id) {
                            buf.push_str(delta);
                        }
                        let _ = tx.send(Ok(event));
                    }
                    ModelEvent::Finish { finish_reason, input_tokens, output_tokens } => {
                        terminal = Some((finish_reason, input_tokens, output_tokens));
                        break;
                    }
                    other => {
                        let _ = tx.send(Ok(other));
                    }
                }
            }

            let Some((finish_reason, input_tokens, output_tokens)) = terminal else {
                // Upstream closed without a terminal marker; treat as done.
                return;
            };

            let calling_tools = FinishReason::normalize(&finish_reason) == FinishReason::ToolCalls;
            if !calling_tools || pending.is_empty() || steps_taken + 1 >= max_steps {
                let finish_reason = if calling_tools && steps_taken + 1 >= max_steps {
                    "length".to_string()
                } else {
                    finish_reason
                };
                let _ = tx.send(Ok(ModelEvent::Finish { finish_reason, input_tokens, output_tokens }));
                return;
            }

            steps_taken += 1;
            let step = steps_taken;
            // Anthropic (and most vendors) require one assistant message
            // carrying every tool_use block for a step, followed by one
            // message carrying every matching tool_result — so the calls
            // and their results are appended as two batches, not
            // interleaved per call.
            let mut calls = Vec::with_capacity(pending.len());
            let mut results = Vec::with_capacity(pending.len());
            for (call_id, (tool_name, raw_arguments)) in pending {
                let arguments: serde_json::Value =
                    serde_json::from_str(&raw_arguments).unwrap_or(serde_json::Value::Null);
                let _ = tx.send(Ok(ModelEvent::ToolCall {
                    step,
                    call_id: call_id.clone(),
                    tool_name: tool_name.clone(),
                    arguments: arguments.clone(),
                }));

                let (output, is_error) = match tool_table.get(&tool_name) {
                    Some(tool) => match (tool.execute)(arguments.clone()).await {
                        Ok(value) => (value, false),
                        Err(err) => (serde_json::json!({ "error": err.to_string() }), true),
                    },
                    None => (
                        serde_json::json!({ "error": format!("unknown tool: {tool_name}") }),
                        true,
                    ),
                };

                let _ = tx.send(Ok(ModelEvent::ToolResult {
                    step,
                    call_id: call_id.clone(),
                    output: output.clone(),
                    is_error,
                }));

                calls.push(WireTurn::AssistantToolCall { call_id: call_id.clone(), tool_name: tool_name.clone(), arguments });
                results.push(WireTurn::ToolResult { call_id, tool_name, output, is_error });
            }
            history.extend(calls);
            history.extend(results);
        }
    });

    Box::pin(UnboundedReceiverStream::new(rx).map(|item: Result<ModelEvent>| item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Mutex;

    /// A `StepCaller` that plays back one canned event list per call,
    /// ignoring the accumulated history.
    struct ScriptedCaller {
        steps: Mutex<std::vec::IntoIter<Vec<ModelEvent>>>,
    }

    impl StepCaller for ScriptedCaller {
        fn call_step(&self, _history: &[WireTurn]) -> StepFuture<'_> {
            let events = self.steps.lock().unwrap().next().unwrap_or_default();
            Box::pin(async move {
                let items: Vec<Result<ModelEvent>> = events.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)) as ModelEventStream)
            })
        }
    }

    #[tokio::test]
    async fn loop_runs_tool_then_forwards_final_finish() {
        let first_step = vec![
            ModelEvent::ToolInputStart { step: 0, call_id: "c1".to_string(), tool_name: "echo".to_string() },
            ModelEvent::ToolInputDelta { step: 0, call_id: "c1".to_string(), delta: "{\"x\":1}".to_string() },
            ModelEvent::Finish { finish_reason: "tool_use".to_string(), input_tokens: 1, output_tokens: 1 },
        ];
        let second_step = vec![
            ModelEvent::TextDelta { step: 0, delta: "done".to_string() },
            ModelEvent::Finish { finish_reason: "end_turn".to_string(), input_tokens: 2, output_tokens: 2 },
        ];
        let caller = Arc::new(ScriptedCaller {
            steps: Mutex::new(vec![first_step, second_step].into_iter()),
        });
        let tool = ToolSpec {
            name: "echo".to_string(),
            description: String::new(),
            input_schema: serde_json::json!({}),
            execute: Arc::new(|input| Box::pin(async move { Ok(input) })),
        };

        let mut stream = run_agentic_loop(caller, vec![tool], 10, CancellationToken::new());
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }

        assert!(events.iter().any(|e| matches!(e, ModelEvent::ToolCall { tool_name, .. } if tool_name == "echo")));
        assert!(events.iter().any(|e| matches!(e, ModelEvent::ToolResult { is_error: false, .. })));
        match events.last().unwrap() {
            ModelEvent::Finish { finish_reason, .. } => assert_eq!(finish_reason, "end_turn"),
            other => panic!("expected final finish, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn loop_stops_at_step_ceiling_with_length_finish() {
        let always_tool_use = || {
            vec![
                ModelEvent::ToolInputStart { step: 0, call_id: "c1".to_string(), tool_name: "echo".to_string() },
                ModelEvent::Finish { finish_reason: "tool_use".to_string(), input_tokens: 1, output_tokens: 1 },
            ]
        };
        let caller = Arc::new(ScriptedCaller {
            steps: Mutex::new(vec![always_tool_use(), always_tool_use()].into_iter()),
        });
        let tool = ToolSpec {
            name: "echo".to_string(),
            description: String::new(),
            input_schema: serde_json::json!({}),
            execute: Arc::new(|input| Box::pin(async move { Ok(input) })),
        };

        let mut stream = run_agentic_loop(caller, vec![tool], 1, CancellationToken::new());
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }

        match events.last().unwrap() {
            ModelEvent::Finish { finish_reason, .. } => assert_eq!(finish_reason, "length"),
            other => panic!("expected length finish, got {other:?}"),
        }
        assert!(!events.iter().any(|e| matches!(e, ModelEvent::ToolCall { .. })));
    }
}
