//! The Stream Processor (spec.md §4.5): the single-writer consumer of a
//! model adapter's event stream. Materialises ordered message parts,
//! accumulates text/reasoning deltas, pairs tool calls with results,
//! finalises message and session statistics, and broadcasts typed events.
//!
//! One instance is bound to exactly one assistant message for the lifetime
//! of one turn; it holds no state shared across turns, grounded directly on
//! the teacher's `agtrace-providers::v2::builder::EventBuilder` (parent-id
//! chaining + `tool_map: HashMap<String, Uuid>`), generalized here from
//! "build one flat event log" to "maintain per-message running state across
//! an event stream."

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use agentflow_types::{
    BroadcastEvent, FilePart, FinishReason, MessageCompletionInput, MessageErrorInfo, MessageId,
    MessagePart, MessagePartRepository, MessageRepository, ModelEvent, PartContent, PartId,
    PartStatus, ReasoningPart, SessionId, SessionRepository, SessionStatsDelta, StepMarker,
    TextPart, ToolCallPart, ToolResultPart,
};
use agentflow_providers::ProviderRegistry;
use tracing::warn;

use crate::error::Result;

/// What happened as a result of feeding one `ModelEvent` to the processor.
/// The Orchestrator's turn loop matches on this to decide whether to keep
/// pulling from the adapter stream or stop.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The turn is still in progress; keep consuming the stream.
    Continue,
    /// A natural `finish` was observed; the assistant message is complete.
    Finished {
        finish_reason: FinishReason,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
    },
    /// An `error` event was observed; the assistant message is marked
    /// failed and no further events will be accepted.
    Errored { error_type: String, message: String },
}

/// Per-turn running state for one assistant message (spec.md §4.5).
pub struct StreamProcessor {
    message_id: MessageId,
    session_id: SessionId,
    vendor: String,
    model: String,
    parts: Arc<dyn MessagePartRepository>,
    messages: Arc<dyn MessageRepository>,
    sessions: Arc<dyn SessionRepository>,
    providers: Arc<ProviderRegistry>,
    observer: Arc<dyn Fn(BroadcastEvent) + Send + Sync>,

    order: u32,
    step: u32,
    open_text: Option<(PartId, String)>,
    open_reasoning: Option<(PartId, String)>,
    /// call_id -> part id of its `tool-call` part, kept for the lifetime of
    /// the turn so a late `tool-result` can still be paired.
    tool_call_parts: HashMap<String, PartId>,
    /// call_ids whose `tool-call` part is still `running` (i.e. no matching
    /// `tool-result` has arrived yet). Drained on `error` to flip every
    /// still-open tool part to `error` (spec.md §4.5, §8).
    open_tool_calls: HashSet<String>,
    finished: bool,
}

impl StreamProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message_id: MessageId,
        session_id: SessionId,
        vendor: impl Into<String>,
        model: impl Into<String>,
        parts: Arc<dyn MessagePartRepository>,
        messages: Arc<dyn MessageRepository>,
        sessions: Arc<dyn SessionRepository>,
        providers: Arc<ProviderRegistry>,
        observer: Arc<dyn Fn(BroadcastEvent) + Send + Sync>,
    ) -> Self {
        Self {
            message_id,
            session_id,
            vendor: vendor.into(),
            model: model.into(),
            parts,
            messages,
            sessions,
            providers,
            observer,
            order: 0,
            step: 0,
            open_text: None,
            open_reasoning: None,
            tool_call_parts: HashMap::new(),
            open_tool_calls: HashSet::new(),
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn next_order(&mut self) -> u32 {
        let order = self.order;
        self.order += 1;
        order
    }

    fn notify(&self, event: BroadcastEvent) {
        (self.observer)(event);
    }

    /// Feeds one event from the adapter's stream into the state machine.
    /// Returns `Ok(ProcessOutcome::Continue)` for events that don't end the
    /// turn. Idempotent after a terminal event: further calls are a no-op,
    /// satisfying "no part is created after finish or error" (spec.md §4.5
    /// invariants, §8).
    pub async fn process(&mut self, event: ModelEvent) -> Result<ProcessOutcome> {
        if self.finished {
            return Ok(ProcessOutcome::Continue);
        }

        match event {
            ModelEvent::TextDelta { delta, .. } => {
                self.close_reasoning().await?;
                self.append_text(delta).await?;
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::ReasoningDelta { delta, .. } => {
                self.close_text().await?;
                self.append_reasoning(delta).await?;
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::ToolInputStart {
                call_id, tool_name, ..
            } => {
                self.close_text().await?;
                self.close_reasoning().await?;
                self.notify(BroadcastEvent::ToolCallStart {
                    message_id: self.message_id,
                    call_id,
                    tool_name,
                });
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::ToolInputDelta { .. } => {
                // Progress indicator only; no part, no broadcast event in
                // the fixed alphabet (spec.md §4.5, §6).
                self.close_text().await?;
                self.close_reasoning().await?;
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::ToolCall {
                call_id,
                tool_name,
                arguments,
                ..
            } => {
                self.close_text().await?;
                self.close_reasoning().await?;
                let order = self.next_order();
                let part = MessagePart::new(
                    self.message_id,
                    order,
                    PartContent::ToolCall(ToolCallPart {
                        call_id: call_id.clone(),
                        tool_name: tool_name.clone(),
                        arguments: arguments.clone(),
                    }),
                );
                let part_id = part.id;
                self.parts.create(part).await?;
                self.tool_call_parts.insert(call_id.clone(), part_id);
                self.open_tool_calls.insert(call_id.clone());
                self.notify(BroadcastEvent::ToolCall {
                    message_id: self.message_id,
                    part_id,
                    call_id,
                    tool_name,
                    arguments,
                });
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::ToolResult {
                call_id,
                output,
                is_error,
                ..
            } => {
                self.close_text().await?;
                self.close_reasoning().await?;
                let order = self.next_order();
                let mut part = MessagePart::new(
                    self.message_id,
                    order,
                    PartContent::ToolResult(ToolResultPart {
                        call_id: call_id.clone(),
                        output: output.clone(),
                        is_error,
                    }),
                );
                part.status = PartStatus::Completed;
                let part_id = part.id;
                self.parts.create(part).await?;

                // Pairing is a best-effort lookup: a result without a
                // preceding call is still persisted (spec.md §8 boundary
                // behaviours), the transition is simply a no-op.
                if let Some(call_part_id) = self.tool_call_parts.get(&call_id).copied() {
                    let status = if is_error {
                        PartStatus::Error
                    } else {
                        PartStatus::Completed
                    };
                    self.parts
                        .update_tool_status(call_part_id, status)
                        .await
                        ?;
                    self.open_tool_calls.remove(&call_id);
                } else {
                    warn!(call_id = %call_id, "tool result with no matching tool call part");
                }

                self.notify(BroadcastEvent::ToolResult {
                    message_id: self.message_id,
                    part_id,
                    call_id,
                    output,
                    is_error,
                });
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::StepStart { .. } => {
                self.close_text().await?;
                self.close_reasoning().await?;
                self.step += 1;
                let order = self.next_order();
                let part = MessagePart::new(
                    self.message_id,
                    order,
                    PartContent::StepStart(StepMarker {
                        step_index: self.step,
                    }),
                );
                let part_id = part.id;
                self.parts.create(part).await?;
                self.notify(BroadcastEvent::StepStart {
                    message_id: self.message_id,
                    part_id,
                    step: self.step,
                });
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::StepFinish { .. } => {
                self.close_text().await?;
                self.close_reasoning().await?;
                let order = self.next_order();
                let part = MessagePart::new(
                    self.message_id,
                    order,
                    PartContent::StepFinish(StepMarker {
                        step_index: self.step,
                    }),
                );
                let part_id = part.id;
                self.parts.create(part).await?;
                self.notify(BroadcastEvent::StepFinish {
                    message_id: self.message_id,
                    part_id,
                    step: self.step,
                });
                Ok(ProcessOutcome::Continue)
            }
            ModelEvent::Finish {
                finish_reason,
                input_tokens,
                output_tokens,
            } => {
                self.close_text().await?;
                self.close_reasoning().await?;

                let normalized = FinishReason::normalize(&finish_reason);
                let cost = self
                    .providers
                    .compute_cost(&self.vendor, &self.model, input_tokens, output_tokens);

                self.messages
                    .complete(
                        self.message_id,
                        MessageCompletionInput {
                            finish_reason: finish_reason_wire(normalized).to_string(),
                            cost,
                            tokens_input: input_tokens,
                            tokens_output: output_tokens,
                        },
                    )
                    .await
                    ?;

                // Authorized to mutate session aggregates only here
                // (spec.md §9 Open Questions resolution) — two messages
                // (user + assistant) were created for this turn.
                self.sessions
                    .update_stats(
                        self.session_id,
                        SessionStatsDelta {
                            message_count: Some(2),
                            cost: Some(cost),
                            tokens_input: Some(input_tokens),
                            tokens_output: Some(output_tokens),
                        },
                    )
                    .await
                    ?;

                self.finished = true;
                self.notify(BroadcastEvent::Finish {
                    message_id: self.message_id,
                    finish_reason: finish_reason_wire(normalized).to_string(),
                    input_tokens,
                    output_tokens,
                });

                Ok(ProcessOutcome::Finished {
                    finish_reason: normalized,
                    input_tokens,
                    output_tokens,
                    cost,
                })
            }
            ModelEvent::Error {
                error_type,
                message,
            } => {
                for call_id in std::mem::take(&mut self.open_tool_calls) {
                    if let Some(part_id) = self.tool_call_parts.get(&call_id).copied() {
                        self.parts
                            .update_tool_status(part_id, PartStatus::Error)
                            .await
                            ?;
                    }
                }

                self.messages
                    .set_error(
                        self.message_id,
                        MessageErrorInfo {
                            error_type: error_type.clone(),
                            message: message.clone(),
                        },
                    )
                    .await
                    ?;

                self.finished = true;
                self.notify(BroadcastEvent::Error {
                    message_id: self.message_id,
                    error_type: error_type.clone(),
                    message: message.clone(),
                });

                Ok(ProcessOutcome::Errored {
                    error_type,
                    message,
                })
            }
        }
    }

    /// Marks the assistant message cancelled when the stream did not reach
    /// a natural finish (spec.md §4.4 Cancellation, §7 `Cancelled`).
    pub async fn mark_cancelled(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        for call_id in std::mem::take(&mut self.open_tool_calls) {
            if let Some(part_id) = self.tool_call_parts.get(&call_id).copied() {
                self.parts
                    .update_tool_status(part_id, PartStatus::Error)
                    .await
                    ?;
            }
        }
        self.messages
            .set_error(
                self.message_id,
                MessageErrorInfo {
                    error_type: "Cancelled".to_string(),
                    message: "turn cancelled".to_string(),
                },
            )
            .await
            ?;
        self.finished = true;
        self.notify(BroadcastEvent::Error {
            message_id: self.message_id,
            error_type: "Cancelled".to_string(),
            message: "turn cancelled".to_string(),
        });
        Ok(())
    }

    async fn append_text(&mut self, delta: String) -> Result<()> {
        match &mut self.open_text {
            Some((part_id, buffer)) => {
                buffer.push_str(&delta);
                let part_id = *part_id;
                let content = buffer.clone();
                self.parts
                    .update_content(part_id, PartContent::Text(TextPart { text: content }))
                    .await
                    ?;
                self.notify(BroadcastEvent::TextDelta {
                    message_id: self.message_id,
                    part_id,
                    delta,
                });
            }
            None => {
                let order = self.next_order();
                let part = MessagePart::new(
                    self.message_id,
                    order,
                    PartContent::Text(TextPart {
                        text: delta.clone(),
                    }),
                );
                let part_id = part.id;
                self.parts.create(part).await?;
                self.open_text = Some((part_id, delta.clone()));
                self.notify(BroadcastEvent::TextDelta {
                    message_id: self.message_id,
                    part_id,
                    delta,
                });
            }
        }
        Ok(())
    }

    async fn append_reasoning(&mut self, delta: String) -> Result<()> {
        match &mut self.open_reasoning {
            Some((part_id, buffer)) => {
                buffer.push_str(&delta);
                let part_id = *part_id;
                let content = buffer.clone();
                self.parts
                    .update_content(part_id, PartContent::Reasoning(ReasoningPart { text: content }))
                    .await
                    ?;
                self.notify(BroadcastEvent::ReasoningDelta {
                    message_id: self.message_id,
                    part_id,
                    delta,
                });
            }
            None => {
                let order = self.next_order();
                let part = MessagePart::new(
                    self.message_id,
                    order,
                    PartContent::Reasoning(ReasoningPart {
                        text: delta.clone(),
                    }),
                );
                let part_id = part.id;
                self.parts.create(part).await?;
                self.open_reasoning = Some((part_id, delta.clone()));
                self.notify(BroadcastEvent::ReasoningDelta {
                    message_id: self.message_id,
                    part_id,
                    delta,
                });
            }
        }
        Ok(())
    }

    async fn close_text(&mut self) -> Result<()> {
        self.open_text = None;
        Ok(())
    }

    async fn close_reasoning(&mut self) -> Result<()> {
        self.open_reasoning = None;
        Ok(())
    }
}

/// A `file` part is created by tool callers that surface generated
/// artefacts (spec.md §3); the Stream Processor itself never emits one
/// directly since the event alphabet has no `file` event, but exposes this
/// helper so a tool-result handler can attach one at the same ordering
/// discipline used for every other part.
pub fn file_part(message_id: MessageId, order: u32, path: String, mime_type: Option<String>) -> MessagePart {
    MessagePart::new(message_id, order, PartContent::File(FilePart { path, mime_type }))
}

fn finish_reason_wire(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::ToolCalls => "tool-calls",
        FinishReason::Length => "length",
        FinishReason::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_testing::{
        sample_session, InMemoryMessagePartRepository, InMemoryMessageRepository,
        InMemorySessionRepository,
    };
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct Harness {
        processor: StreamProcessor,
        sessions: Arc<InMemorySessionRepository>,
        messages: Arc<InMemoryMessageRepository>,
        parts: Arc<InMemoryMessagePartRepository>,
        session_id: SessionId,
        message_id: MessageId,
        events: Arc<Mutex<Vec<BroadcastEvent>>>,
    }

    async fn harness() -> Harness {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let parts = Arc::new(InMemoryMessagePartRepository::new());
        let providers = Arc::new(ProviderRegistry::new());

        let session = sample_session(Uuid::new_v4());
        let session_id = session.id;
        sessions.create(session).await.unwrap();

        let message = agentflow_types::Message::new(
            session_id,
            agentflow_types::Role::Assistant,
            None,
            "anthropic",
            "claude-sonnet-4",
            "general",
        );
        let message_id = message.id;
        messages.create(message).await.unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_for_observer = events.clone();
        let observer: Arc<dyn Fn(BroadcastEvent) + Send + Sync> =
            Arc::new(move |event| events_for_observer.lock().unwrap().push(event));

        let processor = StreamProcessor::new(
            message_id,
            session_id,
            "anthropic",
            "claude-sonnet-4",
            parts.clone(),
            messages.clone(),
            sessions.clone(),
            providers,
            observer,
        );

        Harness { processor, sessions, messages, parts, session_id, message_id, events }
    }

    #[tokio::test]
    async fn simple_text_then_finish_persists_completion_and_session_stats() {
        let mut h = harness().await;
        h.processor.process(ModelEvent::TextDelta { step: 0, delta: "hel".to_string() }).await.unwrap();
        h.processor.process(ModelEvent::TextDelta { step: 0, delta: "lo".to_string() }).await.unwrap();

        let outcome = h
            .processor
            .process(ModelEvent::Finish { finish_reason: "stop".to_string(), input_tokens: 4, output_tokens: 2 })
            .await
            .unwrap();
        match outcome {
            ProcessOutcome::Finished { finish_reason, input_tokens, output_tokens, cost } => {
                assert_eq!(finish_reason, FinishReason::Stop);
                assert_eq!(input_tokens, 4);
                assert_eq!(output_tokens, 2);
                assert!((cost - 0.000_042).abs() < 1e-12);
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert!(h.processor.is_finished());

        let parts = h.parts.list_by_message(h.message_id).await.unwrap();
        assert_eq!(parts.len(), 1);
        match &parts[0].content {
            PartContent::Text(text) => assert_eq!(text.text, "hello"),
            other => panic!("expected a single merged text part, got {other:?}"),
        }

        let session = h.sessions.get_or_throw(h.session_id).await.unwrap();
        assert_eq!(session.message_count, 2);
        assert!((session.total_cost - 0.000_042).abs() < 1e-12);

        assert!(h.events.lock().unwrap().iter().any(|e| matches!(e, BroadcastEvent::Finish { .. })));
    }

    #[tokio::test]
    async fn tool_call_then_result_pairs_and_flips_status() {
        let mut h = harness().await;
        h.processor
            .process(ModelEvent::ToolCall {
                step: 0,
                call_id: "call_1".to_string(),
                tool_name: "read".to_string(),
                arguments: json!({"path": "a.rs"}),
            })
            .await
            .unwrap();
        h.processor
            .process(ModelEvent::ToolResult {
                step: 0,
                call_id: "call_1".to_string(),
                output: json!({"content": "fn main() {}"}),
                is_error: false,
            })
            .await
            .unwrap();

        let parts = h.parts.list_by_message(h.message_id).await.unwrap();
        assert_eq!(parts.len(), 2);
        let call_part = parts.iter().find(|p| matches!(p.content, PartContent::ToolCall(_))).unwrap();
        assert_eq!(call_part.status, PartStatus::Completed);
    }

    #[tokio::test]
    async fn error_event_flips_open_tool_calls_and_marks_message_errored() {
        let mut h = harness().await;
        h.processor
            .process(ModelEvent::ToolCall {
                step: 0,
                call_id: "call_1".to_string(),
                tool_name: "bash".to_string(),
                arguments: json!({"command": "true"}),
            })
            .await
            .unwrap();

        let outcome = h
            .processor
            .process(ModelEvent::Error { error_type: "ProviderError".to_string(), message: "upstream 500".to_string() })
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Errored { .. }));

        let parts = h.parts.list_by_message(h.message_id).await.unwrap();
        let call_part = parts.iter().find(|p| matches!(p.content, PartContent::ToolCall(_))).unwrap();
        assert_eq!(call_part.status, PartStatus::Error);

        let message = h.messages.get(h.message_id).unwrap();
        assert!(message.error.is_some());
        assert!(message.completion.is_none());
    }

    #[tokio::test]
    async fn events_after_finish_are_ignored() {
        let mut h = harness().await;
        h.processor
            .process(ModelEvent::Finish { finish_reason: "stop".to_string(), input_tokens: 1, output_tokens: 1 })
            .await
            .unwrap();
        let before = h.parts.list_by_message(h.message_id).await.unwrap().len();

        let outcome = h.processor.process(ModelEvent::TextDelta { step: 0, delta: "late".to_string() }).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::Continue));
        let after = h.parts.list_by_message(h.message_id).await.unwrap().len();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn mark_cancelled_is_idempotent_after_finish() {
        let mut h = harness().await;
        h.processor
            .process(ModelEvent::Finish { finish_reason: "stop".to_string(), input_tokens: 1, output_tokens: 1 })
            .await
            .unwrap();
        h.processor.mark_cancelled().await.unwrap();
        let message = h.messages.get(h.message_id).unwrap();
        assert!(message.completion.is_some());
        assert!(message.error.is_none());
    }

    #[tokio::test]
    async fn mark_cancelled_without_finish_sets_cancelled_error() {
        let mut h = harness().await;
        h.processor.process(ModelEvent::TextDelta { step: 0, delta: "partial".to_string() }).await.unwrap();
        h.processor.mark_cancelled().await.unwrap();

        let message = h.messages.get(h.message_id).unwrap();
        assert_eq!(message.error.as_ref().unwrap().error_type, "Cancelled");
        assert!(h.processor.is_finished());
    }
}
