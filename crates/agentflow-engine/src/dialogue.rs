//! Rebuilds the flat dialogue a model adapter consumes from a session's
//! persisted messages and parts (spec.md §4.4 step 6, §8 round-trip
//! property).

use agentflow_providers::DialogueMessage;
use agentflow_types::{Message, MessagePart, PartContent, Role};

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Flattens one message's ordered parts into its adapter-facing text: the
/// concatenation of its `text` parts in `order`, skipping everything else
/// (reasoning, tool calls/results, step markers, files never reach the
/// wire dialogue).
pub fn flatten_message_text(parts: &[MessagePart]) -> String {
    let mut ordered: Vec<&MessagePart> = parts.iter().collect();
    ordered.sort_by_key(|p| p.order);
    let mut text = String::new();
    for part in ordered {
        if let PartContent::Text(text_part) = &part.content {
            text.push_str(&text_part.text);
        }
    }
    text
}

/// Rebuilds the dialogue passed to `ModelAdapter::stream_text` from a
/// session's message history, in creation order. Messages with no text
/// parts (e.g. a tool-only assistant turn) are still included as an empty
/// string so turn numbering stays aligned with the stored history.
///
/// `final_utterance` is the raw argument the caller passed into this turn
/// (spec.md §4.4 step 6): the last entry in `parts_by_message` is the user
/// message just persisted for this same turn, and its persisted parts are
/// replaced by this raw string rather than replayed from the DB, so that
/// any artefact introduced between "the caller's argument" and "what got
/// written" never reaches the model.
pub fn rebuild_dialogue(parts_by_message: &[(Message, Vec<MessagePart>)], final_utterance: &str) -> Vec<DialogueMessage> {
    let last_index = parts_by_message.len().checked_sub(1);
    parts_by_message
        .iter()
        .enumerate()
        .map(|(index, (message, parts))| DialogueMessage {
            role: role_str(message.role),
            content: if Some(index) == last_index && message.role == Role::User {
                final_utterance.to_string()
            } else {
                flatten_message_text(parts)
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_types::{PartContent, ReasoningPart, TextPart};
    use uuid::Uuid;

    fn text_part(message_id: Uuid, order: u32, text: &str) -> MessagePart {
        MessagePart::new(message_id, order, PartContent::Text(TextPart { text: text.to_string() }))
    }

    #[test]
    fn flattens_text_parts_in_order() {
        let message_id = Uuid::new_v4();
        let reasoning = MessagePart::new(
            message_id,
            0,
            PartContent::Reasoning(ReasoningPart {
                text: "thinking".to_string(),
            }),
        );
        let first = text_part(message_id, 1, "hello ");
        let second = text_part(message_id, 2, "world");
        let parts = vec![second.clone(), reasoning, first.clone()];

        let flattened = flatten_message_text(&parts);
        assert_eq!(flattened, "hello world");
    }

    #[test]
    fn empty_parts_yield_empty_text() {
        assert_eq!(flatten_message_text(&[]), "");
    }

    fn sample_message(session_id: Uuid, role: Role) -> Message {
        Message::new(session_id, role, None, "anthropic", "claude-sonnet-4", "general")
    }

    #[test]
    fn rebuild_dialogue_substitutes_raw_utterance_for_final_user_turn() {
        let session_id = Uuid::new_v4();
        let prior_user = sample_message(session_id, Role::User);
        let prior_user_parts = vec![text_part(prior_user.id, 0, "earlier question")];
        let prior_assistant = sample_message(session_id, Role::Assistant);
        let prior_assistant_parts = vec![text_part(prior_assistant.id, 0, "earlier answer")];
        let final_user = sample_message(session_id, Role::User);
        let final_user_parts = vec![text_part(final_user.id, 0, "stored copy with an artefact")];

        let parts_by_message = vec![
            (prior_user, prior_user_parts),
            (prior_assistant, prior_assistant_parts),
            (final_user, final_user_parts),
        ];

        let dialogue = rebuild_dialogue(&parts_by_message, "raw caller utterance");
        assert_eq!(dialogue.len(), 3);
        assert_eq!(dialogue[0].content, "earlier question");
        assert_eq!(dialogue[1].content, "earlier answer");
        assert_eq!(dialogue[2].role, "user");
        assert_eq!(dialogue[2].content, "raw caller utterance");
    }
}
