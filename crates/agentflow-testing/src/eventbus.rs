//! A recording `EventBus` for assertions in orchestrator/stream-processor
//! tests, grounded on the same "append to a shared in-memory log" pattern
//! used by the repository fakes in this crate (spec.md §6 Event bus
//! interface: best-effort, publish failures never abort turn processing —
//! so this fake never fails).

use std::sync::Arc;

use agentflow_types::{BroadcastEvent, EventBus, ProjectId};
use async_trait::async_trait;
use dashmap::DashMap;

/// Records every published event per project, in publish order.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventBus {
    published: Arc<DashMap<ProjectId, Vec<BroadcastEvent>>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_for(&self, project_id: ProjectId) -> Vec<BroadcastEvent> {
        self.published.get(&project_id).map(|entry| entry.clone()).unwrap_or_default()
    }

    pub fn total_count(&self) -> usize {
        self.published.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish(&self, project_id: ProjectId, event: BroadcastEvent) {
        self.published.entry(project_id).or_default().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_types::MessageId;
    use uuid::Uuid;

    #[tokio::test]
    async fn records_events_per_project_in_order() {
        let bus = RecordingEventBus::new();
        let project_id = Uuid::new_v4();
        let message_id: MessageId = Uuid::new_v4();
        bus.publish(project_id, BroadcastEvent::MessageCreated { session_id: Uuid::new_v4(), message_id }).await;
        bus.publish(project_id, BroadcastEvent::Finish { message_id, finish_reason: "stop".to_string(), input_tokens: 1, output_tokens: 2 }).await;

        let events = bus.events_for(project_id);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], BroadcastEvent::MessageCreated { .. }));
        assert!(matches!(events[1], BroadcastEvent::Finish { .. }));
        assert_eq!(bus.total_count(), 2);
    }

    #[tokio::test]
    async fn events_for_unknown_project_is_empty() {
        let bus = RecordingEventBus::new();
        assert!(bus.events_for(Uuid::new_v4()).is_empty());
    }
}
