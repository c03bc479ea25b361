//! Event bus interface (spec.md §6): `publish(projectId, event)`,
//! best-effort. A failure to deliver must never abort turn processing —
//! callers that need that guarantee should catch and log, not propagate.

use async_trait::async_trait;

use crate::domain::ProjectId;
use crate::event::BroadcastEvent;

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, project_id: ProjectId, event: BroadcastEvent);
}
