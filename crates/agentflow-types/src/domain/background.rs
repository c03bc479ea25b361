use super::session::SessionId;
use tokio_util::sync::CancellationToken;

/// A sub-agent launched with `runInBackground: true`, tracked in the
/// process-wide registry owned by the Sub-Agent Runner (spec.md §3, §4.6).
///
/// Not serialisable: it holds a live cancellation handle and a join handle
/// to the detached task, both process-local.
pub struct BackgroundTask {
    pub child_session_id: SessionId,
    pub cancellation: CancellationToken,
    pub handle: tokio::task::JoinHandle<()>,
}

impl BackgroundTask {
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
