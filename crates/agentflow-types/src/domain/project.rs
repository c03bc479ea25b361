use std::path::PathBuf;
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type UserId = String;

/// The project a turn runs against: an external project record plus the
/// filesystem root tool bindings are rooted at (spec.md §4.4 inputs).
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub project_id: ProjectId,
    pub root: PathBuf,
}
