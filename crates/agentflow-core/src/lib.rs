//! Shared path/home-dir helpers and small cross-cutting utilities used
//! across the orchestration core. Not intended for direct use outside the
//! `agentflow-*` workspace.

pub mod path;

pub use path::{
    discover_project_root, expand_tilde, normalize_path, project_agents_dir, resolve_state_dir,
    Error, Result,
};
