//! Core domain types, error kinds, event alphabets, and external interface
//! traits for the agent orchestration engine. Not intended for direct use —
//! consumed by `agentflow-providers`, `agentflow-engine`, `agentflow-runtime`,
//! and the `agentflow-sdk` facade.

pub mod domain;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod repository;
pub mod tool;

pub use domain::*;
pub use error::{CoreError, Result};
pub use event::{BroadcastEvent, ModelEvent};
pub use eventbus::EventBus;
pub use repository::{
    CredentialRepository, MessageCompletionInput, MessageErrorInfo, MessagePartRepository,
    MessageRepository, SessionRepository, SessionStatsDelta,
};
pub use tool::{ToolBinding, ToolRegistry};
