//! In-memory repository, event bus, and tool-binding fakes used across the
//! `agentflow-*` workspace's test suites. Not intended for direct use
//! outside tests.

pub mod eventbus;
pub mod fixtures;
pub mod repository;
pub mod tool;

pub use eventbus::RecordingEventBus;
pub use fixtures::{sample_agent_definition, sample_session, sample_turn_request};
pub use repository::{
    InMemoryCredentialRepository, InMemoryMessagePartRepository, InMemoryMessageRepository,
    InMemorySessionRepository,
};
pub use tool::{EchoToolBinding, StubToolRegistry};
