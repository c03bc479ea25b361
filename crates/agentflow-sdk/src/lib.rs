//! agentflow-sdk: the public facade for the agentflow agent orchestration
//! engine.
//!
//! # Overview
//!
//! `agentflow-sdk` wires the Provider Registry, Credential Resolver, Agent
//! Registry, Orchestrator, and Sub-Agent Runner into one `Runtime` entry
//! point. It abstracts away the internal turn-driving machinery, exposing
//! only what a host application needs: supply the external interfaces
//! (tool registry, repositories) this workspace deliberately does not
//! implement, then call `Runtime::run` once per turn.
//!
//! # Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentflow_sdk::{Runtime, RuntimeConfig};
//! use agentflow_testing::{
//!     InMemoryCredentialRepository, InMemoryMessagePartRepository, InMemoryMessageRepository,
//!     InMemorySessionRepository, StubToolRegistry, sample_turn_request,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Runtime::builder(RuntimeConfig::default())
//!     .tools(Arc::new(StubToolRegistry::new(["read", "grep"])))
//!     .sessions(Arc::new(InMemorySessionRepository::new()))
//!     .messages(Arc::new(InMemoryMessageRepository::new()))
//!     .parts(Arc::new(InMemoryMessagePartRepository::new()))
//!     .credential_repository(Arc::new(InMemoryCredentialRepository::new()))
//!     .build()?;
//!
//! // `runtime.run(request)` drives one turn; see the crate's README for a
//! // complete example wiring a real model vendor credential.
//! let _ = runtime.agents().list();
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! This facade wraps:
//! - `agentflow-types`: the data model, event alphabets, and external
//!   interface traits
//! - `agentflow-providers`: the Provider Registry and Credential Resolver
//! - `agentflow-engine`: the Stream Processor and prompt/dialogue assembly
//! - `agentflow-runtime`: the Orchestrator, Sub-Agent Runner, and Agent
//!   Registry

pub mod config;
pub mod error;
pub mod runtime;

pub use config::{OAuthEndpointConfig, RuntimeConfig};
pub use error::{Error, Result};
pub use runtime::{Runtime, RuntimeBuilder};

// Re-exported so a host application can build `TurnRequest`s and read
// `TurnResult`s without depending on `agentflow-types` directly.
pub use agentflow_types::{TurnRequest, TurnResult};
