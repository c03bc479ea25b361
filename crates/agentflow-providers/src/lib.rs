//! Provider Registry and Credential Resolver (spec.md §4.1, §4.2): the
//! model vendor catalogue, streaming model adapters, and OAuth credential
//! refresh. Not intended for direct use outside the `agentflow-*` workspace.

pub mod adapter;
pub mod agentic;
pub mod anthropic;
pub mod anthropic_oauth;
pub mod catalog;
pub mod credential;
pub mod error;
pub mod oauth;
pub mod openai;
pub mod registry;

pub use adapter::{
    DialogueMessage, GenerateRequest, GenerateResponse, ModelAdapter, ModelEventStream,
    StreamRequest, ToolExecuteFn, ToolSpec,
};
pub use agentic::{run_agentic_loop, StepCaller, StepFuture, WireTurn};
pub use credential::{CredentialResolver, OAuthEndpoint};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;
