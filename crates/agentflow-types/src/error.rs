use std::fmt;

use uuid::Uuid;

/// Result type used throughout the orchestration core.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The error kinds the orchestration core can surface to a caller.
///
/// Every variant here corresponds to one of the named failure modes a turn
/// can end in: a missing lookup, a credential problem, a tool or model
/// failure, or cancellation. There is deliberately one flat enum rather than
/// a hierarchy per crate, since callers (the SDK facade, tests) need to
/// match on all of them uniformly.
#[derive(Debug)]
pub enum CoreError {
    SessionNotFound(Uuid),
    AgentNotFound(String),
    UnknownVendor(String),
    InvalidCredential { vendor: String, reason: String },
    CredentialMissing { user_id: String, vendor: String },
    ModelAdapterError(String),
    ToolInvocationError { tool: String, message: String },
    Cancelled,
    RefreshFailure(String),
    Io(std::io::Error),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::SessionNotFound(id) => write!(f, "session not found: {id}"),
            CoreError::AgentNotFound(name) => write!(f, "agent not found: {name}"),
            CoreError::UnknownVendor(name) => write!(f, "unknown vendor: {name}"),
            CoreError::InvalidCredential { vendor, reason } => {
                write!(f, "invalid credential for {vendor}: {reason}")
            }
            CoreError::CredentialMissing { user_id, vendor } => {
                write!(f, "no credential for user {user_id} and vendor {vendor}")
            }
            CoreError::ModelAdapterError(msg) => write!(f, "model adapter error: {msg}"),
            CoreError::ToolInvocationError { tool, message } => {
                write!(f, "tool {tool} failed: {message}")
            }
            CoreError::Cancelled => write!(f, "turn cancelled"),
            CoreError::RefreshFailure(msg) => write!(f, "credential refresh failed: {msg}"),
            CoreError::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err)
    }
}
