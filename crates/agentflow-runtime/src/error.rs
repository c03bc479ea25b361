use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving agents, driving a turn, or supervising a
/// sub-agent (spec.md §4.3, §4.4, §4.6, §7). Wraps the lower-layer error
/// types rather than duplicating their variants.
#[derive(Debug)]
pub enum Error {
    Core(agentflow_types::CoreError),
    Engine(agentflow_engine::Error),
    Provider(agentflow_providers::Error),
    /// A project-scoped agent definition file could not be parsed. Logged
    /// and skipped by the registry rather than surfaced — this variant
    /// exists for the loader's own test coverage.
    AgentDefinitionParse { path: String, reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Core(err) => write!(f, "{err}"),
            Error::Engine(err) => write!(f, "{err}"),
            Error::Provider(err) => write!(f, "{err}"),
            Error::AgentDefinitionParse { path, reason } => {
                write!(f, "failed to parse agent definition {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Core(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Provider(err) => Some(err),
            Error::AgentDefinitionParse { .. } => None,
        }
    }
}

impl From<agentflow_types::CoreError> for Error {
    fn from(err: agentflow_types::CoreError) -> Self {
        Error::Core(err)
    }
}

impl From<agentflow_engine::Error> for Error {
    fn from(err: agentflow_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<agentflow_providers::Error> for Error {
    fn from(err: agentflow_providers::Error) -> Self {
        Error::Provider(err)
    }
}

impl From<Error> for agentflow_types::CoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(err) => err,
            Error::Engine(err) => err.into(),
            Error::Provider(err) => err.into(),
            Error::AgentDefinitionParse { path, reason } => {
                agentflow_types::CoreError::ModelAdapterError(format!(
                    "agent definition {path}: {reason}"
                ))
            }
        }
    }
}
