use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while driving the Stream Processor's state machine
/// (spec.md §4.5, §7).
#[derive(Debug)]
pub enum Error {
    /// A repository call (message/part/session persistence) failed.
    Repository(agentflow_types::CoreError),
    /// Cost computation needed the Provider Registry and it rejected the
    /// (vendor, model) pair outright (distinct from "unknown model", which
    /// is priced at zero rather than erroring).
    Provider(agentflow_providers::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Repository(err) => write!(f, "repository error: {err}"),
            Error::Provider(err) => write!(f, "provider error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Repository(err) => Some(err),
            Error::Provider(err) => Some(err),
        }
    }
}

impl From<agentflow_types::CoreError> for Error {
    fn from(err: agentflow_types::CoreError) -> Self {
        Error::Repository(err)
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
            Error::Repository(err) => err,
            Error::Provider(err) => err.into(),
        }
    }
}
