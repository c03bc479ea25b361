use std::fmt;

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the `agentflow-sdk` facade.
#[derive(Debug)]
pub enum Error {
    /// Malformed or unreadable `RuntimeConfig` toml file.
    Config(String),
    /// Error from the underlying orchestration layer.
    Runtime(agentflow_runtime::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Runtime(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Runtime(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<agentflow_runtime::Error> for Error {
    fn from(err: agentflow_runtime::Error) -> Self {
        Error::Runtime(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
