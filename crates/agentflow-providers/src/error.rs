use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the Provider Registry and Credential Resolver
/// (spec.md §4.1, §7).
#[derive(Debug)]
pub enum Error {
    UnknownVendor(String),
    InvalidCredential { vendor: String, reason: String },
    CredentialMissing { user_id: String, vendor: String },
    Http(reqwest::Error),
    Json(serde_json::Error),
    ModelAdapter(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownVendor(vendor) => write!(f, "unknown vendor: {vendor}"),
            Error::InvalidCredential { vendor, reason } => {
                write!(f, "invalid credential for {vendor}: {reason}")
            }
            Error::CredentialMissing { user_id, vendor } => {
                write!(f, "no credential for user {user_id} and vendor {vendor}")
            }
            Error::Http(err) => write!(f, "HTTP error: {err}"),
            Error::Json(err) => write!(f, "JSON error: {err}"),
            Error::ModelAdapter(msg) => write!(f, "model adapter error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<Error> for agentflow_types::CoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::UnknownVendor(vendor) => agentflow_types::CoreError::UnknownVendor(vendor),
            Error::InvalidCredential { vendor, reason } => {
                agentflow_types::CoreError::InvalidCredential { vendor, reason }
            }
            Error::CredentialMissing { user_id, vendor } => {
                agentflow_types::CoreError::CredentialMissing { user_id, vendor }
            }
            Error::Http(err) => agentflow_types::CoreError::ModelAdapterError(err.to_string()),
            Error::Json(err) => agentflow_types::CoreError::ModelAdapterError(err.to_string()),
            Error::ModelAdapter(msg) => agentflow_types::CoreError::ModelAdapterError(msg),
        }
    }
}
