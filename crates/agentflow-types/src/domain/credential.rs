use serde::{Deserialize, Serialize};

/// The stored secret for a (user, vendor) pair. Static-key vendors store a
/// plain string; OAuth vendors store the refreshable triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    ApiKey(String),
    OAuth(OAuthTokens),
}

impl Credential {
    /// The bearer value to send on the wire right now, without refreshing.
    pub fn current_secret(&self) -> &str {
        match self {
            Credential::ApiKey(key) => key,
            Credential::OAuth(tokens) => &tokens.access,
        }
    }
}

/// An OAuth token triple as persisted by the credentials repository
/// (spec.md §3, §6). `expires_at_ms` is Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access: String,
    pub refresh: String,
    pub expires_at_ms: i64,
}

impl OAuthTokens {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}
