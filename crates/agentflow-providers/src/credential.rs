//! The Credential Resolver (spec.md §4.2): lazily returns a fresh
//! credential for a (user, vendor), transparently refreshing and
//! persisting OAuth tokens, deduplicating concurrent refreshes.

use std::sync::Arc;

use agentflow_types::{Credential, CredentialRepository, UserId};
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::oauth;

/// Per-vendor OAuth endpoint configuration, needed only by `resolve_async`
/// for vendors whose credential is a refreshable triple.
#[derive(Debug, Clone)]
pub struct OAuthEndpoint {
    pub token_url: String,
    pub client_id: String,
}

pub struct CredentialResolver {
    repository: Arc<dyn CredentialRepository>,
    http: reqwest::Client,
    oauth_endpoints: std::collections::HashMap<String, OAuthEndpoint>,
    /// One lock per (user, vendor) so concurrent refreshes for the same
    /// pair serialise instead of racing (spec.md §4.2, §5).
    refresh_locks: DashMap<(UserId, String), Arc<Mutex<()>>>,
    /// A caller-supplied static key that overrides store lookup entirely.
    static_override: Option<String>,
}

impl CredentialResolver {
    pub fn new(repository: Arc<dyn CredentialRepository>) -> Self {
        Self {
            repository,
            http: reqwest::Client::new(),
            oauth_endpoints: std::collections::HashMap::new(),
            refresh_locks: DashMap::new(),
            static_override: None,
        }
    }

    pub fn with_static_key(mut self, key: impl Into<String>) -> Self {
        self.static_override = Some(key.into());
        self
    }

    pub fn with_oauth_endpoint(mut self, vendor: impl Into<String>, endpoint: OAuthEndpoint) -> Self {
        self.oauth_endpoints.insert(vendor.into(), endpoint);
        self
    }

    /// Returns the current secret without refreshing. OAuth refresh is
    /// deferred to the adapter's outbound HTTP wrapper in this path.
    pub async fn resolve(&self, user_id: &UserId, vendor: &str) -> Result<String> {
        if let Some(key) = &self.static_override {
            return Ok(key.clone());
        }
        let credential = self
            .repository
            .get(user_id, vendor)
            .await
            .map_err(|err| Error::ModelAdapter(err.to_string()))?
            .ok_or_else(|| Error::CredentialMissing {
                user_id: user_id.clone(),
                vendor: vendor.to_string(),
            })?;
        Ok(credential.current_secret().to_string())
    }

    /// Returns a fresh credential, performing refresh-and-persist first if
    /// OAuth tokens have expired (spec.md §4.2).
    pub async fn resolve_async(&self, user_id: &UserId, vendor: &str) -> Result<Credential> {
        if let Some(key) = &self.static_override {
            return Ok(Credential::ApiKey(key.clone()));
        }

        let stored = self
            .repository
            .get(user_id, vendor)
            .await
            .map_err(|err| Error::ModelAdapter(err.to_string()))?
            .ok_or_else(|| Error::CredentialMissing {
                user_id: user_id.clone(),
                vendor: vendor.to_string(),
            })?;

        let Credential::OAuth(tokens) = &stored else {
            return Ok(stored);
        };

        if !tokens.is_expired(Utc::now().timestamp_millis()) {
            return Ok(stored);
        }

        let Some(endpoint) = self.oauth_endpoints.get(vendor) else {
            warn!(vendor, "oauth tokens expired but no token endpoint configured");
            return Ok(stored);
        };

        let key = (user_id.clone(), vendor.to_string());
        let lock = self
            .refresh_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another waiter may have already refreshed while we waited for
        // the lock; re-read before hitting the network again.
        let current = self
            .repository
            .get(user_id, vendor)
            .await
            .map_err(|err| Error::ModelAdapter(err.to_string()))?
            .unwrap_or(stored);
        let Credential::OAuth(current_tokens) = &current else {
            return Ok(current);
        };
        if !current_tokens.is_expired(Utc::now().timestamp_millis()) {
            return Ok(current);
        }

        match oauth::exchange_refresh_token(
            &self.http,
            &endpoint.token_url,
            &current_tokens.refresh,
            &endpoint.client_id,
        )
        .await
        {
            Ok(refreshed) => {
                let credential = Credential::OAuth(refreshed);
                if let Err(err) = self.repository.update(user_id, vendor, credential.clone()).await {
                    warn!(vendor, error = %err, "failed to persist refreshed oauth tokens");
                }
                info!(vendor, "refreshed oauth credential");
                Ok(credential)
            }
            Err(err) => {
                // RefreshFailure is non-fatal: stale tokens are returned
                // and the HTTP wrapper's 401 retry path takes over.
                warn!(vendor, error = %err, "oauth refresh failed, returning stale tokens");
                Ok(current)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_types::Result as CoreResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRepo {
        credential: tokio::sync::Mutex<Option<Credential>>,
        get_calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialRepository for FakeRepo {
        async fn list(&self, _user_id: &UserId) -> CoreResult<Vec<(String, Credential)>> {
            Ok(vec![])
        }

        async fn get(&self, _user_id: &UserId, _vendor: &str) -> CoreResult<Option<Credential>> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.credential.lock().await.clone())
        }

        async fn update(&self, _user_id: &UserId, _vendor: &str, credential: Credential) -> CoreResult<()> {
            *self.credential.lock().await = Some(credential);
            Ok(())
        }
    }

    #[tokio::test]
    async fn resolve_returns_static_override_without_repo_lookup() {
        let repo = Arc::new(FakeRepo {
            credential: tokio::sync::Mutex::new(None),
            get_calls: AtomicUsize::new(0),
        });
        let resolver = CredentialResolver::new(repo.clone()).with_static_key("sk-override");
        let secret = resolver.resolve(&"user-1".to_string(), "anthropic").await.unwrap();
        assert_eq!(secret, "sk-override");
        assert_eq!(repo.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolve_missing_credential_errors() {
        let repo = Arc::new(FakeRepo {
            credential: tokio::sync::Mutex::new(None),
            get_calls: AtomicUsize::new(0),
        });
        let resolver = CredentialResolver::new(repo);
        let result = resolver.resolve(&"user-1".to_string(), "anthropic").await;
        assert!(matches!(result, Err(Error::CredentialMissing { .. })));
    }

    #[tokio::test]
    async fn resolve_async_passes_through_non_expired_oauth() {
        let tokens = agentflow_types::OAuthTokens {
            access: "a1".into(),
            refresh: "r1".into(),
            expires_at_ms: Utc::now().timestamp_millis() + 60_000,
        };
        let repo = Arc::new(FakeRepo {
            credential: tokio::sync::Mutex::new(Some(Credential::OAuth(tokens.clone()))),
            get_calls: AtomicUsize::new(0),
        });
        let resolver = CredentialResolver::new(repo);
        let credential = resolver.resolve_async(&"user-1".to_string(), "anthropic-oauth").await.unwrap();
        match credential {
            Credential::OAuth(t) => assert_eq!(t.access, "a1"),
            _ => panic!("expected oauth credential"),
        }
    }

    #[tokio::test]
    async fn resolve_async_returns_stale_when_no_endpoint_configured() {
        let tokens = agentflow_types::OAuthTokens {
            access: "a1".into(),
            refresh: "r1".into(),
            expires_at_ms: Utc::now().timestamp_millis() - 1,
        };
        let repo = Arc::new(FakeRepo {
            credential: tokio::sync::Mutex::new(Some(Credential::OAuth(tokens.clone()))),
            get_calls: AtomicUsize::new(0),
        });
        let resolver = CredentialResolver::new(repo);
        let credential = resolver.resolve_async(&"user-1".to_string(), "anthropic-oauth").await.unwrap();
        match credential {
            Credential::OAuth(t) => assert_eq!(t.access, "a1"),
            _ => panic!("expected oauth credential"),
        }
    }
}
