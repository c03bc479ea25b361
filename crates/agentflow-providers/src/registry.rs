//! The Provider Registry (spec.md §4.1): vendor/model lookups, adapter
//! construction, and cost computation.

use std::sync::Arc;

use agentflow_types::{Credential, ModelInfo, VendorInfo};
use tracing::warn;

use crate::adapter::ModelAdapter;
use crate::anthropic::AnthropicAdapter;
use crate::anthropic_oauth::AnthropicOAuthAdapter;
use crate::catalog::default_catalogue;
use crate::credential::CredentialResolver;
use crate::error::{Error, Result};
use crate::openai::OpenAiAdapter;

pub struct ProviderRegistry {
    catalogue: Vec<VendorInfo>,
    http: reqwest::Client,
    ollama_base_url: String,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            catalogue: default_catalogue(),
            http: reqwest::Client::new(),
            ollama_base_url: "http://localhost:11434/v1".to_string(),
        }
    }

    pub fn list_vendors(&self) -> &[VendorInfo] {
        &self.catalogue
    }

    pub fn list_models(&self, vendor_id: &str) -> Option<&[ModelInfo]> {
        self.catalogue
            .iter()
            .find(|v| v.id == vendor_id)
            .map(|v| v.models.as_slice())
    }

    pub fn get_model(&self, vendor_id: &str, model_id: &str) -> Option<&ModelInfo> {
        self.catalogue
            .iter()
            .find(|v| v.id == vendor_id)?
            .model(model_id)
    }

    pub fn get_vendor(&self, vendor_id: &str) -> Option<&VendorInfo> {
        self.catalogue.iter().find(|v| v.id == vendor_id)
    }

    /// `(in/1000)·inCost + (out/1000)·outCost`; 0 when the model is not in
    /// the catalogue or has zero pricing (spec.md §4.1).
    pub fn compute_cost(&self, vendor_id: &str, model_id: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.get_model(vendor_id, model_id) {
            Some(model) => model.pricing.cost(input_tokens, output_tokens),
            None => 0.0,
        }
    }

    /// Builds a streaming model adapter. Unknown model ids are logged and
    /// passed through unchanged — vendors may accept ids the catalogue has
    /// not yet enumerated (spec.md §4.1).
    pub async fn create_model_adapter(
        &self,
        vendor_id: &str,
        model_id: &str,
        credential: &Credential,
    ) -> Result<Arc<dyn ModelAdapter>> {
        let Some(vendor) = self.get_vendor(vendor_id) else {
            return Err(Error::UnknownVendor(vendor_id.to_string()));
        };
        if vendor.model(model_id).is_none() {
            warn!(vendor = vendor_id, model = model_id, "unknown model id, passing through to adapter");
        }

        match vendor_id {
            "anthropic" => {
                let Credential::ApiKey(key) = credential else {
                    return Err(Error::InvalidCredential {
                        vendor: vendor_id.to_string(),
                        reason: "expected an API key credential".to_string(),
                    });
                };
                Ok(Arc::new(AnthropicAdapter::new(self.http.clone(), model_id, key.clone())))
            }
            "anthropic-oauth" => {
                let Credential::OAuth(tokens) = credential else {
                    return Err(Error::InvalidCredential {
                        vendor: vendor_id.to_string(),
                        reason: "expected an OAuth credential triple".to_string(),
                    });
                };
                // The oauth adapter needs a resolver handle to refresh
                // itself mid-stream; callers wire one up via
                // `create_oauth_adapter` when a resolver is available.
                let _ = tokens;
                Err(Error::InvalidCredential {
                    vendor: vendor_id.to_string(),
                    reason: "anthropic-oauth requires create_oauth_adapter (needs a CredentialResolver)".to_string(),
                })
            }
            "openai" => {
                let Credential::ApiKey(key) = credential else {
                    return Err(Error::InvalidCredential {
                        vendor: vendor_id.to_string(),
                        reason: "expected an API key credential".to_string(),
                    });
                };
                Ok(Arc::new(OpenAiAdapter::new(self.http.clone(), model_id, key.clone())))
            }
            "ollama" => Ok(Arc::new(OpenAiAdapter::ollama(self.http.clone(), self.ollama_base_url.clone(), model_id))),
            other => Err(Error::UnknownVendor(other.to_string())),
        }
    }

    /// Builds the `anthropic-oauth` adapter, which additionally needs a
    /// `CredentialResolver` to refresh itself on expiry or a 401.
    pub fn create_oauth_adapter(
        &self,
        model_id: &str,
        user_id: agentflow_types::UserId,
        resolver: Arc<CredentialResolver>,
        initial_tokens: agentflow_types::OAuthTokens,
    ) -> Arc<dyn ModelAdapter> {
        Arc::new(AnthropicOAuthAdapter::new(self.http.clone(), model_id, user_id, resolver, initial_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_vendor_cost_is_zero() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.compute_cost("made-up", "model", 1000, 1000), 0.0);
    }

    #[test]
    fn unknown_model_within_known_vendor_cost_is_zero() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.compute_cost("anthropic", "made-up-model", 1000, 1000), 0.0);
    }

    #[test]
    fn known_model_cost_matches_pricing() {
        let registry = ProviderRegistry::new();
        let cost = registry.compute_cost("anthropic", "claude-sonnet-4", 4, 2);
        assert!((cost - 0.000_042).abs() < 1e-12);
    }

    #[tokio::test]
    async fn create_adapter_rejects_unknown_vendor() {
        let registry = ProviderRegistry::new();
        let result = registry
            .create_model_adapter("made-up", "model", &Credential::ApiKey("x".into()))
            .await;
        assert!(matches!(result, Err(Error::UnknownVendor(_))));
    }

    #[tokio::test]
    async fn create_adapter_rejects_wrong_credential_shape() {
        let registry = ProviderRegistry::new();
        let result = registry
            .create_model_adapter(
                "anthropic",
                "claude-sonnet-4",
                &Credential::OAuth(agentflow_types::OAuthTokens {
                    access: "a".into(),
                    refresh: "r".into(),
                    expires_at_ms: 0,
                }),
            )
            .await;
        assert!(matches!(result, Err(Error::InvalidCredential { .. })));
    }
}
