//! `anthropic-oauth` adapter: same wire format as `AnthropicAdapter`, but
//! authorizes with a refreshable bearer token instead of a static API key,
//! and retries once on a 401 after a fresh refresh (spec.md §4.1).

use std::sync::Arc;

use agentflow_types::{OAuthTokens, UserId};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::adapter::{
    DialogueMessage, GenerateRequest, GenerateResponse, ModelAdapter, ModelEventStream,
    StreamRequest, ToolSpec,
};
use crate::agentic::{run_agentic_loop, StepCaller, StepFuture, WireTurn};
use crate::anthropic::{build_anthropic_body, sse_to_model_events, ANTHROPIC_VERSION, DEFAULT_BASE_URL};
use crate::credential::{CredentialResolver, OAuthEndpoint};
use crate::error::{Error, Result};

pub struct AnthropicOAuthAdapter {
    http: reqwest::Client,
    base_url: String,
    model: String,
    user_id: UserId,
    resolver: Arc<CredentialResolver>,
    tokens: Arc<RwLock<OAuthTokens>>,
}

impl AnthropicOAuthAdapter {
    pub fn new(
        http: reqwest::Client,
        model: impl Into<String>,
        user_id: UserId,
        resolver: Arc<CredentialResolver>,
        initial_tokens: OAuthTokens,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            user_id,
            resolver,
            tokens: Arc::new(RwLock::new(initial_tokens)),
        }
    }

    /// Vendor id used to look up the OAuth endpoint and stored credential.
    const VENDOR: &'static str = "anthropic-oauth";

    async fn current_access_token(&self) -> Result<String> {
        current_access_token(&self.resolver, &self.user_id, &self.tokens).await
    }
}

/// Returns the current bearer token, refreshing through the resolver first
/// if the stored one has expired. Shared between the adapter's
/// `generate_text` and the per-step caller used by `stream_text`'s agentic
/// loop, both of which hold the same `Arc<RwLock<OAuthTokens>>`.
async fn current_access_token(
    resolver: &CredentialResolver,
    user_id: &UserId,
    tokens: &RwLock<OAuthTokens>,
) -> Result<String> {
    if tokens.read().await.is_expired(Utc::now().timestamp_millis()) {
        refresh(resolver, user_id, tokens).await?;
    }
    Ok(tokens.read().await.access.clone())
}

async fn refresh(resolver: &CredentialResolver, user_id: &UserId, tokens: &RwLock<OAuthTokens>) -> Result<()> {
    let credential = resolver.resolve_async(user_id, AnthropicOAuthAdapter::VENDOR).await?;
    if let agentflow_types::Credential::OAuth(fresh) = credential {
        *tokens.write().await = fresh;
    }
    Ok(())
}

async fn dispatch_with_refresh(
    http: &reqwest::Client,
    base_url: &str,
    resolver: &CredentialResolver,
    user_id: &UserId,
    tokens: &RwLock<OAuthTokens>,
    body: &serde_json::Value,
) -> Result<reqwest::Response> {
    let access = current_access_token(resolver, user_id, tokens).await?;
    let response = http
        .post(format!("{base_url}/messages"))
        .bearer_auth(&access)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("anthropic-beta", "oauth-2025-04-20")
        .json(body)
        .send()
        .await?;

    if response.status().as_u16() == 401 {
        // One immediate refresh-and-retry per spec.md §4.1.
        refresh(resolver, user_id, tokens).await?;
        let access = tokens.read().await.access.clone();
        return Ok(http
            .post(format!("{base_url}/messages"))
            .bearer_auth(&access)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", "oauth-2025-04-20")
            .json(body)
            .send()
            .await?);
    }
    Ok(response)
}

struct AnthropicOAuthStepCaller {
    http: reqwest::Client,
    base_url: String,
    model: String,
    user_id: UserId,
    resolver: Arc<CredentialResolver>,
    tokens: Arc<RwLock<OAuthTokens>>,
    system: String,
    messages: Vec<DialogueMessage>,
    tools: Vec<ToolSpec>,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl StepCaller for AnthropicOAuthStepCaller {
    fn call_step(&self, history: &[WireTurn]) -> StepFuture<'_> {
        let history = history.to_vec();
        Box::pin(async move {
            let request = StreamRequest {
                system: self.system.clone(),
                messages: self.messages.clone(),
                tools: self.tools.clone(),
                stop_when_step_count: 0,
                temperature: self.temperature,
                top_p: self.top_p,
                cancellation: tokio_util::sync::CancellationToken::new(),
            };
            let body = build_anthropic_body(&self.model, &request, &history);
            let response = dispatch_with_refresh(
                &self.http,
                &self.base_url,
                &self.resolver,
                &self.user_id,
                &self.tokens,
                &body,
            )
            .await?;
            if !response.status().is_success() {
                return Err(Error::ModelAdapter(format!(
                    "anthropic (oauth) returned status {}",
                    response.status()
                )));
            }
            Ok(sse_to_model_events(response))
        })
    }
}

#[async_trait]
impl ModelAdapter for AnthropicOAuthAdapter {
    fn vendor(&self) -> &str {
        Self::VENDOR
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_text(&self, request: StreamRequest) -> Result<ModelEventStream> {
        let caller = Arc::new(AnthropicOAuthStepCaller {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            user_id: self.user_id.clone(),
            resolver: self.resolver.clone(),
            tokens: self.tokens.clone(),
            system: request.system,
            messages: request.messages,
            tools: request.tools.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
        });
        let max_steps = request.stop_when_step_count.max(1);
        Ok(run_agentic_loop(caller, request.tools, max_steps, request.cancellation))
    }

    async fn generate_text(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let access = self.current_access_token().await?;
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&access)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", "oauth-2025-04-20")
            .json(&serde_json::json!({
                "model": self.model,
                "system": request.system,
                "messages": request.messages.iter().map(|m| serde_json::json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
                "max_tokens": 8192,
                "stream": false,
            }))
            .send()
            .await?;
        let body: serde_json::Value = response.json().await?;
        let text = body
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| blocks.first())
            .and_then(|block| block.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(GenerateResponse {
            text,
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// Default OAuth endpoint wiring for `anthropic-oauth`, used by callers
/// constructing a `CredentialResolver` (spec.md §6 OAuth token endpoint).
pub fn default_oauth_endpoint() -> OAuthEndpoint {
    OAuthEndpoint {
        token_url: "https://console.anthropic.com/v1/oauth/token".to_string(),
        client_id: "agentflow-cli".to_string(),
    }
}
