//! OAuth token endpoint client (spec.md §6 OAuth token endpoint).

use agentflow_types::OAuthTokens;
use chrono::Utc;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Exchanges a refresh token for a fresh access/refresh pair via
/// `POST {token_url}` with `grant_type=refresh_token`.
pub async fn exchange_refresh_token(
    http: &reqwest::Client,
    token_url: &str,
    refresh_token: &str,
    client_id: &str,
) -> Result<OAuthTokens> {
    let response = http
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::ModelAdapter(format!(
            "token refresh failed with status {}",
            response.status()
        )));
    }

    let body: TokenResponse = response.json().await?;
    let expires_at_ms = Utc::now().timestamp_millis() + body.expires_in * 1000;

    Ok(OAuthTokens {
        access: body.access_token,
        refresh: body.refresh_token.unwrap_or_else(|| refresh_token.to_string()),
        expires_at_ms,
    })
}
