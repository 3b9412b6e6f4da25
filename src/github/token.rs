//! Access token resolution for the GitHub API.
//!
//! The token either comes straight from the environment, or is fetched from an
//! exchange endpoint that hands out short-lived tokens. Fetched tokens are
//! cached until shortly before their expiry; the cache is explicit state owned
//! by the client, never module-level.

use super::GitHubError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Refresh a cached token this long before it actually expires.
const EXPIRY_SKEW_SECONDS: i64 = 30;

/// Where the GitHub access token comes from.
#[derive(Debug, Clone)]
pub enum AccessTokenSource {
    /// Long-lived token taken directly from the environment.
    Static(String),
    /// Endpoint that exchanges a deployment identity for a short-lived token.
    Exchange { endpoint: String, identity: String },
}

impl AccessTokenSource {
    /// Resolve the token source from the environment.
    ///
    /// `GITHUB_TOKEN` wins; otherwise `GITHUB_TOKEN_EXCHANGE_URL` plus
    /// `GITHUB_TOKEN_EXCHANGE_IDENTITY` select the exchange flow.
    pub fn from_env() -> Option<Self> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                return Some(Self::Static(token));
            }
        }

        match (
            std::env::var("GITHUB_TOKEN_EXCHANGE_URL"),
            std::env::var("GITHUB_TOKEN_EXCHANGE_IDENTITY"),
        ) {
            (Ok(endpoint), Ok(identity)) if !endpoint.is_empty() && !identity.is_empty() => {
                Some(Self::Exchange { endpoint, identity })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    /// RFC3339 expiry; absent means the token must not be cached.
    expires_at: Option<String>,
}

/// Token cache guarded by an expiry timestamp comparison.
pub struct TokenCache {
    source: AccessTokenSource,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(source: AccessTokenSource) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Return a valid access token, fetching a fresh one when needed.
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, GitHubError> {
        let (endpoint, identity) = match &self.source {
            AccessTokenSource::Static(token) => return Ok(token.clone()),
            AccessTokenSource::Exchange { endpoint, identity } => (endpoint, identity),
        };

        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.expires_at - Duration::seconds(EXPIRY_SKEW_SECONDS) > Utc::now() {
                    return Ok(entry.token.clone());
                }
            }
        }

        debug!("Fetching GitHub access token from exchange endpoint");
        let response = client
            .get(endpoint)
            .header("Accept", "application/json")
            .header("Authorization", identity)
            .send()
            .await
            .map_err(|e| GitHubError::Token(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Token(format!(
                "Token exchange failed with status {}: {}",
                status, body
            )));
        }

        let exchanged: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| GitHubError::Token(format!("Invalid token exchange response: {}", e)))?;

        if exchanged.access_token.is_empty() {
            return Err(GitHubError::Token(
                "Token exchange returned an empty token".to_string(),
            ));
        }

        if let Some(raw_expiry) = exchanged.expires_at.as_deref() {
            let expires_at = DateTime::parse_from_rfc3339(raw_expiry)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    GitHubError::Token(format!("Invalid token expiry '{}': {}", raw_expiry, e))
                })?;

            let mut cached = self.cached.write().await;
            *cached = Some(CachedToken {
                token: exchanged.access_token.clone(),
                expires_at,
            });
        }

        Ok(exchanged.access_token)
    }
}
