//! OAuth authorization-code flows for the supported social platforms
//!
//! [`OAuthCoordinator`] builds authorize URLs and exchanges returned codes
//! for tokens. Everything provider specific lives in the
//! [`providers::PROVIDERS`] table; credentials come from [`OAuthConfig`].
//!
//! PKCE providers get a fresh verifier per authorize URL. The verifier is
//! parked under the generated `state` until the code comes back, and dropped
//! after `oauth.pending_ttl`.

mod connections;
mod pkce;
pub mod providers;

pub use connections::{ConnectedPlatform, ConnectionStore};
pub use providers::{PROVIDERS, ProviderStrategy, TokenTransport};

use crate::config::{OAuthConfig, PlatformAuthConfig};
use crate::error::{Error, Result};
use crate::redact::redact_text;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// An authorize URL and the state value embedded in it
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizeRequest {
    /// URL to send the user to
    pub url: String,
    /// Opaque state to expect back on the callback
    pub state: String,
}

/// Tokens returned by a successful exchange
#[derive(Clone, Debug, PartialEq)]
pub struct TokenResult {
    /// Access token
    pub access_token: String,
    /// Refresh token, when the provider issues one
    pub refresh_token: Option<String>,
    /// Lifetime of the access token, when reported
    pub expires_in_seconds: Option<u64>,
}

struct PendingAuthorization {
    platform: &'static str,
    code_verifier: String,
    created_at: Instant,
}

/// Drives OAuth flows against the providers in [`PROVIDERS`]
pub struct OAuthCoordinator {
    platforms: HashMap<String, PlatformAuthConfig>,
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    pending_ttl: Duration,
    http: reqwest::Client,
    connections: ConnectionStore,
}

impl OAuthCoordinator {
    /// Create a coordinator from the OAuth configuration
    pub fn new(config: &OAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            platforms: config.platforms.clone(),
            pending: Mutex::new(HashMap::new()),
            pending_ttl: config.pending_ttl,
            http,
            connections: ConnectionStore::new(),
        })
    }

    /// Build the provider authorize URL for `platform`
    ///
    /// The client id and redirect URI are embedded as configured, scopes are
    /// joined with the provider's delimiter.
    pub async fn authorize_url(&self, platform: &str) -> Result<AuthorizeRequest> {
        let (provider, credentials) = self.resolve(platform)?;
        let endpoint = credentials
            .authorize_url
            .as_deref()
            .unwrap_or(provider.authorize_endpoint);

        let mut url = url::Url::parse(endpoint).map_err(|e| Error::Config {
            message: format!("invalid authorize URL for {}: {e}", provider.id),
            key: Some(format!("oauth.platforms.{}.authorize_url", provider.id)),
        })?;

        let state = pkce::state_token();
        let scope = credentials.scope.join(provider.scope_delimiter);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair(provider.client_id_param, &credentials.client_id)
                .append_pair("redirect_uri", &credentials.redirect_uri)
                .append_pair("scope", &scope);
            for (name, value) in provider.extra_authorize_params {
                query.append_pair(name, value);
            }
            if provider.include_state {
                query.append_pair("state", &state);
            }
        }

        if provider.pkce {
            let code_verifier = pkce::code_verifier();
            url.query_pairs_mut()
                .append_pair("code_challenge", &pkce::code_challenge(&code_verifier))
                .append_pair("code_challenge_method", "S256");

            let mut pending = self.pending.lock().await;
            let ttl = self.pending_ttl;
            pending.retain(|_, p| p.created_at.elapsed() < ttl);
            pending.insert(
                state.clone(),
                PendingAuthorization {
                    platform: provider.id,
                    code_verifier,
                    created_at: Instant::now(),
                },
            );
        }

        tracing::debug!(platform = provider.id, "authorize URL generated");
        Ok(AuthorizeRequest {
            url: url.into(),
            state,
        })
    }

    /// Exchange an authorization code for tokens
    ///
    /// PKCE providers need the `state` returned with the code so the stored
    /// verifier can be sent along.
    pub async fn exchange_code(
        &self,
        platform: &str,
        code: &str,
        state: Option<&str>,
    ) -> Result<TokenResult> {
        let (provider, credentials) = self.resolve(platform)?;
        if code.trim().is_empty() {
            return Err(Error::Validation("Authorization code is required".into()));
        }

        let mut params: Vec<(&str, String)> = vec![
            (provider.client_id_param, credentials.client_id.clone()),
            ("client_secret", credentials.client_secret.clone()),
            ("grant_type", "authorization_code".into()),
            ("redirect_uri", credentials.redirect_uri.clone()),
            ("code", code.to_string()),
        ];
        if provider.pkce {
            params.push(("code_verifier", self.take_verifier(provider, state).await?));
        }

        let token_url = credentials
            .token_url
            .as_deref()
            .unwrap_or(provider.token_endpoint);
        let failed = |status: Option<u16>, message: String| Error::TokenExchangeFailed {
            platform: provider.id.to_string(),
            status,
            message,
        };

        let request = self
            .http
            .post(token_url)
            .header(reqwest::header::ACCEPT, "application/json");
        let request = match provider.token_transport {
            TokenTransport::Form => request.form(&params),
            TokenTransport::Json => request.json(
                &params
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                    .collect::<serde_json::Map<_, _>>(),
            ),
        };

        let response = request
            .send()
            .await
            .map_err(|e| failed(None, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = redact_text(&body).chars().take(MAX_ERROR_BODY).collect();
            tracing::warn!(
                platform = provider.id,
                status = status.as_u16(),
                body = %body,
                "token endpoint rejected the exchange"
            );
            return Err(failed(Some(status.as_u16()), format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| failed(Some(status.as_u16()), format!("unreadable response: {e}")))?;

        let token = parse_token_response(provider, &body)
            .ok_or_else(|| failed(Some(status.as_u16()), "missing access_token in response".into()))?;

        tracing::info!(platform = provider.id, "token exchange succeeded");
        Ok(token)
    }

    /// Exchange a code and record the connection
    pub async fn connect(
        &self,
        platform: &str,
        code: &str,
        state: Option<&str>,
    ) -> Result<ConnectedPlatform> {
        let token = self.exchange_code(platform, code, state).await?;
        let provider = self.provider(platform)?;
        Ok(self.connections.connect(provider, token, Utc::now()).await)
    }

    /// Whether `platform` holds a live connection
    pub async fn is_connected(&self, platform: &str) -> Result<bool> {
        let provider = self.provider(platform)?;
        Ok(self.connections.is_connected(provider, Utc::now()).await)
    }

    /// Drop the connection for `platform`
    pub async fn disconnect(&self, platform: &str) -> Result<()> {
        let provider = self.provider(platform)?;
        if self.connections.disconnect(provider).await {
            tracing::info!(platform = provider.id, "platform disconnected");
        }
        Ok(())
    }

    /// Frontend URI the callback redirects to
    pub fn redirect_uri(&self, platform: &str) -> Result<String> {
        let (_, credentials) = self.resolve(platform)?;
        Ok(credentials.redirect_uri)
    }

    /// Canonical provider id
    pub fn provider(&self, platform: &str) -> Result<&'static ProviderStrategy> {
        providers::lookup(platform).ok_or_else(|| Error::UnsupportedPlatform(platform.to_string()))
    }

    fn resolve(&self, platform: &str) -> Result<(&'static ProviderStrategy, PlatformAuthConfig)> {
        let provider = self.provider(platform)?;
        let credentials = self
            .platforms
            .get(provider.id)
            .cloned()
            .unwrap_or_else(|| PlatformAuthConfig::for_platform(provider.id));
        if !credentials.is_configured() {
            return Err(Error::Validation(format!(
                "{} login is not configured",
                provider.display_name
            )));
        }
        Ok((provider, credentials))
    }

    async fn take_verifier(
        &self,
        provider: &ProviderStrategy,
        state: Option<&str>,
    ) -> Result<String> {
        let expired = || Error::Validation("Unknown or expired OAuth state".into());
        let state = state.filter(|s| !s.is_empty()).ok_or_else(expired)?;

        let pending = self.pending.lock().await.remove(state).ok_or_else(expired)?;
        if pending.platform != provider.id || pending.created_at.elapsed() >= self.pending_ttl {
            return Err(expired());
        }
        Ok(pending.code_verifier)
    }
}

fn parse_token_response(provider: &ProviderStrategy, body: &Value) -> Option<TokenResult> {
    // fall back to the top level when the provider omits its wrapper
    let root = match provider.response_root {
        Some(key) => body.get(key).filter(|v| v.is_object()).unwrap_or(body),
        None => body,
    };

    let access_token = root
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?
        .to_string();

    let refresh_token = root
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(String::from);

    // some providers send the lifetime as a string
    let expires_in_seconds = root.get("expires_in").and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Some(TokenResult {
        access_token,
        refresh_token,
        expires_in_seconds,
    })
}
