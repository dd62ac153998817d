//! In-memory record of connected platforms

use super::TokenResult;
use super::providers::ProviderStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// A platform connection as returned to the client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPlatform {
    /// Provider id
    pub id: String,
    /// Provider display name
    pub name: String,
    /// Icon path served by the frontend
    pub icon: String,
    /// Always true for a fresh connection
    pub is_connected: bool,
    /// Access token issued by the provider
    pub access_token: String,
    /// Refresh token, when issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as milliseconds since the Unix epoch, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[derive(Clone, Debug)]
struct StoredConnection {
    expires_at: Option<DateTime<Utc>>,
}

/// Tracks which platforms currently hold a token
#[derive(Default)]
pub struct ConnectionStore {
    connections: RwLock<HashMap<&'static str, StoredConnection>>,
}

impl ConnectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful exchange and build the client view
    pub async fn connect(
        &self,
        provider: &'static ProviderStrategy,
        token: TokenResult,
        now: DateTime<Utc>,
    ) -> ConnectedPlatform {
        let expires_at = token
            .expires_in_seconds
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl));

        self.connections
            .write()
            .await
            .insert(provider.id, StoredConnection { expires_at });

        ConnectedPlatform {
            id: provider.id.to_string(),
            name: provider.display_name.to_string(),
            icon: format!("/{}-icon.png", provider.id),
            is_connected: true,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: expires_at.map(|t| t.timestamp_millis()),
        }
    }

    /// Whether a non-expired connection exists
    pub async fn is_connected(&self, provider: &ProviderStrategy, now: DateTime<Utc>) -> bool {
        self.connections
            .read()
            .await
            .get(provider.id)
            .is_some_and(|c| c.expires_at.is_none_or(|expiry| expiry > now))
    }

    /// Forget a connection. Returns whether one existed.
    pub async fn disconnect(&self, provider: &ProviderStrategy) -> bool {
        self.connections.write().await.remove(provider.id).is_some()
    }
}
