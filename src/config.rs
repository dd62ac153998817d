//! Configuration types for mediagrab
//!
//! Every field has a serde default, so an empty TOML file (or none at all)
//! yields a working configuration. [`load`] layers a TOML file, `MEDIAGRAB__*`
//! environment overrides and per-platform OAuth secrets on top of the defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, time::Duration};

const CONFIG_ENV_VAR: &str = "MEDIAGRAB_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/mediagrab.toml";
const ENV_PREFIX: &str = "MEDIAGRAB";
const ENV_SEPARATOR: &str = "__";

/// OAuth provider identifiers with built-in defaults
pub const OAUTH_PLATFORMS: [&str; 4] = ["instagram", "youtube", "tiktok", "twitter"];

/// Main configuration for the service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API settings (bind address, CORS, rate limiting)
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch and artifact storage settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// OAuth provider credentials
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "must allow at least one concurrent fetch".into(),
                key: Some("download.max_concurrent_fetches".into()),
            });
        }
        if self.download.fetch_timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch timeout must be greater than zero".into(),
                key: Some("download.fetch_timeout".into()),
            });
        }
        if self.download.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep interval must be greater than zero".into(),
                key: Some("download.sweep_interval".into()),
            });
        }
        if self.api.rate_limit.enabled {
            if self.api.rate_limit.max_requests == 0 {
                return Err(Error::Config {
                    message: "rate limit must allow at least one request".into(),
                    key: Some("api.rate_limit.max_requests".into()),
                });
            }
            if self.api.rate_limit.window.is_zero() || self.api.rate_limit.purge_interval.is_zero()
            {
                return Err(Error::Config {
                    message: "rate limit window and purge interval must be greater than zero"
                        .into(),
                    key: Some("api.rate_limit.window".into()),
                });
            }
        }
        if !self.api.artifact_prefix.starts_with('/') || self.api.artifact_prefix.ends_with('/') {
            return Err(Error::Config {
                message: format!(
                    "artifact prefix must start with '/' and not end with one, got {:?}",
                    self.api.artifact_prefix
                ),
                key: Some("api.artifact_prefix".into()),
            });
        }
        Ok(())
    }
}

/// API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:2500)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: local web and Expo dev servers)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Include structured causes in error responses (default: false)
    #[serde(default)]
    pub detailed_errors: bool,

    /// Public path prefix artifacts are served under (default: "/temp")
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            detailed_errors: false,
            artifact_prefix: default_artifact_prefix(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Fixed-window rate limiting configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per client per window (default: 100)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length (default: 900 seconds)
    #[serde(default = "default_rate_window", with = "duration_serde")]
    pub window: Duration,

    /// How often elapsed windows are purged (default: 300 seconds)
    #[serde(default = "default_purge_interval", with = "duration_serde")]
    pub purge_interval: Duration,

    /// Endpoints exempt from rate limiting
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// Key clients by the first X-Forwarded-For hop instead of the peer
    /// address (default: false; enable only behind a trusted proxy)
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window: default_rate_window(),
            purge_interval: default_purge_interval(),
            exempt_paths: default_exempt_paths(),
            trust_forwarded_for: false,
        }
    }
}

/// Fetch and artifact lifecycle configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory artifacts are written to (default: "<system temp>/mediagrab")
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Path to the yt-dlp binary (None = search PATH)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Deadline for a single fetch before the subprocess is killed (default: 300 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Maximum fetch subprocesses running at once (default: 4)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Smallest output, in bytes, accepted as a complete download (default: 1000)
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,

    /// Resolution cap for video format selection (default: 1080)
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// How long an artifact stays available (default: 900 seconds)
    #[serde(default = "default_artifact_ttl", with = "duration_serde")]
    pub artifact_ttl: Duration,

    /// How often expired artifacts are swept (default: 900 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,

    /// Refuse URLs pointing at loopback, private or link-local hosts (default: false)
    #[serde(default)]
    pub block_private_hosts: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            ytdlp_path: None,
            fetch_timeout: default_fetch_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            min_file_size: default_min_file_size(),
            max_height: default_max_height(),
            artifact_ttl: default_artifact_ttl(),
            sweep_interval: default_sweep_interval(),
            block_private_hosts: false,
        }
    }
}

/// OAuth configuration for all providers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Per-provider credentials keyed by provider id
    #[serde(default = "default_oauth_platforms")]
    pub platforms: HashMap<String, PlatformAuthConfig>,

    /// How long an issued authorize URL's state stays redeemable (default: 600 seconds)
    #[serde(default = "default_pending_ttl", with = "duration_serde")]
    pub pending_ttl: Duration,

    /// Timeout for token endpoint requests (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub http_timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            platforms: default_oauth_platforms(),
            pending_ttl: default_pending_ttl(),
            http_timeout: default_http_timeout(),
        }
    }
}

/// Credentials and endpoints for one OAuth provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlatformAuthConfig {
    /// OAuth client id (or TikTok client key)
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered with the provider
    #[serde(default)]
    pub redirect_uri: String,

    /// Requested scopes
    #[serde(default)]
    pub scope: Vec<String>,

    /// Override for the provider's authorize endpoint
    #[serde(default)]
    pub authorize_url: Option<String>,

    /// Override for the provider's token endpoint
    #[serde(default)]
    pub token_url: Option<String>,
}

impl PlatformAuthConfig {
    /// Defaults for a known provider: local callback URI and read-only scopes
    pub fn for_platform(platform: &str) -> Self {
        let scope: &[&str] = match platform {
            "instagram" => &["basic", "user_profile"],
            "youtube" => &["https://www.googleapis.com/auth/youtube.readonly"],
            "twitter" => &["tweet.read", "users.read"],
            "tiktok" => &["user.info.basic"],
            _ => &[],
        };
        Self {
            redirect_uri: format!("http://localhost:5173/auth/callback/{platform}"),
            scope: scope.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// True once a client id has been provided
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }
}

/// Log output configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output (default: false)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Load configuration from every source, in increasing priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file at `$MEDIAGRAB_CONFIG` or `config/mediagrab.toml` (if it exists)
/// 3. `MEDIAGRAB__SECTION__FIELD` environment variables (`.env` is read first)
/// 4. `<PLATFORM>_CLIENT_ID`, `_CLIENT_SECRET`, `_REDIRECT_URI` for OAuth
pub fn load() -> Result<Config> {
    // A missing .env file is the normal case
    let _ = dotenvy::dotenv();

    let config_path = std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_path(config_path)?;
    apply_platform_env(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific TOML path plus `MEDIAGRAB__*` overrides
pub fn load_from_path(config_path: PathBuf) -> Result<Config> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!(path = %config_path.display(), "loading configuration file");
        builder = builder.add_source(config::File::from(config_path).required(false));
    } else {
        tracing::debug!(
            path = %config_path.display(),
            "configuration file not found, using defaults and environment overrides"
        );
    }

    // MEDIAGRAB__API__BIND_ADDRESS -> api.bind_address
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder
        .build()
        .and_then(|c| c.try_deserialize::<Config>())
        .map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })
}

/// Fill OAuth credentials from conventional per-platform variables
///
/// Secrets are never expected in the TOML file. `lookup` abstracts the
/// environment so callers can supply their own source.
pub fn apply_platform_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for platform in OAUTH_PLATFORMS {
        let prefix = platform.to_uppercase();
        let entry = config
            .oauth
            .platforms
            .entry(platform.to_string())
            .or_insert_with(|| PlatformAuthConfig::for_platform(platform));

        if let Some(client_id) = lookup(&format!("{prefix}_CLIENT_ID")) {
            entry.client_id = client_id;
        }
        if let Some(client_secret) = lookup(&format!("{prefix}_CLIENT_SECRET")) {
            entry.client_secret = client_secret;
        }
        if let Some(redirect_uri) = lookup(&format!("{prefix}_REDIRECT_URI")) {
            entry.redirect_uri = redirect_uri;
        }
    }
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 2500))
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:8081".into(),
        "http://localhost:19006".into(),
    ]
}

fn default_artifact_prefix() -> String {
    "/temp".into()
}

fn default_max_requests() -> u32 {
    100
}

fn default_rate_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_purge_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_exempt_paths() -> Vec<String> {
    vec!["/".into(), "/health".into(), "/ready".into()]
}

fn default_storage_dir() -> PathBuf {
    std::env::temp_dir().join("mediagrab")
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_min_file_size() -> u64 {
    1000
}

fn default_max_height() -> u32 {
    1080
}

fn default_artifact_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_oauth_platforms() -> HashMap<String, PlatformAuthConfig> {
    OAUTH_PLATFORMS
        .iter()
        .map(|p| (p.to_string(), PlatformAuthConfig::for_platform(p)))
        .collect()
}

fn default_pending_ttl() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".into()
}
