//! Rate limiting middleware for the API
//!
//! Fixed-window counting per client: the first request from a client opens a
//! window of `rate_limit.window`; every request inside it increments the
//! count, and requests beyond `max_requests` are refused with 429 until the
//! window ends. Elapsed windows are purged periodically.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::error::Error;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Outcome of a rate limit check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    /// Path is not rate limited (or limiting is disabled)
    Exempt,
    /// Request counted and allowed
    Allowed {
        /// Requests allowed per window
        limit: u32,
        /// Requests left in the current window
        remaining: u32,
        /// Time until the window resets
        reset_after: Duration,
    },
    /// Request refused
    Limited {
        /// Requests allowed per window
        limit: u32,
        /// Time until the window resets
        retry_after: Duration,
    },
}

/// Request count for one client in the current window
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window rate limiter keyed by client address
pub struct RateLimiter {
    /// Per-client windows
    windows: Mutex<HashMap<String, Window>>,
    /// Configuration
    config: RateLimitConfig,
    cancel_token: CancellationToken,
    purger: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
            cancel_token: CancellationToken::new(),
            purger: std::sync::Mutex::new(None),
        }
    }

    /// Whether requests from behind a proxy are keyed by `X-Forwarded-For`
    pub fn trusts_forwarded_for(&self) -> bool {
        self.config.trust_forwarded_for
    }

    /// Check if a path is exempt from rate limiting
    ///
    /// Matches exactly or as a prefix ending at a `/` boundary. `/` itself
    /// only ever matches exactly.
    fn is_path_exempt(&self, path: &str) -> bool {
        self.config.exempt_paths.iter().any(|exempt| {
            path == exempt
                || (exempt != "/"
                    && path
                        .strip_prefix(exempt.as_str())
                        .is_some_and(|rest| rest.starts_with('/')))
        })
    }

    /// Count a request from `key` to `path` at `now`
    pub async fn check(&self, path: &str, key: &str, now: Instant) -> RateDecision {
        if !self.config.enabled || self.is_path_exempt(path) {
            return RateDecision::Exempt;
        }

        let limit = self.config.max_requests;
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.config.window,
        });
        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + self.config.window;
        }
        window.count = window.count.saturating_add(1);

        let reset_after = window.reset_at.saturating_duration_since(now);
        if window.count > limit {
            RateDecision::Limited {
                limit,
                retry_after: reset_after,
            }
        } else {
            RateDecision::Allowed {
                limit,
                remaining: limit - window.count,
                reset_after,
            }
        }
    }

    /// Drop windows that have ended as of `now`. Returns how many were dropped.
    pub async fn purge(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| w.reset_at > now);
        before - windows.len()
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// Start the periodic purge task, stopped by [`shutdown`](Self::shutdown)
    pub fn start_purger(self: &Arc<Self>) {
        if !self.config.enabled {
            return;
        }
        let mut slot = match self.purger.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return;
        }

        let limiter = Arc::clone(self);
        let cancel_token = self.cancel_token.clone();
        let interval = self.config.purge_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = limiter.purge(Instant::now()).await;
                        if purged > 0 {
                            tracing::debug!(purged, "expired rate limit windows purged");
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        tracing::debug!("rate limit purger stopped");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the purge task and wait for it to exit
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let handle = match self.purger.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "rate limit purger task panicked");
        }
    }
}

/// Key identifying the client behind a request
///
/// The peer address, or the first `X-Forwarded-For` hop when the limiter is
/// configured to trust it.
fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for
        && let Some(first_hop) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
    {
        return first_hop.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// whole seconds, rounded up
fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req, limiter.trusts_forwarded_for());
    let decision = limiter.check(req.uri().path(), &key, Instant::now()).await;

    match decision {
        RateDecision::Exempt => next.run(req).await,
        RateDecision::Allowed {
            limit,
            remaining,
            reset_after,
        } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            set_header(headers, LIMIT_HEADER, limit.into());
            set_header(headers, REMAINING_HEADER, remaining.into());
            set_header(headers, RESET_HEADER, ceil_secs(reset_after));
            response
        }
        RateDecision::Limited { limit, retry_after } => {
            let retry_after_secs = ceil_secs(retry_after).max(1);
            tracing::warn!(
                client = %key,
                path = %req.uri().path(),
                retry_after_secs,
                "rate limit exceeded"
            );

            let mut response = Error::RateLimited { retry_after_secs }.into_response();
            let headers = response.headers_mut();
            set_header(headers, LIMIT_HEADER, limit.into());
            set_header(headers, REMAINING_HEADER, 0);
            set_header(headers, RESET_HEADER, retry_after_secs);
            set_header(headers, header::RETRY_AFTER, retry_after_secs);
            response
        }
    }
}
