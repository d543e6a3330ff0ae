//! Rate limiting for login and registration.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::auth::extract_client_ip;
use crate::cli::IpExtractor;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default login attempts allowed per IP per minute.
pub const DEFAULT_LOGIN_PER_MINUTE: u32 = 10;

/// Default registrations allowed per IP per minute.
pub const DEFAULT_REGISTER_PER_MINUTE: u32 = 3;

/// Interval between sweeps of idle per-IP buckets.
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Requests allowed per IP per minute on each limited endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub login_per_minute: u32,
    pub register_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login_per_minute: DEFAULT_LOGIN_PER_MINUTE,
            register_per_minute: DEFAULT_REGISTER_PER_MINUTE,
        }
    }
}

/// Rate limiters for the authentication endpoints.
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts
    pub login: IpLimiter,
    /// Per-IP limiter for account creation
    pub register: IpLimiter,
    /// How the client IP is determined
    pub ip_extractor: Option<IpExtractor>,
}

impl RateLimitConfig {
    pub fn new(settings: &RateLimitSettings, ip_extractor: Option<IpExtractor>) -> Self {
        Self {
            login: RateLimiter::keyed(per_minute(settings.login_per_minute)),
            register: RateLimiter::keyed(per_minute(settings.register_per_minute)),
            ip_extractor,
        }
    }

    /// Drop buckets that have refilled completely. They are indistinguishable
    /// from a client that was never seen.
    pub fn prune(&self) {
        self.login.retain_recent();
        self.login.shrink_to_fit();
        self.register.retain_recent();
        self.register.shrink_to_fit();
    }
}

/// Spawn a background task that prunes idle buckets periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_prune_scheduler(config: Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);

        loop {
            interval.tick().await;
            config.prune();
            debug!(
                login = config.login.len(),
                register = config.register.len(),
                "Pruned rate limiter buckets"
            );
        }
    })
}

/// A zero rate is clamped to one request per minute.
fn per_minute(requests: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN))
}

async fn check_limit(
    config: &RateLimitConfig,
    limiter: &IpLimiter,
    request: Request,
    next: Next,
    message: &str,
) -> Response {
    let ip = match extract_client_ip(&request, config.ip_extractor.as_ref()) {
        Ok(ip) => ip,
        Err(reason) => {
            warn!(path = %request.uri().path(), reason, "Unable to determine client IP");
            return ApiError::forbidden("Unable to determine client IP.").into_response();
        }
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            ApiError::too_many_requests(message).into_response()
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check_limit(
        &config,
        &config.login,
        request,
        next,
        "Too many login attempts. Please wait before trying again.",
    )
    .await
}

/// Middleware for rate limiting account creation.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check_limit(
        &config,
        &config.register,
        request,
        next,
        "Too many signup attempts. Please wait before trying again.",
    )
    .await
}
