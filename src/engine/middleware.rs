//! Axum middleware hosting the decision engine.
//!
//! Flow per request: whitelist check → token transport (header, then
//! cookie) → session resolution (failures become the anonymous session and
//! clear the client's stale cookie) → capability lookup by route identity →
//! [`decide`](super::decide). Allow attaches the session payload to request
//! extensions; deny short-circuits with the configured JSON body. The
//! whitelist/capability check always runs before the downstream handler.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{HeaderMap, HeaderValue, Request, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheStore, ExpiringCache};
use crate::config::AuthConfig;
use crate::session::{LogicSession, SessionResolver, SessionService};
use crate::token::TokenCodec;
use crate::whitelist::RouteWhitelist;

use super::capability::CapabilityRegistry;
use super::decision::{Decision, decide};
use super::error::DenyStatuses;

/// Shared middleware state, explicitly constructed and owned by the server
/// that mounts it. Multiple independent instances can coexist (separate
/// caches, separate whitelists), which tests rely on.
#[derive(Clone)]
pub struct AuthState {
    pub resolver: Arc<SessionResolver>,
    pub sessions: Arc<SessionService>,
    pub whitelist: Arc<RouteWhitelist>,
    pub registry: Arc<CapabilityRegistry>,
    pub deny: DenyStatuses,
    pub token_header: String,
    pub platform_header: String,
    pub version_header: String,
}

impl AuthState {
    /// Build the full component stack from configuration with the bundled
    /// in-memory cache.
    ///
    /// The only fallible step is cache construction; a loading cache without
    /// a loader must abort startup here rather than degrade per-request.
    pub fn from_config(config: &AuthConfig) -> Result<Self, CacheError> {
        let mut builder = ExpiringCache::builder(config.overdue_secs)
            .initial_capacity(config.cache.initial_capacity)
            .max_capacity(config.cache.max_capacity)
            .record_stats(config.cache.record_stats)
            .loading(config.cache.loading);
        if config.cache.lanes > 0 {
            builder = builder.lanes(config.cache.lanes);
        }
        Ok(Self::with_store(config, Arc::new(builder.build()?)))
    }

    /// Same as [`from_config`](Self::from_config) but over a caller-supplied
    /// backing store (e.g. Redis-backed).
    pub fn with_store(config: &AuthConfig, cache: Arc<dyn CacheStore>) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.secret, config.exclusive_login));
        let resolver = Arc::new(SessionResolver::new(
            Arc::clone(&codec),
            Arc::clone(&cache),
            config.token_prefix.clone(),
            config.overdue_secs,
        ));
        let sessions = Arc::new(SessionService::new(
            codec,
            cache,
            config.token_prefix.clone(),
            config.overdue_secs,
        ));
        Self {
            resolver,
            sessions,
            whitelist: Arc::new(RouteWhitelist::with_patterns(&config.whitelist)),
            registry: Arc::new(CapabilityRegistry::new()),
            deny: config.deny.clone(),
            token_header: config.token_header.clone(),
            platform_header: config.platform_header.clone(),
            version_header: config.version_header.clone(),
        }
    }
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if state.whitelist.is_whitelisted(&path) {
        return next.run(request).await;
    }

    let headers = request.headers();
    let token = extract_token(headers, &state.token_header);
    let platform = header_value(headers, &state.platform_header);
    let version = header_value(headers, &state.version_header);
    let ip = client_ip(headers);

    let mut clear_cookie = false;
    let session = match &token {
        None => LogicSession::anonymous(),
        Some(token) => match state.resolver.resolve(
            token,
            platform.as_deref(),
            version.as_deref(),
            ip.as_deref(),
        ) {
            Ok(session) => session,
            Err(e) => {
                // Fail open to anonymous; a stale cookie must not take down
                // unrelated unauthenticated traffic.
                debug!(%path, "session resolution failed: {e}");
                clear_cookie = true;
                LogicSession::anonymous()
            }
        },
    };

    // Route identity is the matched route template when available, the raw
    // path otherwise.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let descriptor = state.registry.lookup(&route).unwrap_or_default();

    let mut response = match decide(&descriptor, &session) {
        Decision::Allow { attach } => {
            if attach {
                if let Some(payload) = session.payload {
                    request.extensions_mut().insert(payload);
                }
            }
            next.run(request).await
        }
        Decision::Deny(kind) => {
            warn!(%path, kind = kind.name(), "request denied");
            state.deny.response(kind)
        }
    };

    if clear_cookie {
        let expired = format!("{}=; Max-Age=0; Path=/", state.token_header);
        if let Ok(value) = HeaderValue::from_str(&expired) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Token transport: named header first, cookie of the same name second.
pub fn extract_token(headers: &HeaderMap, name: &str) -> Option<String> {
    header_value(headers, name)
        .filter(|v| !v.is_empty())
        .or_else(|| cookie_value(headers, name))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k.trim() == name && !v.trim().is_empty()).then(|| v.trim().to_string())
    })
}

/// Best-effort client IP: first usable `x-forwarded-for` hop, then
/// `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(hop) = forwarded
            .split(',')
            .map(str::trim)
            .find(|hop| !hop.is_empty() && !hop.eq_ignore_ascii_case("unknown"))
        {
            return Some(hop.to_string());
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
