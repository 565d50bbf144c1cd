//! Turns a raw token into a validated [`LogicSession`].

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::cache::CacheStore;
use crate::token::{TokenCodec, TokenError};

use super::models::{LogicSession, SessionPayload};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Malformed(#[from] TokenError),
    /// Issue timestamp plus the overdue window is in the past. Rejected
    /// regardless of cache state.
    #[error("token expired")]
    Expired,
}

/// Combines [`TokenCodec`] and a [`CacheStore`] into per-request session
/// resolution. Stateless apart from its shared components; safe to call
/// concurrently from any number of request tasks.
pub struct SessionResolver {
    codec: Arc<TokenCodec>,
    cache: Arc<dyn CacheStore>,
    key_prefix: String,
    overdue_secs: u64,
}

impl SessionResolver {
    pub fn new(
        codec: Arc<TokenCodec>,
        cache: Arc<dyn CacheStore>,
        key_prefix: impl Into<String>,
        overdue_secs: u64,
    ) -> Self {
        Self {
            codec,
            cache,
            key_prefix: key_prefix.into(),
            overdue_secs,
        }
    }

    /// Resolve `token` into a per-request session view.
    ///
    /// Decode failures and expiry are errors; a valid, unexpired token whose
    /// cache entry is missing is NOT an error, it resolves to a session with
    /// `valid_login == false`. Callers are expected to map `Err` into the
    /// anonymous session (clearing any stale client token) rather than
    /// failing the surrounding request.
    pub fn resolve(
        &self,
        token: &str,
        platform: Option<&str>,
        version: Option<&str>,
        client_ip: Option<&str>,
    ) -> Result<LogicSession, ResolveError> {
        let claims = self.codec.decode(token)?;

        let deadline = claims.issued_at_ms + (self.overdue_secs as i64) * 1000;
        if deadline < Utc::now().timestamp_millis() {
            return Err(ResolveError::Expired);
        }

        let key = format!("{}{}", self.key_prefix, claims.cache_key());
        let entry = self.cache.get(&key);
        let valid_login = entry.is_some();

        let payload = entry.and_then(|json| {
            serde_json::from_str::<SessionPayload>(&json)
                .map_err(|e| debug!(user_no = %claims.user_no, "unreadable session payload: {e}"))
                .ok()
                .map(|mut payload| {
                    // Attach request metadata for downstream auditing.
                    if payload.platform.is_none() {
                        payload.platform = platform.map(str::to_string);
                    }
                    if payload.version.is_none() {
                        payload.version = version.map(str::to_string);
                    }
                    payload.client_ip = client_ip.map(str::to_string);
                    payload
                })
        });

        Ok(LogicSession {
            valid_login,
            valid_token: true,
            payload,
        })
    }
}
