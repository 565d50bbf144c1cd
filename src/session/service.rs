//! Session lifecycle: login, logout, liveness check.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::token::{Claims, TokenCodec, TokenError};

use super::models::SessionPayload;

/// Caller-supplied session attributes captured at login.
#[derive(Debug, Clone, Default)]
pub struct SessionAttrs {
    pub platform: Option<String>,
    pub version: Option<String>,
    pub obj: Option<Value>,
}

/// Issues and revokes sessions on top of [`TokenCodec`] + [`CacheStore`].
///
/// Token TTL and cache TTL are the same overdue window, so a token outlives
/// its cache entry only through explicit logout or eviction.
pub struct SessionService {
    codec: Arc<TokenCodec>,
    cache: Arc<dyn CacheStore>,
    key_prefix: String,
    overdue_secs: u64,
}

impl SessionService {
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

    /// Log a user in: invalidate `previous_token` (if its claims still
    /// decode), store the session payload under the derived key, and return
    /// the new token.
    ///
    /// In exclusive-login mode each login carries a distinct nonce, so
    /// concurrent sessions for one user + group coexist unless the previous
    /// token is handed in. Without exclusive mode the caller passes the
    /// requester's current token (when present) to get single-session
    /// semantics.
    pub fn auth(
        &self,
        group: &str,
        user_no: &str,
        roles: &str,
        attrs: SessionAttrs,
        previous_token: Option<&str>,
    ) -> Result<String, TokenError> {
        if let Some(previous) = previous_token {
            // Best effort: an undecodable previous token has no entry to drop.
            match self.codec.decode(previous) {
                Ok(old) => self.cache.remove(&self.entry_key(&old)),
                Err(e) => debug!("ignoring undecodable previous token: {e}"),
            }
        }

        let now_ms = Utc::now().timestamp_millis();
        let claims = if self.codec.exclusive() {
            Claims::with_nonce(user_no, group, now_ms, format!("E{now_ms}"))
        } else {
            Claims::new(user_no, group, now_ms)
        };
        let token = self.codec.encode(&claims)?;

        let payload = SessionPayload {
            user_no: user_no.to_string(),
            roles: roles.to_string(),
            platform: attrs.platform,
            version: attrs.version,
            client_ip: None,
            obj: attrs.obj,
        };
        let json = serde_json::to_string(&payload).expect("session payload serializes");
        self.cache.put(&self.entry_key(&claims), json, self.overdue_secs);

        info!(user_no, group, "session issued");
        Ok(token)
    }

    /// Remove the session behind `token`. Returns false if the token did not
    /// decode; the transport layer should clear the client's cookie either
    /// way.
    pub fn logout(&self, token: &str) -> bool {
        match self.codec.decode(token) {
            Ok(claims) => {
                self.cache.remove(&self.entry_key(&claims));
                info!(user_no = %claims.user_no, group = %claims.group, "session revoked");
                true
            }
            Err(e) => {
                debug!("logout with undecodable token: {e}");
                false
            }
        }
    }

    /// True iff `token` decodes and its cache entry is still live.
    pub fn check_token(&self, token: &str) -> bool {
        match self.codec.decode(token) {
            Ok(claims) => self.cache.get_expire(&self.entry_key(&claims)) > 0,
            Err(_) => false,
        }
    }

    fn entry_key(&self, claims: &Claims) -> String {
        format!("{}{}", self.key_prefix, claims.cache_key())
    }
}
