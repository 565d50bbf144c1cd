//! Session payload and the per-request logic view.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-held session record, stored JSON-serialized in the cache.
///
/// `roles` is a comma-joined set of role names, matching the cache wire
/// shape. Platform/version/client-IP are informational metadata for
/// auditing; they never invalidate a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub user_no: String,
    pub roles: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Arbitrary caller-supplied attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<Value>,
}

impl SessionPayload {
    pub fn new(user_no: impl Into<String>, roles: impl Into<String>) -> Self {
        Self {
            user_no: user_no.into(),
            roles: roles.into(),
            platform: None,
            version: None,
            client_ip: None,
            obj: None,
        }
    }

    /// Role names held by this session, trimmed, empties dropped.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    /// True if any of `required` is held by this session.
    pub fn has_any_role<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.role_names()
            .any(|held| required.iter().any(|r| r.as_ref() == held))
    }
}

/// Transient per-request session view. Built fresh for every request and
/// discarded with it; never persisted.
///
/// A session is fully valid only when both flags hold: a structurally valid
/// unexpired token whose cache entry is gone (logout elsewhere, eviction)
/// yields `valid_login == false`, not an error.
#[derive(Debug, Clone, Default)]
pub struct LogicSession {
    pub valid_login: bool,
    pub valid_token: bool,
    pub payload: Option<SessionPayload>,
}

impl LogicSession {
    /// The unauthenticated view: no token, or resolution failed.
    pub fn anonymous() -> Self {
        Self::default()
    }
}
