//! Deny kinds and their JSON response bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// The three canonical denial outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyKind {
    /// No valid login session for this request.
    NotLoggedIn,
    /// A login exists but the presented token is not valid for it.
    TokenInvalid,
    /// Logged in, but none of the required roles are held.
    Forbidden,
}

impl DenyKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::Forbidden => "FORBIDDEN",
        }
    }
}

/// Configured status for one deny kind. `code` is a string on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyStatus {
    pub code: String,
    pub msg: String,
    pub http_status: u16,
}

/// The three deny statuses, overridable from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DenyStatuses {
    pub not_logged_in: DenyStatus,
    pub token_invalid: DenyStatus,
    pub forbidden: DenyStatus,
}

impl Default for DenyStatuses {
    fn default() -> Self {
        Self {
            not_logged_in: DenyStatus {
                code: "1001".into(),
                msg: "login required".into(),
                http_status: 401,
            },
            token_invalid: DenyStatus {
                code: "1002".into(),
                msg: "token invalid".into(),
                http_status: 401,
            },
            forbidden: DenyStatus {
                code: "1003".into(),
                msg: "permission denied".into(),
                http_status: 403,
            },
        }
    }
}

impl DenyStatuses {
    pub fn status(&self, kind: DenyKind) -> &DenyStatus {
        match kind {
            DenyKind::NotLoggedIn => &self.not_logged_in,
            DenyKind::TokenInvalid => &self.token_invalid,
            DenyKind::Forbidden => &self.forbidden,
        }
    }

    /// Build the terminal response for a denied request.
    pub fn response(&self, kind: DenyKind) -> Response {
        let status = self.status(kind);
        let http = StatusCode::from_u16(status.http_status).unwrap_or(StatusCode::UNAUTHORIZED);
        let body = DenyBody {
            msg: status.msg.clone(),
            code: status.code.clone(),
        };
        (http, Json(body)).into_response()
    }
}

/// Wire shape of a deny response.
#[derive(Debug, Serialize, Deserialize)]
pub struct DenyBody {
    pub msg: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_defaults() {
        let statuses = DenyStatuses::default();
        assert_ne!(
            statuses.not_logged_in.code,
            statuses.token_invalid.code
        );
        assert_ne!(statuses.token_invalid.code, statuses.forbidden.code);
        assert_eq!(statuses.forbidden.http_status, 403);
    }

    #[test]
    fn test_response_shape() {
        let statuses = DenyStatuses::default();
        let response = statuses.response(DenyKind::Forbidden);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_bad_http_status_falls_back() {
        let mut statuses = DenyStatuses::default();
        statuses.not_logged_in.http_status = 0;
        let response = statuses.response(DenyKind::NotLoggedIn);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DenyKind::NotLoggedIn.name(), "NOT_LOGGED_IN");
        assert_eq!(DenyKind::Forbidden.name(), "FORBIDDEN");
    }
}
