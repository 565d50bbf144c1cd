//! Handler-side session extractor.

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::session::SessionPayload;

/// Extracts the [`SessionPayload`] the middleware attached to the request.
///
/// Only valid on routes behind the auth middleware with a decision that
/// attaches the session; elsewhere the extractor rejects with a 500, which
/// points at a route registration mistake rather than a client error.
#[derive(Debug)]
pub struct Session(pub SessionPayload);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionPayload>()
            .cloned()
            .map(Session)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "no session attached to this route",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_attached_session() {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(SessionPayload::new("u1", "ADMIN"));
        let (mut parts, _) = request.into_parts();

        let Session(payload) = Session::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(payload.user_no, "u1");
    }

    #[tokio::test]
    async fn test_rejects_without_session() {
        let request = Request::new(Body::empty());
        let (mut parts, _) = request.into_parts();

        let result = Session::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
