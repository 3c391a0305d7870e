//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_HEADER: &str = "x-user-id";

/// The user making the request, as asserted by the upstream gateway.
///
/// Roles are not read from the request; the engine resolves them.
#[derive(Debug, Clone, Copy)]
pub struct ActorId(pub UserId);

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(ActorId)
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {USER_HEADER} header")))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn test_actor_from_header() {
        let user = UserId::new();
        let req = Request::builder()
            .header(USER_HEADER, user.to_string())
            .body(())
            .unwrap();

        let (mut parts, _) = req.into_parts();
        let actor = ActorId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(actor.0, user);
    }

    #[tokio::test]
    async fn test_missing_or_invalid_header() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let err = ActorId::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let req = Request::builder()
            .header(USER_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        assert!(ActorId::from_request_parts(&mut parts, &()).await.is_err());
    }
}
