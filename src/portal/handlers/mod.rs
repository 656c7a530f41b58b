//! Auth action handlers.
//!
//! Every handler answers with JSON. Client input problems and upstream
//! rejections both map to `400` (the latter with the upstream text), missing
//! credentials to `401`, and anything unexpected (an unreachable or garbled
//! Identity Service included) to a generic `500` whose cause is only logged.

pub mod health;
pub mod login;
pub mod otp;
pub mod protected;
pub mod upload;
pub mod verify;

use crate::{
    identity::{IdentityError, IdentityService, User},
    portal::session::current_session,
};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

pub(crate) const INTERNAL_ERROR: &str = "Internal Server Error";
pub(crate) const UNAUTHORIZED: &str = "Unauthorized";

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map an Identity Service failure on an auth action.
///
/// Upstream rejections are `400` with the upstream text verbatim. Transport
/// and decode failures are logged and answered with a generic `500`.
pub(crate) fn identity_failure(action: &str, err: IdentityError) -> Response {
    match err {
        IdentityError::Rejected { status, message } => {
            debug!(%status, "{action} rejected: {message}");
            error_response(StatusCode::BAD_REQUEST, message)
        }
        err => {
            error!("{action} failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// Present and non-empty.
pub(crate) fn required(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.is_empty())
}

/// The `{id, email}` pair echoed back to clients.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Resolve the caller from the bearer header or session cookie.
///
/// Any failure is a `401 {"error":"Unauthorized"}`.
pub(crate) async fn require_user(
    headers: &HeaderMap,
    identity: &dyn IdentityService,
) -> Result<User, Response> {
    let Some(session) = current_session(headers) else {
        return Err(error_response(StatusCode::UNAUTHORIZED, UNAUTHORIZED));
    };

    identity
        .get_user(&session.access_token)
        .await
        .map_err(|err| {
            debug!("Rejecting unauthenticated API call: {err}");
            error_response(StatusCode::UNAUTHORIZED, UNAUTHORIZED)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_empty() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some(&String::new())), None);
        assert_eq!(required(Some(&"a@b.com".to_string())), Some("a@b.com"));
    }

    #[tokio::test]
    async fn identity_failure_hides_non_upstream_errors() -> anyhow::Result<()> {
        let rejected = identity_failure(
            "Password sign-in",
            IdentityError::rejected(StatusCode::FORBIDDEN, "Token has expired or is invalid"),
        );
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(rejected.into_body(), usize::MAX).await?;
        assert_eq!(
            serde_json::from_slice::<ErrorBody>(&body)?.error,
            "Token has expired or is invalid"
        );

        let decode = identity_failure(
            "Password sign-in",
            IdentityError::Decode("missing field `access_token` at http://10.0.0.5".to_string()),
        );
        assert_eq!(decode.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(decode.into_body(), usize::MAX).await?;
        assert_eq!(serde_json::from_slice::<ErrorBody>(&body)?.error, INTERNAL_ERROR);
        Ok(())
    }

    #[test]
    fn user_summary_copies_id_and_email() {
        let user = User {
            id: Uuid::from_u128(7),
            email: Some("a@b.com".to_string()),
        };
        let summary = UserSummary::from(&user);
        assert_eq!(summary.id, user.id);
        assert_eq!(summary.email.as_deref(), Some("a@b.com"));
    }
}
