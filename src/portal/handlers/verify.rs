//! OTP verification.
//!
//! Flow Overview:
//! 1) Verify the emailed code upstream (`email` channel).
//! 2) If a session was issued, provision the caller's `users` row.
//! 3) Establish the session upstream and hand it to the browser as cookies.
//!
//! Steps 2 and 3 only run after upstream already accepted the code, so their
//! failures are ours: logged, and reported as a generic `500`.

use super::{error_response, identity_failure, required, INTERNAL_ERROR};
use crate::{
    identity::{IdentityError, IdentityService, Profile, Session, SharedIdentity, SignedIn, User},
    portal::session::{set_session_cookies, CookieConfig},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyResponse {
    pub success: bool,
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[utoipa::path(
    post,
    path = "/api/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Code accepted; profile provisioned and session cookies set", body = VerifyResponse),
        (status = 400, description = "Missing fields or invalid code", body = super::ErrorBody),
        (status = 500, description = "Identity service unavailable, or provisioning or session setup failed", body = super::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn verify(
    Extension(identity): Extension<SharedIdentity>,
    cookies: Extension<CookieConfig>,
    payload: Option<Json<VerifyRequest>>,
) -> Response {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let (Some(email), Some(token)) = (
        required(request.email.as_ref()),
        required(request.token.as_ref()),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "Email and token are required");
    };

    let outcome = match identity.verify_otp(email, token).await {
        Ok(outcome) => outcome,
        Err(err) => return identity_failure("OTP verification", err),
    };

    let Some(session) = outcome.session else {
        // Verified without a session: nothing to provision or persist.
        return (
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                user: outcome.user,
                session: None,
            }),
        )
            .into_response();
    };

    let signed_in =
        match complete_verification(identity.as_ref(), email, outcome.user, &session).await {
            Ok(signed_in) => signed_in,
            Err(err) => {
                error!("Failed to complete OTP verification: {err}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR);
            }
        };

    let mut headers = HeaderMap::new();
    if let Err(err) = set_session_cookies(&mut headers, &cookies, &signed_in.session) {
        error!("Failed to build session cookies: {err}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR);
    }

    (
        StatusCode::OK,
        headers,
        Json(VerifyResponse {
            success: true,
            user: Some(signed_in.user),
            session: Some(signed_in.session),
        }),
    )
        .into_response()
}

/// Provision the profile row, then establish the session.
async fn complete_verification(
    identity: &dyn IdentityService,
    email: &str,
    user: Option<User>,
    session: &Session,
) -> Result<SignedIn, IdentityError> {
    let user = match user {
        Some(user) => user,
        None => identity.get_user(&session.access_token).await?,
    };

    let profile = Profile {
        user_id: user.id,
        email: user.email.clone().unwrap_or_else(|| email.to_string()),
        name: None,
    };
    identity.provision_profile(session, &profile).await?;
    info!(user_id = %user.id, "profile provisioned");

    identity.set_session(session).await
}
