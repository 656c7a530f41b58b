use super::{error_response, identity_failure, required, UserSummary, INTERNAL_ERROR};
use crate::{
    identity::SharedIdentity,
    portal::session::{set_session_cookies, CookieConfig},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[schema(format = Password)]
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookies set", body = LoginResponse),
        (status = 400, description = "Missing fields or rejected credentials", body = super::ErrorBody),
        (status = 500, description = "Identity service unavailable or session cookies could not be written", body = super::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    identity: Extension<SharedIdentity>,
    cookies: Extension<CookieConfig>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let (Some(email), Some(password)) = (
        required(request.email.as_ref()),
        required(request.password.as_ref()),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "Email and password are required");
    };

    let signed_in = match identity.sign_in_with_password(email, password).await {
        Ok(signed_in) => signed_in,
        Err(err) => return identity_failure("Password sign-in", err),
    };

    let mut headers = HeaderMap::new();
    if let Err(err) = set_session_cookies(&mut headers, &cookies, &signed_in.session) {
        error!("Failed to build session cookies: {err}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR);
    }

    info!(user_id = %signed_in.user.id, "password sign-in");

    (
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: UserSummary::from(&signed_in.user),
        }),
    )
        .into_response()
}
