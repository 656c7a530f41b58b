use super::{error_response, identity_failure, required};
use crate::identity::SharedIdentity;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct OtpRequest {
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpResponse {
    pub success: bool,
    /// Upstream payload, passed through as-is.
    #[schema(value_type = Object)]
    pub data: Value,
}

#[utoipa::path(
    post,
    path = "/api/auth",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "One-time code sent", body = OtpResponse),
        (status = 400, description = "Missing email or upstream rejection", body = super::ErrorBody),
        (status = 500, description = "Identity service unavailable", body = super::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn request_otp(
    identity: Extension<SharedIdentity>,
    payload: Option<Json<OtpRequest>>,
) -> impl IntoResponse {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let Some(email) = required(request.email.as_ref()) else {
        return error_response(StatusCode::BAD_REQUEST, "Email is required");
    };

    // Unknown addresses get an account on first verification.
    match identity.sign_in_with_otp(email, true).await {
        Ok(data) => (StatusCode::OK, Json(OtpResponse { success: true, data })).into_response(),
        Err(err) => identity_failure("OTP request", err),
    }
}
