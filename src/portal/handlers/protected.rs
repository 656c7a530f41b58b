use super::{require_user, UserSummary};
use crate::identity::SharedIdentity;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: UserSummary,
}

#[utoipa::path(
    get,
    path = "/api/protected",
    responses(
        (status = 200, description = "Caller is signed in", body = ProtectedResponse),
        (status = 401, description = "Missing or invalid session", body = super::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn protected(
    headers: HeaderMap,
    Extension(identity): Extension<SharedIdentity>,
) -> impl IntoResponse {
    let user = match require_user(&headers, identity.as_ref()).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    (
        StatusCode::OK,
        Json(ProtectedResponse {
            message: "Protected data".to_string(),
            user: UserSummary::from(&user),
        }),
    )
        .into_response()
}
