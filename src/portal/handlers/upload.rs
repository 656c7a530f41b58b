use super::{error_response, require_user};
use crate::{
    identity::SharedIdentity,
    portal::upload::{UploadError, UploadFile, UploadRelay, FILENAME_HEADER, FILE_FIELD},
};
use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart},
    http::{
        header::{CONTENT_TYPE, HeaderName},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info};
use utoipa::ToSchema;

/// Request body cap for `/api/upload` (10 MiB).
pub const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

const DEFAULT_FILE_NAME: &str = "upload.bin";

/// Multipart form accepted by `/api/upload`.
#[derive(ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Relayed; body is the upload endpoint's reply", body = String, content_type = "text/plain",
            headers(("x-filename" = String, description = "Stored file name"))),
        (status = 400, description = "Not a multipart form, or no `file` part", body = super::ErrorBody),
        (status = 401, description = "Missing or invalid session", body = super::ErrorBody),
        (status = 502, description = "Upload endpoint failed", body = super::ErrorBody),
        (status = 503, description = "No upload endpoint configured", body = super::ErrorBody),
    ),
    tag = "upload"
)]
pub async fn upload(
    headers: HeaderMap,
    Extension(identity): Extension<SharedIdentity>,
    relay: Option<Extension<Arc<UploadRelay>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let user = match require_user(&headers, identity.as_ref()).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let Some(Extension(relay)) = relay else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Upload is not configured");
    };

    // Only read the form once the caller is known and the relay is there.
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Rejecting malformed upload: {rejection}");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let file = match read_file(multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, "File is required"),
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    info!(user_id = %user.id, file_name = %file.file_name, "relaying upload");

    match relay.relay(file).await {
        Ok(receipt) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            if let Some(value) = receipt
                .file_name
                .as_deref()
                .and_then(|name| HeaderValue::from_str(name).ok())
            {
                headers.insert(HeaderName::from_static(FILENAME_HEADER), value);
            }
            (StatusCode::OK, headers, receipt.body).into_response()
        }
        Err(err @ UploadError::Status(_)) => {
            error!("Upload endpoint rejected file: {err}");
            error_response(StatusCode::BAD_GATEWAY, err.to_string())
        }
        Err(err) => {
            error!("Upload relay failed: {err}");
            error_response(StatusCode::BAD_GATEWAY, "Upload failed")
        }
    }
}

/// Pull the `file` part out of the form. Other parts are skipped.
async fn read_file(mut multipart: Multipart) -> Result<Option<UploadFile>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| format!("Multipart read error: {err}"))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| format!("Failed to read upload body: {err}"))?;

        return Ok(Some(UploadFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}
