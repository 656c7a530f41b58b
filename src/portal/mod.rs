use crate::identity::SharedIdentity;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod gate;
pub mod handlers;
mod openapi;
pub mod pages;
pub mod session;
pub mod state;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use openapi::openapi;

use gate::{DASHBOARD_PATH, LOGIN_PATH};
use handlers::{health, login, otp, protected, upload::UPLOAD_BODY_LIMIT, verify};
use session::CookieConfig;
use upload::UploadRelay;

const REQUEST_ID: &str = "x-request-id";

/// Build the portal router.
///
/// `upload` is optional; without it `/api/upload` answers `503`.
pub fn router(
    identity: SharedIdentity,
    cookies: CookieConfig,
    upload: Option<Arc<UploadRelay>>,
) -> Router {
    let guest = Router::new()
        .route(LOGIN_PATH, get(pages::login_page))
        .route("/verify", get(pages::verify_page))
        .route_layer(middleware::from_fn(gate::guest_gate));

    let members = Router::new()
        .route(DASHBOARD_PATH, get(pages::dashboard_page))
        .route_layer(middleware::from_fn(gate::profile_gate));

    let api = Router::new()
        .route("/api/auth", post(otp::request_otp))
        .route("/api/auth/login", post(login::login))
        .route("/api/auth/verify", post(verify::verify))
        .route("/api/protected", get(protected::protected))
        .route(
            "/api/upload",
            post(handlers::upload::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        );

    let mut app = Router::new()
        .route("/", get(|| async { Redirect::temporary(DASHBOARD_PATH) }))
        .route("/health", get(health::health))
        .merge(guest)
        .merge(members)
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()));

    if let Some(relay) = upload {
        app = app.layer(Extension(relay));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(REQUEST_ID),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                REQUEST_ID,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(identity))
            .layer(Extension(cookies)),
    )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gracefully shutdown");

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                error!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
