use anyhow::Result;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use portal::portal::upload::{UploadError, UploadFile, UploadRelay};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;

/// What the endpoint saw for one multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SeenPart {
    name: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

type Seen = Arc<Mutex<Vec<SeenPart>>>;

async fn record(State(seen): State<Seen>, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(SeenPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    let stored = parts
        .first()
        .and_then(|part| part.file_name.clone())
        .unwrap_or_default();
    seen.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .extend(parts);
    ([("x-filename", format!("stored-{stored}"))], "ok").into_response()
}

async fn spawn_endpoint(route: Router<Seen>) -> Result<(String, Seen)> {
    let seen = Seen::default();
    let app = route.with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/upload"), seen))
}

fn notes() -> UploadFile {
    UploadFile {
        file_name: "notes.txt".to_string(),
        content_type: Some("text/plain".to_string()),
        bytes: b"hello".to_vec(),
    }
}

#[tokio::test]
async fn relays_exactly_one_file_part() -> Result<()> {
    let (endpoint, seen) = spawn_endpoint(Router::new().route("/upload", post(record))).await?;
    let receipt = UploadRelay::new(&endpoint)?.relay(notes()).await?;

    assert_eq!(receipt.body, "ok");
    assert_eq!(receipt.file_name.as_deref(), Some("stored-notes.txt"));
    assert_eq!(
        seen.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        vec![SeenPart {
            name: Some("file".to_string()),
            file_name: Some("notes.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            bytes: b"hello".to_vec(),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn missing_filename_header_is_none() -> Result<()> {
    let (endpoint, _) = spawn_endpoint(
        Router::new().route("/upload", post(|| async { "stored" })),
    )
    .await?;
    let receipt = UploadRelay::new(&endpoint)?.relay(notes()).await?;

    assert_eq!(receipt.body, "stored");
    assert_eq!(receipt.file_name, None);
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_an_error() -> Result<()> {
    let (endpoint, _) = spawn_endpoint(Router::new().route(
        "/upload",
        post(|| async { (StatusCode::PAYLOAD_TOO_LARGE, "too big") }),
    ))
    .await?;
    let result = UploadRelay::new(&endpoint)?.relay(notes()).await;

    assert!(matches!(
        result,
        Err(UploadError::Status(status)) if status == StatusCode::PAYLOAD_TOO_LARGE
    ));
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() -> Result<()> {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let result = UploadRelay::new(&format!("http://{addr}/upload"))?
        .relay(notes())
        .await;
    assert!(matches!(result, Err(UploadError::Transport(_))));
    Ok(())
}
