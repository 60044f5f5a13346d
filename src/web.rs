use crate::classify::FaceAttributes;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const PAGE_HEAD: &str = r#"<!doctype html>
<html>
<head>
  <title>Age &amp; Gender Detection</title>
</head>
<body>
  <h2>Upload a photo to detect age and gender</h2>
  <form method="post" enctype="multipart/form-data">
    <input type="file" name="file" required>
    <input type="submit" value="Detect">
  </form>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Renders the upload form, followed by a results list when `faces` is non-empty.
pub fn render_page(faces: &[FaceAttributes]) -> String {
    let mut page = String::from(PAGE_HEAD);
    if !faces.is_empty() {
        page.push_str("  <h3>Results:</h3>\n  <ul>\n");
        for face in faces {
            page.push_str(&format!("    <li>{face}</li>\n"));
        }
        page.push_str("  </ul>\n");
    }
    page.push_str(PAGE_TAIL);
    page
}

pub fn router(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(show_form).post(detect_upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(pipeline)
}

pub async fn serve(pipeline: Pipeline, cfg: &Config) -> Result<()> {
    let app = router(Arc::new(pipeline), cfg.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    info!(addr = %cfg.bind, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}

async fn show_form() -> Html<String> {
    Html(render_page(&[]))
}

async fn detect_upload(
    State(pipeline): State<Arc<Pipeline>>,
    multipart: Multipart,
) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let status = e.status();
            warn!(%status, "rejected upload: {e}");
            let body = if status == StatusCode::PAYLOAD_TOO_LARGE {
                "Upload too large"
            } else {
                "Malformed upload"
            };
            return (status, body).into_response();
        }
    };
    let Some(bytes) = upload else {
        debug!("no file in upload");
        return Html(render_page(&[])).into_response();
    };
    let image = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!(size = bytes.len(), "undecodable upload: {e}");
            return (StatusCode::BAD_REQUEST, "Could not read the image").into_response();
        }
    };
    match tokio::task::spawn_blocking(move || pipeline.analyze(&image)).await {
        Ok(Ok(analysis)) => {
            debug!(
                boxes = analysis.boxes.len(),
                faces = analysis.faces.len(),
                "upload analysed"
            );
            Html(render_page(&analysis.faces)).into_response()
        }
        Ok(Err(e)) => {
            error!("inference failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Inference failed").into_response()
        }
        Err(e) => {
            error!("inference task failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Inference failed").into_response()
        }
    }
}

/// Returns the bytes of the `file` part, or `None` when no file was chosen.
async fn read_upload(
    mut multipart: Multipart,
) -> std::result::Result<Option<Vec<u8>>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name().map_or(true, str::is_empty) {
            return Ok(None);
        }
        return Ok(Some(field.bytes().await?.to_vec()));
    }
    Ok(None)
}
