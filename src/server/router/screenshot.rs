use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::analysis::UxAudit;
use crate::server::router::{bad_request, error_response};
use crate::server::ServeState;
use crate::sessions::{CaptureRecord, SessionPatch};

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/api/screenshot", post(screenshot_handler))
}

#[derive(Debug, Deserialize)]
struct ScreenshotRequest {
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ScreenshotResponse {
    image: String,
    #[serde(rename = "filePath")]
    file_path: String,
    width: u32,
    height: u32,
    analysis: UxAudit,
}

/// Capture → persist → audit → record. Inputs are validated before any
/// component with side effects runs, and the session is patched only after
/// every stage has succeeded, so a failed run never overwrites a previous
/// capture with partial data.
#[instrument(name = "probe.screenshot", skip(state, req))]
async fn screenshot_handler(
    State(state): State<ServeState>,
    Json(req): Json<ScreenshotRequest>,
) -> Result<Json<ScreenshotResponse>, (StatusCode, Json<Value>)> {
    let session_id = match req.session_id.as_deref() {
        Some(token) if state.sessions.exists(token) => token.to_string(),
        _ => return Err(bad_request("Invalid session ID")),
    };

    let Some(url) = req.url.as_deref().filter(|url| !url.is_empty()) else {
        return Err(bad_request("URL is required"));
    };
    if let Err(err) = url::Url::parse(url) {
        return Err(bad_request(&format!("invalid URL: {err}")));
    }

    let capture = state
        .capture
        .capture(url, &state.capture_options)
        .await
        .map_err(|err| {
            error!(%err, %url, "capture failed");
            error_response(&err)
        })?;

    let artifact = state.artifacts.persist(&capture.png).await.map_err(|err| {
        error!(%err, "artifact persistence failed");
        error_response(&err)
    })?;

    let analysis = state.vision.audit(&capture.png).await.map_err(|err| {
        error!(%err, "audit failed");
        error_response(&err)
    })?;

    let file_path = artifact.path.display().to_string();
    state.sessions.update(
        &session_id,
        SessionPatch {
            capture: Some(CaptureRecord {
                base64: artifact.base64.clone(),
                file_path: file_path.clone(),
                width: capture.width,
                height: capture.height,
            }),
            dom: Some(capture.html),
            styles: Some(capture.stylesheets),
            audit: Some(analysis.clone()),
            ..Default::default()
        },
    );

    info!(%session_id, %url, width = capture.width, height = capture.height, "screenshot pipeline complete");

    Ok(Json(ScreenshotResponse {
        image: artifact.base64,
        file_path,
        width: capture.width,
        height: capture.height,
        analysis,
    }))
}
