use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::analysis::DesignComparison;
use crate::server::router::{bad_request, error_response};
use crate::server::ServeState;
use crate::sessions::SessionPatch;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/api/analyze", post(analyze_handler))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(rename = "prodImage", default)]
    prod_image: Option<String>,
    #[serde(rename = "DesImage", default)]
    design_image: Option<String>,
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    comparison: DesignComparison,
}

/// Compare a production screenshot against a design screenshot. When the
/// caller omits the production image, the session's last capture is reused.
#[instrument(name = "probe.analyze", skip(state, req))]
async fn analyze_handler(
    State(state): State<ServeState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<Value>)> {
    let session = match req.session_id.as_deref() {
        Some(token) => match state.sessions.get(token) {
            Some(record) => (token.to_string(), record),
            None => return Err(bad_request("Invalid session ID")),
        },
        None => return Err(bad_request("Invalid session ID")),
    };
    let (session_id, record) = session;

    let Some(design_image) = req.design_image.filter(|payload| !payload.is_empty()) else {
        return Err(bad_request("design image payload is required"));
    };

    let prod_image = req
        .prod_image
        .filter(|payload| !payload.is_empty())
        .or_else(|| record.capture.map(|capture| capture.base64));
    let Some(prod_image) = prod_image else {
        return Err(bad_request("production image payload is required"));
    };

    let comparison = state
        .vision
        .compare(&prod_image, &design_image)
        .await
        .map_err(|err| {
            error!(%err, "comparison failed");
            error_response(&err)
        })?;

    state.sessions.update(
        &session_id,
        SessionPatch {
            comparison: Some(comparison.clone()),
            ..Default::default()
        },
    );

    info!(%session_id, "comparison pipeline complete");

    Ok(Json(AnalyzeResponse { comparison }))
}
