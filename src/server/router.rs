use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::errors::PipelineError;

use super::state::ServeState;

mod analyze;
mod screenshot;
mod sessions;

/// Inline image payloads travel in JSON bodies, so the limit is generous.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: ServeState) -> Router {
    Router::new()
        .route("/", get(welcome_handler))
        .merge(sessions::router())
        .merge(screenshot::router())
        .merge(analyze::router())
        .layer(cors_layer())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn welcome_handler() -> &'static str {
    "Welcome to PixelProbe!"
}

/// Every failure maps to a JSON object with a single descriptive `error`
/// string; no structured codes are exposed.
pub(crate) fn error_response(err: &PipelineError) -> (StatusCode, Json<Value>) {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.to_string() })))
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    error_response(&PipelineError::validation(message))
}
