use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::server::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/api/start", post(start_session_handler))
}

#[derive(Serialize)]
struct StartSessionResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn start_session_handler(State(state): State<ServeState>) -> Json<StartSessionResponse> {
    let session_id = state.sessions.create();
    debug!(%session_id, "session created");
    Json(StartSessionResponse { session_id })
}
