use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use headwater_observability::metrics::memory_rss_bytes;
use serde_json::json;
use tracing::warn;

use super::AppState;

/// Process-local check only: the process is alive while its resident memory
/// stays under the configured ceiling.
pub async fn liveness(State(state): State<AppState>) -> Response {
    match memory_rss_bytes() {
        Some(rss) if rss > state.memory_ceiling_bytes => {
            warn!(rss, ceiling = state.memory_ceiling_bytes, "liveness memory ceiling exceeded");
            unavailable()
        }
        _ => ok(),
    }
}

/// Liveness plus block store reachability.
pub async fn readiness(State(state): State<AppState>) -> Response {
    if let Some(rss) = memory_rss_bytes() {
        if rss > state.memory_ceiling_bytes {
            warn!(rss, ceiling = state.memory_ceiling_bytes, "readiness memory ceiling exceeded");
            return unavailable();
        }
    }

    match state.store.ping().await {
        Ok(()) => ok(),
        Err(err) => {
            warn!(error = ?err, "readiness database check failed");
            unavailable()
        }
    }
}

fn ok() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "unavailable" })),
    )
        .into_response()
}
