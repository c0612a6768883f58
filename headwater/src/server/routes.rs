use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use headwater_observability::metrics::PROMETHEUS_CONTENT_TYPE;
use serde_json::json;
use tracing::error;

use crate::core::{BlockHeaderDto, ChainId};

use super::AppState;

pub async fn health() -> Response {
    Json(json!({ "ok": true })).into_response()
}

pub async fn latest(State(state): State<AppState>, Path(chain_id): Path<String>) -> Response {
    let Ok(chain_id) = chain_id.parse::<ChainId>() else {
        return bad_request();
    };

    match state.store.latest(chain_id).await {
        Ok(Some(block)) => Json(BlockHeaderDto::from(block)).into_response(),
        Ok(None) => not_found_sentinel(),
        Err(err) => {
            error!(chain_id, error = ?err, "failed to read the latest block");
            internal_error()
        }
    }
}

pub async fn by_number(
    State(state): State<AppState>,
    Path((chain_id, number)): Path<(String, String)>,
) -> Response {
    let Ok(chain_id) = chain_id.parse::<ChainId>() else {
        return bad_request();
    };
    // Heights are 64-bit; anything that does not parse as one is malformed.
    let Ok(number) = number.parse::<u64>() else {
        return bad_request();
    };

    match state.store.by_number(chain_id, number).await {
        Ok(Some(block)) => Json(BlockHeaderDto::from(block)).into_response(),
        Ok(None) => not_found_sentinel(),
        Err(err) => {
            error!(chain_id, number, error = ?err, "failed to read a block by number");
            internal_error()
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics_handle.render(),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Empty results are 200 with a sentinel body, not 404: existing consumers
/// dispatch on the body and reserve non-2xx for infrastructure failures.
fn not_found_sentinel() -> Response {
    Json(json!({ "error": "Not found" })).into_response()
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Bad request" }))).into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
