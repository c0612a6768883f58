use std::time::Instant;

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use headwater_observability::metrics::record_http_request;

use super::AppState;

/// Time every request into `http_server_requests_seconds`.
///
/// The path is normalized and capped against the route allow-list before it
/// becomes a label.
pub async fn track(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(
        method.as_str(),
        state.routes.label(&path),
        response.status().as_u16(),
        started.elapsed(),
    );

    response
}
