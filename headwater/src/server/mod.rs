mod cli;
mod health;
mod request_metrics;
mod routes;

use std::{net::SocketAddr, sync::Arc};

use axum::{middleware, routing::get, Router};
use error_stack::{Result, ResultExt};
use headwater_observability::request::RouteAllowList;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::storage::BlockStore;

pub use self::cli::ServerArgs;

#[derive(Debug)]
pub enum ServerError {
    Configuration,
    Bind,
    Serve,
}

#[derive(Clone)]
pub struct AppState {
    pub store: BlockStore,
    pub metrics_handle: PrometheusHandle,
    pub memory_ceiling_bytes: u64,
    pub routes: Arc<RouteAllowList>,
}

/// Route templates this server is allowed to record as metric labels.
pub fn route_allow_list() -> RouteAllowList {
    RouteAllowList::new([
        "/evm/blocks/health",
        "/evm/blocks/:id/latest",
        "/evm/blocks/:id/:id",
        "/health/liveness",
        "/health/readiness",
        "/metrics",
    ])
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/evm/blocks/health", get(routes::health))
        .route("/evm/blocks/:chain_id/latest", get(routes::latest))
        .route("/evm/blocks/:chain_id/:number", get(routes::by_number))
        .route("/health/liveness", get(health::liveness))
        .route("/health/readiness", get(health::readiness))
        .route("/metrics", get(routes::metrics))
        .fallback(routes::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_metrics::track,
        ))
        .with_state(state)
}

/// Serve the read API until the token is cancelled.
pub async fn serve(
    state: AppState,
    address: SocketAddr,
    ct: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .change_context(ServerError::Bind)
        .attach_printable_lazy(|| format!("address: {address}"))?;

    info!(%address, "starting http server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .change_context(ServerError::Serve)
}

impl error_stack::Context for ServerError {}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Configuration => write!(f, "invalid server configuration"),
            ServerError::Bind => write!(f, "failed to bind the http listener"),
            ServerError::Serve => write!(f, "http server failed"),
        }
    }
}
