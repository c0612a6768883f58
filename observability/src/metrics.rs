//! Prometheus recorder bootstrap and the narrow metric capabilities handed to
//! other components.

use std::{fmt, time::Duration};

use error_stack::{Result, ResultExt};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio_util::sync::CancellationToken;

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const HTTP_SERVER_REQUESTS_SECONDS: &str = "http_server_requests_seconds";
pub const DB_QUERY_SECONDS: &str = "db_query_seconds";
pub const DB_CONNECTIONS_ACTIVE: &str = "db_connections_active";
pub const DB_CONNECTIONS_IDLE: &str = "db_connections_idle";

const HTTP_BUCKETS: [f64; 8] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
const DB_BUCKETS: [f64; 8] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

#[derive(Debug)]
pub struct MetricsInitError;

impl error_stack::Context for MetricsInitError {}

impl fmt::Display for MetricsInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to initialize the metrics recorder")
    }
}

/// Install the global Prometheus recorder and return the handle used to
/// render the scrape output.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsInitError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_SERVER_REQUESTS_SECONDS.into()),
            &HTTP_BUCKETS,
        )
        .change_context(MetricsInitError)
        .attach_printable("invalid http histogram buckets")?
        .set_buckets_for_metric(Matcher::Full(DB_QUERY_SECONDS.into()), &DB_BUCKETS)
        .change_context(MetricsInitError)
        .attach_printable("invalid db histogram buckets")?
        .install_recorder()
        .change_context(MetricsInitError)
        .attach_printable("failed to install the global recorder")
}

/// Spawn the process metrics collector (memory, CPU, fds) on its own task.
pub fn spawn_process_collector(ct: CancellationToken) {
    tokio::spawn(async move {
        let collector = metrics_process::Collector::default();
        collector.describe();
        loop {
            collector.collect();
            tokio::select! {
                _ = ct.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(10)) => {}
            }
        }
    });
}

/// Record one served HTTP request.
///
/// `route` must already be normalized and capped by the caller (see
/// [`crate::request`]) so the label domain stays bounded.
pub fn record_http_request(method: &str, route: String, status_code: u16, elapsed: Duration) {
    metrics::histogram!(
        HTTP_SERVER_REQUESTS_SECONDS,
        "method" => method.to_string(),
        "route" => route,
        "status_code" => status_code.to_string(),
    )
    .record(elapsed.as_secs_f64());
}

/// Database metric capability handed to the block store at construction.
///
/// The store records through this handle instead of importing the metrics
/// surface, keeping the dependency one-directional.
#[derive(Debug, Clone, Default)]
pub struct DatabaseMetrics;

impl DatabaseMetrics {
    pub fn record_query(
        &self,
        model: &'static str,
        action: &'static str,
        success: bool,
        elapsed: Duration,
    ) {
        metrics::histogram!(
            DB_QUERY_SECONDS,
            "model" => model,
            "action" => action,
            "success" => if success { "true" } else { "false" },
        )
        .record(elapsed.as_secs_f64());
    }

    pub fn set_pool_connections(&self, active: u64, idle: u64) {
        metrics::gauge!(DB_CONNECTIONS_ACTIVE).set(active as f64);
        metrics::gauge!(DB_CONNECTIONS_IDLE).set(idle as f64);
    }
}

/// Resident set size of the current process, if the platform exposes it.
pub fn memory_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb = line
        .split_whitespace()
        .nth(1)
        .and_then(|value| value.parse::<u64>().ok())?;
    Some(kb * 1024)
}
