use std::time::Duration;

use crate::core::ChainId;

#[derive(Debug, Clone)]
pub struct IngestionMetrics;

impl IngestionMetrics {
    pub const HEAD_TICK_ERRORS_TOTAL: &'static str = "head_tick_errors_total";
    pub const GAP_SCAN_ERRORS_TOTAL: &'static str = "gap_scan_errors_total";
    pub const HEAD_BLOCK_NUMBER: &'static str = "head_block_number";
    pub const SCHEDULER_LAG_SECONDS: &'static str = "eventloop_or_scheduler_lag_seconds";

    pub fn init() {
        metrics::describe_counter!(
            Self::HEAD_TICK_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Total number of failed head ticks, per chain",
        );
        metrics::describe_counter!(
            Self::GAP_SCAN_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Total number of failed gap scans, per chain",
        );
        metrics::describe_gauge!(
            Self::HEAD_BLOCK_NUMBER,
            metrics::Unit::Count,
            "Last head block number observed per chain",
        );
        metrics::describe_gauge!(
            Self::SCHEDULER_LAG_SECONDS,
            metrics::Unit::Seconds,
            "Delay between a tick's scheduled and actual dispatch",
        );

        metrics::gauge!(Self::SCHEDULER_LAG_SECONDS).set(0.0);
    }

    pub fn record_head_tick_error(chain_id: ChainId) {
        metrics::counter!(
            Self::HEAD_TICK_ERRORS_TOTAL,
            "chain_id" => chain_id.to_string(),
        )
        .increment(1);
    }

    pub fn record_gap_scan_error(chain_id: ChainId) {
        metrics::counter!(
            Self::GAP_SCAN_ERRORS_TOTAL,
            "chain_id" => chain_id.to_string(),
        )
        .increment(1);
    }

    pub fn set_head(chain_id: ChainId, number: u64) {
        metrics::gauge!(
            Self::HEAD_BLOCK_NUMBER,
            "chain_id" => chain_id.to_string(),
        )
        .set(number as f64);
    }

    pub fn record_scheduler_lag(lag: Duration) {
        metrics::gauge!(Self::SCHEDULER_LAG_SECONDS).set(lag.as_secs_f64());
    }
}
