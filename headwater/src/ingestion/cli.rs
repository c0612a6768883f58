use std::time::Duration;

use clap::Args;

use super::IngestionServiceOptions;

#[derive(Args, Debug, Clone)]
pub struct IngestionArgs {
    /// How often to refresh the head block, in seconds.
    #[arg(
        long = "ingestion.head-interval-sec",
        env = "INGESTION_HEAD_INTERVAL_SEC",
        default_value = "5"
    )]
    pub head_interval_sec: u64,

    /// How often to scan for missing blocks, in seconds.
    #[arg(
        long = "ingestion.gap-interval-sec",
        env = "INGESTION_GAP_INTERVAL_SEC",
        default_value = "60"
    )]
    pub gap_interval_sec: u64,

    /// Maximum number of missing blocks fetched per chain per scan.
    #[arg(
        long = "ingestion.gap-limit",
        env = "INGESTION_GAP_LIMIT",
        default_value = "10"
    )]
    pub gap_limit: usize,
}

impl IngestionArgs {
    pub fn to_ingestion_options(&self) -> IngestionServiceOptions {
        IngestionServiceOptions {
            head_interval: Duration::from_secs(self.head_interval_sec),
            gap_interval: Duration::from_secs(self.gap_interval_sec),
            gap_limit: self.gap_limit,
        }
    }
}
