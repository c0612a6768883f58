mod cli;
mod error;
mod metrics;
mod service;

pub use self::cli::IngestionArgs;
pub use self::error::IngestionError;
pub use self::metrics::IngestionMetrics;
pub use self::service::{IngestionService, IngestionServiceOptions};
