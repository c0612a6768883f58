use std::time::Duration;

use clap::Args;
use error_stack::{Result, ResultExt};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::HeadwaterError;

#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Postgres connection string.
    #[arg(long = "database.url", env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum number of pooled connections.
    #[arg(
        long = "database.max-connections",
        env = "DATABASE_MAX_CONNECTIONS",
        default_value = "10"
    )]
    pub max_connections: u32,
}

impl StorageArgs {
    pub async fn connect(&self) -> Result<PgPool, HeadwaterError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&self.database_url)
            .await
            .change_context(HeadwaterError::Fatal)
            .attach_printable("failed to connect to the database")
    }
}
