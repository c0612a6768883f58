use clap::Parser;
use error_stack::{Result, ResultExt};
use headwater::{cli::Cli, error::HeadwaterError};
use headwater_observability::init_telemetry;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<(), HeadwaterError> {
    let args = Cli::parse();

    init_telemetry().change_context(HeadwaterError::Fatal)?;

    let ct = CancellationToken::new();
    tokio::spawn({
        let ct = ct.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("received ctrl-c, shutting down");
                ct.cancel();
            }
        }
    });

    args.run(ct).await
}
