mod rpc;
mod start;
mod storage;

use clap::{Parser, Subcommand};
use error_stack::Result;
use tokio_util::sync::CancellationToken;

use crate::error::HeadwaterError;

pub use self::rpc::RpcArgs;
pub use self::start::StartCommand;
pub use self::storage::StorageArgs;

#[derive(Parser, Debug)]
#[command(name = "headwater", about = "EVM block header ingestion service", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the ingestion scheduler and the read API.
    Start(StartCommand),
}

impl Cli {
    pub async fn run(self, ct: CancellationToken) -> Result<(), HeadwaterError> {
        match self.command {
            Command::Start(command) => command.run(ct).await,
        }
    }
}
