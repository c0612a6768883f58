use std::net::SocketAddr;

use clap::Args;
use error_stack::{Result, ResultExt};

use super::ServerError;

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// HTTP listen address.
    #[arg(
        long = "server.address",
        env = "SERVER_ADDRESS",
        default_value = "0.0.0.0"
    )]
    pub address: String,

    /// HTTP listen port.
    #[arg(long = "server.port", env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Liveness memory ceiling, in megabytes.
    #[arg(
        long = "server.memory-ceiling-mb",
        env = "SERVER_MEMORY_CEILING_MB",
        default_value = "2048"
    )]
    pub memory_ceiling_mb: u64,
}

impl ServerArgs {
    pub fn to_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.address, self.port)
            .parse::<SocketAddr>()
            .change_context(ServerError::Configuration)
            .attach_printable_lazy(|| {
                format!("invalid listen address: {}:{}", self.address, self.port)
            })
    }

    pub fn memory_ceiling_bytes(&self) -> u64 {
        self.memory_ceiling_mb * 1024 * 1024
    }
}
