use std::time::Duration;

use clap::Args;
use error_stack::{Result, ResultExt};

use crate::{
    error::HeadwaterError,
    provider::{JsonRpcGateway, JsonRpcProviderOptions},
};

#[derive(Args, Debug, Clone)]
pub struct RpcArgs {
    /// Request timeout.
    #[arg(long = "rpc.timeout-sec", env = "RPC_TIMEOUT_SEC", default_value = "5")]
    pub rpc_timeout_sec: u64,
}

impl RpcArgs {
    /// Build the gateway. Chains are configured through the environment:
    /// `RPC_ETH_MAINNET_URL` for chain 1 and `RPC_CHAIN_<N>_URL` for
    /// everything else.
    pub fn to_gateway(&self) -> Result<JsonRpcGateway, HeadwaterError> {
        let options = JsonRpcProviderOptions {
            timeout: Duration::from_secs(self.rpc_timeout_sec),
        };

        JsonRpcGateway::from_env(options).change_context(HeadwaterError::Configuration)
    }
}
