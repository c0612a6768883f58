mod chains;
mod gateway;
mod http;
pub mod models;

pub use self::chains::chain_display_name;
pub use self::gateway::{JsonRpcGateway, RpcError, RpcGateway};
pub use self::http::{JsonRpcProvider, JsonRpcProviderError, JsonRpcProviderOptions};
