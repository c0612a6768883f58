use std::time::Duration;

use alloy_provider::{network::Ethereum, Provider, ProviderBuilder};
use alloy_rpc_client::ClientBuilder;
use alloy_transport::BoxTransport;
use error_stack::{Result, ResultExt};
use url::Url;

use super::models;

#[derive(Debug)]
pub enum JsonRpcProviderError {
    Request,
    Timeout,
    RateLimited,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct JsonRpcProviderOptions {
    /// Request timeout.
    pub timeout: Duration,
}

/// JSON-RPC client for a single chain.
pub struct JsonRpcProvider {
    provider: Box<dyn Provider<BoxTransport, Ethereum>>,
    options: JsonRpcProviderOptions,
}

impl JsonRpcProvider {
    pub fn new(url: Url, options: JsonRpcProviderOptions) -> Self {
        let client = ClientBuilder::default().http(url);
        let provider = ProviderBuilder::default().on_client(client).boxed();

        Self {
            provider: Box::new(provider),
            options,
        }
    }

    /// The chain's current tip height.
    pub async fn get_head_number(&self) -> Result<u64, JsonRpcProviderError> {
        let request = self.provider.get_block_number();

        let Ok(response) = tokio::time::timeout(self.options.timeout, request).await else {
            return Err(JsonRpcProviderError::Timeout)
                .attach_printable("failed to get head block number");
        };

        response.map_err(|err| {
            let message = err.to_string();
            error_stack::Report::new(classify_request_error(&message)).attach_printable(message)
        })
    }

    /// The block at the given height, without transaction bodies.
    pub async fn get_block_by_number(
        &self,
        number: u64,
    ) -> Result<models::Block, JsonRpcProviderError> {
        let block_id = models::BlockId::Number(models::BlockNumberOrTag::Number(number));
        let request = self
            .provider
            .get_block(block_id, models::BlockTransactionsKind::Hashes);

        let Ok(response) = tokio::time::timeout(self.options.timeout, request).await else {
            return Err(JsonRpcProviderError::Timeout)
                .attach_printable("failed to get block by number")
                .attach_printable_lazy(|| format!("block number: {number}"));
        };

        response
            .map_err(|err| {
                let message = err.to_string();
                error_stack::Report::new(classify_request_error(&message))
                    .attach_printable(message)
                    .attach_printable(format!("block number: {number}"))
            })?
            .ok_or(JsonRpcProviderError::NotFound.into())
    }
}

fn classify_request_error(message: &str) -> JsonRpcProviderError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
    {
        JsonRpcProviderError::RateLimited
    } else {
        JsonRpcProviderError::Request
    }
}

impl Default for JsonRpcProviderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl error_stack::Context for JsonRpcProviderError {}

impl std::fmt::Display for JsonRpcProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonRpcProviderError::Request => write!(f, "failed to send request"),
            JsonRpcProviderError::Timeout => write!(f, "request timed out"),
            JsonRpcProviderError::RateLimited => write!(f, "request was rate limited"),
            JsonRpcProviderError::NotFound => write!(f, "not found"),
        }
    }
}
