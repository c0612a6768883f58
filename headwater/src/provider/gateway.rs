use std::{
    collections::HashMap,
    env,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use error_stack::{Report, Result, ResultExt};
use url::Url;

use crate::core::{ChainId, NewBlockHeader};

use super::{
    chains::chain_display_name,
    http::{JsonRpcProvider, JsonRpcProviderError, JsonRpcProviderOptions},
    models::BlockExt,
};

const ETH_MAINNET_URL_VAR: &str = "RPC_ETH_MAINNET_URL";
const ETH_MAINNET_CHAIN_ID: ChainId = 1;

#[derive(Debug)]
pub enum RpcError {
    Unavailable,
    Timeout,
    RateLimited,
    ChainUnknown,
    NotFound,
}

/// Read access to one or more EVM chains.
///
/// The ingestion scheduler only sees this trait, so tests can swap the
/// JSON-RPC implementation for an in-memory one.
#[async_trait]
pub trait RpcGateway: Send + Sync + 'static {
    /// Chain IDs known at startup.
    fn chain_ids(&self) -> Vec<ChainId>;

    /// Human name for a chain, for log and metric labels only.
    fn chain_name(&self, chain_id: ChainId) -> String;

    /// Current tip height of the chain.
    async fn head_number(&self, chain_id: ChainId) -> Result<u64, RpcError>;

    /// Fully populated header at the given height.
    async fn block_by_number(
        &self,
        chain_id: ChainId,
        number: u64,
    ) -> Result<NewBlockHeader, RpcError>;
}

/// Gateway backed by one JSON-RPC transport per chain.
///
/// Chains are configured through the environment: `RPC_ETH_MAINNET_URL` for
/// chain 1 and `RPC_CHAIN_<N>_URL` for everything else. Transports are built
/// lazily on first use and cached; the cache is append-only.
pub struct JsonRpcGateway {
    chain_ids: Vec<ChainId>,
    urls: HashMap<ChainId, Url>,
    providers: RwLock<HashMap<ChainId, Arc<JsonRpcProvider>>>,
    options: JsonRpcProviderOptions,
}

impl JsonRpcGateway {
    pub fn new(chains: Vec<(ChainId, Url)>, options: JsonRpcProviderOptions) -> Self {
        let mut chain_ids: Vec<ChainId> = chains.iter().map(|(id, _)| *id).collect();
        chain_ids.sort_unstable();
        chain_ids.dedup();

        Self {
            chain_ids,
            urls: chains.into_iter().collect(),
            providers: RwLock::new(HashMap::new()),
            options,
        }
    }

    /// Build a gateway from the process environment.
    pub fn from_env(options: JsonRpcProviderOptions) -> Result<Self, RpcError> {
        Ok(Self::new(chains_from_env()?, options))
    }

    fn provider(&self, chain_id: ChainId) -> Result<Arc<JsonRpcProvider>, RpcError> {
        {
            let providers = self.providers.read().expect("provider cache lock poisoned");
            if let Some(provider) = providers.get(&chain_id) {
                return Ok(provider.clone());
            }
        }

        let url = self.resolve_url(chain_id)?;
        let provider = Arc::new(JsonRpcProvider::new(url, self.options.clone()));

        let mut providers = self.providers.write().expect("provider cache lock poisoned");
        let provider = providers.entry(chain_id).or_insert(provider);
        Ok(provider.clone())
    }

    fn resolve_url(&self, chain_id: ChainId) -> Result<Url, RpcError> {
        if let Some(url) = self.urls.get(&chain_id) {
            return Ok(url.clone());
        }

        // Chains may be configured after startup; consult the environment
        // again before giving up.
        let var = format!("RPC_CHAIN_{chain_id}_URL");
        let value = match env::var(&var) {
            Ok(value) if !value.is_empty() => value,
            _ if chain_id == ETH_MAINNET_CHAIN_ID => env::var(ETH_MAINNET_URL_VAR)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or(RpcError::ChainUnknown)
                .attach_printable("no RPC URL configured for ethereum mainnet")?,
            _ => {
                return Err(RpcError::ChainUnknown)
                    .attach_printable_lazy(|| format!("no RPC URL configured for chain {chain_id}"))
                    .attach_printable_lazy(|| format!("set {var} to configure it"));
            }
        };

        value
            .parse::<Url>()
            .change_context(RpcError::ChainUnknown)
            .attach_printable_lazy(|| format!("invalid RPC URL for chain {chain_id}"))
    }
}

#[async_trait]
impl RpcGateway for JsonRpcGateway {
    fn chain_ids(&self) -> Vec<ChainId> {
        self.chain_ids.clone()
    }

    fn chain_name(&self, chain_id: ChainId) -> String {
        chain_display_name(chain_id)
    }

    async fn head_number(&self, chain_id: ChainId) -> Result<u64, RpcError> {
        let provider = self.provider(chain_id)?;
        provider
            .get_head_number()
            .await
            .map_err(into_rpc_error)
            .attach_printable_lazy(|| format!("chain id: {chain_id}"))
    }

    async fn block_by_number(
        &self,
        chain_id: ChainId,
        number: u64,
    ) -> Result<NewBlockHeader, RpcError> {
        let provider = self.provider(chain_id)?;
        let block = provider
            .get_block_by_number(number)
            .await
            .map_err(into_rpc_error)
            .attach_printable_lazy(|| format!("chain id: {chain_id}"))?;

        block
            .to_new_header(chain_id)
            .ok_or(RpcError::Unavailable)
            .attach_printable("node returned a partial header")
            .attach_printable_lazy(|| format!("chain id: {chain_id}, block number: {number}"))
    }
}

/// Chains configured through the environment at this moment.
fn chains_from_env() -> Result<Vec<(ChainId, Url)>, RpcError> {
    let mut chains = Vec::new();

    for (key, value) in env::vars() {
        let Some(chain_id) = parse_chain_url_var(&key) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let url = value
            .parse::<Url>()
            .change_context(RpcError::ChainUnknown)
            .attach_printable_lazy(|| format!("invalid RPC URL in {key}"))?;
        chains.push((chain_id, url));
    }

    if let Ok(value) = env::var(ETH_MAINNET_URL_VAR) {
        if !value.is_empty() {
            let url = value
                .parse::<Url>()
                .change_context(RpcError::ChainUnknown)
                .attach_printable_lazy(|| format!("invalid RPC URL in {ETH_MAINNET_URL_VAR}"))?;
            chains.push((ETH_MAINNET_CHAIN_ID, url));
        }
    }

    Ok(chains)
}

fn parse_chain_url_var(key: &str) -> Option<ChainId> {
    let rest = key.strip_prefix("RPC_CHAIN_")?;
    let chain_id = rest.strip_suffix("_URL")?;
    chain_id.parse::<ChainId>().ok()
}

fn into_rpc_error(report: Report<JsonRpcProviderError>) -> Report<RpcError> {
    let kind = match report.current_context() {
        JsonRpcProviderError::Request => RpcError::Unavailable,
        JsonRpcProviderError::Timeout => RpcError::Timeout,
        JsonRpcProviderError::RateLimited => RpcError::RateLimited,
        JsonRpcProviderError::NotFound => RpcError::NotFound,
    };
    report.change_context(kind)
}

impl error_stack::Context for RpcError {}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Unavailable => write!(f, "RPC endpoint unavailable"),
            RpcError::Timeout => write!(f, "RPC request timed out"),
            RpcError::RateLimited => write!(f, "RPC request was rate limited"),
            RpcError::ChainUnknown => write!(f, "chain is not configured"),
            RpcError::NotFound => write!(f, "block not found"),
        }
    }
}
