#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use error_stack::{Report, Result};
use headwater::{
    core::{ChainId, NewBlockHeader},
    provider::{RpcError, RpcGateway},
    storage::{ensure_schema, BlockStore},
};
use headwater_observability::metrics::DatabaseMetrics;
use sqlx::{postgres::PgPoolOptions, PgPool};
use testcontainers::{core::WaitFor, GenericImage};

pub fn new_postgres_image() -> GenericImage {
    GenericImage::new("postgres", "15-alpine")
        .with_exposed_port(5432)
        .with_env_var("POSTGRES_DB", "postgres")
        .with_env_var("POSTGRES_HOST_AUTH_METHOD", "trust")
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
}

pub async fn new_store(port: u16) -> (BlockStore, PgPool) {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&format!("postgresql://postgres@localhost:{port}"))
        .await
        .unwrap();

    ensure_schema(&pool).await.unwrap();

    let store = BlockStore::new(pool.clone(), DatabaseMetrics::default());
    (store, pool)
}

pub fn new_header(chain_id: ChainId, number: u64) -> NewBlockHeader {
    NewBlockHeader {
        chain_id,
        number,
        hash: format!("0xhash_{chain_id}_{number}"),
        parent_hash: format!("0xhash_{chain_id}_{}", number.saturating_sub(1)),
        timestamp: 1_700_000_000 + (number % 1_000) as u32,
    }
}

pub async fn seed_range(store: &BlockStore, chain_id: ChainId, numbers: impl Iterator<Item = u64>) {
    let headers: Vec<_> = numbers.map(|n| new_header(chain_id, n)).collect();
    store.insert_many(&headers).await.unwrap();
}

pub async fn count_rows(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM block_headers")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// In-memory RPC gateway for scheduler tests.
#[derive(Debug, Default)]
pub struct MockGateway {
    chains: Vec<ChainId>,
    heads: HashMap<ChainId, u64>,
    blocks: HashMap<(ChainId, u64), NewBlockHeader>,
    failing_heads: HashSet<ChainId>,
    failing_blocks: HashSet<(ChainId, u64)>,
}

impl MockGateway {
    pub fn new(chains: impl IntoIterator<Item = ChainId>) -> Self {
        Self {
            chains: chains.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_head(mut self, chain_id: ChainId, number: u64) -> Self {
        self.heads.insert(chain_id, number);
        self
    }

    pub fn with_block(mut self, header: NewBlockHeader) -> Self {
        self.blocks
            .insert((header.chain_id, header.number), header);
        self
    }

    /// `head_number` for this chain always fails with `Unavailable`.
    pub fn with_failing_head(mut self, chain_id: ChainId) -> Self {
        self.failing_heads.insert(chain_id);
        self
    }

    /// `block_by_number` for this height always fails with `Unavailable`.
    pub fn with_failing_block(mut self, chain_id: ChainId, number: u64) -> Self {
        self.failing_blocks.insert((chain_id, number));
        self
    }
}

#[async_trait]
impl RpcGateway for MockGateway {
    fn chain_ids(&self) -> Vec<ChainId> {
        self.chains.clone()
    }

    fn chain_name(&self, chain_id: ChainId) -> String {
        format!("chain-{chain_id}")
    }

    async fn head_number(&self, chain_id: ChainId) -> Result<u64, RpcError> {
        if self.failing_heads.contains(&chain_id) {
            return Err(Report::new(RpcError::Unavailable));
        }
        self.heads
            .get(&chain_id)
            .copied()
            .ok_or_else(|| Report::new(RpcError::ChainUnknown))
    }

    async fn block_by_number(
        &self,
        chain_id: ChainId,
        number: u64,
    ) -> Result<NewBlockHeader, RpcError> {
        if self.failing_blocks.contains(&(chain_id, number)) {
            return Err(Report::new(RpcError::Unavailable));
        }
        self.blocks
            .get(&(chain_id, number))
            .cloned()
            .ok_or_else(|| Report::new(RpcError::NotFound))
    }
}
