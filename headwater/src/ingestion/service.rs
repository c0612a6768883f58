use std::{sync::Arc, time::Duration};

use error_stack::{Report, Result, ResultExt};
use tokio::{task::JoinSet, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    core::ChainId,
    provider::{RpcError, RpcGateway},
    storage::BlockStore,
};

use super::{error::IngestionError, metrics::IngestionMetrics};

#[derive(Debug, Clone)]
pub struct IngestionServiceOptions {
    /// How often to refresh each chain's head block.
    pub head_interval: Duration,
    /// How often to scan each chain for missing blocks.
    pub gap_interval: Duration,
    /// Maximum number of missing blocks fetched per chain per scan.
    pub gap_limit: usize,
}

/// Drives the two periodic ingestion loops.
///
/// The head tick follows each chain's tip; the gap scan repairs holes inside
/// the already-stored range. The store's latest block is the only cursor:
/// the service keeps no bookkeeping of its own, so restarts are harmless and
/// the two loops coordinate purely through the store's idempotent upsert.
pub struct IngestionService<G>
where
    G: RpcGateway,
{
    gateway: Arc<G>,
    store: BlockStore,
    chain_ids: Vec<ChainId>,
    options: IngestionServiceOptions,
}

impl<G> IngestionService<G>
where
    G: RpcGateway,
{
    pub fn new(gateway: Arc<G>, store: BlockStore, options: IngestionServiceOptions) -> Self {
        let chain_ids = gateway.chain_ids();
        Self {
            gateway,
            store,
            chain_ids,
            options,
        }
    }

    /// Run both loops until the token is cancelled.
    ///
    /// In-flight per-chain work is bounded by the loop period and awaited
    /// before this returns.
    pub async fn start(self, ct: CancellationToken) -> Result<(), IngestionError> {
        IngestionMetrics::init();

        if self.chain_ids.is_empty() {
            warn!("no chains configured, ingestion is idle");
        }

        let service = Arc::new(self);

        let head_handle = tokio::spawn({
            let service = service.clone();
            let ct = ct.clone();
            async move { service.head_loop(ct).await }
        });
        let gap_handle = tokio::spawn({
            let service = service.clone();
            let ct = ct.clone();
            async move { service.gap_loop(ct).await }
        });

        let (head, gap) = tokio::join!(head_handle, gap_handle);
        head.change_context(IngestionError::TaskJoin)?;
        gap.change_context(IngestionError::TaskJoin)?;

        Ok(())
    }

    async fn head_loop(&self, ct: CancellationToken) {
        info!(interval = ?self.options.head_interval, "starting head tick loop");

        let mut interval = tokio::time::interval(self.options.head_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    info!("head tick loop shutting down");
                    break;
                }
                tick = interval.tick() => {
                    IngestionMetrics::record_scheduler_lag(tick.elapsed());
                    self.tick_head().await;
                }
            }
        }
    }

    async fn gap_loop(&self, ct: CancellationToken) {
        info!(interval = ?self.options.gap_interval, "starting gap scan loop");

        let mut interval = tokio::time::interval(self.options.gap_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    info!("gap scan loop shutting down");
                    break;
                }
                tick = interval.tick() => {
                    IngestionMetrics::record_scheduler_lag(tick.elapsed());
                    self.scan_gaps().await;
                }
            }
        }
    }

    /// Run one head tick over every configured chain.
    ///
    /// Chains are synced concurrently and independently: one chain failing
    /// never delays or aborts another.
    pub async fn tick_head(&self) {
        let mut tasks = JoinSet::new();

        for &chain_id in &self.chain_ids {
            let gateway = self.gateway.clone();
            let store = self.store.clone();
            let deadline = self.options.head_interval;

            tasks.spawn(async move {
                let result = match tokio::time::timeout(
                    deadline,
                    Self::sync_head(gateway, store, chain_id),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Report::new(IngestionError::Deadline)
                        .attach_printable("head tick deadline expired")),
                };

                if let Err(err) = result {
                    warn!(chain_id, error = ?err, "head tick failed");
                    IngestionMetrics::record_head_tick_error(chain_id);
                }
            });
        }

        while tasks.join_next().await.is_some() {}
    }

    async fn sync_head(
        gateway: Arc<G>,
        store: BlockStore,
        chain_id: ChainId,
    ) -> Result<(), IngestionError> {
        let head = gateway
            .head_number(chain_id)
            .await
            .change_context(IngestionError::HeadTick)?;

        // A NotFound here means the node reported a head it cannot serve
        // yet; it propagates like any other transient failure.
        let header = gateway
            .block_by_number(chain_id, head)
            .await
            .change_context(IngestionError::HeadTick)?;

        let inserted = store
            .insert_many(std::slice::from_ref(&header))
            .await
            .change_context(IngestionError::HeadTick)?;

        IngestionMetrics::set_head(chain_id, head);
        debug!(
            chain = %gateway.chain_name(chain_id),
            head,
            inserted,
            "head tick complete"
        );

        Ok(())
    }

    /// Run one gap scan over every configured chain.
    pub async fn scan_gaps(&self) {
        let mut tasks = JoinSet::new();

        for &chain_id in &self.chain_ids {
            let gateway = self.gateway.clone();
            let store = self.store.clone();
            let deadline = self.options.gap_interval;
            let limit = self.options.gap_limit;

            tasks.spawn(async move {
                let result = match tokio::time::timeout(
                    deadline,
                    Self::fill_gaps(gateway, store, chain_id, limit),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Report::new(IngestionError::Deadline)
                        .attach_printable("gap scan deadline expired")),
                };

                if let Err(err) = result {
                    warn!(chain_id, error = ?err, "gap scan failed");
                    IngestionMetrics::record_gap_scan_error(chain_id);
                }
            });
        }

        while tasks.join_next().await.is_some() {}
    }

    async fn fill_gaps(
        gateway: Arc<G>,
        store: BlockStore,
        chain_id: ChainId,
        limit: usize,
    ) -> Result<(), IngestionError> {
        // The head tick seeds chains; the gap scan never introduces the
        // first block.
        let Some(latest) = store
            .latest(chain_id)
            .await
            .change_context(IngestionError::GapScan)?
        else {
            debug!(chain_id, "No blocks in DB yet");
            return Ok(());
        };

        trace!(chain_id, latest = latest.number, "scanning stored range for gaps");

        let missing = store
            .find_missing_in_range(chain_id, limit)
            .await
            .change_context(IngestionError::GapScan)?;

        if missing.is_empty() {
            debug!(chain_id, "No missing blocks found");
            return Ok(());
        }

        let mut fetches = JoinSet::new();
        for &number in &missing {
            let gateway = gateway.clone();
            fetches.spawn(async move { (number, gateway.block_by_number(chain_id, number).await) });
        }

        let mut headers = Vec::with_capacity(missing.len());
        let mut failure = None;

        while let Some(joined) = fetches.join_next().await {
            let (number, result) = joined.change_context(IngestionError::GapScan)?;
            match result {
                Ok(header) => headers.push(header),
                Err(err) if matches!(err.current_context(), RpcError::NotFound) => {
                    // The height came from stored neighbors, so the node
                    // should have it. Skip it and let a later scan retry.
                    error!(
                        chain_id,
                        number, "block inside the stored range is missing from the node"
                    );
                }
                Err(err) if failure.is_none() => {
                    failure = Some(err.change_context(IngestionError::GapScan));
                }
                Err(_) => {}
            }
        }

        // On failure the whole round is discarded; the next scan recomputes
        // the gap list from the store, so nothing is lost.
        if let Some(err) = failure {
            return Err(err.attach_printable("aborting gap scan for this chain"));
        }

        if headers.is_empty() {
            return Ok(());
        }

        let inserted = store
            .insert_many(&headers)
            .await
            .change_context(IngestionError::GapScan)?;

        let mut synced: Vec<u64> = headers.iter().map(|header| header.number).collect();
        synced.sort_unstable();
        info!(
            chain = %gateway.chain_name(chain_id),
            inserted,
            synced = ?synced,
            "filled missing blocks"
        );

        Ok(())
    }
}

impl Default for IngestionServiceOptions {
    fn default() -> Self {
        Self {
            head_interval: Duration::from_secs(5),
            gap_interval: Duration::from_secs(60),
            gap_limit: 10,
        }
    }
}
