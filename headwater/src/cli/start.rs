use std::{sync::Arc, time::Duration};

use clap::Args;
use error_stack::{Result, ResultExt};
use headwater_observability::metrics::{
    install_recorder, spawn_process_collector, DatabaseMetrics,
};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    error::HeadwaterError,
    ingestion::{IngestionArgs, IngestionService},
    provider::RpcGateway,
    server::{self, route_allow_list, AppState, ServerArgs},
    storage::{ensure_schema, BlockStore},
};

use super::{RpcArgs, StorageArgs};

#[derive(Args, Debug)]
pub struct StartCommand {
    #[clap(flatten)]
    rpc: RpcArgs,
    #[clap(flatten)]
    storage: StorageArgs,
    #[clap(flatten)]
    server: ServerArgs,
    #[clap(flatten)]
    ingestion: IngestionArgs,
}

impl StartCommand {
    pub async fn run(self, ct: CancellationToken) -> Result<(), HeadwaterError> {
        info!("Starting headwater");

        let metrics_handle = install_recorder().change_context(HeadwaterError::Fatal)?;
        spawn_process_collector(ct.clone());

        let pool = self.storage.connect().await?;
        ensure_schema(&pool)
            .await
            .change_context(HeadwaterError::Fatal)?;

        let db_metrics = DatabaseMetrics::default();
        let store = BlockStore::new(pool.clone(), db_metrics.clone());
        spawn_pool_sampler(pool, db_metrics, ct.clone());

        let gateway = Arc::new(self.rpc.to_gateway()?);
        info!(chains = ?gateway.chain_ids(), "configured chains");

        let address = self
            .server
            .to_socket_addr()
            .change_context(HeadwaterError::Configuration)?;

        let state = AppState {
            store: store.clone(),
            metrics_handle,
            memory_ceiling_bytes: self.server.memory_ceiling_bytes(),
            routes: Arc::new(route_allow_list()),
        };

        let ingestion =
            IngestionService::new(gateway, store, self.ingestion.to_ingestion_options());

        let mut ingestion_handle = tokio::spawn({
            let ct = ct.clone();
            async move { ingestion.start(ct).await }
        });
        let mut server_handle = tokio::spawn({
            let ct = ct.clone();
            async move { server::serve(state, address, ct).await }
        });

        // Whichever side stops first takes the other one down with it; both
        // are awaited so in-flight work drains before we return.
        let result = tokio::select! {
            res = &mut ingestion_handle => {
                ct.cancel();
                let _ = (&mut server_handle).await;
                res.change_context(HeadwaterError::Fatal)?
                    .change_context(HeadwaterError::Fatal)
            }
            res = &mut server_handle => {
                ct.cancel();
                let _ = (&mut ingestion_handle).await;
                res.change_context(HeadwaterError::Fatal)?
                    .change_context(HeadwaterError::Fatal)
            }
        };

        info!("headwater stopped");
        result
    }
}

fn spawn_pool_sampler(pool: PgPool, metrics: DatabaseMetrics, ct: CancellationToken) {
    tokio::spawn(async move {
        loop {
            let size = u64::from(pool.size());
            let idle = pool.num_idle() as u64;
            metrics.set_pool_connections(size.saturating_sub(idle), idle);

            tokio::select! {
                _ = ct.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(10)) => {}
            }
        }
    });
}
