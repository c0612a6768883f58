use std::{sync::Arc, time::Duration};

use headwater::{
    core::NewBlockHeader,
    ingestion::{IngestionService, IngestionServiceOptions},
};
use testcontainers::clients;
use tokio_util::sync::CancellationToken;

mod common;
use crate::common::*;

fn fast_options() -> IngestionServiceOptions {
    IngestionServiceOptions {
        head_interval: Duration::from_millis(50),
        gap_interval: Duration::from_millis(50),
        gap_limit: 10,
    }
}

#[tokio::test]
async fn test_gap_scan_skips_chains_with_no_blocks() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    let gateway = Arc::new(MockGateway::new([1]));
    let service = IngestionService::new(gateway, store, IngestionServiceOptions::default());

    service.scan_gaps().await;

    // The gap scan never introduces a chain's first block.
    assert_eq!(count_rows(&pool).await, 0);
}

#[tokio::test]
async fn test_head_tick_seeds_a_chain() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    let header = NewBlockHeader {
        chain_id: 3,
        number: 5000,
        hash: "0xhead5000".to_string(),
        parent_hash: "0xparent5000".to_string(),
        timestamp: 1_700_000_000,
    };
    let gateway = Arc::new(
        MockGateway::new([3])
            .with_head(3, 5000)
            .with_block(header.clone()),
    );
    let service =
        IngestionService::new(gateway, store.clone(), IngestionServiceOptions::default());

    service.tick_head().await;

    assert_eq!(count_rows(&pool).await, 1);
    let latest = store.latest(3).await.unwrap().unwrap();
    assert_eq!(latest.number, 5000);
    assert_eq!(store.by_number(3, 5000).await.unwrap().unwrap().hash, "0xhead5000");

    // The next tick sees the same head and inserts nothing new.
    service.tick_head().await;
    assert_eq!(count_rows(&pool).await, 1);
}

#[tokio::test]
async fn test_gap_scan_fills_missing_heights() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    seed_range(&store, 2, 2000..=2005).await;
    seed_range(&store, 2, 2010..=2015).await;

    let mut gateway = MockGateway::new([2]);
    for number in 2006..=2009 {
        gateway = gateway.with_block(NewBlockHeader {
            chain_id: 2,
            number,
            hash: format!("0xmock_{number}"),
            parent_hash: format!("0xmock_{}", number - 1),
            timestamp: 1_700_000_000,
        });
    }
    let service = IngestionService::new(
        Arc::new(gateway),
        store.clone(),
        IngestionServiceOptions::default(),
    );

    service.scan_gaps().await;

    assert_eq!(store.by_number(2, 2006).await.unwrap().unwrap().hash, "0xmock_2006");
    assert_eq!(store.by_number(2, 2009).await.unwrap().unwrap().hash, "0xmock_2009");
    assert!(store.find_missing_in_range(2, 10).await.unwrap().is_empty());
    let rows = count_rows(&pool).await;
    assert_eq!(rows, 16);

    // A second scan with identical state inserts nothing.
    service.scan_gaps().await;
    assert_eq!(count_rows(&pool).await, rows);
}

#[tokio::test]
async fn test_gap_scan_on_contiguous_chain_does_nothing() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    seed_range(&store, 1, 1000..=1020).await;
    let rows = count_rows(&pool).await;

    let gateway = Arc::new(MockGateway::new([1]));
    let service = IngestionService::new(gateway, store, IngestionServiceOptions::default());

    service.scan_gaps().await;

    assert_eq!(count_rows(&pool).await, rows);
}

#[tokio::test]
async fn test_head_tick_failures_do_not_cross_chains() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, _pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    let gateway = Arc::new(
        MockGateway::new([1, 2, 3])
            .with_head(1, 100)
            .with_block(new_header(1, 100))
            .with_failing_head(2)
            .with_head(3, 300)
            .with_block(new_header(3, 300)),
    );
    let service =
        IngestionService::new(gateway, store.clone(), IngestionServiceOptions::default());

    service.tick_head().await;

    assert!(store.by_number(1, 100).await.unwrap().is_some());
    assert!(store.by_number(3, 300).await.unwrap().is_some());
    assert!(store.latest(2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_gap_scan_skips_heights_the_node_lost() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, _pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    seed_range(&store, 7, 10..=12).await;
    seed_range(&store, 7, 15..=16).await;

    // The node serves height 13 but claims 14 does not exist.
    let gateway = Arc::new(MockGateway::new([7]).with_block(new_header(7, 13)));
    let service =
        IngestionService::new(gateway, store.clone(), IngestionServiceOptions::default());

    service.scan_gaps().await;

    assert!(store.by_number(7, 13).await.unwrap().is_some());
    assert!(store.by_number(7, 14).await.unwrap().is_none());
}

#[tokio::test]
async fn test_gap_scan_discards_the_round_on_rpc_failure() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, _pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    seed_range(&store, 7, 10..=12).await;
    seed_range(&store, 7, 15..=16).await;

    let gateway = Arc::new(
        MockGateway::new([7])
            .with_block(new_header(7, 13))
            .with_failing_block(7, 14),
    );
    let service =
        IngestionService::new(gateway, store.clone(), IngestionServiceOptions::default());

    service.scan_gaps().await;

    // Nothing from the failed round is persisted; the next scan retries.
    assert!(store.by_number(7, 13).await.unwrap().is_none());
    assert!(store.by_number(7, 14).await.unwrap().is_none());
}

#[tokio::test]
async fn test_start_runs_both_loops_and_stops_on_cancellation() {
    let docker = clients::Cli::default();
    let postgres = docker.run(new_postgres_image());
    let (store, _pool) = new_store(postgres.get_host_port_ipv4(5432)).await;

    let gateway = Arc::new(
        MockGateway::new([1])
            .with_head(1, 10)
            .with_block(new_header(1, 10)),
    );
    let service = IngestionService::new(gateway, store.clone(), fast_options());

    let ct = CancellationToken::new();
    let handle = tokio::spawn(service.start(ct.clone()));

    // Give the head tick a few firings to seed the chain.
    tokio::time::sleep(Duration::from_millis(300)).await;
    ct.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(store.latest(1).await.unwrap().unwrap().number, 10);
}
