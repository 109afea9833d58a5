//! Sweep Tests
//!
//! Tests for chunked delete-all in both modes.

use std::sync::Arc;

use kvconsole::client::ClientManager;
use kvconsole::memstore::{FaultConfig, MemCluster};
use kvconsole::ops::{Context, RangeScanner, Sweeper};
use kvconsole::{Config, ConsoleError, Mode};

const ENDPOINT: &str = "127.0.0.1:2379";
const PREFIX: &[u8] = b"kvconsole_";

fn setup(direct_batch: usize, txn_batch: usize) -> (MemCluster, Context) {
    let config = Config::builder()
        .endpoints([ENDPOINT])
        .direct_sweep_batch(direct_batch)
        .txn_sweep_batch(txn_batch)
        .build();
    let cluster = MemCluster::with_endpoints([ENDPOINT]);
    let manager = Arc::new(ClientManager::new(Arc::new(cluster.clone()), &config).unwrap());
    manager.connect().unwrap();
    (cluster, Context::new(manager, &config))
}

fn seed(cluster: &MemCluster, mode: Mode, count: usize) {
    for i in 0..count {
        let mut wire = PREFIX.to_vec();
        wire.extend_from_slice(format!("key_{:05}", i).as_bytes());
        cluster.keyspace(mode).put(&wire, b"v");
    }
}

// =============================================================================
// Completeness Tests
// =============================================================================

#[test]
fn test_direct_sweep_deletes_everything() {
    let (cluster, ctx) = setup(7, 5);
    seed(&cluster, Mode::Direct, 53);

    let report = Sweeper::new(ctx.clone()).delete_all(Mode::Direct).unwrap();
    assert_eq!(report.deleted_count, 53);
    assert_eq!(report.mode, Mode::Direct);
    assert!(RangeScanner::new(ctx).scan(Mode::Direct, b"", 1000).unwrap().is_empty());
}

#[test]
fn test_transactional_sweep_deletes_everything() {
    let (cluster, ctx) = setup(7, 5);
    seed(&cluster, Mode::Transactional, 53);

    let report = Sweeper::new(ctx.clone())
        .delete_all(Mode::Transactional)
        .unwrap();
    assert_eq!(report.deleted_count, 53);
    assert!(cluster.keyspace(Mode::Transactional).is_empty());
}

#[test]
fn test_sweep_exact_multiple_of_batch() {
    let (cluster, ctx) = setup(10, 10);
    seed(&cluster, Mode::Direct, 30);
    seed(&cluster, Mode::Transactional, 30);

    let sweeper = Sweeper::new(ctx);
    assert_eq!(sweeper.delete_all(Mode::Direct).unwrap().deleted_count, 30);
    assert_eq!(sweeper.delete_all(Mode::Transactional).unwrap().deleted_count, 30);
    assert!(cluster.keyspace(Mode::Transactional).is_empty());
}

#[test]
fn test_sweep_default_batches() {
    let (cluster, ctx) = setup(1000, 200);
    seed(&cluster, Mode::Direct, 2500);
    seed(&cluster, Mode::Transactional, 450);

    let sweeper = Sweeper::new(ctx);
    assert_eq!(sweeper.delete_all(Mode::Direct).unwrap().deleted_count, 2500);
    assert_eq!(
        sweeper.delete_all(Mode::Transactional).unwrap().deleted_count,
        450
    );
}

#[test]
fn test_sweep_empty_keyspace() {
    let (_cluster, ctx) = setup(10, 10);
    let sweeper = Sweeper::new(ctx);
    for mode in Mode::ALL {
        assert_eq!(sweeper.delete_all(mode).unwrap().deleted_count, 0);
    }
}

#[test]
fn test_sweep_leaves_foreign_keys_and_other_mode() {
    let (cluster, ctx) = setup(4, 4);
    seed(&cluster, Mode::Direct, 9);
    seed(&cluster, Mode::Transactional, 3);
    cluster.keyspace(Mode::Direct).put(b"other_tenant", b"x");
    cluster.keyspace(Mode::Direct).put(b"kvconsolf", b"x");

    Sweeper::new(ctx).delete_all(Mode::Direct).unwrap();

    assert_eq!(
        cluster.keyspace(Mode::Direct).keys(),
        vec![b"kvconsolf".to_vec(), b"other_tenant".to_vec()]
    );
    assert_eq!(cluster.keyspace(Mode::Transactional).len(), 3);
}

#[test]
fn test_sweep_handles_ff_tails() {
    let (cluster, ctx) = setup(2, 2);
    for tail in [vec![0xFF], vec![0xFF, 0xFF], vec![0xFF, 0xFF, 0xFF, 0x00], vec![0x00]] {
        let mut wire = PREFIX.to_vec();
        wire.extend_from_slice(&tail);
        cluster.keyspace(Mode::Direct).put(&wire, b"v");
        cluster.keyspace(Mode::Transactional).put(&wire, b"v");
    }

    let sweeper = Sweeper::new(ctx);
    assert_eq!(sweeper.delete_all(Mode::Direct).unwrap().deleted_count, 4);
    assert_eq!(sweeper.delete_all(Mode::Transactional).unwrap().deleted_count, 4);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_direct_sweep_failure_reports_progress() {
    let (cluster, ctx) = setup(10, 10);
    seed(&cluster, Mode::Direct, 25);
    cluster.set_faults(Some(FaultConfig {
        fail_deletes_after: Some(13),
        ..Default::default()
    }));

    match Sweeper::new(ctx).delete_all(Mode::Direct) {
        Err(ConsoleError::SweepAborted { deleted, cause }) => {
            assert_eq!(deleted, 13);
            assert!(matches!(*cause, ConsoleError::Backend(_)));
        }
        other => panic!("expected aborted sweep, got {:?}", other.map(|r| r.deleted_count)),
    }
    // Deleted keys stay deleted
    assert_eq!(cluster.keyspace(Mode::Direct).len(), 12);
}

#[test]
fn test_transactional_sweep_failure_keeps_committed_chunks() {
    let (cluster, ctx) = setup(10, 10);
    seed(&cluster, Mode::Transactional, 35);
    cluster.set_faults(Some(FaultConfig {
        fail_commits_after: Some(2),
        ..Default::default()
    }));

    match Sweeper::new(ctx).delete_all(Mode::Transactional) {
        Err(ConsoleError::SweepAborted { deleted, cause }) => {
            assert_eq!(deleted, 20);
            assert!(matches!(*cause, ConsoleError::TxnFailed(_)));
        }
        other => panic!("expected aborted sweep, got {:?}", other.map(|r| r.deleted_count)),
    }
    assert_eq!(cluster.keyspace(Mode::Transactional).len(), 15);
}

#[test]
fn test_sweep_scan_failure_aborts_immediately() {
    let (cluster, ctx) = setup(10, 10);
    seed(&cluster, Mode::Direct, 5);
    cluster.set_faults(Some(FaultConfig {
        fail_scan: true,
        ..Default::default()
    }));

    match Sweeper::new(ctx).delete_all(Mode::Direct) {
        Err(ConsoleError::SweepAborted { deleted, cause }) => {
            assert_eq!(deleted, 0);
            assert!(matches!(*cause, ConsoleError::ScanFailed(_)));
        }
        other => panic!("expected aborted sweep, got {:?}", other.map(|r| r.deleted_count)),
    }
    assert_eq!(cluster.keyspace(Mode::Direct).len(), 5);
}

#[test]
fn test_sweep_without_client_is_unavailable() {
    let config = Config::builder().endpoints([ENDPOINT]).build();
    let cluster = MemCluster::with_endpoints([ENDPOINT]);
    let manager = Arc::new(ClientManager::new(Arc::new(cluster), &config).unwrap());
    let sweeper = Sweeper::new(Context::new(manager, &config));

    assert!(matches!(
        sweeper.delete_all(Mode::Transactional),
        Err(ConsoleError::Unavailable(Mode::Transactional))
    ));
}
