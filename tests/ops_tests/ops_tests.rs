//! Operation Tests
//!
//! Tests for scanning, paging, single-key, batch and atomic operations in
//! both modes over an in-memory cluster.

use std::collections::BTreeSet;
use std::sync::Arc;

use kvconsole::client::ClientManager;
use kvconsole::memstore::{FaultConfig, MemCluster};
use kvconsole::model::OpKind;
use kvconsole::ops::{BatchRunner, Context, KeyOps, Paginator, RangeScanner, TxnExecutor};
use kvconsole::{AtomicOperation, Config, ConsoleError, Mode, Operation};

const ENDPOINT: &str = "127.0.0.1:2379";
const PREFIX: &[u8] = b"kvconsole_";

struct Fixture {
    cluster: MemCluster,
    ctx: Context,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(Config::builder().endpoints([ENDPOINT]).build())
    }

    fn with_config(config: Config) -> Self {
        let cluster = MemCluster::with_endpoints([ENDPOINT]);
        let manager = Arc::new(ClientManager::new(Arc::new(cluster.clone()), &config).unwrap());
        manager.connect().unwrap();
        Self {
            cluster,
            ctx: Context::new(manager, &config),
        }
    }

    /// A fixture whose manager never connected
    fn disconnected() -> Self {
        let config = Config::builder().endpoints([ENDPOINT]).build();
        let cluster = MemCluster::with_endpoints([ENDPOINT]);
        let manager = Arc::new(ClientManager::new(Arc::new(cluster.clone()), &config).unwrap());
        Self {
            cluster,
            ctx: Context::new(manager, &config),
        }
    }

    fn keys(&self) -> KeyOps {
        KeyOps::new(self.ctx.clone())
    }

    fn pages(&self) -> Paginator {
        Paginator::new(self.ctx.clone())
    }

    fn scanner(&self) -> RangeScanner {
        RangeScanner::new(self.ctx.clone())
    }

    fn batch(&self) -> BatchRunner {
        BatchRunner::new(self.ctx.clone())
    }

    fn txn(&self) -> TxnExecutor {
        TxnExecutor::new(self.ctx.clone())
    }

    /// Write a managed key straight into the backend
    fn seed(&self, mode: Mode, key: &str, value: &str) {
        let mut wire = PREFIX.to_vec();
        wire.extend_from_slice(key.as_bytes());
        self.cluster.keyspace(mode).put(&wire, value.as_bytes());
    }

    fn raw(&self, mode: Mode, key: &str) -> Option<Vec<u8>> {
        let mut wire = PREFIX.to_vec();
        wire.extend_from_slice(key.as_bytes());
        self.cluster.keyspace(mode).get(&wire)
    }
}

// =============================================================================
// Single-Key Tests
// =============================================================================

#[test]
fn test_put_then_get_both_modes() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        fx.keys().create(mode, b"user:1", b"alice").unwrap();
        assert_eq!(fx.keys().get(mode, b"user:1").unwrap(), b"alice".to_vec());
    }
}

#[test]
fn test_modes_are_independent() {
    let fx = Fixture::new();
    fx.keys().create(Mode::Direct, b"k", b"direct").unwrap();
    assert!(matches!(
        fx.keys().get(Mode::Transactional, b"k"),
        Err(ConsoleError::NotFound)
    ));
}

#[test]
fn test_delete_then_get_not_found() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        fx.seed(mode, "gone", "v");
        fx.keys().delete(mode, b"gone").unwrap();
        assert!(matches!(fx.keys().get(mode, b"gone"), Err(ConsoleError::NotFound)));
        assert!(matches!(fx.keys().delete(mode, b"gone"), Err(ConsoleError::NotFound)));
    }
}

#[test]
fn test_keys_are_namespaced_on_the_wire() {
    let fx = Fixture::new();
    fx.keys().create(Mode::Direct, b"user:1", b"alice").unwrap();
    assert_eq!(fx.raw(Mode::Direct, "user:1"), Some(b"alice".to_vec()));
    assert_eq!(fx.cluster.keyspace(Mode::Direct).get(b"user:1"), None);
}

#[test]
fn test_create_existing_key_conflicts() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        fx.seed(mode, "k", "old");
        assert!(matches!(
            fx.keys().create(mode, b"k", b"new"),
            Err(ConsoleError::AlreadyExists)
        ));
        assert_eq!(fx.raw(mode, "k"), Some(b"old".to_vec()));
    }
}

#[test]
fn test_update_requires_existing_key() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        assert!(matches!(
            fx.keys().update(mode, b"missing", b"v"),
            Err(ConsoleError::NotFound)
        ));
        fx.seed(mode, "k", "old");
        fx.keys().update(mode, b"k", b"new").unwrap();
        assert_eq!(fx.raw(mode, "k"), Some(b"new".to_vec()));
    }
}

#[test]
fn test_empty_value_rejected_for_create() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.keys().create(Mode::Direct, b"k", b""),
        Err(ConsoleError::Validation(_))
    ));
}

#[test]
fn test_unavailable_without_clients() {
    let fx = Fixture::disconnected();
    assert!(matches!(
        fx.keys().get(Mode::Direct, b"k"),
        Err(ConsoleError::Unavailable(Mode::Direct))
    ));
    assert!(matches!(
        fx.scanner().scan(Mode::Transactional, b"", 10),
        Err(ConsoleError::Unavailable(Mode::Transactional))
    ));
    assert!(fx.cluster.keyspace(Mode::Direct).is_empty());
}

#[test]
fn test_delete_keys_reports_each_key() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        fx.seed(mode, "a", "1");
        fx.seed(mode, "b", "2");

        let report = fx.keys().delete_keys(mode, &["a", "b", "c"]).unwrap();
        assert_eq!(report.deleted_count, 2);
        assert_eq!(report.not_found_count, 1);
        assert_eq!(report.total_requested, 3);
        assert!(report.errors.is_empty());
    }
}

#[test]
fn test_stats_counts_managed_keys() {
    let fx = Fixture::new();
    fx.seed(Mode::Direct, "a", "1");
    fx.seed(Mode::Direct, "b", "2");
    fx.seed(Mode::Transactional, "c", "3");
    fx.cluster.keyspace(Mode::Direct).put(b"foreign", b"x");

    let stats = fx.keys().stats().unwrap();
    assert!(stats.connected);
    assert_eq!(stats.direct.sample_keys, 2);
    assert_eq!(stats.transactional.sample_keys, 1);

    let offline = Fixture::disconnected().keys().stats().unwrap();
    assert!(!offline.connected);
    assert!(!offline.direct.connected);
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_returns_prefix_in_order() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        for key in ["user:3", "user:1", "user:2", "order:1", "user"] {
            fx.seed(mode, key, &format!("v-{}", key));
        }

        let pairs = fx.scanner().scan(mode, b"user:", 100).unwrap();
        let keys: Vec<_> = pairs.iter().map(|p| p.key.clone()).collect();
        assert_eq!(
            keys,
            vec![b"user:1".to_vec(), b"user:2".to_vec(), b"user:3".to_vec()]
        );
        assert!(pairs
            .iter()
            .all(|p| p.value == [&b"v-"[..], p.key.as_slice()].concat()));
    }
}

#[test]
fn test_scan_never_returns_foreign_keys() {
    let fx = Fixture::new();
    let ks = fx.cluster.keyspace(Mode::Direct);
    ks.put(b"kvconsole", b"short");
    ks.put(b"other_tenant", b"x");
    ks.put(b"kvconsolf", b"after");
    fx.seed(Mode::Direct, "mine", "v");

    let pairs = fx.scanner().scan(Mode::Direct, b"", 100).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].key, b"mine".to_vec());
}

#[test]
fn test_scan_includes_keys_with_ff_tail() {
    let fx = Fixture::new();
    let mut wire = PREFIX.to_vec();
    wire.extend_from_slice(&[b'a', 0xFF, 0xFF, 0xFF, 0xFF]);
    fx.cluster.keyspace(Mode::Direct).put(&wire, b"v");

    let pairs = fx.scanner().scan(Mode::Direct, b"a", 10).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].key, vec![b'a', 0xFF, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn test_transactional_scan_failure_is_scan_failed() {
    let fx = Fixture::new();
    fx.seed(Mode::Transactional, "k", "v");
    fx.cluster.set_faults(Some(FaultConfig {
        fail_scan: true,
        ..Default::default()
    }));

    for mode in Mode::ALL {
        match fx.scanner().scan(mode, b"", 10) {
            Err(ConsoleError::ScanFailed(cause)) => assert!(cause.contains("injected")),
            other => panic!("expected scan failure, got {:?}", other.map(|p| p.len())),
        }
    }
}

// =============================================================================
// Pagination Tests
// =============================================================================

#[test]
fn test_pages_concatenate_to_every_key() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        for i in 0..47 {
            fx.seed(mode, &format!("item:{:03}", i), "v");
        }

        let size = 10;
        let first = fx.pages().page(mode, b"item:", 1, size).unwrap();
        let mut seen = Vec::new();
        for page in 1..=5 {
            let p = fx.pages().page(mode, b"item:", page, size).unwrap();
            seen.extend(p.items.into_iter().map(|i| i.key));
        }

        assert_eq!(seen.len(), 47);
        assert_eq!(seen.iter().collect::<BTreeSet<_>>().len(), 47);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        // The last page sees the whole prefix
        let last = fx.pages().page(mode, b"item:", 5, size).unwrap();
        assert_eq!(last.total, 47);
        assert_eq!(last.total_pages, 5);
        assert_eq!(last.items.len(), 7);
        assert!(!last.total_is_estimate);

        // Earlier pages only know what their window saw
        assert_eq!(first.total, 10);
        assert!(first.total_is_estimate);
    }
}

#[test]
fn test_page_past_end_is_empty() {
    let fx = Fixture::new();
    for i in 0..5 {
        fx.seed(Mode::Direct, &format!("k{}", i), "v");
    }
    let page = fx.pages().page(Mode::Direct, b"", 3, 10).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.page, 3);
}

#[test]
fn test_page_window_capped() {
    let config = Config::builder().endpoints([ENDPOINT]).scan_cap(25).build();
    let fx = Fixture::with_config(config);
    for i in 0..40 {
        fx.seed(Mode::Direct, &format!("k{:02}", i), "v");
    }

    let page = fx.pages().page(Mode::Direct, b"", 3, 10).unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total, 25);
    assert!(page.total_is_estimate);
}

#[test]
fn test_page_arguments_validated() {
    let fx = Fixture::new();
    for (page, size) in [(0, 10), (1, 0), (1, 101)] {
        assert!(matches!(
            fx.pages().page(Mode::Direct, b"", page, size),
            Err(ConsoleError::Validation(_))
        ));
    }
    assert!(fx.pages().page(Mode::Direct, b"", 1, 100).is_ok());
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_batch_entries_are_independent() {
    let fx = Fixture::new();
    for mode in Mode::ALL {
        let result = fx.batch().run(&[
            Operation::put(mode, "k1", "v1"),
            Operation::delete(mode, "k2"),
        ]);

        assert_eq!(result.results.len(), 2);
        assert!(result.results[0].success);
        assert!(!result.results[1].success);
        assert_eq!(result.results[1].error.as_deref(), Some("Key not found"));
        assert_eq!(result.results[1].operation, OpKind::Delete);
        assert_eq!((result.success_count, result.failure_count), (1, 1));
        assert_eq!(fx.keys().get(mode, b"k1").unwrap(), b"v1".to_vec());
    }
}

#[test]
fn test_batch_preserves_submission_order() {
    let fx = Fixture::new();
    let ops: Vec<_> = ["c", "a", "b"]
        .iter()
        .map(|k| Operation::put(Mode::Direct, *k, "v"))
        .collect();
    let result = fx.batch().run(&ops);
    let keys: Vec<_> = result.results.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["c", "a", "b"]);
}

#[test]
fn test_batch_put_without_value_fails_alone() {
    let fx = Fixture::new();
    let mut missing = Operation::put(Mode::Direct, "bad", "x");
    missing.value = None;

    let result = fx.batch().run(&[missing, Operation::put(Mode::Direct, "good", "v")]);
    assert!(!result.results[0].success);
    assert!(result.results[1].success);
    assert_eq!(fx.raw(Mode::Direct, "bad"), None);
}

#[test]
fn test_batch_put_empty_value_is_a_put() {
    let fx = Fixture::new();
    fx.seed(Mode::Direct, "k", "old");
    let result = fx.batch().run(&[Operation::put(Mode::Direct, "k", "")]);

    assert!(result.results[0].success);
    assert_eq!(result.results[0].operation, OpKind::Put);
    assert_eq!(fx.raw(Mode::Direct, "k"), Some(Vec::new()));
}

#[test]
fn test_batch_mixed_modes() {
    let fx = Fixture::new();
    fx.seed(Mode::Transactional, "t", "v");
    let result = fx.batch().run(&[
        Operation::put(Mode::Direct, "d", "v"),
        Operation::delete(Mode::Transactional, "t"),
    ]);
    assert_eq!(result.failure_count, 0);
    assert_eq!(fx.raw(Mode::Direct, "d"), Some(b"v".to_vec()));
    assert_eq!(fx.raw(Mode::Transactional, "t"), None);
}

#[test]
fn test_batch_unavailable_client_reported_per_entry() {
    let fx = Fixture::disconnected();
    let result = fx.batch().run(&[
        Operation::put(Mode::Direct, "a", "v"),
        Operation::put(Mode::Transactional, "b", "v"),
    ]);
    assert_eq!(result.failure_count, 2);
    for item in &result.results {
        assert!(item.error.as_deref().unwrap().contains("client not initialized"));
    }
}

#[test]
fn test_batch_delete_read_failure_is_not_found() {
    let fx = Fixture::new();
    fx.seed(Mode::Direct, "k", "v");
    fx.cluster.set_faults(Some(FaultConfig {
        fail_get: true,
        ..Default::default()
    }));

    let result = fx.batch().run(&[Operation::delete(Mode::Direct, "k")]);
    assert_eq!(result.results[0].error.as_deref(), Some("Key not found"));
    assert_eq!(fx.raw(Mode::Direct, "k"), Some(b"v".to_vec()));
}

// =============================================================================
// Atomic Transaction Tests
// =============================================================================

#[test]
fn test_transaction_commits_all() {
    let fx = Fixture::new();
    fx.seed(Mode::Transactional, "old", "v");

    let summary = fx
        .txn()
        .run(&[
            AtomicOperation::put("a", "1"),
            AtomicOperation::put("b", "2"),
            AtomicOperation::delete("old"),
        ])
        .unwrap();

    assert_eq!(summary.operation_count, 3);
    assert_eq!(fx.raw(Mode::Transactional, "a"), Some(b"1".to_vec()));
    assert_eq!(fx.raw(Mode::Transactional, "b"), Some(b"2".to_vec()));
    assert_eq!(fx.raw(Mode::Transactional, "old"), None);
}

#[test]
fn test_transaction_with_absent_delete_changes_nothing() {
    let fx = Fixture::new();
    let result = fx.txn().run(&[
        AtomicOperation::put("k1", "v1"),
        AtomicOperation::delete("k2"),
    ]);

    assert!(matches!(result, Err(ConsoleError::NotFound)));
    assert_eq!(fx.raw(Mode::Transactional, "k1"), None);
    assert!(fx.cluster.keyspace(Mode::Transactional).is_empty());
}

#[test]
fn test_transaction_put_without_value_aborts() {
    let fx = Fixture::new();
    let result = fx.txn().run(&[
        AtomicOperation::put("k1", "v1"),
        AtomicOperation::put("k2", ""),
    ]);
    assert!(matches!(result, Err(ConsoleError::Validation(_))));
    assert!(fx.cluster.keyspace(Mode::Transactional).is_empty());
}

#[test]
fn test_transaction_sees_its_own_puts() {
    let fx = Fixture::new();
    fx.txn()
        .run(&[AtomicOperation::put("k", "v"), AtomicOperation::delete("k")])
        .unwrap();
    assert_eq!(fx.raw(Mode::Transactional, "k"), None);
}

#[test]
fn test_transaction_commit_failure_is_txn_failed() {
    let fx = Fixture::new();
    fx.cluster.set_faults(Some(FaultConfig {
        fail_commit: true,
        ..Default::default()
    }));
    let result = fx.txn().run(&[AtomicOperation::put("k", "v")]);
    assert!(matches!(result, Err(ConsoleError::TxnFailed(_))));
    assert!(fx.cluster.keyspace(Mode::Transactional).is_empty());
}

#[test]
fn test_transaction_rejects_empty_list() {
    let fx = Fixture::new();
    assert!(matches!(fx.txn().run(&[]), Err(ConsoleError::Validation(_))));
}

#[test]
fn test_transaction_never_touches_direct_keyspace() {
    let fx = Fixture::new();
    fx.txn().run(&[AtomicOperation::put("k", "v")]).unwrap();
    assert!(fx.cluster.keyspace(Mode::Direct).is_empty());
}
