//! Client Manager Tests
//!
//! Tests for handle lifecycle: startup, reconfiguration and retirement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kvconsole::client::{parse_endpoints, ClientManager};
use kvconsole::memstore::MemCluster;
use kvconsole::{Config, ConsoleError, Mode};

const PRIMARY: &str = "10.0.0.1:2379";
const SECONDARY: &str = "10.0.0.2:2379";
const UNREACHABLE: &str = "10.9.9.9:2379";

fn config(endpoint: &str, close_grace_ms: u64) -> Config {
    Config::builder()
        .endpoints([endpoint])
        .close_grace_ms(close_grace_ms)
        .build()
}

fn wait_until<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

// =============================================================================
// Startup Tests
// =============================================================================

#[test]
fn test_unavailable_before_connect() {
    let cluster = MemCluster::with_endpoints([PRIMARY]);
    let manager = ClientManager::new(Arc::new(cluster), &config(PRIMARY, 100)).unwrap();

    assert!(!manager.is_connected());
    assert!(matches!(
        manager.direct(),
        Err(ConsoleError::Unavailable(Mode::Direct))
    ));
    match manager.transactional() {
        Err(e) => {
            assert!(e.is_retryable());
            assert_eq!(e.to_string(), "transactional client not initialized");
        }
        Ok(_) => panic!("expected unavailable"),
    }
}

#[test]
fn test_connect_opens_both_handles() {
    let cluster = MemCluster::with_endpoints([PRIMARY]);
    let manager = ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 100)).unwrap();
    manager.connect().unwrap();

    assert!(manager.is_connected());
    assert_eq!(manager.generation(), 1);
    assert_eq!(cluster.opened_handles(), 2);
    assert!(manager.direct().is_ok());
    assert!(manager.transactional().is_ok());
}

#[test]
fn test_failed_startup_stays_unavailable() {
    let cluster = MemCluster::with_endpoints([PRIMARY]);
    let manager = ClientManager::new(Arc::new(cluster), &config(UNREACHABLE, 100)).unwrap();

    assert!(matches!(manager.connect(), Err(ConsoleError::Connect(_))));
    assert!(!manager.is_connected());
    assert_eq!(manager.endpoints(), vec![UNREACHABLE.to_string()]);
}

#[test]
fn test_new_rejects_malformed_endpoints() {
    let cluster = MemCluster::new();
    let bad = Config::builder().endpoints(["no-port"]).build();
    assert!(matches!(
        ClientManager::new(Arc::new(cluster.clone()), &bad),
        Err(ConsoleError::Config(_))
    ));

    let empty = Config::builder().endpoints(Vec::<String>::new()).build();
    assert!(ClientManager::new(Arc::new(cluster), &empty).is_err());
}

// =============================================================================
// Reconfiguration Tests
// =============================================================================

#[test]
fn test_reconfigure_to_unreachable_keeps_previous() {
    let cluster = MemCluster::with_endpoints([PRIMARY]);
    let manager = ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 100)).unwrap();
    manager.connect().unwrap();

    let result = manager.reconfigure(parse_endpoints(UNREACHABLE).unwrap());
    assert!(matches!(result, Err(ConsoleError::Connect(_))));

    assert!(manager.is_connected());
    assert_eq!(manager.endpoints(), vec![PRIMARY.to_string()]);
    assert_eq!(manager.generation(), 1);
    assert_eq!(cluster.closed_handles(), 0);

    // Old handles still serve requests
    manager.direct().unwrap().put(b"k", b"v").unwrap();
    assert_eq!(manager.direct().unwrap().get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_reconfigure_swaps_and_retires_old_handles() {
    let cluster = MemCluster::with_endpoints([PRIMARY, SECONDARY]);
    let manager = ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 1000)).unwrap();
    manager.connect().unwrap();

    manager
        .reconfigure(parse_endpoints(SECONDARY).unwrap())
        .unwrap();

    assert_eq!(manager.endpoints(), vec![SECONDARY.to_string()]);
    assert_eq!(manager.generation(), 2);
    assert_eq!(cluster.opened_handles(), 4);
    assert!(wait_until(Duration::from_secs(2), || cluster.closed_handles() == 2));
}

#[test]
fn test_retired_handle_waits_for_in_flight_borrower() {
    let cluster = MemCluster::with_endpoints([PRIMARY, SECONDARY]);
    let manager = ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 5000)).unwrap();
    manager.connect().unwrap();

    let in_flight = manager.direct().unwrap();
    manager
        .reconfigure(parse_endpoints(SECONDARY).unwrap())
        .unwrap();

    // The transactional half has no borrower, but the set is retired as a unit
    thread::sleep(Duration::from_millis(100));
    assert_eq!(cluster.closed_handles(), 0);
    in_flight.put(b"still", b"works").unwrap();

    drop(in_flight);
    assert!(wait_until(Duration::from_secs(2), || cluster.closed_handles() == 2));
}

#[test]
fn test_retired_handle_closed_after_grace() {
    let cluster = MemCluster::with_endpoints([PRIMARY, SECONDARY]);
    let manager = ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 50)).unwrap();
    manager.connect().unwrap();

    let stuck = manager.direct().unwrap();
    manager
        .reconfigure(parse_endpoints(SECONDARY).unwrap())
        .unwrap();

    assert!(wait_until(Duration::from_secs(2), || cluster.closed_handles() == 2));
    assert!(matches!(stuck.get(b"k"), Err(ConsoleError::Closed)));
}

#[test]
fn test_reconfigure_rejects_empty_set() {
    let cluster = MemCluster::with_endpoints([PRIMARY]);
    let manager = ClientManager::new(Arc::new(cluster), &config(PRIMARY, 100)).unwrap();
    assert!(matches!(
        manager.reconfigure(Vec::new()),
        Err(ConsoleError::Validation(_))
    ));
}

#[test]
fn test_readers_never_see_unavailable_during_reconfigure() {
    let cluster = MemCluster::with_endpoints([PRIMARY, SECONDARY]);
    let manager = Arc::new(
        ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 1000)).unwrap(),
    );
    manager.connect().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut reads = 0;
                while !stop.load(Ordering::SeqCst) {
                    let client = manager.direct().expect("handle must stay available");
                    // A retired handle may close under us once its grace runs out,
                    // but it is never missing
                    let _ = client.get(b"k");
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for i in 0..10 {
        let target = if i % 2 == 0 { SECONDARY } else { PRIMARY };
        manager.reconfigure(parse_endpoints(target).unwrap()).unwrap();
    }
    stop.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(manager.generation(), 11);
}

#[test]
fn test_concurrent_reconfigures_serialize() {
    let cluster = MemCluster::with_endpoints([PRIMARY, SECONDARY]);
    let manager = Arc::new(
        ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 100)).unwrap(),
    );
    manager.connect().unwrap();

    let handles: Vec<_> = [PRIMARY, SECONDARY, PRIMARY, SECONDARY]
        .into_iter()
        .map(|target| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.reconfigure(parse_endpoints(target).unwrap()))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(manager.generation(), 5);
    assert_eq!(cluster.opened_handles(), 10);
    assert!(wait_until(Duration::from_secs(2), || cluster.closed_handles() == 8));
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_closes_live_handles() {
    let cluster = MemCluster::with_endpoints([PRIMARY]);
    let manager = ClientManager::new(Arc::new(cluster.clone()), &config(PRIMARY, 100)).unwrap();
    manager.connect().unwrap();

    manager.shutdown();
    assert!(!manager.is_connected());
    assert_eq!(cluster.closed_handles(), 2);
    assert!(manager.direct().is_err());
}
