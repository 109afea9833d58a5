//! In-process cluster and its handles

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::client::{Connector, Endpoint, KvStore, Mutation, ReadCheck};
use crate::error::{ConsoleError, Result};
use crate::model::{KvPair, Mode};

use super::{FaultConfig, Keyspace};

#[derive(Default)]
struct ClusterInner {
    direct: Keyspace,
    transactional: Keyspace,
    reachable: RwLock<HashSet<String>>,
    faults: RwLock<Option<FaultConfig>>,
    deletes: AtomicUsize,
    commits: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl ClusterInner {
    fn keyspace(&self, mode: Mode) -> &Keyspace {
        match mode {
            Mode::Direct => &self.direct,
            Mode::Transactional => &self.transactional,
        }
    }

    fn fault<F: Fn(&FaultConfig) -> bool>(&self, check: F) -> bool {
        self.faults.read().as_ref().map_or(false, check)
    }
}

/// Shared in-memory cluster. Clones share state.
///
/// Only registered endpoints accept connections; connecting to any other
/// address fails the way an unreachable cluster would.
#[derive(Clone, Default)]
pub struct MemCluster {
    inner: Arc<ClusterInner>,
}

impl MemCluster {
    /// A cluster with no reachable endpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// A cluster reachable at each of `endpoints`
    pub fn with_endpoints<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cluster = Self::new();
        for endpoint in endpoints {
            cluster.add_endpoint(endpoint);
        }
        cluster
    }

    pub fn add_endpoint(&self, endpoint: impl Into<String>) {
        self.inner.reachable.write().insert(endpoint.into());
    }

    pub fn remove_endpoint(&self, endpoint: &str) {
        self.inner.reachable.write().remove(endpoint);
    }

    /// Keyspace backing `mode`, for seeding and inspection
    pub fn keyspace(&self, mode: Mode) -> &Keyspace {
        self.inner.keyspace(mode)
    }

    /// Install (or clear) injected faults and reset fault counters
    pub fn set_faults(&self, faults: Option<FaultConfig>) {
        let mut guard = self.inner.faults.write();
        self.inner.deletes.store(0, Ordering::SeqCst);
        self.inner.commits.store(0, Ordering::SeqCst);
        *guard = faults;
    }

    pub fn clear_faults(&self) {
        self.set_faults(None);
    }

    /// Handles opened so far
    pub fn opened_handles(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Handles closed so far
    pub fn closed_handles(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Open a handle without going through endpoint checks
    pub fn handle(&self, mode: Mode) -> Arc<MemStore> {
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Arc::new(MemStore {
            cluster: Arc::clone(&self.inner),
            mode,
            closed: AtomicBool::new(false),
        })
    }
}

impl Connector for MemCluster {
    fn connect(
        &self,
        endpoints: &[Endpoint],
        mode: Mode,
        _timeout: Duration,
    ) -> Result<Arc<dyn KvStore>> {
        let reachable = {
            let set = self.inner.reachable.read();
            endpoints.iter().any(|e| set.contains(e.as_str()))
        };
        if !reachable {
            return Err(ConsoleError::Connect(format!(
                "no reachable endpoint among {:?}",
                endpoints.iter().map(Endpoint::as_str).collect::<Vec<_>>()
            )));
        }
        tracing::debug!("memstore: opened {} handle", mode);
        Ok(self.handle(mode))
    }
}

/// One handle onto a [`MemCluster`] keyspace
pub struct MemStore {
    cluster: Arc<ClusterInner>,
    mode: Mode,
    closed: AtomicBool,
}

impl MemStore {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn keyspace(&self) -> Result<&Keyspace> {
        if self.is_closed() {
            return Err(ConsoleError::Closed);
        }
        Ok(self.cluster.keyspace(self.mode))
    }

    fn injected(what: &str) -> ConsoleError {
        ConsoleError::Backend(format!("injected {} failure", what))
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let keyspace = self.keyspace()?;
        if self.cluster.fault(|f| f.fail_get) {
            return Err(Self::injected("get"));
        }
        Ok(keyspace.get(key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.keyspace()?.put(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let keyspace = self.keyspace()?;
        let done = self.cluster.deletes.load(Ordering::SeqCst);
        if self
            .cluster
            .fault(|f| f.fail_deletes_after.map_or(false, |n| done >= n))
        {
            return Err(Self::injected("delete"));
        }
        keyspace.delete(key);
        self.cluster.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn scan(&self, start: &[u8], end: Option<&[u8]>, limit: usize) -> Result<Vec<KvPair>> {
        let keyspace = self.keyspace()?;
        if self.cluster.fault(|f| f.fail_scan) {
            return Err(Self::injected("scan"));
        }
        Ok(keyspace.scan(start, end, limit))
    }

    fn commit(&self, checks: &[ReadCheck], mutations: &[Mutation]) -> Result<()> {
        let keyspace = self.keyspace()?;
        let done = self.cluster.commits.load(Ordering::SeqCst);
        if self.cluster.fault(|f| {
            f.fail_commit || f.fail_commits_after.map_or(false, |n| done >= n)
        }) {
            return Err(Self::injected("commit"));
        }
        keyspace.commit(checks, mutations)?;
        self.cluster.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.keyspace().map(|_| ())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cluster.closed.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("memstore: closed {} handle", self.mode);
        }
    }
}
