//! Transactional-mode client handle
//!
//! Transactions are optimistic and buffered on the client:
//! - `get` reads through to the backend and remembers what it saw
//! - `set` / `delete` stage into an ordered write buffer (read-your-writes)
//! - `commit` sends every observed read as a check plus every staged write
//!   in one atomic backend call; a changed read fails the whole commit
//! - `rollback` discards the buffer; nothing ever reached the backend
//!
//! Range reads through [`TxnIter`] are not recorded as checks, so phantom
//! inserts inside an iterated range do not fail the commit.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ConsoleError, Result};
use crate::keys::{successor, KeyRange};
use crate::model::KvPair;

use super::{KvStore, Mutation, ReadCheck};

/// Pairs fetched from the backend per iterator round trip
pub const ITER_BATCH_SIZE: usize = 256;

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Transactional client. Cheap to clone; begins independent transactions.
#[derive(Clone)]
pub struct TxnClient {
    store: Arc<dyn KvStore>,
}

impl TxnClient {
    pub(crate) fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Start a new transaction bound to this handle
    pub fn begin(&self) -> Result<Transaction> {
        Ok(Transaction::new(Arc::clone(&self.store)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    RolledBack,
}

/// An in-flight transaction.
///
/// Terminal states are committed and rolled back. Dropping an active
/// transaction rolls it back.
pub struct Transaction {
    id: u64,
    store: Arc<dyn KvStore>,
    /// Staged writes; `None` is a staged delete
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    /// First value observed per key read through the backend
    reads: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    state: TxnState,
}

impl Transaction {
    fn new(store: Arc<dyn KvStore>) -> Self {
        let id = NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("txn {} begin", id);
        Self {
            id,
            store,
            writes: BTreeMap::new(),
            reads: BTreeMap::new(),
            state: TxnState::Active,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of staged mutations
    pub fn staged_len(&self) -> usize {
        self.writes.len()
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            TxnState::Active => Ok(()),
            TxnState::Committed => Err(ConsoleError::TxnFailed(format!(
                "transaction {} already committed",
                self.id
            ))),
            TxnState::RolledBack => Err(ConsoleError::TxnFailed(format!(
                "transaction {} already rolled back",
                self.id
            ))),
        }
    }

    /// Read a key, seeing this transaction's own staged writes first
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_active()?;
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        let value = self.store.get(key)?;
        self.reads
            .entry(key.to_vec())
            .or_insert_with(|| value.clone());
        Ok(value)
    }

    /// Stage a write
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_active()?;
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    /// Stage a delete
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_active()?;
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    /// Forward iterator over `range`, merged with staged writes
    pub fn iter(&self, range: &KeyRange) -> Result<TxnIter<'_>> {
        self.ensure_active()?;
        Ok(TxnIter::new(self.store.as_ref(), &self.writes, range, ITER_BATCH_SIZE))
    }

    /// Make every staged write durable at once, or none of them
    pub fn commit(mut self) -> Result<()> {
        self.ensure_active()?;

        if self.writes.is_empty() {
            // Read-only: nothing to validate against
            self.state = TxnState::Committed;
            tracing::trace!("txn {} commit (read-only)", self.id);
            return Ok(());
        }

        let checks: Vec<ReadCheck> = std::mem::take(&mut self.reads)
            .into_iter()
            .map(|(key, expected)| ReadCheck { key, expected })
            .collect();
        let mutations: Vec<Mutation> = std::mem::take(&mut self.writes)
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Mutation::Put { key, value },
                None => Mutation::Delete { key },
            })
            .collect();

        match self.store.commit(&checks, &mutations) {
            Ok(()) => {
                self.state = TxnState::Committed;
                tracing::trace!("txn {} committed {} mutations", self.id, mutations.len());
                Ok(())
            }
            Err(e) => {
                self.state = TxnState::RolledBack;
                tracing::debug!("txn {} commit failed: {}", self.id, e);
                Err(e)
            }
        }
    }

    /// Discard every staged write
    pub fn rollback(mut self) -> Result<()> {
        self.ensure_active()?;
        self.abort();
        Ok(())
    }

    fn abort(&mut self) {
        self.writes.clear();
        self.reads.clear();
        self.state = TxnState::RolledBack;
        tracing::trace!("txn {} rolled back", self.id);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TxnState::Active {
            self.abort();
        }
    }
}

/// Lazy forward iterator over a transaction's view of a range.
///
/// Pages through the backend `ITER_BATCH_SIZE` pairs at a time and overlays
/// staged writes falling in each page's key window.
pub struct TxnIter<'a> {
    store: &'a dyn KvStore,
    writes: &'a BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    cursor: Vec<u8>,
    end: Option<Vec<u8>>,
    buffer: VecDeque<KvPair>,
    batch: usize,
    exhausted: bool,
}

impl<'a> TxnIter<'a> {
    fn new(
        store: &'a dyn KvStore,
        writes: &'a BTreeMap<Vec<u8>, Option<Vec<u8>>>,
        range: &KeyRange,
        batch: usize,
    ) -> Self {
        Self {
            store,
            writes,
            cursor: range.start.clone(),
            end: range.end.clone(),
            buffer: VecDeque::new(),
            batch: batch.max(1),
            exhausted: range.is_empty(),
        }
    }

    fn fill(&mut self) -> Result<()> {
        while self.buffer.is_empty() && !self.exhausted {
            let page = self
                .store
                .scan(&self.cursor, self.end.as_deref(), self.batch)?;

            // Exclusive upper edge of the key window this page covers
            let upper = if page.len() < self.batch {
                self.exhausted = true;
                self.end.clone()
            } else {
                page.last().map(|p| successor(&p.key))
            };

            let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
                page.into_iter().map(|p| (p.key, p.value)).collect();

            let upper_bound = match &upper {
                Some(u) => Bound::Excluded(u.as_slice()),
                None => Bound::Unbounded,
            };
            for (key, staged) in self
                .writes
                .range::<[u8], _>((Bound::Included(self.cursor.as_slice()), upper_bound))
            {
                match staged {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key.as_slice());
                    }
                }
            }

            self.buffer
                .extend(merged.into_iter().map(|(key, value)| KvPair { key, value }));

            if let (false, Some(next)) = (self.exhausted, upper) {
                self.cursor = next;
            }
        }
        Ok(())
    }
}

impl Iterator for TxnIter<'_> {
    type Item = Result<KvPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
