//! Direct-mode client handle

use std::sync::Arc;

use crate::error::Result;
use crate::keys::KeyRange;
use crate::model::KvPair;

use super::KvStore;

/// Non-transactional access: each call is independently visible.
///
/// Borrowed from the [`ClientManager`](super::ClientManager) for the
/// duration of one request; never stored.
#[derive(Clone)]
pub struct RawClient {
    store: Arc<dyn KvStore>,
}

impl RawClient {
    pub(crate) fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store.put(key, value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.store.delete(key)
    }

    /// One bounded scan, ascending
    pub fn scan(&self, range: &KeyRange, limit: usize) -> Result<Vec<KvPair>> {
        if limit == 0 || range.is_empty() {
            return Ok(Vec::new());
        }
        self.store.scan(&range.start, range.end_bound(), limit)
    }
}
