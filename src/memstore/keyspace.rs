//! Ordered in-memory keyspace

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::client::{Mutation, ReadCheck};
use crate::error::{ConsoleError, Result};
use crate::model::KvPair;

/// BTreeMap-backed keyspace, safe to share between threads
#[derive(Debug, Default)]
pub struct Keyspace {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    pub fn put(&self, key: &[u8], value: &[u8]) {
        self.data.write().insert(key.to_vec(), value.to_vec());
    }

    /// Returns whether the key existed
    pub fn delete(&self, key: &[u8]) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Up to `limit` pairs from `[start, end)` in ascending order
    pub fn scan(&self, start: &[u8], end: Option<&[u8]>, limit: usize) -> Vec<KvPair> {
        if limit == 0 {
            return Vec::new();
        }
        let upper = match end {
            // BTreeMap::range panics on an inverted range
            Some(end) if end <= start => return Vec::new(),
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };

        self.data
            .read()
            .range::<[u8], _>((Bound::Included(start), upper))
            .take(limit)
            .map(|(k, v)| KvPair::new(k.clone(), v.clone()))
            .collect()
    }

    /// Apply every mutation if every check holds, else nothing
    pub fn commit(&self, checks: &[ReadCheck], mutations: &[Mutation]) -> Result<()> {
        let mut data = self.data.write();

        for check in checks {
            if data.get(&check.key) != check.expected.as_ref() {
                return Err(ConsoleError::Conflict(format!(
                    "key {} changed since it was read",
                    String::from_utf8_lossy(&check.key)
                )));
            }
        }

        for mutation in mutations {
            match mutation {
                Mutation::Put { key, value } => {
                    data.insert(key.clone(), value.clone());
                }
                Mutation::Delete { key } => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Every key, in order
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.data.read().keys().cloned().collect()
    }
}
