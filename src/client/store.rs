//! Backend boundary
//!
//! The console never talks to a backend directly; it goes through a
//! [`KvStore`] handle bound to one keyspace, obtained from a [`Connector`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{KvPair, Mode};

use super::Endpoint;

/// A staged write sent at commit time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl Mutation {
    pub fn key(&self) -> &[u8] {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

/// A value a transaction observed; the commit fails if it no longer holds.
/// `expected == None` means the key was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCheck {
    pub key: Vec<u8>,
    pub expected: Option<Vec<u8>>,
}

/// One connected handle to the backend, bound to a single keyspace.
///
/// Implementations must be safe to share: any number of requests may use
/// the same handle at once.
pub trait KvStore: Send + Sync {
    /// Read a key. `Ok(None)` when absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write a key, overwriting any existing value
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Up to `limit` pairs in ascending key order from `[start, end)`.
    /// `end == None` scans to the end of the keyspace.
    fn scan(&self, start: &[u8], end: Option<&[u8]>, limit: usize) -> Result<Vec<KvPair>>;

    /// Apply `mutations` atomically if every check still holds,
    /// otherwise apply nothing and fail with `Conflict`.
    fn commit(&self, checks: &[ReadCheck], mutations: &[Mutation]) -> Result<()>;

    /// Round-trip health probe
    fn ping(&self) -> Result<()>;

    /// Release the handle. Later calls fail with `Closed`.
    fn close(&self);
}

/// Opens handles against a set of endpoints
pub trait Connector: Send + Sync {
    /// Open a handle for `mode`, giving up after `timeout`
    fn connect(&self, endpoints: &[Endpoint], mode: Mode, timeout: Duration)
        -> Result<Arc<dyn KvStore>>;
}
