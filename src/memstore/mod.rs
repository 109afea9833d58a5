//! MemStore Module
//!
//! In-process backend used by the dev server and the test suites.
//!
//! ## Responsibilities
//! - Two isolated ordered keyspaces (direct and transactional)
//! - Atomic check-and-apply commits for the transactional keyspace
//! - Endpoint reachability, so connect failures can be simulated
//! - Fault injection for mid-operation failures
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (range scans are the hot path)
//! - A commit holds the write lock for its whole check-and-apply

mod keyspace;
mod cluster;

pub use keyspace::Keyspace;
pub use cluster::{MemCluster, MemStore};

/// Failures to inject into every handle of a [`MemCluster`].
///
/// Counters start from the moment the config is installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultConfig {
    /// Every point read fails
    pub fail_get: bool,
    /// Every scan fails
    pub fail_scan: bool,
    /// Every commit fails
    pub fail_commit: bool,
    /// Deletes fail once this many have succeeded
    pub fail_deletes_after: Option<usize>,
    /// Commits fail once this many have succeeded
    pub fail_commits_after: Option<usize>,
}
