//! Operations Module
//!
//! The console's request-level operations, each built over a shared
//! [`Context`]:
//!
//! | Operation            | Type           |
//! |----------------------|----------------|
//! | range scan           | `RangeScanner` |
//! | paginated listing    | `Paginator`    |
//! | get / create / ...   | `KeyOps`       |
//! | independent batch    | `BatchRunner`  |
//! | all-or-nothing txn   | `TxnExecutor`  |
//! | delete everything    | `Sweeper`      |
//!
//! Every key goes through the [`KeyNamespace`] before it reaches a client
//! handle, and every key read back is unwrapped before it is returned.

mod scan;
mod page;
mod single;
mod batch;
mod atomic;
mod sweep;

use std::sync::Arc;

use crate::client::ClientManager;
use crate::config::Config;
use crate::keys::KeyNamespace;

pub use scan::RangeScanner;
pub use page::{Paginator, MAX_PAGE_SIZE};
pub use single::KeyOps;
pub use batch::BatchRunner;
pub use atomic::TxnExecutor;
pub use sweep::Sweeper;

/// Size limits applied by the operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Most pairs a single listing scan may read
    pub scan_cap: usize,
    pub direct_sweep_batch: usize,
    pub txn_sweep_batch: usize,
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scan_cap: config.scan_cap.max(1),
            direct_sweep_batch: config.direct_sweep_batch.max(1),
            txn_sweep_batch: config.txn_sweep_batch.max(1),
        }
    }
}

/// What every operation needs: the client manager and the key namespace
#[derive(Clone)]
pub struct Context {
    manager: Arc<ClientManager>,
    namespace: Arc<KeyNamespace>,
    limits: Limits,
}

impl Context {
    pub fn new(manager: Arc<ClientManager>, config: &Config) -> Self {
        Self {
            manager,
            namespace: Arc::new(KeyNamespace::new(config.key_prefix.clone())),
            limits: Limits::from_config(config),
        }
    }

    pub fn manager(&self) -> &ClientManager {
        &self.manager
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }
}
