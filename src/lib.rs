//! # kvconsole
//!
//! Access and transaction orchestration for an administrative console over
//! a shared, distributed key-value cluster:
//! - Two client handles (direct and transactional), swapped atomically on
//!   reconfiguration
//! - A fixed key namespace isolating managed keys from other tenants
//! - Paginated prefix scans, independent batches, all-or-nothing
//!   transactions and chunked bulk deletes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Console                              │
//! │              (request envelope, one call per op)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          ops                                 │
//! │   scan · page · single · batch · atomic · sweep              │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ KeyNamespace                     │
//! ┌──────────▼──────────────────────────────────▼───────────────┐
//! │                     ClientManager                            │
//! │          RawClient  ·  TxnClient / Transaction               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ KvStore / Connector
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ RemoteStore │── TCP ──▶│   Server    │──▶ MemCluster
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod model;
pub mod keys;

pub mod client;
pub mod memstore;
pub mod protocol;
pub mod network;
pub mod ops;
pub mod console;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ConsoleError, Result};
pub use config::Config;
pub use console::Console;
pub use keys::{KeyNamespace, KeyRange};
pub use model::{ApiResponse, AtomicOperation, KvPair, Mode, OpKind, Operation};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvconsole
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
