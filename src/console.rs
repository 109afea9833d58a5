//! Console Module
//!
//! The request-facing surface. Each method maps one administrative request
//! onto the operations in [`ops`](crate::ops) and wraps the outcome in an
//! [`ApiResponse`] envelope.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::{parse_endpoints, ClientManager, Connector};
use crate::config::Config;
use crate::error::{ConsoleError, Result};
use crate::model::{
    ApiResponse, AtomicOperation, BatchResult, ClusterStatus, DeleteAllReport, DeleteKeysReport,
    KvPair, Mode, Operation, Page, ReconfigureReport, Stats, TxnSummary,
};
use crate::ops::{BatchRunner, Context, KeyOps, Paginator, Sweeper, TxnExecutor};

/// Administrative console over a shared KV cluster
pub struct Console {
    manager: Arc<ClientManager>,
    paginator: Paginator,
    keys: KeyOps,
    batch: BatchRunner,
    txn: TxnExecutor,
    sweeper: Sweeper,
}

impl Console {
    /// Build a console without opening any handles
    pub fn new(connector: Arc<dyn Connector>, config: &Config) -> Result<Self> {
        let manager = Arc::new(ClientManager::new(connector, config)?);
        let ctx = Context::new(Arc::clone(&manager), config);

        Ok(Self {
            manager,
            paginator: Paginator::new(ctx.clone()),
            keys: KeyOps::new(ctx.clone()),
            batch: BatchRunner::new(ctx.clone()),
            txn: TxnExecutor::new(ctx.clone()),
            sweeper: Sweeper::new(ctx),
        })
    }

    /// Build a console and try to connect to the configured endpoints.
    ///
    /// A failed connect is logged and the console starts without clients;
    /// requests fail as unavailable until a reconfiguration succeeds.
    pub fn open(connector: Arc<dyn Connector>, config: &Config) -> Result<Self> {
        let console = Self::new(connector, config)?;
        match console.manager.connect() {
            Ok(()) => tracing::info!("Connected to {:?}", console.manager.endpoints()),
            Err(e) => tracing::warn!("Starting without clients: {}", e),
        }
        Ok(console)
    }

    pub fn manager(&self) -> &ClientManager {
        &self.manager
    }

    // =========================================================================
    // Listing
    // =========================================================================

    pub fn scan(&self, mode: Mode, prefix: Option<&str>, page: usize, limit: usize) -> ApiResponse<Page> {
        let prefix = prefix.unwrap_or_default();
        respond(
            "Keys retrieved successfully",
            "Failed to scan keys",
            self.paginator.page(mode, prefix.as_bytes(), page, limit),
        )
    }

    // =========================================================================
    // Single Keys
    // =========================================================================

    pub fn get(&self, mode: Mode, key: &str) -> ApiResponse<KvPair> {
        let result = require_key(key)
            .and_then(|_| self.keys.get(mode, key.as_bytes()))
            .map(|value| KvPair::new(key, value));
        respond("Key retrieved successfully", "Failed to get key", result)
    }

    pub fn create(&self, mode: Mode, key: &str, value: &str) -> ApiResponse<KvPair> {
        let result = require_key(key)
            .and_then(|_| self.keys.create(mode, key.as_bytes(), value.as_bytes()))
            .map(|_| KvPair::new(key, value));
        respond("Key created successfully", "Failed to create key", result)
    }

    pub fn update(&self, mode: Mode, key: &str, value: &str) -> ApiResponse<KvPair> {
        let result = require_key(key)
            .and_then(|_| self.keys.update(mode, key.as_bytes(), value.as_bytes()))
            .map(|_| KvPair::new(key, value));
        respond("Key updated successfully", "Failed to update key", result)
    }

    pub fn delete(&self, mode: Mode, key: &str) -> ApiResponse<()> {
        let result = require_key(key).and_then(|_| self.keys.delete(mode, key.as_bytes()));
        match result {
            Ok(()) => ApiResponse::ok_empty("Key deleted successfully"),
            Err(e) => failure("Failed to delete key", e),
        }
    }

    pub fn delete_keys(&self, mode: Mode, keys: &[String]) -> ApiResponse<DeleteKeysReport> {
        match self.keys.delete_keys(mode, keys) {
            Ok(report) => {
                let message = format!(
                    "Batch delete completed. Deleted: {}, Errors: {}",
                    report.deleted_count,
                    report.errors.len()
                );
                ApiResponse::ok(message, report)
            }
            Err(e) => failure("Failed to batch delete keys", e),
        }
    }

    // =========================================================================
    // Multi-Key
    // =========================================================================

    pub fn batch(&self, operations: &[Operation]) -> ApiResponse<BatchResult> {
        if operations.is_empty() {
            return failure(
                "Invalid request body",
                ConsoleError::Validation("operations cannot be empty".to_string()),
            );
        }
        let result = self.batch.run(operations);
        let message = if result.failure_count == 0 {
            "Batch operations completed successfully".to_string()
        } else {
            format!(
                "Batch operation completed: {} succeeded, {} failed",
                result.success_count, result.failure_count
            )
        };
        ApiResponse::ok(message, result)
    }

    pub fn transaction(&self, operations: &[AtomicOperation]) -> ApiResponse<TxnSummary> {
        respond(
            "Atomic transaction completed successfully",
            "Atomic transaction failed",
            self.txn.run(operations),
        )
    }

    pub fn delete_all(&self, mode: Mode) -> ApiResponse<DeleteAllReport> {
        match self.sweeper.delete_all(mode) {
            Ok(report) => {
                let message = format!(
                    "Successfully deleted {} keys from {}",
                    report.deleted_count,
                    mode.as_str()
                );
                ApiResponse::ok(message, report)
            }
            Err(e) => failure("Failed to delete all keys", e),
        }
    }

    // =========================================================================
    // Cluster
    // =========================================================================

    /// Reconnect to a comma separated endpoint list
    pub fn reconfigure_csv(&self, csv: &str) -> ApiResponse<ReconfigureReport> {
        let result = parse_endpoints(csv)
            .and_then(|endpoints| self.manager.reconfigure(endpoints))
            .map(|_| ReconfigureReport {
                status: "healthy".to_string(),
                endpoints: self.manager.endpoints(),
            });
        respond(
            "Cluster endpoints updated successfully",
            "Failed to update cluster endpoints",
            result,
        )
    }

    pub fn cluster_status(&self) -> ApiResponse<ClusterStatus> {
        ApiResponse::ok(
            "Cluster status retrieved successfully",
            ClusterStatus {
                connected: self.manager.is_connected(),
                endpoints: self.manager.endpoints(),
            },
        )
    }

    pub fn stats(&self) -> ApiResponse<Stats> {
        respond("Stats retrieved successfully", "Failed to get stats", self.keys.stats())
    }

    /// Close every live handle
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Parse a JSON request body (an operation list, for instance)
pub fn read_request<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    Ok(serde_json::from_reader(reader)?)
}

/// Parse a JSON request body from a file
pub fn read_request_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path.as_ref())?;
    read_request(BufReader::new(file))
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ConsoleError::Validation("Key is required".to_string()));
    }
    Ok(())
}

fn respond<T>(ok: &str, failed: &str, result: Result<T>) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::ok(ok, data),
        Err(e) => failure(failed, e),
    }
}

/// Envelope for a failed request. Key-level outcomes get their own message;
/// everything else gets the operation's generic one.
fn failure<T>(failed: &str, err: ConsoleError) -> ApiResponse<T> {
    let message = match &err {
        ConsoleError::NotFound => "Key not found".to_string(),
        ConsoleError::AlreadyExists => "Key already exists".to_string(),
        ConsoleError::Unavailable(_) => err.to_string(),
        ConsoleError::Validation(_) => "Invalid request".to_string(),
        _ => failed.to_string(),
    };
    tracing::debug!("{}: {}", message, err);
    ApiResponse::failure(message, &err)
}
