//! Configuration for kvconsole
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Environment variable holding a comma separated endpoint list.
pub const ENDPOINTS_ENV: &str = "KVCONSOLE_ENDPOINTS";

/// Main configuration for a console instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Cluster Configuration
    // -------------------------------------------------------------------------
    /// Backend cluster addresses (`host:port`) used on startup
    pub endpoints: Vec<String>,

    /// Bound on opening a new client handle (milliseconds)
    pub connect_timeout_ms: u64,

    /// Per-request read timeout on backend connections (milliseconds)
    pub read_timeout_ms: u64,

    /// Per-request write timeout on backend connections (milliseconds)
    pub write_timeout_ms: u64,

    /// Idle connections kept per remote handle
    pub pool_size: usize,

    /// How long a retired handle may wait for in-flight borrowers before
    /// it is closed anyway (milliseconds)
    pub close_grace_ms: u64,

    // -------------------------------------------------------------------------
    // Keyspace Configuration
    // -------------------------------------------------------------------------
    /// Isolation prefix prepended to every managed key.
    /// Fixed for the lifetime of the process.
    pub key_prefix: Vec<u8>,

    // -------------------------------------------------------------------------
    // Scan / Sweep Configuration
    // -------------------------------------------------------------------------
    /// Largest scan window a single page request may open
    pub scan_cap: usize,

    /// Keys scanned and deleted per round in direct mode
    pub direct_sweep_batch: usize,

    /// Keys deleted per committed transaction in transactional mode
    pub txn_sweep_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: vec!["127.0.0.1:2379".to_string()],
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            pool_size: 4,
            close_grace_ms: 30_000,
            key_prefix: b"kvconsole_".to_vec(),
            scan_cap: 10_000,
            direct_sweep_batch: 1000,
            txn_sweep_batch: 200,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Override endpoints from `KVCONSOLE_ENDPOINTS` when it is set.
    ///
    /// Entries are split on commas and trimmed; empty entries are dropped.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENDPOINTS_ENV) {
            let endpoints: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !endpoints.is_empty() {
                tracing::debug!("Endpoints overridden from {}: {:?}", ENDPOINTS_ENV, endpoints);
                self.endpoints = endpoints;
            }
        }
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the startup endpoints
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the idle connection pool size per remote handle
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Set the grace period for retired handles (in milliseconds)
    pub fn close_grace_ms(mut self, ms: u64) -> Self {
        self.config.close_grace_ms = ms;
        self
    }

    /// Set the key isolation prefix
    pub fn key_prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set the maximum scan window for paging
    pub fn scan_cap(mut self, cap: usize) -> Self {
        self.config.scan_cap = cap;
        self
    }

    /// Set the direct-mode sweep batch size
    pub fn direct_sweep_batch(mut self, size: usize) -> Self {
        self.config.direct_sweep_batch = size;
        self
    }

    /// Set the transactional-mode sweep batch size
    pub fn txn_sweep_batch(mut self, size: usize) -> Self {
        self.config.txn_sweep_batch = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
