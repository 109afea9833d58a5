//! Client Lifecycle Manager
//!
//! Owns the pair of client handles (direct + transactional) and swaps them
//! on reconfiguration.
//!
//! ## Concurrency
//! - `current`: the only shared mutable state. Readers take the read lock
//!   just long enough to clone the handle `Arc`; reconfiguration takes the
//!   write lock only for the pointer swap.
//! - New handles are opened *before* any lock is taken, so a slow or
//!   failing connect never blocks in-flight requests.
//! - `reconfigure_lock` serializes reconfigurations against each other.
//! - Superseded handles are closed on a background thread once their
//!   in-flight borrowers are gone (bounded by the close grace period).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{ConsoleError, Result};
use crate::model::Mode;

use super::{validate_endpoints, Connector, Endpoint, EndpointRegistry, KvStore, RawClient, TxnClient};

/// Poll interval while a retired handle waits for borrowers
const RETIRE_POLL: Duration = Duration::from_millis(10);

/// One generation of handles, swapped as a unit
struct ClientSet {
    generation: u64,
    direct: Arc<dyn KvStore>,
    transactional: Arc<dyn KvStore>,
}

impl ClientSet {
    fn close(&self) {
        self.direct.close();
        self.transactional.close();
    }

    fn in_use(&self) -> bool {
        Arc::strong_count(&self.direct) > 1 || Arc::strong_count(&self.transactional) > 1
    }
}

/// Creates, hands out and retires client handles
pub struct ClientManager {
    connector: Arc<dyn Connector>,
    registry: EndpointRegistry,
    current: RwLock<Option<Arc<ClientSet>>>,
    reconfigure_lock: Mutex<()>,
    connect_timeout: Duration,
    close_grace: Duration,
    generation: AtomicU64,
}

impl ClientManager {
    /// Create a manager with no live handles.
    ///
    /// The configured endpoints seed the registry; call [`connect`](Self::connect)
    /// to open handles against them.
    pub fn new(connector: Arc<dyn Connector>, config: &Config) -> Result<Self> {
        let endpoints = validate_endpoints(&config.endpoints)
            .map_err(|e| ConsoleError::Config(e.to_string()))?;

        Ok(Self {
            connector,
            registry: EndpointRegistry::new(endpoints),
            current: RwLock::new(None),
            reconfigure_lock: Mutex::new(()),
            connect_timeout: config.connect_timeout(),
            close_grace: config.close_grace(),
            generation: AtomicU64::new(0),
        })
    }

    /// Open handles against the registered endpoints (startup path)
    pub fn connect(&self) -> Result<()> {
        self.reconfigure(self.registry.get())
    }

    /// Replace both handles with new ones opened against `endpoints`.
    ///
    /// Either both new handles open and are swapped in together, or the
    /// call fails and the previous handles and endpoints stay in effect.
    pub fn reconfigure(&self, endpoints: Vec<Endpoint>) -> Result<()> {
        if endpoints.is_empty() {
            return Err(ConsoleError::Validation("endpoints cannot be empty".to_string()));
        }

        let _guard = self.reconfigure_lock.lock();
        tracing::info!("Connecting to endpoints {:?}", endpoints);

        let direct = self
            .connector
            .connect(&endpoints, Mode::Direct, self.connect_timeout)
            .map_err(connect_error)?;

        let transactional = match self
            .connector
            .connect(&endpoints, Mode::Transactional, self.connect_timeout)
        {
            Ok(handle) => handle,
            Err(e) => {
                direct.close();
                return Err(connect_error(e));
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let next = Arc::new(ClientSet {
            generation,
            direct,
            transactional,
        });

        let previous = self.current.write().replace(next);
        self.registry.replace(endpoints);
        tracing::info!("Client handles swapped in (generation {})", generation);

        if let Some(old) = previous {
            self.retire(old);
        }
        Ok(())
    }

    /// Close a superseded generation once nobody borrows it any more
    fn retire(&self, old: Arc<ClientSet>) {
        let grace = self.close_grace;
        let generation = old.generation;
        let spawned = thread::Builder::new()
            .name(format!("kvconsole-retire-{}", generation))
            .spawn({
                let old = Arc::clone(&old);
                move || {
                    let deadline = Instant::now() + grace;
                    while old.in_use() && Instant::now() < deadline {
                        thread::sleep(RETIRE_POLL);
                    }
                    if old.in_use() {
                        tracing::warn!(
                            "Closing generation {} with requests still in flight",
                            generation
                        );
                    }
                    old.close();
                    tracing::debug!("Retired client generation {}", generation);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Could not spawn retire thread ({}); closing inline", e);
            old.close();
        }
    }

    /// Current direct-mode handle
    pub fn direct(&self) -> Result<RawClient> {
        self.current
            .read()
            .as_ref()
            .map(|set| RawClient::new(Arc::clone(&set.direct)))
            .ok_or(ConsoleError::Unavailable(Mode::Direct))
    }

    /// Current transactional-mode handle
    pub fn transactional(&self) -> Result<TxnClient> {
        self.current
            .read()
            .as_ref()
            .map(|set| TxnClient::new(Arc::clone(&set.transactional)))
            .ok_or(ConsoleError::Unavailable(Mode::Transactional))
    }

    /// True only when both handles are live
    pub fn is_connected(&self) -> bool {
        self.current.read().is_some()
    }

    /// Registered endpoints, verbatim
    pub fn endpoints(&self) -> Vec<String> {
        self.registry.to_strings()
    }

    /// Number of successful (re)configurations so far
    pub fn generation(&self) -> u64 {
        self.current.read().as_ref().map_or(0, |set| set.generation)
    }

    /// Close the live handles immediately
    pub fn shutdown(&self) {
        let _guard = self.reconfigure_lock.lock();
        if let Some(set) = self.current.write().take() {
            set.close();
            tracing::info!("Client handles closed (generation {})", set.generation);
        }
    }
}

fn connect_error(err: ConsoleError) -> ConsoleError {
    match err {
        e @ ConsoleError::Connect(_) => e,
        other => ConsoleError::Connect(other.to_string()),
    }
}
