//! Network Module
//!
//! TCP transport between console handles and a backend server.
//!
//! ## Architecture
//! - `Server`: single non-blocking acceptor, one thread per connection
//! - `Connection`: serves one client against a [`Backend`]
//! - `RemoteStore` / `TcpConnector`: the client side, a pooled [`KvStore`]

mod client;
mod connection;
mod server;

use std::sync::Arc;

use crate::client::KvStore;
use crate::memstore::MemCluster;
use crate::model::Mode;

pub use client::{RemoteStore, TcpConnector};
pub use connection::Connection;
pub use server::{Server, ServerHandle};

/// The pair of keyspaces a server exposes
#[derive(Clone)]
pub struct Backend {
    direct: Arc<dyn KvStore>,
    transactional: Arc<dyn KvStore>,
}

impl Backend {
    pub fn new(direct: Arc<dyn KvStore>, transactional: Arc<dyn KvStore>) -> Self {
        Self {
            direct,
            transactional,
        }
    }

    /// Serve both keyspaces of an in-process cluster
    pub fn from_cluster(cluster: &MemCluster) -> Self {
        Self::new(
            cluster.handle(Mode::Direct),
            cluster.handle(Mode::Transactional),
        )
    }

    pub fn store(&self, mode: Mode) -> &dyn KvStore {
        match mode {
            Mode::Direct => self.direct.as_ref(),
            Mode::Transactional => self.transactional.as_ref(),
        }
    }
}
