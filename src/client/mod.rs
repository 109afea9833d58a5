//! Client Module
//!
//! Everything between the console's operations and the backend wire.
//!
//! ## Responsibilities
//! - Define the backend boundary (`KvStore`, `Connector`)
//! - Track the current endpoint set
//! - Own the direct and transactional handles and swap them on reconfiguration
//! - Provide buffered optimistic transactions over a transactional handle
//!
//! ## Ownership
//! The [`ClientManager`] exclusively owns the handles. Operations borrow a
//! [`RawClient`] or [`TxnClient`] for one call and drop it afterwards, which
//! is what lets a retired handle know when it is safe to close.

mod store;
mod endpoint;
mod raw;
mod txn;
mod manager;

pub use store::{Connector, KvStore, Mutation, ReadCheck};
pub use endpoint::{parse_endpoints, validate_endpoints, Endpoint, EndpointRegistry};
pub use raw::RawClient;
pub use txn::{Transaction, TxnClient, TxnIter, ITER_BATCH_SIZE};
pub use manager::ClientManager;
