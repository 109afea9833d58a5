//! Atomic Transaction Executor
//!
//! One transaction for the whole operation list: every mutation commits
//! together or none does.

use crate::error::{ConsoleError, Result};
use crate::model::{AtomicOperation, OpKind, TxnSummary};

use super::Context;

pub struct TxnExecutor {
    ctx: Context,
}

impl TxnExecutor {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn run(&self, operations: &[AtomicOperation]) -> Result<TxnSummary> {
        if operations.is_empty() {
            return Err(ConsoleError::Validation(
                "operations cannot be empty".to_string(),
            ));
        }

        let client = self.ctx.manager().transactional()?;
        let mut txn = client.begin().map_err(ConsoleError::into_txn_failure)?;
        let namespace = self.ctx.namespace();

        for (index, op) in operations.iter().enumerate() {
            let wire = namespace.wrap(op.key.as_bytes());

            let staged = match op.kind {
                OpKind::Put => match op.value.as_deref() {
                    Some(value) if !value.is_empty() => txn.set(&wire, value.as_bytes()),
                    _ => Err(ConsoleError::Validation(format!(
                        "operation {}: put on {} requires a non-empty value",
                        index, op.key
                    ))),
                },
                OpKind::Delete => match txn.get(&wire) {
                    Ok(Some(_)) => txn.delete(&wire),
                    Ok(None) => Err(ConsoleError::NotFound),
                    Err(e) => Err(e),
                },
            };

            if let Err(e) = staged {
                tracing::debug!(
                    "txn {} aborted at operation {} ({} {}): {}",
                    txn.id(),
                    index,
                    op.kind,
                    op.key,
                    e
                );
                txn.rollback()?;
                return Err(e.into_txn_failure());
            }
        }

        let id = txn.id();
        txn.commit().map_err(ConsoleError::into_txn_failure)?;
        tracing::debug!("txn {} committed {} operations", id, operations.len());

        Ok(TxnSummary {
            operation_count: operations.len(),
        })
    }
}
