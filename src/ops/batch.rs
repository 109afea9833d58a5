//! Batch Orchestrator
//!
//! Runs each operation on its own. A failing entry is recorded and the
//! batch moves on; nothing is rolled back across entries.

use crate::error::{ConsoleError, Result};
use crate::model::{BatchItem, BatchResult, Mode, OpKind, Operation};

use super::Context;

pub struct BatchRunner {
    ctx: Context,
}

impl BatchRunner {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Apply `operations` in order, one result per entry
    pub fn run(&self, operations: &[Operation]) -> BatchResult {
        let mut result = BatchResult::default();

        for op in operations {
            let outcome = self.apply(op);
            if let Err(e) = &outcome {
                tracing::debug!("batch {} {} ({}) failed: {}", op.kind, op.key, op.mode, e);
            }
            result.push(BatchItem {
                key: op.key.clone(),
                operation: op.kind,
                success: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }

        tracing::debug!(
            "batch of {}: {} succeeded, {} failed",
            operations.len(),
            result.success_count,
            result.failure_count
        );
        result
    }

    fn apply(&self, op: &Operation) -> Result<()> {
        let wire = self.ctx.namespace().wrap(op.key.as_bytes());

        match op.kind {
            OpKind::Put => {
                let value = op.value.as_deref().ok_or_else(|| {
                    ConsoleError::Validation("put requires a value".to_string())
                })?;
                self.put(op.mode, &wire, value.as_bytes())
            }
            OpKind::Delete => self.delete(op.mode, &wire),
        }
    }

    fn put(&self, mode: Mode, wire: &[u8], value: &[u8]) -> Result<()> {
        match mode {
            Mode::Direct => self.ctx.manager().direct()?.put(wire, value),
            Mode::Transactional => {
                let mut txn = self.ctx.manager().transactional()?.begin()?;
                txn.set(wire, value)?;
                txn.commit().map_err(ConsoleError::into_txn_failure)
            }
        }
    }

    /// Existence is checked first; an absent key or a failed read is `NotFound`
    fn delete(&self, mode: Mode, wire: &[u8]) -> Result<()> {
        match mode {
            Mode::Direct => {
                let client = self.ctx.manager().direct()?;
                match client.get(wire) {
                    Ok(Some(_)) => client.delete(wire),
                    _ => Err(ConsoleError::NotFound),
                }
            }
            Mode::Transactional => {
                let mut txn = self.ctx.manager().transactional()?.begin()?;
                match txn.get(wire) {
                    Ok(Some(_)) => {
                        txn.delete(wire)?;
                        txn.commit().map_err(ConsoleError::into_txn_failure)
                    }
                    _ => {
                        txn.rollback()?;
                        Err(ConsoleError::NotFound)
                    }
                }
            }
        }
    }
}
