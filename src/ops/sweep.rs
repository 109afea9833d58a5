//! Bulk Sweep Deleter
//!
//! Deletes every managed key of one mode in bounded chunks. Each chunk is
//! durable on its own: a failure stops the sweep, and keys removed by
//! earlier chunks stay removed.

use crate::error::{ConsoleError, Result};
use crate::keys::successor;
use crate::model::{DeleteAllReport, Mode};

use super::Context;

pub struct Sweeper {
    ctx: Context,
}

impl Sweeper {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn delete_all(&self, mode: Mode) -> Result<DeleteAllReport> {
        let deleted = match mode {
            Mode::Direct => self.sweep_direct()?,
            Mode::Transactional => self.sweep_transactional()?,
        };
        tracing::info!("Swept {} {} keys", deleted, mode);
        Ok(DeleteAllReport {
            deleted_count: deleted,
            mode,
        })
    }

    /// Scan a batch from the cursor, delete it, move the cursor past the
    /// last key; stop on an empty batch.
    fn sweep_direct(&self) -> Result<usize> {
        let client = self.ctx.manager().direct()?;
        let batch = self.ctx.limits().direct_sweep_batch;
        let range = self.ctx.namespace().full_range();
        let mut cursor = range.start.clone();
        let mut deleted = 0;

        loop {
            let pairs = client
                .scan(&range.starting_at(cursor.clone()), batch)
                .map_err(|e| aborted(deleted, e.into_scan_failure()))?;
            let Some(last) = pairs.last() else {
                return Ok(deleted);
            };
            cursor = successor(&last.key);

            for pair in &pairs {
                client
                    .delete(&pair.key)
                    .map_err(|e| aborted(deleted, e))?;
                deleted += 1;
            }
            tracing::trace!("direct sweep: {} deleted so far", deleted);
        }
    }

    /// One short transaction per batch; stop on an empty or short batch.
    fn sweep_transactional(&self) -> Result<usize> {
        let client = self.ctx.manager().transactional()?;
        let batch = self.ctx.limits().txn_sweep_batch;
        let range = self.ctx.namespace().full_range();
        let mut deleted = 0;

        loop {
            let mut txn = client.begin().map_err(|e| aborted(deleted, e))?;
            let keys = txn
                .iter(&range)
                .and_then(|iter| {
                    iter.take(batch)
                        .map(|pair| pair.map(|p| p.key))
                        .collect::<Result<Vec<_>>>()
                })
                .map_err(|e| aborted(deleted, e.into_scan_failure()))?;

            if keys.is_empty() {
                txn.rollback().map_err(|e| aborted(deleted, e))?;
                return Ok(deleted);
            }

            for key in &keys {
                txn.delete(key).map_err(|e| aborted(deleted, e))?;
            }
            txn.commit()
                .map_err(|e| aborted(deleted, e.into_txn_failure()))?;
            deleted += keys.len();
            tracing::trace!("txn sweep: {} deleted so far", deleted);

            if keys.len() < batch {
                return Ok(deleted);
            }
        }
    }
}

fn aborted(deleted: usize, cause: ConsoleError) -> ConsoleError {
    ConsoleError::SweepAborted {
        deleted,
        cause: Box::new(cause),
    }
}
