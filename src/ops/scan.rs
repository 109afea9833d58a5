//! Range Scanner

use crate::error::{ConsoleError, Result};
use crate::keys::KeyRange;
use crate::model::{KvPair, Mode};

use super::Context;

/// Ordered, bounded reads over a key range in either mode
#[derive(Clone)]
pub struct RangeScanner {
    ctx: Context,
}

impl RangeScanner {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Up to `limit` managed pairs whose logical key starts with `prefix`,
    /// ascending, with logical keys.
    pub fn scan(&self, mode: Mode, prefix: &[u8], limit: usize) -> Result<Vec<KvPair>> {
        let range = self.ctx.namespace().range(prefix);
        let wire = self.scan_range(mode, &range, limit)?;

        let namespace = self.ctx.namespace();
        Ok(wire
            .into_iter()
            .filter_map(|KvPair { key, value }| {
                namespace.unwrap(&key).map(|logical| KvPair::new(logical, value))
            })
            .collect())
    }

    /// Up to `limit` wire pairs in `range`.
    ///
    /// Direct mode issues one bounded scan. Transactional mode walks a
    /// read-only transaction's iterator and then rolls it back.
    pub fn scan_range(&self, mode: Mode, range: &KeyRange, limit: usize) -> Result<Vec<KvPair>> {
        match mode {
            Mode::Direct => {
                let client = self.ctx.manager().direct()?;
                client
                    .scan(range, limit)
                    .map_err(ConsoleError::into_scan_failure)
            }
            Mode::Transactional => {
                let client = self.ctx.manager().transactional()?;
                let txn = client.begin().map_err(ConsoleError::into_scan_failure)?;

                let pairs = txn
                    .iter(range)
                    .and_then(|iter| iter.take(limit).collect::<Result<Vec<_>>>())
                    .map_err(ConsoleError::into_scan_failure);

                if let Err(e) = txn.rollback() {
                    tracing::debug!("rollback after scan failed: {}", e);
                }
                pairs
            }
        }
    }
}
