//! Single-key operations and stats

use crate::error::{ConsoleError, Result};
use crate::model::{DeleteKeysReport, Mode, ModeStats, Stats};

use super::{Context, RangeScanner};

/// How a write treats the key's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteRule {
    MustBeAbsent,
    MustExist,
}

/// get / create / update / delete for one key at a time
#[derive(Clone)]
pub struct KeyOps {
    ctx: Context,
}

impl KeyOps {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Value of `key`, or `NotFound`
    pub fn get(&self, mode: Mode, key: &[u8]) -> Result<Vec<u8>> {
        let wire = self.ctx.namespace().wrap(key);
        let value = match mode {
            Mode::Direct => self.ctx.manager().direct()?.get(&wire)?,
            Mode::Transactional => {
                let client = self.ctx.manager().transactional()?;
                let mut txn = client.begin()?;
                let value = txn.get(&wire).map_err(ConsoleError::into_txn_failure)?;
                txn.rollback()?;
                value
            }
        };
        value.ok_or(ConsoleError::NotFound)
    }

    /// Write a new key. Fails with `AlreadyExists` if it is present.
    pub fn create(&self, mode: Mode, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(mode, key, value, WriteRule::MustBeAbsent)
    }

    /// Overwrite an existing key. Fails with `NotFound` if it is absent.
    pub fn update(&self, mode: Mode, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(mode, key, value, WriteRule::MustExist)
    }

    fn write(&self, mode: Mode, key: &[u8], value: &[u8], rule: WriteRule) -> Result<()> {
        if value.is_empty() {
            return Err(ConsoleError::Validation("value cannot be empty".to_string()));
        }
        let wire = self.ctx.namespace().wrap(key);

        let check = |current: &Option<Vec<u8>>| match (rule, current) {
            (WriteRule::MustBeAbsent, Some(_)) => Err(ConsoleError::AlreadyExists),
            (WriteRule::MustExist, None) => Err(ConsoleError::NotFound),
            _ => Ok(()),
        };

        match mode {
            Mode::Direct => {
                let client = self.ctx.manager().direct()?;
                check(&client.get(&wire)?)?;
                client.put(&wire, value)
            }
            Mode::Transactional => {
                let client = self.ctx.manager().transactional()?;
                let mut txn = client.begin()?;
                let current = txn.get(&wire).map_err(ConsoleError::into_txn_failure)?;
                if let Err(e) = check(&current) {
                    txn.rollback()?;
                    return Err(e);
                }
                txn.set(&wire, value)?;
                txn.commit().map_err(ConsoleError::into_txn_failure)
            }
        }
    }

    /// Remove an existing key. Fails with `NotFound` if it is absent.
    pub fn delete(&self, mode: Mode, key: &[u8]) -> Result<()> {
        let wire = self.ctx.namespace().wrap(key);
        match mode {
            Mode::Direct => {
                let client = self.ctx.manager().direct()?;
                if client.get(&wire)?.is_none() {
                    return Err(ConsoleError::NotFound);
                }
                client.delete(&wire)
            }
            Mode::Transactional => {
                let client = self.ctx.manager().transactional()?;
                let mut txn = client.begin()?;
                if txn
                    .get(&wire)
                    .map_err(ConsoleError::into_txn_failure)?
                    .is_none()
                {
                    txn.rollback()?;
                    return Err(ConsoleError::NotFound);
                }
                txn.delete(&wire)?;
                txn.commit().map_err(ConsoleError::into_txn_failure)
            }
        }
    }

    /// Delete each of `keys` independently and report what happened
    pub fn delete_keys<K: AsRef<[u8]>>(&self, mode: Mode, keys: &[K]) -> Result<DeleteKeysReport> {
        if keys.is_empty() {
            return Err(ConsoleError::Validation("keys cannot be empty".to_string()));
        }
        // Fail fast rather than report every key as an error
        match mode {
            Mode::Direct => drop(self.ctx.manager().direct()?),
            Mode::Transactional => drop(self.ctx.manager().transactional()?),
        }

        let mut report = DeleteKeysReport {
            total_requested: keys.len(),
            ..Default::default()
        };
        for key in keys {
            let key = key.as_ref();
            match self.delete(mode, key) {
                Ok(()) => report.deleted_count += 1,
                Err(ConsoleError::NotFound) => report.not_found_count += 1,
                Err(e) => report
                    .errors
                    .push(format!("{}: {}", String::from_utf8_lossy(key), e)),
            }
        }
        tracing::debug!(
            "delete_keys({}): {} deleted, {} not found, {} errors",
            mode,
            report.deleted_count,
            report.not_found_count,
            report.errors.len()
        );
        Ok(report)
    }

    /// Connection state and a bounded count of managed keys per mode
    pub fn stats(&self) -> Result<Stats> {
        let scanner = RangeScanner::new(self.ctx.clone());
        let cap = self.ctx.limits().scan_cap;

        let mode_stats = |mode: Mode| -> Result<ModeStats> {
            match scanner.scan(mode, &[], cap) {
                Ok(pairs) => Ok(ModeStats {
                    connected: true,
                    sample_keys: pairs.len(),
                }),
                Err(ConsoleError::Unavailable(_)) => Ok(ModeStats::default()),
                Err(e) => Err(e),
            }
        };

        Ok(Stats {
            direct: mode_stats(Mode::Direct)?,
            transactional: mode_stats(Mode::Transactional)?,
            connected: self.ctx.manager().is_connected(),
        })
    }
}
