//! Multi-tier synchronizing driver.
//!
//! A [`SyncDriver`] composes an ordered list of tiers into a single cache
//! hierarchy. Tier 0 is the front (fastest); the last tier is the
//! **authority**, the source of truth for enumeration and restore.
//!
//! # Traversal
//!
//! | Operation | Order | On error |
//! |-----------|-------|----------|
//! | `read`, `has` | front → back | abort |
//! | `write` | front → back | abort, roll back written tiers back → front |
//! | `delete`, `flush` | back → front | continue |
//! | `cleanup`, `review` | each tier back → front | continue |
//! | `scan`, `count` | authority only | abort |
//! | `restore` | authority → other tiers front → back | continue |
//!
//! Deletes start at the authority so that a front tier cannot be refilled from
//! a tier that has not been cleared yet. Read fill-back and write rollback are
//! best-effort: their failures are logged at debug level and otherwise
//! ignored.
//!
//! # Concurrency
//!
//! The sync driver holds no lock of its own. Each tier guards its own state,
//! but a multi-tier operation is a sequence of independent tier calls. Two
//! concurrent writers of the same ID can interleave and leave tiers holding
//! different values; callers mutating one ID from several threads need their
//! own per-ID mutual exclusion or a single-writer discipline.

use std::sync::Arc;

use databank_core::{DriverError, DriverResult, Entry};

use crate::driver::{BulkOutcome, Driver};

const TARGET: &str = "databank::sync";

/// Driver mirroring operations across an ordered list of tiers.
#[derive(Clone)]
pub struct SyncDriver {
    tiers: Vec<Arc<dyn Driver>>,
}

impl std::fmt::Debug for SyncDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDriver")
            .field("tiers", &self.tiers.len())
            .finish()
    }
}

impl SyncDriver {
    /// Create a sync driver over `tiers`, front first.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoTiers`] if `tiers` is empty.
    pub fn new(tiers: Vec<Arc<dyn Driver>>) -> DriverResult<Self> {
        if tiers.is_empty() {
            return Err(DriverError::NoTiers);
        }
        Ok(Self { tiers })
    }

    /// The configured tiers, front first.
    pub fn tiers(&self) -> &[Arc<dyn Driver>] {
        &self.tiers
    }

    /// The back-most tier.
    pub fn authority(&self) -> &Arc<dyn Driver> {
        // `new` guarantees at least one tier.
        &self.tiers[self.tiers.len() - 1]
    }

    /// Delete an ID from every tier, authority first, keeping each tier's
    /// result.
    ///
    /// The returned results are in visit order: index 0 is the authority.
    pub fn delete_each(&self, id: &str) -> Vec<DriverResult<bool>> {
        self.tiers.iter().rev().map(|tier| tier.delete(id)).collect()
    }

    /// Scan `tier`, read each ID from it and apply `step` to the entries
    /// found. Counts the steps that returned `Ok(true)`.
    fn sweep(
        tier: &dyn Driver,
        outcome: &mut BulkOutcome<u64>,
        mut step: impl FnMut(Entry) -> Option<DriverResult<bool>>,
    ) {
        let ids = match tier.scan() {
            Ok(ids) => ids,
            Err(e) => {
                outcome.push_error(e);
                return;
            }
        };
        for id in ids {
            let entry = match tier.read(&id) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    outcome.push_error(e);
                    continue;
                }
            };
            match step(entry) {
                None => {}
                Some(Ok(true)) => outcome.value += 1,
                Some(Ok(false)) => outcome.ok = false,
                Some(Err(e)) => outcome.push_error(e),
            }
        }
    }
}

impl Driver for SyncDriver {
    fn cleanup(&self) -> BulkOutcome<u64> {
        let mut outcome = BulkOutcome::ok(0);
        for tier in self.tiers.iter().rev() {
            Self::sweep(tier.as_ref(), &mut outcome, |entry| {
                entry.is_expired().then(|| self.delete(&entry.id()))
            });
        }
        outcome
    }

    fn count(&self) -> DriverResult<u64> {
        self.authority().count()
    }

    /// Delete an ID from every tier, authority first.
    ///
    /// Every tier is visited. The result is `Ok(true)` only if every tier
    /// succeeded; if any tier failed, the last error encountered is returned.
    /// Use [`SyncDriver::delete_each`] for per-tier detail.
    fn delete(&self, id: &str) -> DriverResult<bool> {
        let mut ok = true;
        let mut last_error = None;
        for result in self.delete_each(id) {
            match result {
                Ok(tier_ok) => ok &= tier_ok,
                Err(e) => {
                    ok = false;
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(ok),
        }
    }

    fn flush(&self) -> BulkOutcome {
        let mut outcome = BulkOutcome::ok(());
        for tier in self.tiers.iter().rev() {
            outcome.absorb(tier.flush());
        }
        outcome
    }

    fn has(&self, id: &str) -> DriverResult<bool> {
        for tier in &self.tiers {
            if tier.has(id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read an ID from the first tier that holds it.
    ///
    /// Tiers that missed before the hit are filled back, back to front.
    fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
        let mut missed = 0;
        let mut found = None;
        for tier in &self.tiers {
            match tier.read(id)? {
                Some(entry) => {
                    found = Some(entry);
                    break;
                }
                None => missed += 1,
            }
        }
        let Some(entry) = found else {
            return Ok(None);
        };

        for (index, tier) in self.tiers[..missed].iter().enumerate().rev() {
            if let Err(e) = tier.write(&entry) {
                tracing::debug!(target: TARGET, tier = index, id, error = %e, "fill-back failed");
            }
        }
        Ok(Some(entry))
    }

    /// Copy every entry in the authority into the other tiers.
    ///
    /// Returns the number of entries copied into every tier.
    fn restore(&self) -> BulkOutcome<u64> {
        let authority = self.authority();
        let ids = match authority.scan() {
            Ok(ids) => ids,
            Err(e) => return BulkOutcome::failed(0, e),
        };
        let replicas = &self.tiers[..self.tiers.len() - 1];

        let mut outcome = BulkOutcome::ok(0);
        for id in ids {
            let entry = match authority.read(&id) {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    outcome.ok = false;
                    continue;
                }
                Err(e) => {
                    outcome.push_error(e);
                    continue;
                }
            };
            let mut copied = true;
            for tier in replicas {
                match tier.write(&entry) {
                    Ok(true) => {}
                    Ok(false) => {
                        copied = false;
                        outcome.ok = false;
                    }
                    Err(e) => {
                        copied = false;
                        outcome.push_error(e);
                    }
                }
            }
            if copied {
                outcome.value += 1;
            }
        }
        outcome
    }

    fn review(&self) -> BulkOutcome<u64> {
        let mut outcome = BulkOutcome::ok(0);
        for tier in self.tiers.iter().rev() {
            Self::sweep(tier.as_ref(), &mut outcome, |mut entry| {
                entry.maybe_expire().then(|| self.write(&entry))
            });
        }
        outcome
    }

    fn scan(&self) -> DriverResult<Vec<String>> {
        self.authority().scan()
    }

    /// Write an entry to every tier, front to back.
    ///
    /// The prior value is read first. If a tier fails, the tiers already
    /// written are rolled back, back to front, to the prior value (or the
    /// ID is deleted if there was none) and the error is returned. A tier
    /// refusing the write without an error makes the result `Ok(false)` and
    /// is not rolled back.
    fn write(&self, entry: &Entry) -> DriverResult<bool> {
        let id = entry.id();
        let prior = self.read(&id)?;

        let mut ok = true;
        let mut written = Vec::with_capacity(self.tiers.len());
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.write(entry) {
                Ok(true) => written.push(index),
                Ok(false) => ok = false,
                Err(e) => {
                    self.roll_back(&written, &id, prior.as_ref());
                    return Err(e);
                }
            }
        }
        Ok(ok)
    }
}

impl SyncDriver {
    fn roll_back(&self, written: &[usize], id: &str, prior: Option<&Entry>) {
        for &index in written.iter().rev() {
            let tier = &self.tiers[index];
            let result = match prior {
                Some(entry) => tier.write(entry),
                None => tier.delete(id),
            };
            if let Err(e) = result {
                tracing::debug!(target: TARGET, tier = index, id, error = %e, "rollback failed");
            }
        }
    }
}
