//! In-memory backend.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use databank_core::{DriverError, DriverResult, Entry};

use crate::driver::{BulkOutcome, Driver};

/// Driver holding entries in a sorted map keyed by entry ID.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> DriverResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.entries.read().map_err(|_| DriverError::LockPoisoned)
    }

    fn entries_mut(&self) -> DriverResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.entries.write().map_err(|_| DriverError::LockPoisoned)
    }
}

impl Driver for MemoryDriver {
    fn cleanup(&self) -> BulkOutcome<u64> {
        let mut entries = match self.entries_mut() {
            Ok(entries) => entries,
            Err(e) => return BulkOutcome::failed(0, e),
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        BulkOutcome::ok((before - entries.len()) as u64)
    }

    fn count(&self) -> DriverResult<u64> {
        Ok(self.entries()?.len() as u64)
    }

    fn delete(&self, id: &str) -> DriverResult<bool> {
        self.entries_mut()?.remove(id);
        Ok(true)
    }

    fn expire(&self, id: &str) -> DriverResult<bool> {
        if let Some(entry) = self.entries_mut()?.get_mut(id) {
            entry.expire();
        }
        Ok(true)
    }

    fn flush(&self) -> BulkOutcome {
        match self.entries_mut() {
            Ok(mut entries) => {
                entries.clear();
                BulkOutcome::ok(())
            }
            Err(e) => BulkOutcome::failed((), e),
        }
    }

    fn has(&self, id: &str) -> DriverResult<bool> {
        Ok(self.entries()?.contains_key(id))
    }

    fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
        Ok(self.entries()?.get(id).cloned())
    }

    fn review(&self) -> BulkOutcome<u64> {
        let mut entries = match self.entries_mut() {
            Ok(entries) => entries,
            Err(e) => return BulkOutcome::failed(0, e),
        };
        let mut expired = 0;
        for entry in entries.values_mut() {
            if entry.maybe_expire() {
                expired += 1;
            }
        }
        BulkOutcome::ok(expired)
    }

    fn scan(&self) -> DriverResult<Vec<String>> {
        Ok(self.entries()?.keys().cloned().collect())
    }

    fn write(&self, entry: &Entry) -> DriverResult<bool> {
        let mut stored = entry.clone();
        stored.calculate_size();
        self.entries_mut()?.insert(stored.id(), stored);
        Ok(true)
    }
}
