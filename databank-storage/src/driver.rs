//! The driver contract.
//!
//! Every backend, the tiered [`SyncDriver`](crate::SyncDriver) and the
//! [`InterceptorChain`](crate::InterceptorChain) implement [`Driver`], so
//! callers, interceptors and the sync driver never depend on a concrete
//! backend.
//!
//! # Outcomes
//!
//! Results separate three cases:
//!
//! - success, with a value (`Ok(Some(entry))`, `Ok(true)`)
//! - an expected negative outcome (`Ok(None)` for a miss, `Ok(false)` for a
//!   refused write)
//! - an unexpected operational failure (`Err(DriverError)`)
//!
//! Multi-step operations (`cleanup`, `review`, `flush`, `restore`) keep going
//! after a failure and return a [`BulkOutcome`] carrying every error seen.

use std::collections::HashMap;
use std::sync::Arc;

use databank_core::{DriverError, DriverResult, Entry};

/// Search query.
///
/// Search is not supported by any driver yet; every implementation reports
/// `Ok(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Query {}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Result of a multi-step operation that aggregates errors instead of
/// stopping at the first one.
#[derive(Debug)]
pub struct BulkOutcome<T = ()> {
    /// Operation-specific result, e.g. the number of entries affected.
    pub value: T,
    /// Whether every step succeeded.
    pub ok: bool,
    /// Every operational failure encountered, in order.
    pub errors: Vec<DriverError>,
}

impl<T> BulkOutcome<T> {
    /// A fully successful outcome.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            ok: true,
            errors: Vec::new(),
        }
    }

    /// A failed outcome carrying a single error.
    pub fn failed(value: T, error: DriverError) -> Self {
        Self {
            value,
            ok: false,
            errors: vec![error],
        }
    }

    /// Record a failed step.
    pub fn push_error(&mut self, error: DriverError) {
        self.ok = false;
        self.errors.push(error);
    }

    /// Fold in the outcome of a nested multi-step operation.
    pub fn absorb<U>(&mut self, other: BulkOutcome<U>) -> U {
        if !other.ok || !other.errors.is_empty() {
            self.ok = false;
        }
        self.errors.extend(other.errors);
        other.value
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Storage API implemented by every backend.
///
/// Implementations must be safe to share across threads; each guards its
/// own state.
pub trait Driver: Send + Sync {
    /// Delete all entries flagged as expired. Returns the number deleted.
    fn cleanup(&self) -> BulkOutcome<u64>;

    /// Count stored entries, including expired ones.
    fn count(&self) -> DriverResult<u64>;

    /// Delete an entry.
    ///
    /// `Ok(true)` means the ID is absent when this returns, including when
    /// it was never stored.
    fn delete(&self, id: &str) -> DriverResult<bool>;

    /// Expire an entry.
    ///
    /// `Ok(true)` means the entry is expired or unreachable when this
    /// returns, including when it was never stored.
    fn expire(&self, id: &str) -> DriverResult<bool> {
        match self.read(id)? {
            Some(mut entry) => {
                entry.expire();
                self.write(&entry)
            }
            None => Ok(true),
        }
    }

    /// Delete every entry.
    fn flush(&self) -> BulkOutcome;

    /// Whether an ID is stored. Expired entries still exist until deleted.
    fn has(&self, id: &str) -> DriverResult<bool>;

    /// Read an entry. `Ok(None)` is a miss.
    fn read(&self, id: &str) -> DriverResult<Option<Entry>>;

    /// Repopulate this driver from its source of truth.
    ///
    /// Single-store backends are their own source of truth, so the default
    /// does nothing.
    fn restore(&self) -> BulkOutcome<u64> {
        BulkOutcome::ok(0)
    }

    /// Flag entries whose lifetime has lapsed. Returns the number expired.
    fn review(&self) -> BulkOutcome<u64>;

    /// List stored IDs.
    fn scan(&self) -> DriverResult<Vec<String>>;

    /// Search entries. Not supported yet: always `Ok(None)`.
    fn search(&self, _query: &Query) -> DriverResult<Option<HashMap<String, Entry>>> {
        Ok(None)
    }

    /// Store an entry under its ID.
    fn write(&self, entry: &Entry) -> DriverResult<bool>;
}

impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn cleanup(&self) -> BulkOutcome<u64> {
        (**self).cleanup()
    }

    fn count(&self) -> DriverResult<u64> {
        (**self).count()
    }

    fn delete(&self, id: &str) -> DriverResult<bool> {
        (**self).delete(id)
    }

    fn expire(&self, id: &str) -> DriverResult<bool> {
        (**self).expire(id)
    }

    fn flush(&self) -> BulkOutcome {
        (**self).flush()
    }

    fn has(&self, id: &str) -> DriverResult<bool> {
        (**self).has(id)
    }

    fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
        (**self).read(id)
    }

    fn restore(&self) -> BulkOutcome<u64> {
        (**self).restore()
    }

    fn review(&self) -> BulkOutcome<u64> {
        (**self).review()
    }

    fn scan(&self) -> DriverResult<Vec<String>> {
        (**self).scan()
    }

    fn search(&self, query: &Query) -> DriverResult<Option<HashMap<String, Entry>>> {
        (**self).search(query)
    }

    fn write(&self, entry: &Entry) -> DriverResult<bool> {
        (**self).write(entry)
    }
}
