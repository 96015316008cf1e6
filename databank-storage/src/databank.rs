//! Cache frontend.
//!
//! [`Databank`] applies TTL policy on top of any [`Driver`]: new entries get
//! the configured lifetime, sizes are recomputed on write, and, unless the
//! bank is `hot`, entries whose lifetime has lapsed are expired lazily the
//! first time they are read.
//!
//! Driver errors do not reach callers of the frontend. They are logged at
//! WARN (when `report_errors` is set) and callers see only the logical
//! outcome. [`Databank::driver`] gives access to the full error detail.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use databank_core::{ContentValue, DatabankConfig, DriverError, DriverResult, Entry};

use crate::chain::{Interceptor, InterceptorChain};
use crate::driver::{BulkOutcome, Driver, Query};

const TARGET: &str = "databank";

/// Cache frontend over a driver.
#[derive(Clone)]
pub struct Databank {
    config: DatabankConfig,
    driver: Arc<dyn Driver>,
}

impl fmt::Debug for Databank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Databank")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Databank {
    pub fn new(config: DatabankConfig, driver: Arc<dyn Driver>) -> Self {
        Self { config, driver }
    }

    /// Wrap `driver` in `interceptors` (the last one runs first).
    pub fn with_interceptors(
        config: DatabankConfig,
        driver: Arc<dyn Driver>,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        let chain = InterceptorChain::new(driver, interceptors);
        Self::new(config, Arc::new(chain))
    }

    pub fn config(&self) -> &DatabankConfig {
        &self.config
    }

    /// The composed driver, including any interceptors.
    ///
    /// Bypasses the frontend's TTL handling and surfaces errors directly.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// An empty entry with the configured lifetime.
    pub fn new_entry(&self, key: impl Into<String>) -> Entry {
        Entry::new(key, self.config.lifetime)
    }

    pub fn cleanup(&self) -> (u64, bool) {
        let outcome = self.driver.cleanup();
        self.report_bulk("cleanup", &outcome);
        (outcome.value, outcome.ok)
    }

    /// Number of stored entries, including expired ones.
    pub fn count(&self) -> Option<u64> {
        self.settle("count", None, self.driver.count())
    }

    pub fn delete(&self, id: &str) -> bool {
        self.settle("delete", Some(id), self.driver.delete(id))
            .unwrap_or(false)
    }

    pub fn expire(&self, id: &str) -> bool {
        self.settle("expire", Some(id), self.driver.expire(id))
            .unwrap_or(false)
    }

    pub fn flush(&self) -> bool {
        let outcome = self.driver.flush();
        self.report_bulk("flush", &outcome);
        outcome.ok
    }

    /// Whether an ID is stored. Expired entries exist until deleted.
    pub fn has(&self, id: &str) -> bool {
        self.settle("has", Some(id), self.driver.has(id))
            .unwrap_or(false)
    }

    /// Read an entry.
    ///
    /// Unless the bank is hot, an entry whose lifetime has lapsed is flagged
    /// expired, written back, and reported as a miss.
    pub fn read(&self, id: &str) -> Option<Entry> {
        let mut entry = self.settle("read", Some(id), self.driver.read(id)).flatten()?;
        if !self.config.hot && entry.maybe_expire() {
            self.write(&mut entry);
            return None;
        }
        Some(entry)
    }

    pub fn restore(&self) -> (u64, bool) {
        let outcome = self.driver.restore();
        self.report_bulk("restore", &outcome);
        (outcome.value, outcome.ok)
    }

    pub fn review(&self) -> (u64, bool) {
        let outcome = self.driver.review();
        self.report_bulk("review", &outcome);
        (outcome.value, outcome.ok)
    }

    pub fn scan(&self) -> Option<Vec<String>> {
        self.settle("scan", None, self.driver.scan())
    }

    /// Search entries. No driver supports search yet, so this is `None`.
    pub fn search(&self, query: &Query) -> Option<HashMap<String, Entry>> {
        self.settle("search", None, self.driver.search(query))
            .flatten()
    }

    /// Write an entry, recomputing its size first.
    pub fn write(&self, entry: &mut Entry) -> bool {
        entry.calculate_size();
        let id = entry.id();
        self.settle("write", Some(&id), self.driver.write(entry))
            .unwrap_or(false)
    }

    /// Read an entry and decode its content as `T`.
    ///
    /// A miss or undecodable content is `None`.
    pub fn read_value<T: ContentValue>(&self, id: &str) -> Option<T> {
        let entry = self.read(id)?;
        match entry.read_value() {
            Ok(value) => Some(value),
            Err(e) => {
                if self.config.report_errors {
                    tracing::warn!(target: TARGET, id, error = %e, "undecodable content");
                }
                None
            }
        }
    }

    /// Store `value` in a fresh entry under `key`.
    ///
    /// Returns the entry as written and whether the write succeeded.
    pub fn write_value<T: ContentValue>(&self, key: impl Into<String>, value: &T) -> (Entry, bool) {
        let mut entry = self.new_entry(key);
        entry.write_value(value);
        let ok = self.write(&mut entry);
        (entry, ok)
    }

    fn settle<T>(&self, operation: &str, id: Option<&str>, result: DriverResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(operation, id, &e);
                None
            }
        }
    }

    fn report_bulk<T>(&self, operation: &str, outcome: &BulkOutcome<T>) {
        for e in &outcome.errors {
            self.report(operation, None, e);
        }
    }

    fn report(&self, operation: &str, id: Option<&str>, error: &DriverError) {
        if self.config.report_errors {
            tracing::warn!(target: TARGET, operation, id, error = %error, "driver error");
        }
    }
}
