//! Interceptor chain.
//!
//! An [`InterceptorChain`] wraps a base driver with an ordered list of
//! [`Interceptor`]s. Link 0 is the driver; interceptor `i` wraps link `i - 1`.
//! A call enters the **last** interceptor in the list first and reaches the
//! driver only if every interceptor on the way calls its continuation.
//!
//! ```text
//! interceptors = [A, B]
//! call -> B -> A -> driver
//! ```
//!
//! The chain is assembled once and never changes afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use databank_core::{DriverResult, Entry};

use crate::driver::{BulkOutcome, Driver, Query};

/// Continuation for operations taking no input.
pub type Next<'a, R> = &'a dyn Fn() -> R;
/// Continuation for operations taking an ID.
pub type NextId<'a, R> = &'a dyn Fn(&str) -> R;

/// Cross-cutting behavior around driver operations.
///
/// Each method receives the operation's input and `next`, the rest of the
/// chain. Not calling `next` short-circuits the pipeline: inner interceptors
/// and the driver never run. Every method forwards unchanged by default, so
/// an interceptor only overrides what it observes.
pub trait Interceptor: Send + Sync {
    fn cleanup(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        next()
    }

    fn count(&self, next: Next<'_, DriverResult<u64>>) -> DriverResult<u64> {
        next()
    }

    fn delete(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        next(id)
    }

    fn expire(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        next(id)
    }

    fn flush(&self, next: Next<'_, BulkOutcome>) -> BulkOutcome {
        next()
    }

    fn has(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        next(id)
    }

    fn read(
        &self,
        id: &str,
        next: NextId<'_, DriverResult<Option<Entry>>>,
    ) -> DriverResult<Option<Entry>> {
        next(id)
    }

    fn restore(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        next()
    }

    fn review(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        next()
    }

    fn scan(&self, next: Next<'_, DriverResult<Vec<String>>>) -> DriverResult<Vec<String>> {
        next()
    }

    fn search(
        &self,
        query: &Query,
        next: &dyn Fn(&Query) -> DriverResult<Option<HashMap<String, Entry>>>,
    ) -> DriverResult<Option<HashMap<String, Entry>>> {
        next(query)
    }

    fn write(
        &self,
        entry: &Entry,
        next: &dyn Fn(&Entry) -> DriverResult<bool>,
    ) -> DriverResult<bool> {
        next(entry)
    }
}

/// A driver wrapped in an ordered list of interceptors.
#[derive(Clone)]
pub struct InterceptorChain {
    driver: Arc<dyn Driver>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl InterceptorChain {
    /// Wrap `driver`. The last interceptor in `interceptors` runs first.
    pub fn new(driver: Arc<dyn Driver>, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            driver,
            interceptors,
        }
    }

    /// The wrapped driver, bypassing every interceptor.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    fn cleanup_at(&self, link: usize) -> BulkOutcome<u64> {
        match link {
            0 => self.driver.cleanup(),
            _ => self.interceptors[link - 1].cleanup(&|| self.cleanup_at(link - 1)),
        }
    }

    fn count_at(&self, link: usize) -> DriverResult<u64> {
        match link {
            0 => self.driver.count(),
            _ => self.interceptors[link - 1].count(&|| self.count_at(link - 1)),
        }
    }

    fn delete_at(&self, link: usize, id: &str) -> DriverResult<bool> {
        match link {
            0 => self.driver.delete(id),
            _ => self.interceptors[link - 1].delete(id, &|id| self.delete_at(link - 1, id)),
        }
    }

    fn expire_at(&self, link: usize, id: &str) -> DriverResult<bool> {
        match link {
            0 => self.driver.expire(id),
            _ => self.interceptors[link - 1].expire(id, &|id| self.expire_at(link - 1, id)),
        }
    }

    fn flush_at(&self, link: usize) -> BulkOutcome {
        match link {
            0 => self.driver.flush(),
            _ => self.interceptors[link - 1].flush(&|| self.flush_at(link - 1)),
        }
    }

    fn has_at(&self, link: usize, id: &str) -> DriverResult<bool> {
        match link {
            0 => self.driver.has(id),
            _ => self.interceptors[link - 1].has(id, &|id| self.has_at(link - 1, id)),
        }
    }

    fn read_at(&self, link: usize, id: &str) -> DriverResult<Option<Entry>> {
        match link {
            0 => self.driver.read(id),
            _ => self.interceptors[link - 1].read(id, &|id| self.read_at(link - 1, id)),
        }
    }

    fn restore_at(&self, link: usize) -> BulkOutcome<u64> {
        match link {
            0 => self.driver.restore(),
            _ => self.interceptors[link - 1].restore(&|| self.restore_at(link - 1)),
        }
    }

    fn review_at(&self, link: usize) -> BulkOutcome<u64> {
        match link {
            0 => self.driver.review(),
            _ => self.interceptors[link - 1].review(&|| self.review_at(link - 1)),
        }
    }

    fn scan_at(&self, link: usize) -> DriverResult<Vec<String>> {
        match link {
            0 => self.driver.scan(),
            _ => self.interceptors[link - 1].scan(&|| self.scan_at(link - 1)),
        }
    }

    fn search_at(
        &self,
        link: usize,
        query: &Query,
    ) -> DriverResult<Option<HashMap<String, Entry>>> {
        match link {
            0 => self.driver.search(query),
            _ => self.interceptors[link - 1].search(query, &|q| self.search_at(link - 1, q)),
        }
    }

    fn write_at(&self, link: usize, entry: &Entry) -> DriverResult<bool> {
        match link {
            0 => self.driver.write(entry),
            _ => self.interceptors[link - 1].write(entry, &|e| self.write_at(link - 1, e)),
        }
    }
}

impl Driver for InterceptorChain {
    fn cleanup(&self) -> BulkOutcome<u64> {
        self.cleanup_at(self.len())
    }

    fn count(&self) -> DriverResult<u64> {
        self.count_at(self.len())
    }

    fn delete(&self, id: &str) -> DriverResult<bool> {
        self.delete_at(self.len(), id)
    }

    fn expire(&self, id: &str) -> DriverResult<bool> {
        self.expire_at(self.len(), id)
    }

    fn flush(&self) -> BulkOutcome {
        self.flush_at(self.len())
    }

    fn has(&self, id: &str) -> DriverResult<bool> {
        self.has_at(self.len(), id)
    }

    fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
        self.read_at(self.len(), id)
    }

    fn restore(&self) -> BulkOutcome<u64> {
        self.restore_at(self.len())
    }

    fn review(&self) -> BulkOutcome<u64> {
        self.review_at(self.len())
    }

    fn scan(&self) -> DriverResult<Vec<String>> {
        self.scan_at(self.len())
    }

    fn search(&self, query: &Query) -> DriverResult<Option<HashMap<String, Entry>>> {
        self.search_at(self.len(), query)
    }

    fn write(&self, entry: &Entry) -> DriverResult<bool> {
        self.write_at(self.len(), entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDriver;
    use std::sync::Mutex;
    use std::time::Duration;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records entry into `read`, optionally refusing to continue.
    struct Recorder {
        name: &'static str,
        journal: Journal,
        short_circuit: bool,
    }

    impl Interceptor for Recorder {
        fn read(
            &self,
            id: &str,
            next: NextId<'_, DriverResult<Option<Entry>>>,
        ) -> DriverResult<Option<Entry>> {
            self.journal.lock().unwrap().push(self.name.to_string());
            if self.short_circuit {
                return Ok(None);
            }
            next(id)
        }
    }

    /// Driver that journals reads before delegating to memory.
    struct JournalDriver {
        inner: MemoryDriver,
        journal: Journal,
    }

    impl Driver for JournalDriver {
        fn cleanup(&self) -> BulkOutcome<u64> {
            self.inner.cleanup()
        }
        fn count(&self) -> DriverResult<u64> {
            self.inner.count()
        }
        fn delete(&self, id: &str) -> DriverResult<bool> {
            self.inner.delete(id)
        }
        fn flush(&self) -> BulkOutcome {
            self.inner.flush()
        }
        fn has(&self, id: &str) -> DriverResult<bool> {
            self.inner.has(id)
        }
        fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
            self.journal.lock().unwrap().push("driver".to_string());
            self.inner.read(id)
        }
        fn review(&self) -> BulkOutcome<u64> {
            self.inner.review()
        }
        fn scan(&self) -> DriverResult<Vec<String>> {
            self.inner.scan()
        }
        fn write(&self, entry: &Entry) -> DriverResult<bool> {
            self.inner.write(entry)
        }
    }

    fn chain(short_circuit_b: bool) -> (InterceptorChain, Journal) {
        let journal: Journal = Arc::default();
        let driver = Arc::new(JournalDriver {
            inner: MemoryDriver::new(),
            journal: journal.clone(),
        });
        let a = Arc::new(Recorder {
            name: "A",
            journal: journal.clone(),
            short_circuit: false,
        });
        let b = Arc::new(Recorder {
            name: "B",
            journal: journal.clone(),
            short_circuit: short_circuit_b,
        });
        let chain = InterceptorChain::new(driver, vec![a as Arc<dyn Interceptor>, b]);
        (chain, journal)
    }

    #[test]
    fn test_last_interceptor_runs_first() {
        let (chain, journal) = chain(false);
        chain.write(&Entry::new("k", Duration::ZERO)).unwrap();
        assert!(chain.read("k").unwrap().is_some());
        assert_eq!(*journal.lock().unwrap(), vec!["B", "A", "driver"]);
    }

    #[test]
    fn test_short_circuit_skips_inner_links() {
        let (chain, journal) = chain(true);
        chain.write(&Entry::new("k", Duration::ZERO)).unwrap();
        assert!(chain.read("k").unwrap().is_none());
        assert_eq!(*journal.lock().unwrap(), vec!["B"]);
    }

    #[test]
    fn test_empty_chain_is_transparent() {
        let chain = InterceptorChain::new(Arc::new(MemoryDriver::new()), Vec::new());
        assert!(chain.is_empty());
        chain.write(&Entry::new("k", Duration::ZERO)).unwrap();
        assert_eq!(chain.scan().unwrap(), vec!["k"]);
        assert_eq!(chain.count().unwrap(), 1);
        assert!(chain.search(&Query::new()).unwrap().is_none());
    }
}
