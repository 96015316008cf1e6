//! Counting interceptor.

use std::sync::atomic::{AtomicU64, Ordering};

use databank_core::{DriverResult, Entry};

use crate::chain::{Interceptor, Next, NextId};
use crate::driver::BulkOutcome;

/// Snapshot of the counters kept by [`StatsInterceptor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that found an entry.
    pub hits: u64,
    /// Reads that found nothing.
    pub misses: u64,
    /// Successful writes.
    pub writes: u64,
    /// Successful deletes.
    pub deletes: u64,
    /// Operational errors seen across all operations.
    pub errors: u64,
}

impl CacheStats {
    /// Share of reads that hit, or `None` before the first read.
    pub fn hit_rate(&self) -> Option<f64> {
        let reads = self.hits + self.misses;
        (reads > 0).then(|| self.hits as f64 / reads as f64)
    }
}

/// Counts reads, writes, deletes and errors flowing through a chain.
#[derive(Debug, Default)]
pub struct StatsInterceptor {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl StatsInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.writes,
            &self.deletes,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn track<T>(&self, result: DriverResult<T>) -> DriverResult<T> {
        if result.is_err() {
            Self::bump(&self.errors);
        }
        result
    }

    fn track_bulk<T>(&self, outcome: BulkOutcome<T>) -> BulkOutcome<T> {
        self.errors
            .fetch_add(outcome.errors.len() as u64, Ordering::Relaxed);
        outcome
    }
}

impl Interceptor for StatsInterceptor {
    fn cleanup(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        self.track_bulk(next())
    }

    fn count(&self, next: Next<'_, DriverResult<u64>>) -> DriverResult<u64> {
        self.track(next())
    }

    fn delete(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        let result = self.track(next(id));
        if let Ok(true) = result {
            Self::bump(&self.deletes);
        }
        result
    }

    fn expire(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        self.track(next(id))
    }

    fn flush(&self, next: Next<'_, BulkOutcome>) -> BulkOutcome {
        self.track_bulk(next())
    }

    fn has(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        self.track(next(id))
    }

    fn read(
        &self,
        id: &str,
        next: NextId<'_, DriverResult<Option<Entry>>>,
    ) -> DriverResult<Option<Entry>> {
        let result = self.track(next(id));
        match &result {
            Ok(Some(_)) => Self::bump(&self.hits),
            Ok(None) => Self::bump(&self.misses),
            Err(_) => {}
        }
        result
    }

    fn restore(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        self.track_bulk(next())
    }

    fn review(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        self.track_bulk(next())
    }

    fn scan(&self, next: Next<'_, DriverResult<Vec<String>>>) -> DriverResult<Vec<String>> {
        self.track(next())
    }

    fn write(
        &self,
        entry: &Entry,
        next: &dyn Fn(&Entry) -> DriverResult<bool>,
    ) -> DriverResult<bool> {
        let result = self.track(next(entry));
        if let Ok(true) = result {
            Self::bump(&self.writes);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InterceptorChain;
    use crate::driver::Driver;
    use crate::memory::MemoryDriver;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_hit_rate_needs_reads() {
        assert_eq!(CacheStats::default().hit_rate(), None);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            writes: 10,
            ..CacheStats::default()
        };
        assert_eq!(stats.hit_rate(), Some(0.75));
    }

    #[test]
    fn test_counts_operations() {
        let stats = Arc::new(StatsInterceptor::new());
        let chain = InterceptorChain::new(
            Arc::new(MemoryDriver::new()),
            vec![stats.clone() as Arc<dyn Interceptor>],
        );

        chain.write(&Entry::new("k", Duration::ZERO)).unwrap();
        chain.read("k").unwrap();
        chain.read("k").unwrap();
        chain.read("absent").unwrap();
        chain.delete("k").unwrap();

        assert_eq!(
            stats.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                writes: 1,
                deletes: 1,
                errors: 0,
            }
        );

        stats.reset();
        assert_eq!(stats.stats(), CacheStats::default());
    }
}
