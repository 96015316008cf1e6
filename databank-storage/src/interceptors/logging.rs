//! Logging interceptor.

use std::collections::HashMap;

use databank_core::{DriverError, DriverResult, Entry};
use tracing::Level;

use crate::chain::{Interceptor, Next, NextId};
use crate::driver::{BulkOutcome, Query};

const TARGET: &str = "databank::interceptor";

/// Emit an event at a level chosen at runtime.
macro_rules! event_at {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!(target: TARGET, $($rest)+),
            Level::WARN => tracing::warn!(target: TARGET, $($rest)+),
            Level::INFO => tracing::info!(target: TARGET, $($rest)+),
            Level::DEBUG => tracing::debug!(target: TARGET, $($rest)+),
            _ => tracing::trace!(target: TARGET, $($rest)+),
        }
    };
}

/// Logs every driver operation through `tracing`.
///
/// Events carry `label`, `operation` and, for single-entry operations, `id`.
/// Successful calls log at the configured level; any error raises the event
/// to ERROR, with multiple errors joined into one message.
#[derive(Debug, Clone)]
pub struct TracingInterceptor {
    label: String,
    level: Level,
}

impl TracingInterceptor {
    pub fn new(label: impl Into<String>, level: Level) -> Self {
        Self {
            label: label.into(),
            level,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn level(&self) -> Level {
        self.level
    }

    fn success(&self, operation: &str, id: Option<&str>, message: &str) {
        event_at!(
            self.level,
            label = %self.label,
            operation,
            id,
            "{}",
            message
        );
    }

    fn failure(&self, operation: &str, id: Option<&str>, errors: &[DriverError]) {
        tracing::error!(
            target: TARGET,
            label = %self.label,
            operation,
            id,
            "{}",
            flatten(errors)
        );
    }

    fn single<T>(
        &self,
        operation: &str,
        id: Option<&str>,
        result: DriverResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> DriverResult<T> {
        match &result {
            Ok(value) => self.success(operation, id, &describe(value)),
            Err(e) => self.failure(operation, id, std::slice::from_ref(e)),
        }
        result
    }

    fn bulk<T>(
        &self,
        operation: &str,
        outcome: BulkOutcome<T>,
        describe: impl FnOnce(&BulkOutcome<T>) -> String,
    ) -> BulkOutcome<T> {
        if outcome.has_errors() {
            self.failure(operation, None, &outcome.errors);
        } else {
            self.success(operation, None, &describe(&outcome));
        }
        outcome
    }
}

fn flatten(errors: &[DriverError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn either(ok: bool, yes: &str, no: &str) -> String {
    let message = if ok { yes } else { no };
    message.to_string()
}

impl Interceptor for TracingInterceptor {
    fn cleanup(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        self.bulk("cleanup", next(), |o| format!("{} entries deleted", o.value))
    }

    fn count(&self, next: Next<'_, DriverResult<u64>>) -> DriverResult<u64> {
        self.single("count", None, next(), |n| format!("{} entries", n))
    }

    fn delete(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        self.single("delete", Some(id), next(id), |ok| {
            either(*ok, "deleted", "not deleted")
        })
    }

    fn expire(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        self.single("expire", Some(id), next(id), |ok| {
            either(*ok, "expired", "not expired")
        })
    }

    fn flush(&self, next: Next<'_, BulkOutcome>) -> BulkOutcome {
        self.bulk("flush", next(), |o| either(o.ok, "flushed", "flush incomplete"))
    }

    fn has(&self, id: &str, next: NextId<'_, DriverResult<bool>>) -> DriverResult<bool> {
        self.single("has", Some(id), next(id), |found| {
            either(*found, "found", "not found")
        })
    }

    fn read(
        &self,
        id: &str,
        next: NextId<'_, DriverResult<Option<Entry>>>,
    ) -> DriverResult<Option<Entry>> {
        self.single("read", Some(id), next(id), |entry| {
            either(entry.is_some(), "hit", "miss")
        })
    }

    fn restore(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        self.bulk("restore", next(), |o| format!("{} entries restored", o.value))
    }

    fn review(&self, next: Next<'_, BulkOutcome<u64>>) -> BulkOutcome<u64> {
        self.bulk("review", next(), |o| format!("{} entries expired", o.value))
    }

    fn scan(&self, next: Next<'_, DriverResult<Vec<String>>>) -> DriverResult<Vec<String>> {
        self.single("scan", None, next(), |ids| format!("{} ids", ids.len()))
    }

    fn search(
        &self,
        query: &Query,
        next: &dyn Fn(&Query) -> DriverResult<Option<HashMap<String, Entry>>>,
    ) -> DriverResult<Option<HashMap<String, Entry>>> {
        self.single("search", None, next(query), |found| match found {
            Some(results) => format!("{} results", results.len()),
            None => "unsupported".to_string(),
        })
    }

    fn write(
        &self,
        entry: &Entry,
        next: &dyn Fn(&Entry) -> DriverResult<bool>,
    ) -> DriverResult<bool> {
        let id = entry.id();
        self.single("write", Some(&id), next(entry), |ok| {
            either(*ok, "written", "not written")
        })
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
    fn test_flatten_joins_errors() {
        let errors = vec![DriverError::backend("one"), DriverError::backend("two")];
        assert_eq!(
            flatten(&errors),
            "Backend error: one; Backend error: two"
        );
    }

    #[test]
    fn test_passes_results_through() {
        let chain = InterceptorChain::new(
            Arc::new(MemoryDriver::new()),
            vec![Arc::new(TracingInterceptor::new("test", Level::INFO)) as Arc<dyn Interceptor>],
        );
        assert!(chain.write(&Entry::new("k", Duration::ZERO)).unwrap());
        assert!(chain.read("k").unwrap().is_some());
        assert!(chain.read("absent").unwrap().is_none());
        assert_eq!(chain.count().unwrap(), 1);
        assert!(chain.flush().ok);
        assert_eq!(chain.count().unwrap(), 0);
    }
}
