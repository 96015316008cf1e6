//! Databank Test Utilities
//!
//! Shared test infrastructure for the databank workspace:
//! - A driver conformance suite run against every [`Driver`] implementation
//! - A fault-injecting driver with an optional call journal
//! - Proptest generators for entries, keys and tags
//! - Fixtures mirroring the reference ID vectors

// Re-export the types test code reaches for most
pub use databank_core::{DatabankConfig, DriverError, DriverResult, Entry};
pub use databank_storage::{BulkOutcome, Databank, Driver, MemoryDriver};

use std::sync::Arc;

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Reference entries with known IDs.

    use std::collections::HashMap;

    /// One reference entry: expected ID, key, content and tags.
    #[derive(Debug, Clone, Copy)]
    pub struct Sample {
        pub id: &'static str,
        pub key: &'static str,
        pub content: &'static str,
        pub tags: &'static [(&'static str, &'static str)],
    }

    impl Sample {
        pub fn tags(&self) -> HashMap<String, String> {
            self.tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }
    }

    /// Reference entries, in sorted ID order.
    pub const SAMPLES: &[Sample] = &[
        Sample {
            id: "test",
            key: "test",
            content: "abc",
            tags: &[],
        },
        Sample {
            id: "test2",
            key: "test2",
            content: "defghi",
            tags: &[],
        },
        Sample {
            id: "test3",
            key: "test3",
            content: "RWRnZSBuZXR3b3JrIGlzIGJlc3QgbmV0d29yayEhITE=",
            tags: &[],
        },
        Sample {
            id: "test4_16257516605739849767",
            key: "test4",
            content: "jklmn",
            tags: &[("tag1", "val1")],
        },
        Sample {
            id: "test5_5091786465586096835",
            key: "test5",
            content: "opq",
            tags: &[("tag2", "val2"), ("tag1", "val1")],
        },
        Sample {
            id: "test6_12385537651473712091",
            key: "test6",
            content: "rstu",
            tags: &[("vec", "54"), ("met", "100003"), ("zoop", "21.9")],
        },
    ];

    /// IDs never written by the suite.
    pub const ABSENT_IDS: &[&str] = &["false", "true", "null", "y10gu", "zzz"];
}

// ============================================================================
// CONFORMANCE SUITE
// ============================================================================

pub mod conformance {
    //! Behavioral checks every driver must pass when used behind a
    //! [`Databank`].

    use super::*;
    use crate::fixtures::{ABSENT_IDS, SAMPLES};
    use std::time::Duration;

    /// Base unit for timed checks.
    pub const BASE_SLEEP: Duration = Duration::from_millis(100);

    /// Runs the conformance suite against drivers from a factory.
    ///
    /// Every check starts from a flushed driver and flushes it again when
    /// done, so a factory may hand out drivers sharing one store.
    pub struct DriverTester {
        factory: Box<dyn Fn() -> Arc<dyn Driver>>,
    }

    impl DriverTester {
        pub fn new(factory: impl Fn() -> Arc<dyn Driver> + 'static) -> Self {
            Self {
                factory: Box::new(factory),
            }
        }

        fn bank(&self, config: DatabankConfig) -> Databank {
            let bank = Databank::new(config, (self.factory)());
            if bank.scan().is_some_and(|ids| !ids.is_empty()) {
                assert!(bank.flush(), "unable to flush polluted driver before testing");
            }
            bank
        }

        /// Run every check.
        pub fn run_all(&self) {
            self.sequence();
            self.write_and_read();
            self.overwrite();
            self.delete();
            self.expiry();
            self.flush();
            self.timed_expiry();
        }

        /// Write the reference entries, then count, scan, has, read, delete
        /// and flush them in order.
        pub fn sequence(&self) {
            let bank = self.bank(DatabankConfig::default());

            for sample in SAMPLES {
                let mut entry = bank.new_entry(sample.key);
                entry.tags = sample.tags();
                entry.content = sample.content.as_bytes().to_vec();
                assert_eq!(entry.id(), sample.id);
                assert!(bank.write(&mut entry), "write {}", sample.id);
                assert_eq!(entry.size, sample.content.len() as u64);
            }

            assert_eq!(bank.count(), Some(SAMPLES.len() as u64));

            let mut ids = bank.scan().expect("scan");
            ids.sort();
            let expected: Vec<&str> = SAMPLES.iter().map(|s| s.id).collect();
            assert_eq!(ids, expected);

            for id in &ids {
                assert!(bank.has(id), "has {}", id);
            }
            for id in ABSENT_IDS {
                assert!(!bank.has(id), "has absent {}", id);
                assert!(bank.read(id).is_none(), "read absent {}", id);
            }

            for sample in SAMPLES {
                let entry = bank.read(sample.id).expect("read sample");
                assert_eq!(entry.key, sample.key);
                assert_eq!(entry.content, sample.content.as_bytes());
                assert_eq!(entry.size, sample.content.len() as u64);
                assert_eq!(entry.tags, sample.tags());
            }

            let deleted = ["test", "test2"];
            for id in deleted {
                assert!(bank.delete(id), "delete {}", id);
            }
            let remaining = bank.scan().expect("scan after delete");
            assert_eq!(remaining.len(), SAMPLES.len() - deleted.len());
            assert!(remaining.iter().all(|id| !deleted.contains(&id.as_str())));

            assert!(bank.flush());
            assert_eq!(bank.count(), Some(0));
        }

        pub fn write_and_read(&self) {
            let bank = self.bank(DatabankConfig::default());

            let (entry, ok) = bank.write_value("test", &"abc".to_string());
            assert!(ok);
            assert_eq!(entry.content, b"abc");
            assert_eq!(bank.read_value::<String>("test").as_deref(), Some("abc"));

            bank.flush();
        }

        pub fn overwrite(&self) {
            let bank = self.bank(DatabankConfig::default());

            bank.write_value("test", &"abc".to_string());
            assert_eq!(bank.read_value::<String>("test").as_deref(), Some("abc"));

            let (_, ok) = bank.write_value("test", &"def".to_string());
            assert!(ok);
            assert_eq!(bank.read_value::<String>("test").as_deref(), Some("def"));
            assert_eq!(bank.count(), Some(1));

            bank.flush();
        }

        pub fn delete(&self) {
            let bank = self.bank(DatabankConfig::default());

            bank.write_value("test", &"abc".to_string());
            assert!(bank.delete("test"));
            assert!(!bank.has("test"));
            assert!(bank.delete("test"), "deleting an absent ID succeeds");
        }

        pub fn expiry(&self) {
            let bank = self.bank(DatabankConfig::default());

            bank.write_value("test", &"abc".to_string());
            assert!(bank.has("test"));
            assert!(bank.expire("test"));
            assert!(bank.has("test"), "expired entries exist until deleted");
            assert!(bank.expire("absent"), "expiring an absent ID succeeds");

            let stored = bank.driver().read("test").expect("read").expect("stored");
            assert!(stored.is_expired());

            assert_eq!(bank.cleanup(), (1, true));
            assert!(!bank.has("test"));

            bank.flush();
        }

        pub fn flush(&self) {
            let bank = self.bank(DatabankConfig::default());

            bank.write_value("test", &"abc".to_string());
            assert!(bank.flush());
            assert!(!bank.has("test"));
        }

        /// Sleeps for twice [`BASE_SLEEP`].
        pub fn timed_expiry(&self) {
            let bank = self.bank(DatabankConfig::default().with_lifetime(BASE_SLEEP));

            bank.write_value("test", &"abc".to_string());
            assert_eq!(bank.read_value::<String>("test").as_deref(), Some("abc"));

            std::thread::sleep(2 * BASE_SLEEP);
            assert_eq!(bank.read_value::<String>("test"), None);

            let stored = bank.driver().read("test").expect("read").expect("stored");
            assert!(stored.is_expired());

            bank.flush();
        }
    }
}

// ============================================================================
// FAULT INJECTION
// ============================================================================

pub mod faults {
    //! A memory-backed driver that fails on demand and journals its calls.

    use super::*;
    use databank_storage::Query;
    use std::collections::{HashMap, HashSet};
    use std::fmt;
    use std::sync::Mutex;

    /// Shared, ordered record of driver calls, as `"<name>.<op>"`.
    pub type Journal = Arc<Mutex<Vec<String>>>;

    pub fn journal() -> Journal {
        Arc::default()
    }

    /// Snapshot of a journal.
    pub fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Driver operations that can be made to fail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Op {
        Cleanup,
        Count,
        Delete,
        Expire,
        Flush,
        Has,
        Read,
        Restore,
        Review,
        Scan,
        Search,
        Write,
    }

    impl fmt::Display for Op {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                Op::Cleanup => "cleanup",
                Op::Count => "count",
                Op::Delete => "delete",
                Op::Expire => "expire",
                Op::Flush => "flush",
                Op::Has => "has",
                Op::Read => "read",
                Op::Restore => "restore",
                Op::Review => "review",
                Op::Scan => "scan",
                Op::Search => "search",
                Op::Write => "write",
            };
            f.write_str(name)
        }
    }

    /// Memory driver that raises [`DriverError::Backend`] for selected
    /// operations, or refuses them without an error.
    ///
    /// A refused operation reports the negative outcome: `Ok(false)`,
    /// `Ok(None)`, an empty listing, or a bulk outcome with `ok` cleared and
    /// no errors. Failing takes precedence over refusing.
    pub struct FaultyDriver {
        name: String,
        inner: MemoryDriver,
        failing: Mutex<HashSet<Op>>,
        refusing: Mutex<HashSet<Op>>,
        journal: Option<Journal>,
    }

    impl FaultyDriver {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                inner: MemoryDriver::new(),
                failing: Mutex::new(HashSet::new()),
                refusing: Mutex::new(HashSet::new()),
                journal: None,
            }
        }

        /// Record every call into `journal`.
        pub fn with_journal(mut self, journal: Journal) -> Self {
            self.journal = Some(journal);
            self
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        /// The backing store, bypassing fault injection and the journal.
        pub fn inner(&self) -> &MemoryDriver {
            &self.inner
        }

        /// Make `op` fail until healed.
        pub fn fail(&self, op: Op) {
            self.failing.lock().expect("fault set").insert(op);
        }

        /// Make `op` refuse, without an error, until healed.
        pub fn refuse(&self, op: Op) {
            self.refusing.lock().expect("refusal set").insert(op);
        }

        /// Clear both failure and refusal for `op`.
        pub fn heal(&self, op: Op) {
            self.failing.lock().expect("fault set").remove(&op);
            self.refusing.lock().expect("refusal set").remove(&op);
        }

        /// Journal the call. `Ok(false)` means the call is refused.
        fn enter(&self, op: Op) -> DriverResult<bool> {
            if let Some(journal) = &self.journal {
                journal
                    .lock()
                    .expect("journal")
                    .push(format!("{}.{}", self.name, op));
            }
            if self.failing.lock().expect("fault set").contains(&op) {
                return Err(DriverError::backend(format!("{} {} failed", self.name, op)));
            }
            Ok(!self.refusing.lock().expect("refusal set").contains(&op))
        }

        fn bulk<T>(
            &self,
            op: Op,
            empty: T,
            run: impl FnOnce() -> BulkOutcome<T>,
        ) -> BulkOutcome<T> {
            match self.enter(op) {
                Ok(true) => run(),
                Ok(false) => BulkOutcome {
                    value: empty,
                    ok: false,
                    errors: Vec::new(),
                },
                Err(e) => BulkOutcome::failed(empty, e),
            }
        }
    }

    impl Driver for FaultyDriver {
        fn cleanup(&self) -> BulkOutcome<u64> {
            self.bulk(Op::Cleanup, 0, || self.inner.cleanup())
        }

        fn count(&self) -> DriverResult<u64> {
            if !self.enter(Op::Count)? {
                return Ok(0);
            }
            self.inner.count()
        }

        fn delete(&self, id: &str) -> DriverResult<bool> {
            if !self.enter(Op::Delete)? {
                return Ok(false);
            }
            self.inner.delete(id)
        }

        fn expire(&self, id: &str) -> DriverResult<bool> {
            if !self.enter(Op::Expire)? {
                return Ok(false);
            }
            self.inner.expire(id)
        }

        fn flush(&self) -> BulkOutcome {
            self.bulk(Op::Flush, (), || self.inner.flush())
        }

        fn has(&self, id: &str) -> DriverResult<bool> {
            if !self.enter(Op::Has)? {
                return Ok(false);
            }
            self.inner.has(id)
        }

        fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
            if !self.enter(Op::Read)? {
                return Ok(None);
            }
            self.inner.read(id)
        }

        fn restore(&self) -> BulkOutcome<u64> {
            self.bulk(Op::Restore, 0, || self.inner.restore())
        }

        fn review(&self) -> BulkOutcome<u64> {
            self.bulk(Op::Review, 0, || self.inner.review())
        }

        fn scan(&self) -> DriverResult<Vec<String>> {
            if !self.enter(Op::Scan)? {
                return Ok(Vec::new());
            }
            self.inner.scan()
        }

        fn search(&self, query: &Query) -> DriverResult<Option<HashMap<String, Entry>>> {
            if !self.enter(Op::Search)? {
                return Ok(None);
            }
            self.inner.search(query)
        }

        fn write(&self, entry: &Entry) -> DriverResult<bool> {
            if !self.enter(Op::Write)? {
                return Ok(false);
            }
            self.inner.write(entry)
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for entries and their parts.

    use super::*;
    use proptest::collection::{hash_map, vec};
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Entry keys, including characters the disk driver must escape.
    pub fn arb_key() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9:/._-]{0,23}"
    }

    /// Filesafe keys, stored under their own name on disk.
    pub fn arb_safe_key() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9._-]{0,23}"
    }

    pub fn arb_tags() -> impl Strategy<Value = HashMap<String, String>> {
        hash_map("[a-z]{1,8}", "[a-zA-Z0-9.]{0,8}", 0..6)
    }

    pub fn arb_content() -> impl Strategy<Value = Vec<u8>> {
        vec(any::<u8>(), 0..256)
    }

    /// Zero (never expires) or up to an hour.
    pub fn arb_ttl() -> impl Strategy<Value = Duration> {
        prop_oneof![
            Just(Duration::ZERO),
            (1u64..3_600_000).prop_map(Duration::from_millis),
        ]
    }

    pub fn arb_entry() -> impl Strategy<Value = Entry> {
        (arb_key(), arb_tags(), arb_content(), arb_ttl()).prop_map(|(key, tags, content, ttl)| {
            let mut entry = Entry::new(key, ttl).with_content(content);
            entry.tags = tags;
            entry
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::conformance::DriverTester;
    use super::faults::{self, FaultyDriver, Op};
    use super::fixtures::SAMPLES;
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_samples_have_expected_ids() {
        for sample in SAMPLES {
            let mut entry = Entry::new(sample.key, Duration::ZERO);
            entry.tags = sample.tags();
            assert_eq!(entry.id(), sample.id);
        }
    }

    #[test]
    fn test_memory_driver_conforms() {
        DriverTester::new(|| Arc::new(MemoryDriver::new()) as Arc<dyn Driver>).run_all();
    }

    #[test]
    fn test_faulty_driver_injects_and_journals() {
        let journal = faults::journal();
        let driver = FaultyDriver::new("front").with_journal(journal.clone());

        assert!(driver.write(&Entry::new("k", Duration::ZERO)).unwrap());
        driver.fail(Op::Read);
        let err = driver.read("k").unwrap_err();
        assert_eq!(err.to_string(), "Backend error: front read failed");

        driver.heal(Op::Read);
        assert!(driver.read("k").unwrap().is_some());
        assert_eq!(
            faults::entries(&journal),
            vec!["front.write", "front.read", "front.read"]
        );
    }

    #[test]
    fn test_faulty_bulk_operations_report_errors() {
        let driver = FaultyDriver::new("back");
        driver.fail(Op::Flush);
        let outcome = driver.flush();
        assert!(!outcome.ok);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_faulty_driver_refuses_without_error() {
        let driver = FaultyDriver::new("tier");
        driver.refuse(Op::Write);
        assert!(!driver.write(&Entry::new("k", Duration::ZERO)).unwrap());
        assert!(!driver.inner().has("k").unwrap());

        driver.refuse(Op::Review);
        let outcome = driver.review();
        assert!(!outcome.ok);
        assert!(!outcome.has_errors());

        driver.fail(Op::Write);
        assert!(driver.write(&Entry::new("k", Duration::ZERO)).is_err());

        driver.heal(Op::Write);
        assert!(driver.write(&Entry::new("k", Duration::ZERO)).unwrap());
    }
}
