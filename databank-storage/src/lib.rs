//! Databank Storage - Drivers, Tiering and Interceptors
//!
//! Defines the [`Driver`] contract and everything built on it:
//!
//! - [`MemoryDriver`] and [`DiskDriver`]: self-contained backends
//! - [`SyncDriver`]: composes several drivers into one cache hierarchy with
//!   explicit read fill-back, write rollback and authority-first deletes
//! - [`InterceptorChain`]: wraps a driver in ordered cross-cutting
//!   [`Interceptor`]s such as [`TracingInterceptor`] and [`StatsInterceptor`]
//! - [`Databank`]: the frontend applying TTL policy on top of any driver
//!
//! Entry, identity and configuration types live in `databank-core` and are
//! re-exported here.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use databank_storage::{Databank, DatabankConfig, Driver, MemoryDriver, SyncDriver};
//!
//! let front: Arc<dyn Driver> = Arc::new(MemoryDriver::new());
//! let back: Arc<dyn Driver> = Arc::new(MemoryDriver::new());
//! let tiers = SyncDriver::new(vec![front, back]).unwrap();
//!
//! let bank = Databank::new(
//!     DatabankConfig::default().with_lifetime(Duration::from_secs(60)),
//!     Arc::new(tiers),
//! );
//! bank.write_value("greeting", &"hello".to_string());
//! assert_eq!(bank.read_value::<String>("greeting").as_deref(), Some("hello"));
//! ```

pub mod chain;
pub mod databank;
pub mod disk;
pub mod driver;
pub mod interceptors;
pub mod memory;
pub mod sync;

pub use chain::{Interceptor, InterceptorChain, Next, NextId};
pub use databank::Databank;
pub use disk::{filesafe, DiskConfig, DiskDriver};
pub use driver::{BulkOutcome, Driver, Query};
pub use interceptors::{CacheStats, StatsInterceptor, TracingInterceptor};
pub use memory::MemoryDriver;
pub use sync::SyncDriver;

pub use databank_core::{
    ContentError, ContentValue, DatabankConfig, DriverError, DriverResult, Entry, EntryMetadata,
    EntryState,
};
