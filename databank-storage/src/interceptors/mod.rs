//! Interceptors shipped with databank.
//!
//! - [`TracingInterceptor`]: structured `tracing` events per operation
//! - [`StatsInterceptor`]: hit/miss/write/delete/error counters

mod logging;
mod stats;

pub use logging::TracingInterceptor;
pub use stats::{CacheStats, StatsInterceptor};
