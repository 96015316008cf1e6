//! Databank Core - Entry, Identity and TTL Model
//!
//! Pure data structures shared by every driver. Storage behavior lives in
//! `databank-storage`.
//!
//! - [`Entry`] / [`EntryMetadata`]: the unit of storage and its sticky
//!   expiry lifecycle
//! - [`entry_id`]: deterministic, tag-order-independent storage IDs
//! - [`ContentValue`]: typed payload encoding
//! - [`DriverError`]: operational failures surfaced by drivers
//! - [`DatabankConfig`]: frontend TTL policy

pub mod config;
pub mod content;
pub mod entry;
pub mod error;
pub mod identity;

pub use config::DatabankConfig;
pub use content::ContentValue;
pub use entry::{Entry, EntryMetadata, EntryState};
pub use error::{ContentError, DriverError, DriverResult};
pub use identity::{canonical_tags, entry_id, fnv1a_64};
