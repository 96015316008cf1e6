//! Entries and their TTL lifecycle.
//!
//! An [`Entry`] is the unit of storage: an opaque payload plus the key and
//! tags that determine its ID, and metadata describing its lifetime.
//!
//! # Expiry
//!
//! Expiry is a sticky flag, not a timestamp comparison. [`Entry::should_expire`]
//! is the pure check; [`Entry::maybe_expire`] and [`Entry::expire`] flip the
//! flag. Once set, only [`Entry::touch`] clears it. Expiring an entry never
//! removes it from storage; that takes an explicit delete or flush.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::entry_id;

/// Lifecycle state derived from the sticky expiry flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryState {
    Live,
    Expired,
}

/// Lifetime metadata for an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    /// Set once at creation from a zero TTL.
    pub expires_never: bool,
    /// Sticky; cleared only by `touch`.
    pub expired: bool,
}

/// A single stored record and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(with = "content_base64")]
    pub content: Vec<u8>,
    pub key: String,
    /// Byte length of `content` as of the last write. Recomputed before
    /// persistence; not trusted otherwise.
    pub size: u64,
    pub tags: HashMap<String, String>,
    pub meta: EntryMetadata,
}

impl Entry {
    /// Create an empty entry. A zero `ttl` means the entry never expires.
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self::new_at(key, ttl, Utc::now())
    }

    /// Create an empty entry as if at `now`.
    pub fn new_at(key: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            content: Vec::new(),
            key: key.into(),
            size: 0,
            tags: HashMap::new(),
            meta: EntryMetadata {
                created: now,
                expires: offset(now, ttl),
                expires_never: ttl.is_zero(),
                expired: false,
            },
        }
    }

    /// Attach a tag, changing the entry's ID.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Replace the payload.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self.calculate_size();
        self
    }

    /// The storage ID derived from key and tags.
    pub fn id(&self) -> String {
        entry_id(&self.key, &self.tags)
    }

    /// Recompute `size` from the current content.
    pub fn calculate_size(&mut self) {
        self.size = self.content.len() as u64;
    }

    /// The configured span between creation and expiry.
    pub fn lifetime(&self) -> Duration {
        (self.meta.expires - self.meta.created)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn state(&self) -> EntryState {
        if self.meta.expired {
            EntryState::Expired
        } else {
            EntryState::Live
        }
    }

    pub fn is_expired(&self) -> bool {
        self.meta.expired
    }

    /// Mark the entry expired.
    pub fn expire(&mut self) {
        self.meta.expired = true;
    }

    /// Whether the entry should presently expire.
    pub fn should_expire(&self) -> bool {
        self.should_expire_at(Utc::now())
    }

    pub fn should_expire_at(&self, now: DateTime<Utc>) -> bool {
        if self.meta.expired || self.meta.expires_never {
            return false;
        }
        now >= self.meta.expires
    }

    /// Expire the entry if it should expire. Returns whether it did.
    pub fn maybe_expire(&mut self) -> bool {
        self.maybe_expire_at(Utc::now())
    }

    pub fn maybe_expire_at(&mut self, now: DateTime<Utc>) -> bool {
        let expire = self.should_expire_at(now);
        if expire {
            self.expire();
        }
        expire
    }

    /// Renew the entry, keeping its lifetime. Clears the expiry flag.
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    pub fn touch_at(&mut self, now: DateTime<Utc>) {
        let lifetime = self.lifetime();
        self.meta.created = now;
        self.meta.expires = offset(now, lifetime);
        self.meta.expired = false;
    }
}

/// `at + ttl`, saturating at the maximum representable instant.
fn offset(at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Serde adapter persisting byte content as standard padded base64.
mod content_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
