//! Typed entry content.
//!
//! Integers are stored in host byte order at their natural width. Strings
//! are stored as UTF-8 bytes.

use crate::entry::Entry;
use crate::error::ContentError;

/// A value that can be stored as, and recovered from, entry content.
pub trait ContentValue: Sized {
    fn to_content(&self) -> Vec<u8>;

    fn from_content(bytes: &[u8]) -> Result<Self, ContentError>;
}

macro_rules! int_content {
    ($($t:ty),* $(,)?) => {
        $(
            impl ContentValue for $t {
                fn to_content(&self) -> Vec<u8> {
                    self.to_ne_bytes().to_vec()
                }

                fn from_content(bytes: &[u8]) -> Result<Self, ContentError> {
                    let raw: [u8; std::mem::size_of::<$t>()] =
                        bytes.try_into().map_err(|_| ContentError::Width {
                            expected: std::mem::size_of::<$t>(),
                            actual: bytes.len(),
                        })?;
                    Ok(<$t>::from_ne_bytes(raw))
                }
            }
        )*
    };
}

int_content!(i16, i32, i64, u16, u32, u64);

impl ContentValue for String {
    fn to_content(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_content(bytes: &[u8]) -> Result<Self, ContentError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| ContentError::Utf8(e.to_string()))
    }
}

impl ContentValue for Vec<u8> {
    fn to_content(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_content(bytes: &[u8]) -> Result<Self, ContentError> {
        Ok(bytes.to_vec())
    }
}

impl Entry {
    /// Decode the content as `T`.
    pub fn read_value<T: ContentValue>(&self) -> Result<T, ContentError> {
        T::from_content(&self.content)
    }

    /// Replace the content with an encoded `T` and update `size`.
    pub fn write_value<T: ContentValue>(&mut self, value: &T) {
        self.content = value.to_content();
        self.calculate_size();
    }
}
