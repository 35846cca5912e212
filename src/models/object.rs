//! Represents an object (blob) as reported by a bucket listing.

use chrono::{DateTime, Utc};

/// A single listed object.
///
/// Descriptors carry metadata only, never content bytes. The key is unique
/// within its bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Timestamp when the object was last modified.
    pub last_modified: DateTime<Utc>,

    /// Size in bytes.
    pub size: u64,
}

impl ObjectDescriptor {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            key: key.into(),
            last_modified,
            size,
        }
    }

    /// Last path segment of the key, used to name the local staging file.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}
