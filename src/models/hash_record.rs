//! Represents a persisted content hash for one destination object.

use sqlx::FromRow;

/// A row of the `hashes` table.
///
/// Logically keyed by `destination_key`. The source and destination hashes
/// are the same digest: the object is hashed once, after staging.
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct HashRecord {
    /// Bucket the object was read from.
    pub source_bucket: String,

    /// Key of the object in the source bucket.
    pub source_key: String,

    /// Digest of the staged source content.
    pub source_hash: String,

    /// Key the object was written to in the destination bucket.
    pub destination_key: String,

    /// Digest recorded for the destination object.
    pub destination_hash: String,
}
