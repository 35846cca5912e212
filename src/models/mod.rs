//! Core data models for the bucket synchronizer.
//!
//! Object descriptors come from storage listings and are never mutated.
//! Hash records map onto the `hashes` table via `sqlx::FromRow`.

pub mod bucket;
pub mod hash_record;
pub mod object;

pub use bucket::BucketPair;
pub use hash_record::HashRecord;
pub use object::ObjectDescriptor;
