//! Bucket-to-bucket replication that only copies objects which changed.
//!
//! The binary wires [`services::run_service::RunDriver`] to S3; tests drive
//! the same code through in-memory [`services::object_store::ObjectStore`]s.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use config::{AppConfig, CheckMode, HashMismatchPolicy, HashRecordTiming};
pub use errors::{SyncError, SyncResult};
pub use models::{BucketPair, HashRecord, ObjectDescriptor};
pub use services::{
    detector::{ChangeDetector, DestinationIndex},
    hash_store::HashStore,
    hasher::hash_file,
    marker::LastRunMarker,
    object_store::{ObjectStore, StoreFactory},
    run_service::{RunDriver, RunSummary},
    s3_store::{S3ObjectStore, S3StoreFactory},
    sync_service::{ObjectOutcome, PassSummary, SyncService},
};
