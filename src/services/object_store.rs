//! Storage collaborator seam.
//!
//! The sync core only lists, downloads and uploads; everything else about the
//! storage backend stays behind these traits.

use crate::errors::SyncResult;
use crate::models::ObjectDescriptor;
use async_trait::async_trait;
use std::{path::Path, sync::Arc};

/// Bucket-style object storage opened with one credential profile.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List the objects of `bucket`. A single page; no pagination.
    async fn list(&self, bucket: &str) -> SyncResult<Vec<ObjectDescriptor>>;

    /// Write the object `bucket/key` to `local_path`.
    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> SyncResult<()>;

    /// Create or replace `bucket/key` with the content of `local_path`.
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> SyncResult<()>;
}

/// Opens an [`ObjectStore`] for a named credential profile.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    async fn open(&self, profile: &str) -> SyncResult<Arc<dyn ObjectStore>>;
}
