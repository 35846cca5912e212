// Shared fixtures for the sync integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bucket_sync::{
    AppConfig, CheckMode, ObjectDescriptor, ObjectStore, StoreFactory, SyncError, SyncResult,
};
use chrono::{DateTime, TimeZone, Utc};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{Arc, Mutex},
};
use tempfile::TempDir;

#[derive(Clone)]
struct StoredObject {
    descriptor: ObjectDescriptor,
    body: Vec<u8>,
}

/// In-memory buckets. Listing order is insertion order.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, Vec<StoredObject>>>,
    uploads: Mutex<Vec<(String, String)>>,
    downloads: Mutex<Vec<(String, String)>>,
    failing_downloads: Mutex<HashSet<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    unlistable: Mutex<HashSet<String>>,
    pinned_stage_files: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, bucket: &str, key: &str, body: &[u8], last_modified: DateTime<Utc>) {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets.entry(bucket.to_string()).or_default();
        let stored = StoredObject {
            descriptor: ObjectDescriptor::new(key, last_modified, body.len() as u64),
            body: body.to_vec(),
        };
        match objects.iter_mut().find(|o| o.descriptor.key == key) {
            Some(existing) => *existing = stored,
            None => objects.push(stored),
        }
    }

    pub fn body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)?
            .iter()
            .find(|o| o.descriptor.key == key)
            .map(|o| o.body.clone())
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.iter().map(|o| o.descriptor.key.clone()).collect())
            .unwrap_or_default()
    }

    /// (bucket, key) of every upload, in call order.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    /// (bucket, key) of every download, in call order.
    pub fn downloads(&self) -> Vec<(String, String)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn fail_download(&self, key: &str) {
        self.failing_downloads.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_upload(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_downloads.lock().unwrap().clear();
        self.failing_uploads.lock().unwrap().clear();
    }

    pub fn fail_listing(&self, bucket: &str) {
        self.unlistable.lock().unwrap().insert(bucket.to_string());
    }

    /// After uploading `key`, swap its stage file for a non-empty directory
    /// so the caller's cleanup fails.
    pub fn pin_stage_file(&self, key: &str) {
        self.pinned_stage_files.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, bucket: &str) -> SyncResult<Vec<ObjectDescriptor>> {
        if self.unlistable.lock().unwrap().contains(bucket) {
            return Err(SyncError::storage("list", bucket, "", "access denied"));
        }
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.iter().map(|o| o.descriptor.clone()).collect())
            .unwrap_or_default())
    }

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> SyncResult<()> {
        self.downloads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        if self.failing_downloads.lock().unwrap().contains(key) {
            return Err(SyncError::storage("download", bucket, key, "connection reset"));
        }
        let body = self
            .body(bucket, key)
            .ok_or_else(|| SyncError::storage("download", bucket, key, "no such key"))?;
        tokio::fs::write(local_path, body).await?;
        Ok(())
    }

    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> SyncResult<()> {
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(SyncError::storage("upload", bucket, key, "slow down"));
        }
        let body = tokio::fs::read(local_path).await?;
        self.put(bucket, key, &body, Utc::now());
        if self.pinned_stage_files.lock().unwrap().contains(key) {
            tokio::fs::remove_file(local_path).await?;
            tokio::fs::create_dir(local_path).await?;
            tokio::fs::write(local_path.join("keep"), b"x").await?;
        }
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Hands out the same store for every profile.
pub struct MemoryFactory {
    pub store: Arc<MemoryStore>,
    pub opened: Mutex<Vec<String>>,
}

impl MemoryFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            opened: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StoreFactory for MemoryFactory {
    async fn open(&self, profile: &str) -> SyncResult<Arc<dyn ObjectStore>> {
        self.opened.lock().unwrap().push(profile.to_string());
        let store: Arc<dyn ObjectStore> = self.store.clone();
        Ok(store)
    }
}

/// Config rooted in a fresh temp dir. Keep the `TempDir` alive for the test.
pub fn config(mode: CheckMode) -> (TempDir, AppConfig) {
    let dir = TempDir::new().unwrap();
    let cfg = AppConfig::new(dir.path(), mode);
    (dir, cfg)
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}
