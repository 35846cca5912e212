//! src/services/sync_service.rs
//!
//! SyncService: one synchronization pass for a (source bucket, destination
//! bucket, destination prefix) triple. Objects are handled one at a time:
//! decide, stage to local disk, optionally compare digests, upload, clean up.
//! A failure on one object is logged and the pass moves on.

use crate::config::{AppConfig, CheckMode, HashMismatchPolicy, HashRecordTiming};
use crate::errors::{SyncError, SyncResult};
use crate::models::ObjectDescriptor;
use crate::services::{
    detector::{ChangeDetector, DestinationIndex},
    hash_store::HashStore,
    hasher::hash_file,
    object_store::ObjectStore,
};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Counters for one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Objects considered after the max-object-count cut.
    pub evaluated: usize,
    /// Objects beyond the max-object-count cut, left for a later pass.
    pub truncated: usize,
    /// Objects the change detector ruled out.
    pub skipped: usize,
    /// Objects uploaded to the destination.
    pub transferred: usize,
    /// Objects staged but not uploaded because of dry-run mode.
    pub staged: usize,
    /// Objects whose digest matched the hash store (or was pinned).
    pub unchanged: usize,
    /// Objects whose download, hashing, store access or upload failed.
    pub failed: usize,
}

/// Hash store write owed for a staged object.
enum PendingHash {
    Insert(String),
    Update(String),
}

/// What happened to one object that the detector selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOutcome {
    Transferred,
    Staged,
    Unchanged,
}

#[derive(Clone)]
pub struct SyncService {
    config: Arc<AppConfig>,
    detector: ChangeDetector,
    hash_store: HashStore,
    source: Arc<dyn ObjectStore>,
    destination: Arc<dyn ObjectStore>,
}

impl SyncService {
    pub fn new(
        config: Arc<AppConfig>,
        detector: ChangeDetector,
        hash_store: HashStore,
        source: Arc<dyn ObjectStore>,
        destination: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            detector,
            hash_store,
            source,
            destination,
        }
    }

    /// Run one pass. Listing failures end the pass with an error; per-object
    /// failures are counted in the summary.
    pub async fn sync(
        &self,
        source_bucket: &str,
        destination_bucket: &str,
        destination_prefix: &str,
    ) -> SyncResult<PassSummary> {
        let listing = self.destination.list(destination_bucket).await?;
        let index = DestinationIndex::build(listing, destination_prefix);
        debug!(
            "{} destination objects under s3://{}/{}",
            index.len(),
            destination_bucket,
            destination_prefix
        );

        let mut objects = self.source.list(source_bucket).await?;
        let mut summary = PassSummary::default();
        if objects.len() > self.config.max_object_count {
            summary.truncated = objects.len() - self.config.max_object_count;
            debug!(
                "evaluating the first {} of {} objects in s3://{}",
                self.config.max_object_count,
                objects.len(),
                source_bucket
            );
            objects.truncate(self.config.max_object_count);
        }

        fs::create_dir_all(&self.config.tmp_dir).await?;

        for object in &objects {
            summary.evaluated += 1;
            let destination_key = format!("{}{}", destination_prefix, object.key);
            let needs_sync = self.detector.needs_sync(object, destination_prefix, &index);
            info!(
                key = %object.key,
                destination_key = %destination_key,
                needs_sync,
                "sync decision"
            );
            if !needs_sync {
                summary.skipped += 1;
                continue;
            }

            match self
                .sync_object(source_bucket, destination_bucket, object, &destination_key)
                .await
            {
                Ok(ObjectOutcome::Transferred) => summary.transferred += 1,
                Ok(ObjectOutcome::Staged) => summary.staged += 1,
                Ok(ObjectOutcome::Unchanged) => summary.unchanged += 1,
                Err(err) => {
                    error!(
                        key = %object.key,
                        destination_key = %destination_key,
                        "sync failed: {}",
                        err
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            source_bucket,
            destination_bucket,
            evaluated = summary.evaluated,
            transferred = summary.transferred,
            staged = summary.staged,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            truncated = summary.truncated,
            "pass complete"
        );
        Ok(summary)
    }

    /// Stage, decide by digest when hashing, upload, then remove the stage file.
    ///
    /// In dry-run mode the stage file is left behind and the destination is
    /// not written. Whether the hash store is written depends on
    /// [`HashRecordTiming`].
    pub async fn sync_object(
        &self,
        source_bucket: &str,
        destination_bucket: &str,
        object: &ObjectDescriptor,
        destination_key: &str,
    ) -> SyncResult<ObjectOutcome> {
        let local_path = self.stage_path(object)?;
        let result = self
            .stage_and_transfer(source_bucket, destination_bucket, object, destination_key, &local_path)
            .await;

        // Cleanup never changes the outcome; the object already landed or failed.
        let keep_stage_file = result.is_ok() && self.config.dry_run;
        if !keep_stage_file {
            if let Err(err) = remove_stage_file(&local_path).await {
                warn!(
                    key = %object.key,
                    path = %local_path.display(),
                    "could not remove stage file: {}",
                    err
                );
            }
        }
        result
    }

    async fn stage_and_transfer(
        &self,
        source_bucket: &str,
        destination_bucket: &str,
        object: &ObjectDescriptor,
        destination_key: &str,
        local_path: &Path,
    ) -> SyncResult<ObjectOutcome> {
        self.source
            .download(source_bucket, &object.key, local_path)
            .await?;

        let mut pending = None;
        let mut record_at = HashRecordTiming::default();
        if let CheckMode::ContentHash {
            block_size,
            on_mismatch,
            record_at: timing,
        } = self.config.check_mode
        {
            record_at = timing;
            let digest = hash_file(local_path, block_size).await?;
            match self.hash_store.get(destination_key).await? {
                None => {
                    info!(destination_key, digest = %digest, "no recorded hash, transferring");
                    pending = Some(PendingHash::Insert(digest));
                }
                Some(prior) if prior == digest => {
                    info!(destination_key, digest = %digest, "hash unchanged, skipping");
                    return Ok(ObjectOutcome::Unchanged);
                }
                Some(prior) => match on_mismatch {
                    HashMismatchPolicy::Pinned => {
                        warn!(
                            destination_key,
                            recorded = %prior,
                            digest = %digest,
                            "hash differs from pinned record, skipping"
                        );
                        return Ok(ObjectOutcome::Unchanged);
                    }
                    HashMismatchPolicy::Refresh => {
                        info!(
                            destination_key,
                            recorded = %prior,
                            digest = %digest,
                            "hash changed, transferring"
                        );
                        pending = Some(PendingHash::Update(digest));
                    }
                },
            }
        }

        if record_at == HashRecordTiming::BeforeTransfer {
            if let Some(hash) = pending.take() {
                self.record_hash(source_bucket, object, destination_key, hash)
                    .await?;
            }
        }

        if self.config.dry_run {
            info!(
                "dry run: staged {} at {}, not uploading to s3://{}/{}",
                object.key,
                local_path.display(),
                destination_bucket,
                destination_key
            );
            return Ok(ObjectOutcome::Staged);
        }

        info!(
            "uploading {} to s3://{}/{}",
            object.file_name(),
            destination_bucket,
            destination_key
        );
        self.destination
            .upload(local_path, destination_bucket, destination_key)
            .await?;

        if let Some(hash) = pending {
            self.record_hash(source_bucket, object, destination_key, hash)
                .await?;
        }
        Ok(ObjectOutcome::Transferred)
    }

    async fn record_hash(
        &self,
        source_bucket: &str,
        object: &ObjectDescriptor,
        destination_key: &str,
        hash: PendingHash,
    ) -> SyncResult<()> {
        match hash {
            PendingHash::Insert(digest) => {
                self.hash_store
                    .put(source_bucket, &object.key, &digest, destination_key)
                    .await
            }
            PendingHash::Update(digest) => {
                self.hash_store.update(destination_key, &digest).await?;
                Ok(())
            }
        }
    }

    /// Local stage file for `object`: `tmp_dir/<last key segment>`.
    fn stage_path(&self, object: &ObjectDescriptor) -> SyncResult<PathBuf> {
        let name = object.file_name();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.bytes().any(|b| b == b'\\' || b == b'\0' || b.is_ascii_control())
        {
            return Err(SyncError::InvalidObjectKey(object.key.clone()));
        }
        Ok(self.config.tmp_dir.join(name))
    }
}

async fn remove_stage_file(path: &Path) -> SyncResult<()> {
    match fs::remove_file(path).await {
        Ok(_) => {
            debug!("removed stage file {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(SyncError::Io(err)),
    }
}
