//! S3 implementation of [`ObjectStore`] on top of `aws-sdk-s3`.

use crate::errors::{SyncError, SyncResult};
use crate::models::ObjectDescriptor;
use crate::services::object_store::{ObjectStore, StoreFactory};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client as S3Client, error::DisplayErrorContext, primitives::ByteStream};
use chrono::{DateTime, Utc};
use std::{path::Path, sync::Arc};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;

pub struct S3ObjectStore {
    client: S3Client,
    profile: String,
}

impl S3ObjectStore {
    /// Build a client from the shared AWS config for `profile`.
    ///
    /// Region and credentials resolve through the SDK's own provider chain.
    pub async fn from_profile(profile: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .load()
            .await;
        Self {
            client: S3Client::new(&config),
            profile: profile.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self, bucket: &str) -> SyncResult<Vec<ObjectDescriptor>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| SyncError::storage("list", bucket, "", DisplayErrorContext(err)))?;

        let objects: Vec<ObjectDescriptor> = response
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?;
                let last_modified = obj
                    .last_modified()
                    .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                let size = obj.size().unwrap_or(0).max(0) as u64;
                Some(ObjectDescriptor::new(key, last_modified, size))
            })
            .collect();

        debug!(
            "[{}] listed {} objects in s3://{}",
            self.profile,
            objects.len(),
            bucket
        );
        Ok(objects)
    }

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> SyncResult<()> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| SyncError::storage("download", bucket, key, DisplayErrorContext(err)))?;

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Stream to disk; staged objects can be larger than memory.
        let mut body = output.body.into_async_read();
        let mut file = File::create(local_path).await?;
        let written = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        debug!(
            "[{}] downloaded {} bytes from s3://{}/{} to {}",
            self.profile,
            written,
            bucket,
            key,
            local_path.display()
        );
        Ok(())
    }

    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> SyncResult<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|err| SyncError::storage("upload", bucket, key, err))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|err| SyncError::storage("upload", bucket, key, DisplayErrorContext(err)))?;

        debug!(
            "[{}] uploaded {} to s3://{}/{}",
            self.profile,
            local_path.display(),
            bucket,
            key
        );
        Ok(())
    }
}

/// Opens one [`S3ObjectStore`] per profile name.
#[derive(Debug, Default, Clone, Copy)]
pub struct S3StoreFactory;

#[async_trait]
impl StoreFactory for S3StoreFactory {
    async fn open(&self, profile: &str) -> SyncResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(S3ObjectStore::from_profile(profile).await))
    }
}
