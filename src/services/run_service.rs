//! Run driver: one sync pass per configured bucket pair, then the marker.

use crate::config::{AppConfig, CheckMode};
use crate::errors::SyncResult;
use crate::models::BucketPair;
use crate::services::{
    detector::ChangeDetector,
    hash_store::HashStore,
    marker::LastRunMarker,
    object_store::StoreFactory,
    sync_service::{PassSummary, SyncService},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Completed passes, in configuration order.
    pub passes: Vec<(BucketPair, PassSummary)>,
    /// Pairs whose pass ended early (store setup or listing failure).
    pub failed_pairs: Vec<BucketPair>,
    /// New marker value, when this run advanced it.
    pub marker_advanced_to: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn transferred(&self) -> usize {
        self.passes.iter().map(|(_, pass)| pass.transferred).sum()
    }

    pub fn failed_objects(&self) -> usize {
        self.passes.iter().map(|(_, pass)| pass.failed).sum()
    }
}

pub struct RunDriver<F> {
    config: Arc<AppConfig>,
    factory: F,
    hash_store: HashStore,
    marker: LastRunMarker,
}

impl<F: StoreFactory> RunDriver<F> {
    pub fn new(config: Arc<AppConfig>, factory: F) -> Self {
        let hash_store = HashStore::new(config.database_url.clone());
        let marker = LastRunMarker::new(config.marker_path.clone());
        Self {
            config,
            factory,
            hash_store,
            marker,
        }
    }

    /// Sync every pair in order. Never fails: pair-level errors are logged
    /// and recorded in the summary.
    pub async fn run(&self, bucket_pairs: &[BucketPair]) -> RunSummary {
        let last_run = self.marker.load().await;
        let detector = ChangeDetector::new(self.config.check_mode, last_run);
        let mut summary = RunSummary::default();

        for pair in bucket_pairs {
            info!("syncing {}", pair);
            match self.sync_pair(pair, detector).await {
                Ok(pass) => summary.passes.push((pair.clone(), pass)),
                Err(err) => {
                    error!("pass {} aborted: {}", pair, err);
                    summary.failed_pairs.push(pair.clone());
                }
            }
        }

        // Advanced once per run, after every pair, never per pass.
        if matches!(self.config.check_mode, CheckMode::LastRunTimestamp) && !self.config.dry_run {
            match self.marker.store(Utc::now()).await {
                Ok(at) => summary.marker_advanced_to = Some(at),
                Err(err) => error!(
                    "could not write last run marker {}: {}",
                    self.marker.path().display(),
                    err
                ),
            }
        }

        info!(
            pairs = bucket_pairs.len(),
            failed_pairs = summary.failed_pairs.len(),
            transferred = summary.transferred(),
            failed_objects = summary.failed_objects(),
            "run complete"
        );
        summary
    }

    async fn sync_pair(&self, pair: &BucketPair, detector: ChangeDetector) -> SyncResult<PassSummary> {
        let source = self.factory.open(&pair.source_profile).await?;
        let destination = self.factory.open(&pair.destination_profile).await?;
        let service = SyncService::new(
            self.config.clone(),
            detector,
            self.hash_store.clone(),
            source,
            destination,
        );
        service
            .sync(
                &pair.source_bucket,
                &pair.destination_bucket,
                &pair.destination_prefix(),
            )
            .await
    }
}
