use anyhow::Result;
use bucket_sync::{AppConfig, HashStore, RunDriver, S3StoreFactory};
use std::{fs, sync::Arc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting bucket-sync with config: {:?}", cfg);

    // --- Ensure data + staging directories exist ---
    for dir in [&cfg.data_dir, &cfg.tmp_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            tracing::info!("Created directory {}", dir.display());
        }
    }

    // --- Touch the hash store so schema problems surface before any transfer ---
    if let Err(err) = HashStore::new(cfg.database_url.clone()).init().await {
        tracing::warn!("Hash store {} not ready: {}", cfg.database_url, err);
    }

    let pairs = cfg.bucket_pairs.clone();
    let driver = RunDriver::new(Arc::new(cfg), S3StoreFactory);
    let summary = driver.run(&pairs).await;

    tracing::info!(
        "Done: {} passes, {} failed pairs, {} objects transferred, {} object failures",
        summary.passes.len(),
        summary.failed_pairs.len(),
        summary.transferred(),
        summary.failed_objects()
    );

    Ok(())
}
