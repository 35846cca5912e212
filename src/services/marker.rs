//! Last-run marker: the instant the previous synchronization run completed.
//!
//! Stored as a single RFC 3339 line with a `+00:00` offset, second precision.

use crate::errors::{SyncError, SyncResult};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::{io::ErrorKind, path::PathBuf};
use tokio::fs;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct LastRunMarker {
    path: PathBuf,
}

impl LastRunMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the marker, falling back to the epoch when it is missing or corrupt.
    pub async fn load(&self) -> DateTime<Utc> {
        match self.read().await {
            Ok(Some(at)) => {
                info!("last run marker {} => {}", self.path.display(), at);
                at
            }
            Ok(None) => {
                info!(
                    "no last run marker at {}, treating every object as new",
                    self.path.display()
                );
                DateTime::<Utc>::UNIX_EPOCH
            }
            Err(err) => {
                warn!("ignoring last run marker: {}", err);
                DateTime::<Utc>::UNIX_EPOCH
            }
        }
    }

    /// Strict read: `Ok(None)` when the file does not exist.
    pub async fn read(&self) -> SyncResult<Option<DateTime<Utc>>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SyncError::Io(err)),
        };

        let line = raw.lines().next().unwrap_or("").trim();
        DateTime::parse_from_rfc3339(line)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|err| SyncError::Marker {
                path: self.path.clone(),
                reason: format!("`{}`: {}", line, err),
            })
    }

    /// Persist `at` truncated to whole seconds and return the stored value.
    pub async fn store(&self, at: DateTime<Utc>) -> SyncResult<DateTime<Utc>> {
        let at = at.trunc_subsecs(0);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let line = at.to_rfc3339_opts(SecondsFormat::Secs, false);
        fs::write(&self.path, format!("{}\n", line)).await?;
        info!("last run marker {} advanced to {}", self.path.display(), line);
        Ok(at)
    }
}
