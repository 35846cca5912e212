//! Error types shared by every sync component.

use std::{fmt, io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{op} failed for `{bucket}/{key}`: {message}")]
    Storage {
        op: &'static str,
        bucket: String,
        key: String,
        message: String,
    },
    #[error("object key `{0}` cannot be staged locally")]
    InvalidObjectKey(String),
    #[error("marker file `{}` is unreadable: {reason}", .path.display())]
    Marker { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Wrap a storage SDK failure with the operation and object it concerned.
    ///
    /// Bucket-level calls (listing) pass an empty key.
    pub fn storage(
        op: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        err: impl fmt::Display,
    ) -> Self {
        Self::Storage {
            op,
            bucket: bucket.into(),
            key: key.into(),
            message: err.to_string(),
        }
    }

    /// Shortcut for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
