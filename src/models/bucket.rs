//! Represents one source → destination replication pair.

use crate::errors::{SyncError, SyncResult};
use std::{fmt, str::FromStr};

/// A (source profile, source bucket, destination profile, destination bucket)
/// tuple. Profiles name the credential set each side is opened with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketPair {
    pub source_profile: String,
    pub source_bucket: String,
    pub destination_profile: String,
    pub destination_bucket: String,
}

impl BucketPair {
    pub fn new(
        source_profile: impl Into<String>,
        source_bucket: impl Into<String>,
        destination_profile: impl Into<String>,
        destination_bucket: impl Into<String>,
    ) -> Self {
        Self {
            source_profile: source_profile.into(),
            source_bucket: source_bucket.into(),
            destination_profile: destination_profile.into(),
            destination_bucket: destination_bucket.into(),
        }
    }

    /// Destination objects are nested under the source bucket's name.
    pub fn destination_prefix(&self) -> String {
        format!("{}/", self.source_bucket)
    }
}

/// Parses `src_profile:src_bucket:dst_profile:dst_bucket`.
impl FromStr for BucketPair {
    type Err = SyncError;

    fn from_str(s: &str) -> SyncResult<Self> {
        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        match parts.as_slice() {
            [sp, sb, dp, db] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Self::new(*sp, *sb, *dp, *db))
            }
            _ => Err(SyncError::config(format!(
                "bucket pair `{}` must look like src_profile:src_bucket:dst_profile:dst_bucket",
                s
            ))),
        }
    }
}

impl fmt::Display for BucketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source_profile, self.source_bucket, self.destination_profile, self.destination_bucket
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_part_pair() {
        let pair: BucketPair = "boto-source:ray-src:boto-dest:ray-dst".parse().unwrap();
        assert_eq!(pair, BucketPair::new("boto-source", "ray-src", "boto-dest", "ray-dst"));
        assert_eq!(pair.destination_prefix(), "ray-src/");
    }

    #[test]
    fn rejects_short_or_empty_parts() {
        assert!("a:b:c".parse::<BucketPair>().is_err());
        assert!("a::c:d".parse::<BucketPair>().is_err());
        assert!("a:b:c:d:e".parse::<BucketPair>().is_err());
    }
}
