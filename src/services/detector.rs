//! Change detection: decides whether a listed source object needs a transfer.
//!
//! One decision point covers all four strategies. The content-hash strategy
//! always answers "yes" here; its real decision happens after staging, in the
//! sync service, against the hash store.

use crate::config::CheckMode;
use crate::models::ObjectDescriptor;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// Destination objects under the active prefix, keyed by full destination key.
///
/// Built from a fresh listing on every pass and never reused across runs.
#[derive(Debug, Default, Clone)]
pub struct DestinationIndex {
    entries: HashMap<String, ObjectDescriptor>,
}

impl DestinationIndex {
    /// Keep only the listed objects whose key starts with `prefix`.
    pub fn build(listing: impl IntoIterator<Item = ObjectDescriptor>, prefix: &str) -> Self {
        let entries = listing
            .into_iter()
            .filter(|obj| obj.key.starts_with(prefix))
            .map(|obj| (obj.key.clone(), obj))
            .collect();
        Self { entries }
    }

    pub fn contains(&self, destination_key: &str) -> bool {
        self.entries.contains_key(destination_key)
    }

    pub fn get(&self, destination_key: &str) -> Option<&ObjectDescriptor> {
        self.entries.get(destination_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    mode: CheckMode,
    last_run: DateTime<Utc>,
}

impl ChangeDetector {
    /// `last_run` is the marker loaded at startup; only the last-run strategy reads it.
    pub fn new(mode: CheckMode, last_run: DateTime<Utc>) -> Self {
        Self { mode, last_run }
    }

    pub fn needs_sync(
        &self,
        object: &ObjectDescriptor,
        destination_prefix: &str,
        index: &DestinationIndex,
    ) -> bool {
        let destination_key = format!("{}{}", destination_prefix, object.key);
        match self.mode {
            CheckMode::Existence => !index.contains(&destination_key),
            CheckMode::TimestampDelta { max_delta_seconds } => match index.get(&destination_key) {
                None => true,
                Some(existing) => {
                    // A source older than its copy never syncs, even by a fraction of a second.
                    let delta = object.last_modified - existing.last_modified;
                    delta >= TimeDelta::zero() && delta.num_seconds() >= max_delta_seconds
                }
            },
            CheckMode::LastRunTimestamp => object.last_modified > self.last_run,
            CheckMode::ContentHash { .. } => true,
        }
    }
}
