//! Sync services: change detection, hashing, persistence, storage access,
//! and the pass/run orchestration built on top of them.

pub mod detector;
pub mod hash_store;
pub mod hasher;
pub mod marker;
pub mod object_store;
pub mod run_service;
pub mod s3_store;
pub mod sync_service;
