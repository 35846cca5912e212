use crate::models::BucketPair;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

pub const MB: usize = 1024 * 1024;
pub const DEFAULT_HASH_BLOCK_SIZE: usize = 100 * MB;
pub const DEFAULT_MAX_TIMESTAMP_DELTA: i64 = 60;
pub const DEFAULT_MAX_OBJECT_COUNT: usize = 1000;
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Pairs replicated when neither `--pair` nor `BUCKET_SYNC_PAIRS` is given.
pub const DEFAULT_BUCKET_PAIRS: [(&str, &str, &str, &str); 1] =
    [("boto-source", "ray-boto-source", "boto-dest", "ray-boto-dest")];

/// Change-detection strategy, selected once at startup.
///
/// Each variant carries only the parameters its rule needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Sync objects modified after the previous completed run.
    LastRunTimestamp,
    /// Sync objects missing from the destination.
    Existence,
    /// Sync objects at least `max_delta_seconds` newer than their destination copy.
    TimestampDelta { max_delta_seconds: i64 },
    /// Stage every object and compare its digest with the hash store.
    ContentHash {
        block_size: usize,
        on_mismatch: HashMismatchPolicy,
        record_at: HashRecordTiming,
    },
}

/// What the content-hash strategy does when a stored digest differs from
/// the freshly computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum HashMismatchPolicy {
    /// Record the new digest and transfer the object.
    #[default]
    Refresh,
    /// Keep the first recorded digest forever and skip the transfer.
    Pinned,
}

/// When the content-hash strategy writes the digest it owes the hash store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum HashRecordTiming {
    /// Right after the comparison, before any upload. Dry runs and failed
    /// uploads still leave the record behind.
    #[default]
    BeforeTransfer,
    /// Only once the upload succeeded; dry runs never touch the store.
    AfterUpload,
}

/// Strategy names accepted on the command line and in the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckModeKind {
    LastRunTimestamp,
    Existence,
    TimestampDelta,
    ContentHash,
}

/// Centralized application configuration.
/// Combines compiled-in defaults, environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub check_mode: CheckMode,
    pub max_object_count: usize,
    pub dry_run: bool,
    pub data_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub database_url: String,
    pub marker_path: PathBuf,
    pub bucket_pairs: Vec<BucketPair>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Replicate changed objects between buckets")]
pub struct Args {
    /// Change-detection strategy (overrides BUCKET_SYNC_CHECK_MODE)
    #[arg(long, value_enum)]
    pub check_mode: Option<CheckModeKind>,

    /// Minimum age difference in seconds for timestamp-delta (overrides BUCKET_SYNC_MAX_TIMESTAMP_DELTA)
    #[arg(long)]
    pub max_timestamp_delta: Option<i64>,

    /// Read block size in bytes for content hashing (overrides BUCKET_SYNC_HASH_BLOCK_SIZE)
    #[arg(long)]
    pub hash_block_size: Option<usize>,

    /// Behavior when a stored digest differs (overrides BUCKET_SYNC_ON_HASH_MISMATCH)
    #[arg(long, value_enum)]
    pub on_hash_mismatch: Option<HashMismatchPolicy>,

    /// When a content-hash digest is recorded (overrides BUCKET_SYNC_RECORD_HASH)
    #[arg(long, value_enum)]
    pub record_hash: Option<HashRecordTiming>,

    /// Objects evaluated per bucket pass (overrides BUCKET_SYNC_MAX_OBJECT_COUNT)
    #[arg(long)]
    pub max_object_count: Option<usize>,

    /// Stage objects but skip uploads and marker updates (overrides BUCKET_SYNC_DRY_RUN)
    #[arg(long)]
    pub dry_run: bool,

    /// Directory holding the hash database and marker (overrides BUCKET_SYNC_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Staging directory (overrides BUCKET_SYNC_TMP_DIR)
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,

    /// Hash database URL (overrides BUCKET_SYNC_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Last-run marker file (overrides BUCKET_SYNC_MARKER_PATH)
    #[arg(long)]
    pub marker_path: Option<PathBuf>,

    /// Bucket pair `src_profile:src_bucket:dst_profile:dst_bucket`, repeatable (overrides BUCKET_SYNC_PAIRS)
    #[arg(long = "pair")]
    pub pairs: Vec<String>,
}

impl AppConfig {
    /// Configuration rooted at `data_dir` with every other option at its default.
    pub fn new(data_dir: impl Into<PathBuf>, check_mode: CheckMode) -> Self {
        let data_dir = data_dir.into();
        Self {
            check_mode,
            max_object_count: DEFAULT_MAX_OBJECT_COUNT,
            dry_run: false,
            tmp_dir: data_dir.join("tmp"),
            database_url: format!("sqlite://{}", data_dir.join("hashes.db").display()),
            marker_path: data_dir.join("last_run.txt"),
            bucket_pairs: default_bucket_pairs(),
            data_dir,
        }
    }

    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_sources(args, |name| env::var(name).ok())
    }

    /// Merge CLI args over environment values over compiled-in defaults.
    pub fn from_sources(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = match args.check_mode {
            Some(kind) => kind,
            None => match env("BUCKET_SYNC_CHECK_MODE") {
                Some(value) => CheckModeKind::from_str(&value, true).map_err(|err| {
                    anyhow::anyhow!("parsing BUCKET_SYNC_CHECK_MODE value `{}`: {}", value, err)
                })?,
                None => CheckModeKind::LastRunTimestamp,
            },
        };

        let check_mode = match kind {
            CheckModeKind::LastRunTimestamp => CheckMode::LastRunTimestamp,
            CheckModeKind::Existence => CheckMode::Existence,
            CheckModeKind::TimestampDelta => {
                let max_delta_seconds = match args.max_timestamp_delta {
                    Some(value) => value,
                    None => parse_env(&env, "BUCKET_SYNC_MAX_TIMESTAMP_DELTA")?
                        .unwrap_or(DEFAULT_MAX_TIMESTAMP_DELTA),
                };
                if max_delta_seconds < 0 {
                    anyhow::bail!(
                        "max timestamp delta must not be negative, got {}",
                        max_delta_seconds
                    );
                }
                CheckMode::TimestampDelta { max_delta_seconds }
            }
            CheckModeKind::ContentHash => {
                let block_size = match args.hash_block_size {
                    Some(value) => value,
                    None => parse_env(&env, "BUCKET_SYNC_HASH_BLOCK_SIZE")?
                        .unwrap_or(DEFAULT_HASH_BLOCK_SIZE),
                };
                if block_size == 0 {
                    anyhow::bail!("hash block size must be greater than zero");
                }
                let on_mismatch = match args.on_hash_mismatch {
                    Some(policy) => policy,
                    None => match env("BUCKET_SYNC_ON_HASH_MISMATCH") {
                        Some(value) => HashMismatchPolicy::from_str(&value, true).map_err(|err| {
                            anyhow::anyhow!(
                                "parsing BUCKET_SYNC_ON_HASH_MISMATCH value `{}`: {}",
                                value,
                                err
                            )
                        })?,
                        None => HashMismatchPolicy::default(),
                    },
                };
                let record_at = match args.record_hash {
                    Some(timing) => timing,
                    None => match env("BUCKET_SYNC_RECORD_HASH") {
                        Some(value) => HashRecordTiming::from_str(&value, true).map_err(|err| {
                            anyhow::anyhow!(
                                "parsing BUCKET_SYNC_RECORD_HASH value `{}`: {}",
                                value,
                                err
                            )
                        })?,
                        None => HashRecordTiming::default(),
                    },
                };
                CheckMode::ContentHash {
                    block_size,
                    on_mismatch,
                    record_at,
                }
            }
        };

        let data_dir = args
            .data_dir
            .or_else(|| env("BUCKET_SYNC_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let mut cfg = Self::new(data_dir, check_mode);

        if let Some(count) = args.max_object_count {
            cfg.max_object_count = count;
        } else if let Some(count) = parse_env(&env, "BUCKET_SYNC_MAX_OBJECT_COUNT")? {
            cfg.max_object_count = count;
        }

        cfg.dry_run = args.dry_run || parse_env::<bool>(&env, "BUCKET_SYNC_DRY_RUN")?.unwrap_or(false);

        if let Some(tmp) = args.tmp_dir.or_else(|| env("BUCKET_SYNC_TMP_DIR").map(PathBuf::from)) {
            cfg.tmp_dir = tmp;
        }
        if let Some(url) = args.database_url.or_else(|| env("BUCKET_SYNC_DATABASE_URL")) {
            cfg.database_url = url;
        }
        if let Some(marker) = args
            .marker_path
            .or_else(|| env("BUCKET_SYNC_MARKER_PATH").map(PathBuf::from))
        {
            cfg.marker_path = marker;
        }

        let raw_pairs = if !args.pairs.is_empty() {
            args.pairs
        } else if let Some(value) = env("BUCKET_SYNC_PAIRS") {
            value
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        if !raw_pairs.is_empty() {
            cfg.bucket_pairs = raw_pairs
                .iter()
                .map(|raw| raw.parse::<BucketPair>())
                .collect::<Result<_, _>>()
                .context("parsing bucket pairs")?;
        }

        Ok(cfg)
    }
}

pub fn default_bucket_pairs() -> Vec<BucketPair> {
    DEFAULT_BUCKET_PAIRS
        .iter()
        .map(|(sp, sb, dp, db)| BucketPair::new(*sp, *sb, *dp, *db))
        .collect()
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("parsing {} value `{}`: {}", name, value, err)),
        None => Ok(None),
    }
}
