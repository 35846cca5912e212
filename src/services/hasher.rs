//! Content hashing for the content-hash strategy.
//!
//! Files are streamed through an incremental MD5 context one block at a time,
//! so staged objects larger than memory can be hashed. MD5 only has to detect
//! changes here, not resist adversarial collisions.

use crate::errors::{SyncError, SyncResult};
use md5::Context;
use std::path::Path;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::debug;

/// Hash the file at `path`, reading at most `block_size` bytes per read.
///
/// Returns the lowercase hex digest. An unreadable file is an error; there is
/// no placeholder digest.
pub async fn hash_file(path: &Path, block_size: usize) -> SyncResult<String> {
    if block_size == 0 {
        return Err(SyncError::config("hash block size must be greater than zero"));
    }

    let mut file = File::open(path).await?;
    let len = file.metadata().await?.len();
    // Small files do not need a full-size block buffer.
    let capacity = usize::try_from(len).map_or(block_size, |len| len.clamp(1, block_size));
    let mut buf = vec![0u8; capacity];

    let mut digest = Context::new();
    let mut blocks = 0usize;
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        digest.consume(&buf[..read]);
        blocks += 1;
    }

    let hex = format!("{:x}", digest.compute());
    debug!("hashed {} ({} bytes, {} reads) => {}", path.display(), len, blocks, hex);
    Ok(hex)
}
