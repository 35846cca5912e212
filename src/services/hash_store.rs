//! src/services/hash_store.rs
//!
//! HashStore: persistent mapping from destination object key to the last
//! digest recorded for it, backed by SQLite. The schema is created lazily on
//! every access, and each operation opens and closes its own connection so no
//! transaction spans a sync pass. Every value is bound, never formatted into SQL.

use crate::errors::SyncResult;
use crate::models::HashRecord;
use sqlx::{
    ConnectOptions, Connection, SqliteConnection,
    sqlite::SqliteConnectOptions,
};
use std::{path::Path, str::FromStr};
use tokio::fs;
use tracing::debug;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone, Debug)]
pub struct HashStore {
    database_url: String,
}

impl HashStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Open a connection, creating the database file, its parent directory,
    /// and the schema when they are missing.
    async fn connect(&self) -> SyncResult<SqliteConnection> {
        let db_path = self
            .database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:")
            .trim_start_matches("file:");
        if !db_path.starts_with(':') {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).await?;
                    debug!("created hash store directory {:?}", parent);
                }
            }
        }

        let mut conn = SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .connect()
            .await?;

        for stmt in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&mut conn).await?;
        }
        Ok(conn)
    }

    /// Create the schema without reading or writing any record.
    pub async fn init(&self) -> SyncResult<()> {
        self.connect().await?.close().await?;
        Ok(())
    }

    /// Digest currently recorded for `destination_key`, if any.
    ///
    /// Duplicate rows can exist; the most recently inserted one wins.
    pub async fn get(&self, destination_key: &str) -> SyncResult<Option<String>> {
        let mut conn = self.connect().await?;
        let digest = sqlx::query_scalar::<_, String>(
            "SELECT destination_hash FROM hashes
             WHERE destination_key = ?
             ORDER BY rowid DESC LIMIT 1",
        )
        .bind(destination_key)
        .fetch_optional(&mut conn)
        .await?;
        conn.close().await?;
        Ok(digest)
    }

    /// Insert a record. An existing record for the same key is left in place
    /// and a second row is added.
    pub async fn put(
        &self,
        source_bucket: &str,
        source_key: &str,
        digest: &str,
        destination_key: &str,
    ) -> SyncResult<()> {
        let mut conn = self.connect().await?;
        sqlx::query(
            "INSERT INTO hashes (
                source_bucket, source_key, source_hash, destination_key, destination_hash
             ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(source_bucket)
        .bind(source_key)
        .bind(digest)
        .bind(destination_key)
        .bind(digest)
        .execute(&mut conn)
        .await?;
        conn.close().await?;
        debug!("recorded hash {} for {}", digest, destination_key);
        Ok(())
    }

    /// Rewrite the digest of every row for `destination_key`.
    ///
    /// Returns the number of rows touched; zero means there was no record.
    pub async fn update(&self, destination_key: &str, digest: &str) -> SyncResult<u64> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(
            "UPDATE hashes SET source_hash = ?, destination_hash = ?
             WHERE destination_key = ?",
        )
        .bind(digest)
        .bind(digest)
        .bind(destination_key)
        .execute(&mut conn)
        .await?;
        conn.close().await?;
        debug!(
            "updated {} hash rows for {} to {}",
            result.rows_affected(),
            destination_key,
            digest
        );
        Ok(result.rows_affected())
    }

    /// Number of rows stored for `destination_key`.
    pub async fn count(&self, destination_key: &str) -> SyncResult<i64> {
        let mut conn = self.connect().await?;
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM hashes WHERE destination_key = ?")
                .bind(destination_key)
                .fetch_one(&mut conn)
                .await?;
        conn.close().await?;
        Ok(count)
    }

    /// All rows stored for `destination_key`, oldest first.
    pub async fn records(&self, destination_key: &str) -> SyncResult<Vec<HashRecord>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query_as::<_, HashRecord>(
            "SELECT source_bucket, source_key, source_hash, destination_key, destination_hash
             FROM hashes WHERE destination_key = ?
             ORDER BY rowid ASC",
        )
        .bind(destination_key)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> HashStore {
        HashStore::new(format!(
            "sqlite://{}",
            dir.path().join("meta/hashes.db").display()
        ))
    }

    #[tokio::test]
    async fn lazy_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.init().await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.get("any").await.unwrap(), None);
        assert!(dir.path().join("meta/hashes.db").exists());
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.put("src", "a.txt", "h1", "src/a.txt").await.unwrap();

        assert_eq!(store.get("src/a.txt").await.unwrap().as_deref(), Some("h1"));
        assert_eq!(store.get("src/b.txt").await.unwrap(), None);
        assert_eq!(
            store.records("src/a.txt").await.unwrap(),
            vec![HashRecord {
                source_bucket: "src".into(),
                source_key: "a.txt".into(),
                source_hash: "h1".into(),
                destination_key: "src/a.txt".into(),
                destination_hash: "h1".into(),
            }]
        );
    }

    #[tokio::test]
    async fn put_on_existing_key_inserts_a_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.put("src", "a.txt", "h1", "src/a.txt").await.unwrap();
        store.put("src", "a.txt", "h2", "src/a.txt").await.unwrap();

        assert_eq!(store.count("src/a.txt").await.unwrap(), 2);
        assert_eq!(store.get("src/a.txt").await.unwrap().as_deref(), Some("h2"));
    }

    #[tokio::test]
    async fn update_rewrites_existing_rows_only() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.update("src/a.txt", "h2").await.unwrap(), 0);
        assert_eq!(store.count("src/a.txt").await.unwrap(), 0);

        store.put("src", "a.txt", "h1", "src/a.txt").await.unwrap();
        assert_eq!(store.update("src/a.txt", "h2").await.unwrap(), 1);
        assert_eq!(store.get("src/a.txt").await.unwrap().as_deref(), Some("h2"));
        assert_eq!(store.count("src/a.txt").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn keys_are_bound_not_interpolated() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let nasty = "x'; DROP TABLE hashes; --";

        store.put("src", nasty, "h1", nasty).await.unwrap();
        store.put("src", "b.txt", "h2", "src/b.txt").await.unwrap();

        assert_eq!(store.get(nasty).await.unwrap().as_deref(), Some("h1"));
        assert_eq!(store.get("src/b.txt").await.unwrap().as_deref(), Some("h2"));
    }

    #[tokio::test]
    async fn records_survive_a_new_handle() {
        let dir = TempDir::new().unwrap();
        store_in(&dir)
            .put("src", "a.txt", "h1", "src/a.txt")
            .await
            .unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("src/a.txt").await.unwrap().as_deref(), Some("h1"));
    }
}
