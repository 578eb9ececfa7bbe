use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::params;
use std::path::Path;

use super::MediaStore;
use crate::db::{self, models::now_millis, models::MediaBlob, MEDIA_MIGRATIONS};
use crate::error::AppResult;
use crate::state::DbPool;

/// SQLite implementation of the blob store.
pub struct SqliteMediaStore {
    pool: DbPool,
}

impl SqliteMediaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the blob store at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open(path, MEDIA_MIGRATIONS)?))
    }

    pub fn count(&self) -> AppResult<u64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl MediaStore for SqliteMediaStore {
    async fn put(&self, id: &str, mime: &str, bytes: Bytes) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO media (id, mime, bytes, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               mime = excluded.mime,
               bytes = excluded.bytes,
               saved_at = excluded.saved_at",
            params![id, mime, &bytes[..], now_millis()],
        )?;

        tracing::debug!("Stored media {} ({}, {} bytes)", id, mime, bytes.len());
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<MediaBlob>> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, mime, bytes, saved_at FROM media WHERE id = ?1",
            params![id],
            |row| {
                Ok(MediaBlob {
                    id: row.get(0)?,
                    mime: row.get(1)?,
                    bytes: Bytes::from(row.get::<_, Vec<u8>>(2)?),
                    saved_at: row.get(3)?,
                })
            },
        );

        match result {
            Ok(blob) => Ok(Some(blob)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tracing::debug!("Media {} not found", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
