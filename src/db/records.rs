// Key-value text store backing users, posts and the session.
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::DbPool;

pub const USERS_KEY: &str = "rb_users_v1";
pub const POSTS_KEY: &str = "rb_posts_v1";
pub const SESSION_KEY: &str = "rb_session_v1";

#[derive(Clone)]
pub struct RecordStore {
    pool: DbPool,
}

impl RecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value],
        )?;

        Ok(())
    }

    pub fn remove(&self, key: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Load the collection stored under `key`. A missing key or a value that
    /// does not deserialize both yield an empty collection.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Vec<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!("Discarding unreadable records under {}: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    pub fn save_json<T: Serialize>(&self, key: &str, items: &[T]) -> AppResult<()> {
        let raw = serde_json::to_string(items)?;
        self.set(key, &raw)
    }
}
