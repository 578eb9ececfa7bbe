mod handles;
mod media;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::db::models::MediaBlob;
use crate::error::AppResult;

pub use self::handles::{HandleRegistry, MediaHandle};
pub use self::media::SqliteMediaStore;

/// Binary media keyed by id, kept apart from the record store.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store a blob, silently replacing any blob with the same id.
    async fn put(&self, id: &str, mime: &str, bytes: Bytes) -> AppResult<()>;

    /// Fetch a blob. `None` is a normal outcome: the blob store can be
    /// cleared independently of the records that point into it.
    async fn get(&self, id: &str) -> AppResult<Option<MediaBlob>>;

    /// Remove a blob, returning whether one existed.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

pub type DynMediaStore = Arc<dyn MediaStore>;
