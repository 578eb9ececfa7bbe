use std::collections::HashMap;

use bytes::Bytes;

use crate::db::models::MediaBlob;

/// A revocable reference to media loaded for display. Only valid while the
/// issuing [`HandleRegistry`] still holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaHandle {
    pub url: String,
    pub mime: String,
    pub size: usize,
}

/// Live display handles. Every handle handed out must eventually be revoked,
/// either one at a time or all at once when a feed is rebuilt.
#[derive(Default)]
pub struct HandleRegistry {
    live: HashMap<String, Bytes>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a handle for a loaded blob.
    pub fn create(&mut self, blob: &MediaBlob) -> MediaHandle {
        let url = format!("blob:{}", uuid::Uuid::now_v7());
        self.live.insert(url.clone(), blob.bytes.clone());

        MediaHandle {
            url,
            mime: blob.mime.clone(),
            size: blob.bytes.len(),
        }
    }

    /// Bytes behind a live handle.
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.live.get(url).cloned()
    }

    pub fn revoke(&mut self, handle: &MediaHandle) -> bool {
        self.live.remove(&handle.url).is_some()
    }

    /// Revoke every live handle, returning how many were released.
    pub fn release_all(&mut self) -> usize {
        let released = self.live.len();
        self.live.clear();
        if released > 0 {
            tracing::debug!("Released {} media handles", released);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
