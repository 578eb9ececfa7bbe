use std::sync::Arc;

use bytes::Bytes;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::{IdentityStore, SessionManager};
use crate::config::Config;
use crate::db::models::{new_id, Comment, MediaBlob, MediaKind, Post, User};
use crate::db::records::RecordStore;
use crate::db::{self, RECORD_MIGRATIONS};
use crate::error::{AppError, AppResult};
use crate::feed::{Feed, FeedAssembler};
use crate::posts::PostStore;
use crate::storage::{DynMediaStore, HandleRegistry, SqliteMediaStore};

pub type DbPool = Pool<SqliteConnectionManager>;

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub mime: String,
    pub bytes: Bytes,
}

impl MediaUpload {
    pub fn new(mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }
}

/// Everything the presentation layer talks to: accounts, the session, posts,
/// media and feed assembly over one record store and one blob store.
pub struct AppState {
    pub config: Config,
    session: SessionManager,
    identities: IdentityStore,
    posts: PostStore,
    media: DynMediaStore,
    feed: FeedAssembler,
}

impl AppState {
    /// Open both stores named by `config` and restore the persisted session.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let records = RecordStore::new(db::open(config.records_path(), RECORD_MIGRATIONS)?);
        let media: DynMediaStore = Arc::new(SqliteMediaStore::open(config.media_path())?);
        Ok(Self::from_parts(records, media, config.clone())?)
    }

    pub fn from_parts(
        records: RecordStore,
        media: DynMediaStore,
        config: Config,
    ) -> AppResult<Self> {
        let session = SessionManager::restore(records.clone())?;
        Ok(Self {
            identities: IdentityStore::new(records.clone(), config.auth.password_scheme),
            posts: PostStore::new(records),
            feed: FeedAssembler::new(config.feed.comment_display_limit),
            session,
            media,
            config,
        })
    }

    // --- Accounts ---

    pub fn session(&self) -> Option<&str> {
        self.session.current()
    }

    pub fn register(&mut self, username: &str, password: &str) -> AppResult<User> {
        self.identities
            .register(&mut self.session, username, password)
    }

    pub fn login(&mut self, username: &str, password: &str) -> AppResult<User> {
        self.identities.login(&mut self.session, username, password)
    }

    pub fn logout(&mut self) {
        self.identities.logout(&mut self.session);
    }

    // --- Posts ---

    /// Store the media, then the post that points at it. If the post cannot
    /// be written the blob is removed again.
    pub async fn create_post(
        &self,
        upload: Option<MediaUpload>,
        description: &str,
    ) -> AppResult<Post> {
        let author = self.session.require()?.to_string();

        let upload = upload.ok_or_else(|| AppError::validation("media", "a file is required"))?;
        let kind = MediaKind::from_mime(&upload.mime).ok_or_else(|| {
            AppError::validation("media", "only image/* or video/* files are supported")
        })?;

        let media_id = new_id("media");
        self.media.put(&media_id, &upload.mime, upload.bytes).await?;

        match self
            .posts
            .create(&self.session, &author, description, &media_id, kind, &upload.mime)
        {
            Ok(post) => Ok(post),
            Err(e) => {
                match self.media.delete(&media_id).await {
                    Ok(_) => tracing::debug!("Rolled back media {}", media_id),
                    Err(del) => tracing::warn!("Orphaned media {}: {}", media_id, del),
                }
                Err(e)
            }
        }
    }

    pub fn find_post(&self, post_id: &str) -> AppResult<Post> {
        self.posts.find(post_id)
    }

    pub fn toggle_like(&self, post_id: &str) -> AppResult<Post> {
        let username = self.session.require()?;
        self.posts.toggle_like(&self.session, post_id, username)
    }

    pub fn add_comment(&self, post_id: &str, text: &str) -> AppResult<Comment> {
        let username = self.session.require()?;
        self.posts
            .add_comment(&self.session, post_id, username, text)
    }

    /// The blob behind a post, if the blob store still has it.
    pub async fn post_media(&self, post_id: &str) -> AppResult<Option<MediaBlob>> {
        let post = self.posts.find(post_id)?;
        self.media.get(&post.media_id).await
    }

    // --- Feed ---

    pub async fn build_feed(&mut self, query: &str) -> AppResult<Feed> {
        self.feed
            .build_feed(query, &self.session, &self.posts, self.media.as_ref())
            .await
    }

    pub fn media_handles(&self) -> &HandleRegistry {
        self.feed.handles()
    }

    /// Revoke all media handles held for the last feed.
    pub fn release_media(&mut self) -> usize {
        self.feed.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn open_state() -> (AppState, TempDir) {
        let temp = TempDir::new().unwrap();
        let config = Config::default().with_data_dir(temp.path());
        (AppState::open(&config).unwrap(), temp)
    }

    fn open_parts() -> (AppState, DbPool, Arc<SqliteMediaStore>, TempDir) {
        let temp = TempDir::new().unwrap();
        let pool = db::open(&temp.path().join("records.db"), RECORD_MIGRATIONS).unwrap();
        let media = Arc::new(SqliteMediaStore::open(&temp.path().join("media.db")).unwrap());
        let state = AppState::from_parts(
            RecordStore::new(pool.clone()),
            media.clone(),
            Config::default(),
        )
        .unwrap();
        (state, pool, media, temp)
    }

    fn png() -> Option<MediaUpload> {
        Some(MediaUpload::new("image/png", &b"\x89PNG"[..]))
    }

    #[tokio::test]
    async fn create_post_requires_session() {
        let (state, _temp) = open_state();
        let err = state.create_post(png(), "hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn create_post_requires_media_file() {
        let (mut state, _temp) = open_state();
        state.register("alice", "secret1").unwrap();

        let missing = state.create_post(None, "hi").await.unwrap_err();
        assert!(matches!(missing, AppError::Validation { field: "media", .. }));

        let pdf = Some(MediaUpload::new("application/pdf", &b"%PDF"[..]));
        let wrong_type = state.create_post(pdf, "hi").await.unwrap_err();
        assert!(matches!(wrong_type, AppError::Validation { field: "media", .. }));
    }

    #[tokio::test]
    async fn create_post_stores_media_and_record() {
        let (mut state, _temp) = open_state();
        state.register("alice", "secret1").unwrap();

        let post = state.create_post(png(), "my cat").await.unwrap();
        assert_eq!(post.author, "alice");
        assert_eq!(post.media_kind, MediaKind::Image);

        let blob = state.post_media(&post.id).await.unwrap().unwrap();
        assert_eq!(blob.id, post.media_id);
        assert_eq!(blob.mime, "image/png");
    }

    #[tokio::test]
    async fn create_post_removes_media_when_record_write_fails() {
        let (mut state, pool, media, _temp) = open_parts();
        state.register("alice", "secret1").unwrap();
        pool.get()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_posts BEFORE INSERT ON kv WHEN NEW.key = 'rb_posts_v1'
                 BEGIN SELECT RAISE(ABORT, 'write rejected'); END;",
            )
            .unwrap();

        let err = state.create_post(png(), "lost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(media.count().unwrap(), 0);
        assert!(state.posts.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let config = Config::default().with_data_dir(temp.path());

        let mut state = AppState::open(&config).unwrap();
        state.register("alice", "secret1").unwrap();
        drop(state);

        let mut state = AppState::open(&config).unwrap();
        assert_eq!(state.session(), Some("alice"));
        state.logout();
        drop(state);

        let state = AppState::open(&config).unwrap();
        assert_eq!(state.session(), None);
    }

    #[tokio::test]
    async fn release_media_clears_handles() {
        let (mut state, _temp) = open_state();
        state.register("alice", "secret1").unwrap();
        state.create_post(png(), "p").await.unwrap();

        state.build_feed("").await.unwrap();
        assert_eq!(state.media_handles().len(), 1);
        assert_eq!(state.release_media(), 1);
        assert!(state.media_handles().is_empty());
    }
}
