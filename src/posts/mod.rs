use crate::auth::SessionManager;
use crate::db::models::{now_millis, Comment, MediaKind, Post};
use crate::db::records::{RecordStore, POSTS_KEY};
use crate::error::{AppError, AppResult};

/// Post records, stored newest first under [`POSTS_KEY`].
///
/// Every mutation loads the collection, applies the change in memory and
/// writes it back once, so a failed write leaves the stored posts as they were.
pub struct PostStore {
    records: RecordStore,
}

impl PostStore {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// All posts in stored order.
    pub fn list(&self) -> AppResult<Vec<Post>> {
        self.records.load_json(POSTS_KEY)
    }

    pub fn list_where<F>(&self, predicate: F) -> AppResult<Vec<Post>>
    where
        F: Fn(&Post) -> bool,
    {
        Ok(self.list()?.into_iter().filter(|p| predicate(p)).collect())
    }

    pub fn find(&self, id: &str) -> AppResult<Post> {
        self.list()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found(id))
    }

    /// Store a fully built post at the head of the collection.
    pub fn insert(&self, post: Post) -> AppResult<()> {
        let mut posts = self.list()?;
        posts.insert(0, post);
        self.records.save_json(POSTS_KEY, &posts)
    }

    pub fn create(
        &self,
        session: &SessionManager,
        author: &str,
        description: &str,
        media_id: &str,
        media_kind: MediaKind,
        mime: &str,
    ) -> AppResult<Post> {
        let author = session.authorize(author)?;

        let post = Post::new(author, description, media_id, media_kind, mime, now_millis());
        self.insert(post.clone())?;

        tracing::info!("{} published {} ({})", author, post.id, media_kind.as_str());
        Ok(post)
    }

    /// Like the post if `username` has not, un-like it otherwise.
    pub fn toggle_like(
        &self,
        session: &SessionManager,
        post_id: &str,
        username: &str,
    ) -> AppResult<Post> {
        let username = session.authorize(username)?;

        let mut posts = self.list()?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| AppError::not_found(post_id))?;

        let liked = post.toggle_like(username);
        let updated = post.clone();
        self.records.save_json(POSTS_KEY, &posts)?;

        tracing::debug!(
            "{} {} {}",
            username,
            if liked { "liked" } else { "unliked" },
            post_id
        );
        Ok(updated)
    }

    pub fn add_comment(
        &self,
        session: &SessionManager,
        post_id: &str,
        username: &str,
        text: &str,
    ) -> AppResult<Comment> {
        let username = session.authorize(username)?;
        let comment = Comment::new(username, text, now_millis())?;

        let mut posts = self.list()?;
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| AppError::not_found(post_id))?;

        post.prepend_comment(comment.clone());
        self.records.save_json(POSTS_KEY, &posts)?;

        tracing::debug!("{} commented on {}", username, post_id);
        Ok(comment)
    }
}
