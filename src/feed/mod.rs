pub mod time;

use crate::auth::SessionManager;
use crate::db::models::{Comment, MediaKind, Post};
use crate::error::AppResult;
use crate::posts::PostStore;
use crate::storage::{HandleRegistry, MediaHandle, MediaStore};

pub use self::time::format_timestamp;

pub const DEFAULT_COMMENT_DISPLAY_LIMIT: usize = 12;

// --- View models ---

#[derive(Debug, Clone, PartialEq)]
pub enum MediaView {
    Available(MediaHandle),
    /// The blob store no longer has this post's media.
    Unavailable,
}

impl MediaView {
    pub fn is_available(&self) -> bool {
        matches!(self, MediaView::Available(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub id: String,
    pub user: String,
    pub text: String,
    pub created_at: i64,
    pub created_label: String,
}

impl From<&Comment> for CommentView {
    fn from(c: &Comment) -> Self {
        Self {
            id: c.id.clone(),
            user: c.user.clone(),
            text: c.text.clone(),
            created_at: c.created_at,
            created_label: format_timestamp(c.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostView {
    pub id: String,
    pub author: String,
    pub description: String,
    pub created_at: i64,
    pub created_label: String,
    pub media_kind: MediaKind,
    pub media: MediaView,
    pub liked: bool,
    pub like_count: usize,
    /// Newest first, capped at the display limit.
    pub comments: Vec<CommentView>,
    pub comment_count: usize,
    pub more_comments: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub posts: Vec<PostView>,
}

impl Feed {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }
}

// --- Assembler ---

/// Builds render-ready feeds and owns the media handles they reference.
pub struct FeedAssembler {
    handles: HandleRegistry,
    comment_limit: usize,
}

impl FeedAssembler {
    pub fn new(comment_limit: usize) -> Self {
        Self {
            handles: HandleRegistry::new(),
            comment_limit,
        }
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Drop every handle issued by previous builds.
    pub fn release(&mut self) -> usize {
        self.handles.release_all()
    }

    /// Newest-first feed, optionally narrowed to posts whose description or
    /// author contains `query` (case-insensitive). Handles from the previous
    /// build are revoked before any new ones are issued.
    pub async fn build_feed(
        &mut self,
        query: &str,
        session: &SessionManager,
        posts: &PostStore,
        media: &dyn MediaStore,
    ) -> AppResult<Feed> {
        self.release();

        let mut all = posts.list()?;
        // Stable: equal timestamps keep stored order.
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let needle = query.trim().to_lowercase();
        if !needle.is_empty() {
            all.retain(|p| p.matches_query(&needle));
        }

        let viewer = session.current();
        let mut views = Vec::with_capacity(all.len());
        for post in &all {
            let media_view = match media.get(&post.media_id).await? {
                Some(blob) => MediaView::Available(self.handles.create(&blob)),
                None => {
                    tracing::debug!("Media {} for {} is unavailable", post.media_id, post.id);
                    MediaView::Unavailable
                }
            };
            views.push(self.view(post, viewer, media_view));
        }

        tracing::debug!(
            "Built feed with {} posts ({} media handles)",
            views.len(),
            self.handles.len()
        );
        Ok(Feed { posts: views })
    }

    fn view(&self, post: &Post, viewer: Option<&str>, media: MediaView) -> PostView {
        let comments = post
            .comments
            .iter()
            .take(self.comment_limit)
            .map(CommentView::from)
            .collect();

        PostView {
            id: post.id.clone(),
            author: post.author.clone(),
            description: post.description.clone(),
            created_at: post.created_at,
            created_label: format_timestamp(post.created_at),
            media_kind: post.media_kind,
            media,
            liked: viewer.is_some_and(|name| post.is_liked_by(name)),
            like_count: post.likes.len(),
            comments,
            comment_count: post.comments.len(),
            more_comments: post.comments.len() > self.comment_limit,
        }
    }
}

impl Default for FeedAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_COMMENT_DISPLAY_LIMIT)
    }
}
