use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_COMMENT_CHARS: usize = 500;

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a record id of the form `<prefix>_<millis>_<hex>`.
pub fn new_id(prefix: &str) -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!("{}_{}_{:x}", prefix, now_millis(), suffix)
}

/// Keep at most `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// A validated username: 3-20 characters of `[a-zA-Z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Trim and validate raw form input.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let name = raw.trim();
        let len = name.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
            return Err(AppError::validation(
                "username",
                format!(
                    "must be {}-{} characters",
                    USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
                ),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AppError::validation(
                "username",
                "only latin letters, digits and '_' are allowed",
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Case-insensitive username comparison.
pub fn same_user(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a mime type; only `image/*` and `video/*` are accepted.
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub text: String,
    pub created_at: i64,
}

impl Comment {
    /// Build a comment from raw input. Text is trimmed, must be non-empty and
    /// is cut to 500 characters.
    pub fn new(user: impl Into<String>, text: &str, created_at: i64) -> AppResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("comment", "cannot be empty"));
        }
        Ok(Self {
            id: new_id("c"),
            user: user.into(),
            text: truncate_chars(text, MAX_COMMENT_CHARS),
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub media_id: String,
    #[serde(rename = "mediaType")]
    pub media_kind: MediaKind,
    pub mime: String,
    pub created_at: i64,
    #[serde(default)]
    pub likes: BTreeSet<String>,
    /// Newest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn new(
        author: impl Into<String>,
        description: &str,
        media_id: impl Into<String>,
        media_kind: MediaKind,
        mime: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: new_id("post"),
            author: author.into(),
            description: truncate_chars(description, MAX_DESCRIPTION_CHARS),
            media_id: media_id.into(),
            media_kind,
            mime: mime.into(),
            created_at,
            likes: BTreeSet::new(),
            comments: Vec::new(),
        }
    }

    pub fn is_liked_by(&self, username: &str) -> bool {
        self.likes.contains(username)
    }

    /// Flip `username`'s membership in the like set. Returns whether the user
    /// likes the post afterwards.
    pub fn toggle_like(&mut self, username: &str) -> bool {
        if self.likes.remove(username) {
            false
        } else {
            self.likes.insert(username.to_string());
            true
        }
    }

    pub fn prepend_comment(&mut self, comment: Comment) {
        self.comments.insert(0, comment);
    }

    pub fn matches_query(&self, needle: &str) -> bool {
        self.description.to_lowercase().contains(needle)
            || self.author.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub id: String,
    pub mime: String,
    pub bytes: Bytes,
    pub saved_at: i64,
}
