use std::fmt;

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Auth,
    Unauthenticated,
    NotFound,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Auth => "auth",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Username already taken: {username}")]
    Conflict { username: String },

    /// Shared by "no such user" and "wrong password".
    #[error("Invalid username or password")]
    Auth,

    #[error("Login required")]
    Unauthenticated,

    #[error("Post not found: {post_id}")]
    NotFound { post_id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(post_id: impl Into<String>) -> Self {
        AppError::NotFound {
            post_id: post_id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::Auth => ErrorKind::Auth,
            AppError::Unauthenticated => ErrorKind::Unauthenticated,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Database(_) | AppError::Pool(_) | AppError::Json(_) | AppError::Hash(_) => {
                ErrorKind::Storage
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
