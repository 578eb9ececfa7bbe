use crate::db::models::same_user;
use crate::db::records::{RecordStore, SESSION_KEY};
use crate::error::{AppError, AppResult};

/// The single signed-in identity for this client, persisted under
/// [`SESSION_KEY`] so it survives restarts.
pub struct SessionManager {
    records: RecordStore,
    current: Option<String>,
}

impl SessionManager {
    /// Load whatever session was persisted by a previous run.
    pub fn restore(records: RecordStore) -> AppResult<Self> {
        let current = records.get(SESSION_KEY)?.filter(|name| !name.is_empty());
        if let Some(ref name) = current {
            tracing::debug!("Restored session for {}", name);
        }
        Ok(Self { records, current })
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Persist first, then update the in-memory copy, so a failed write
    /// leaves both unchanged.
    pub fn set_current(&mut self, username: Option<&str>) -> AppResult<()> {
        match username {
            Some(name) => self.records.set(SESSION_KEY, name)?,
            None => self.records.remove(SESSION_KEY)?,
        }
        self.current = username.map(str::to_string);
        Ok(())
    }

    /// Clear the session. Never fails; a persistence error is logged and the
    /// in-memory session is dropped regardless.
    pub fn clear(&mut self) {
        if let Err(e) = self.records.remove(SESSION_KEY) {
            tracing::warn!("Failed to clear persisted session: {}", e);
        }
        self.current = None;
    }

    /// The signed-in username, or `Unauthenticated`.
    pub fn require(&self) -> AppResult<&str> {
        self.current().ok_or(AppError::Unauthenticated)
    }

    /// Check that `username` is the signed-in user and return the session's
    /// own spelling of it, which is what gets recorded.
    pub fn authorize(&self, username: &str) -> AppResult<&str> {
        let current = self.require()?;
        if same_user(current, username) {
            Ok(current)
        } else {
            tracing::warn!("{} attempted to act as {}", current, username);
            Err(AppError::Unauthenticated)
        }
    }
}
