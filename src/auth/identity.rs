use crate::auth::password::{self, PasswordScheme};
use crate::auth::session::SessionManager;
use crate::db::models::{now_millis, same_user, User, Username};
use crate::db::records::{RecordStore, USERS_KEY};
use crate::error::{AppError, AppResult};

/// Registered accounts, persisted as one JSON collection.
pub struct IdentityStore {
    records: RecordStore,
    scheme: PasswordScheme,
}

impl IdentityStore {
    pub fn new(records: RecordStore, scheme: PasswordScheme) -> Self {
        Self { records, scheme }
    }

    pub fn users(&self) -> AppResult<Vec<User>> {
        self.records.load_json(USERS_KEY)
    }

    pub fn find(&self, username: &str) -> AppResult<Option<User>> {
        let username = username.trim();
        Ok(self
            .users()?
            .into_iter()
            .find(|u| same_user(&u.username, username)))
    }

    /// Create an account and sign it in.
    pub fn register(
        &self,
        session: &mut SessionManager,
        username: &str,
        password: &str,
    ) -> AppResult<User> {
        let username = Username::parse(username)?;
        password::validate_password(password)?;

        let mut users = self.users()?;
        if users
            .iter()
            .any(|u| same_user(&u.username, username.as_str()))
        {
            return Err(AppError::Conflict {
                username: username.into_inner(),
            });
        }

        let user = User {
            username: username.into_inner(),
            password_hash: password::hash_password(self.scheme, password)?,
            created_at: now_millis(),
        };
        users.push(user.clone());

        // Sign in first; if the account cannot be saved, put the old session back
        let previous = session.current().map(str::to_string);
        session.set_current(Some(&user.username))?;
        if let Err(e) = self.records.save_json(USERS_KEY, &users) {
            if let Err(restore) = session.set_current(previous.as_deref()) {
                tracing::warn!("Failed to restore session after register: {}", restore);
                session.clear();
            }
            return Err(e);
        }

        tracing::info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Verify credentials and sign in as the stored (canonical-case) username.
    pub fn login(
        &self,
        session: &mut SessionManager,
        username: &str,
        password: &str,
    ) -> AppResult<User> {
        let user = self.find(username)?.ok_or(AppError::Auth)?;
        if !password::verify_password(password, &user.password_hash) {
            return Err(AppError::Auth);
        }

        session.set_current(Some(&user.username))?;
        tracing::info!("User {} logged in", user.username);
        Ok(user)
    }

    pub fn logout(&self, session: &mut SessionManager) {
        if let Some(name) = session.current() {
            tracing::info!("User {} logged out", name);
        }
        session.clear();
    }
}
