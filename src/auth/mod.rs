pub mod identity;
pub mod password;
pub mod session;

pub use identity::IdentityStore;
pub use password::PasswordScheme;
pub use session::SessionManager;
