//! User accounts and API tokens.

mod credentials;
mod sqlite_store;
mod store;
mod types;

pub use credentials::{
    ensure_user, generate_token, hash_password, login, token_digest, verify_password,
    CredentialError,
};
pub use sqlite_store::SqliteUserStore;
pub use store::UserStore;
pub use types::{NewUser, User};
