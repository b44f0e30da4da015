use super::{NewUser, User};
use crate::db::StoreError;

/// Persistence for user accounts.
pub trait UserStore: Send + Sync {
    /// Create a user. Fails with `Conflict` when the username is taken.
    fn create(&self, user: NewUser) -> Result<User, StoreError>;

    fn get(&self, id: i64) -> Result<Option<User>, StoreError>;

    fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Look up the owner of an API token by the token's SHA-256 digest.
    fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, StoreError>;

    /// Replace the user's token digest, invalidating any previous token.
    fn set_token_hash(&self, id: i64, token_hash: &str) -> Result<(), StoreError>;
}
