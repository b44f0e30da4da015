//! Password hashing, API token issuing and login.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use super::{NewUser, User, UserStore};
use crate::db::StoreError;

/// A valid Argon2 hash that never verifies, so unknown usernames cost the
/// same as wrong passwords.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nYXR0YWNr$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generate a new opaque API token.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Digest under which a token is stored.
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Verify credentials and issue a fresh token, invalidating the previous one.
pub fn login(
    store: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<(User, String), CredentialError> {
    let user = store.get_by_username(username)?;

    let hash = user
        .as_ref()
        .map(|u| u.password_hash.as_str())
        .unwrap_or(DUMMY_HASH);
    let valid = verify_password(password, hash);

    let user = match user {
        Some(user) if valid => user,
        _ => return Err(CredentialError::InvalidCredentials),
    };

    let token = generate_token();
    store.set_token_hash(user.id, &token_digest(&token))?;
    Ok((user, token))
}

/// Create the user unless one with that name already exists.
pub fn ensure_user(
    store: &dyn UserStore,
    username: &str,
    password: &str,
    is_staff: bool,
) -> Result<User, CredentialError> {
    if let Some(existing) = store.get_by_username(username)? {
        return Ok(existing);
    }

    let user = store.create(NewUser {
        username: username.to_string(),
        password_hash: hash_password(password)?,
        is_staff,
    })?;
    info!(username = %user.username, is_staff, "Created user");
    Ok(user)
}
