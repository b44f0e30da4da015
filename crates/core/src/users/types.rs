use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored account.
///
/// Password and token hashes are never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request to create a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
}
