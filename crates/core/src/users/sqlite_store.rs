//! SQLite-backed user store.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{NewUser, User, UserStore};
use crate::db::{self, StoreError};

const USER_COLUMNS: &str = "id, username, is_staff, password_hash, token_hash, created_at";

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory user store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = db::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                is_staff INTEGER NOT NULL DEFAULT 0,
                password_hash TEXT NOT NULL,
                token_hash TEXT,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_token_hash ON users(token_hash);
            "#,
        )?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(5)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            is_staff: row.get(2)?,
            password_hash: row.get(3)?,
            token_hash: row.get(4)?,
            created_at: db::parse_timestamp(&created_at),
        })
    }

    fn query_one(&self, clause: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>, StoreError> {
        let conn = db::lock(&self.conn)?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let user = conn
            .query_row(&sql, [value], Self::row_to_user)
            .optional()?;
        Ok(user)
    }
}

impl UserStore for SqliteUserStore {
    fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let conn = db::lock(&self.conn)?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (username, is_staff, password_hash, created_at) VALUES (?, ?, ?, ?)",
            params![user.username, user.is_staff, user.password_hash, now.to_rfc3339()],
        )
        .map_err(|e| {
            if db::is_constraint_violation(&e) {
                StoreError::Conflict(format!("username '{}' is taken", user.username))
            } else {
                e.into()
            }
        })?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: user.username,
            is_staff: user.is_staff,
            password_hash: user.password_hash,
            token_hash: None,
            created_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.query_one("id = ?", &id)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.query_one("username = ?", &username)
    }

    fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, StoreError> {
        self.query_one("token_hash = ?", &token_hash)
    }

    fn set_token_hash(&self, id: i64, token_hash: &str) -> Result<(), StoreError> {
        let conn = db::lock(&self.conn)?;
        let updated = conn.execute(
            "UPDATE users SET token_hash = ? WHERE id = ?",
            params![token_hash, id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, is_staff: bool) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            is_staff,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = store.create(new_user("alice", true)).unwrap();

        let fetched = store.get(user.id).unwrap().unwrap();
        assert_eq!(fetched.username, "alice");
        assert!(fetched.is_staff);
        assert!(fetched.token_hash.is_none());

        let by_name = store.get_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(store.get_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let store = SqliteUserStore::in_memory().unwrap();
        store.create(new_user("alice", false)).unwrap();
        let err = store.create(new_user("alice", false)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_token_hash_replaces_previous() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = store.create(new_user("alice", false)).unwrap();

        store.set_token_hash(user.id, "first").unwrap();
        assert!(store.get_by_token_hash("first").unwrap().is_some());

        store.set_token_hash(user.id, "second").unwrap();
        assert!(store.get_by_token_hash("first").unwrap().is_none());
        assert_eq!(
            store.get_by_token_hash("second").unwrap().unwrap().id,
            user.id
        );
    }

    #[test]
    fn test_set_token_hash_unknown_user() {
        let store = SqliteUserStore::in_memory().unwrap();
        let err = store.set_token_hash(42, "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_serialization_omits_hashes() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = store.create(new_user("alice", false)).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("token_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
