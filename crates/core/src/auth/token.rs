//! Per-user token authentication.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::users::{token_digest, UserStore};

/// Authenticator resolving `Authorization: Token <token>` to a stored user.
pub struct TokenAuthenticator {
    users: Arc<dyn UserStore>,
}

impl TokenAuthenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let token = request.credential().ok_or(AuthError::NotAuthenticated)?;

        let user = self
            .users
            .get_by_token_hash(&token_digest(token))
            .map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid token".to_string()))?;

        let mut claims = HashMap::new();
        claims.insert("user_pk".to_string(), serde_json::json!(user.id));

        Ok(Identity {
            user_id: user.username,
            method: "token".to_string(),
            is_staff: user.is_staff,
            claims,
        })
    }

    fn method_name(&self) -> &'static str {
        "token"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{ensure_user, login, SqliteUserStore};

    fn make_request(authorization: Option<&str>) -> AuthRequest {
        let mut headers = HashMap::new();
        if let Some(value) = authorization {
            headers.insert("authorization".to_string(), value.to_string());
        }
        AuthRequest {
            headers,
            source_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_valid_token_resolves_user() {
        let store = Arc::new(SqliteUserStore::in_memory().unwrap());
        let user = ensure_user(store.as_ref(), "alice", "pw", false).unwrap();
        let (_, token) = login(store.as_ref(), "alice", "pw").unwrap();

        let auth = TokenAuthenticator::new(store);
        let identity = auth
            .authenticate(&make_request(Some(&format!("Token {token}"))))
            .await
            .unwrap();

        assert_eq!(identity.user_id, "alice");
        assert_eq!(identity.method, "token");
        assert!(!identity.is_staff);
        assert_eq!(identity.claims["user_pk"], serde_json::json!(user.id));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let store = Arc::new(SqliteUserStore::in_memory().unwrap());
        let auth = TokenAuthenticator::new(store);

        let result = auth.authenticate(&make_request(Some("Token nope"))).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));

        let result = auth.authenticate(&make_request(None)).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }
}
