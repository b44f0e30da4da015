use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Credential carried by the request, from `Authorization: Token <x>`,
    /// `Authorization: Bearer <x>` or `X-API-Key: <x>`.
    pub fn credential(&self) -> Option<&str> {
        let authorization = self.headers.get("authorization");
        if let Some((scheme, value)) = authorization.and_then(|h| h.split_once(' ')) {
            if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }

        self.headers.get("x-api-key").map(String::as_str)
    }
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Username owning the watch records this caller creates.
    pub user_id: String,
    pub method: String,
    /// Staff may change settings and mutate any watch record.
    pub is_staff: bool,
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    /// Identity used when authentication is disabled. Every caller is trusted.
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            is_staff: true,
            claims: HashMap::new(),
        }
    }

    /// True when this identity may modify a record owned by `owner`.
    pub fn can_modify(&self, owner: &str) -> bool {
        self.is_staff || self.user_id == owner
    }
}
