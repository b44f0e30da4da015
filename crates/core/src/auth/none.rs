//! Open access for single-user installs on a trusted network.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Treats every caller as the anonymous staff user. Credentials sent anyway
/// are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_any_request_is_anonymous_staff() {
        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Token whatever".to_string());
        let request = AuthRequest {
            headers,
            source_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        };

        let identity = NoneAuthenticator.authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "anonymous");
        assert_eq!(identity.method, "none");
        assert!(identity.is_staff);
        assert!(identity.can_modify("alice"));
    }
}
