mod api_key;
mod none;
mod token;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use token::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::users::UserStore;

/// Factory function to create authenticator from config
pub fn create_authenticator(
    config: &AuthConfig,
    users: Arc<dyn UserStore>,
) -> Result<Arc<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Arc::new(NoneAuthenticator)),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "api_key must be set when using ApiKey auth method".to_string(),
                )
            })?;
            Ok(Arc::new(ApiKeyAuthenticator::new(api_key)))
        }
        AuthMethod::Token => Ok(Arc::new(TokenAuthenticator::new(users))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMethod;
    use crate::users::SqliteUserStore;

    fn users() -> Arc<dyn UserStore> {
        Arc::new(SqliteUserStore::in_memory().unwrap())
    }

    fn auth_config(method: AuthMethod, api_key: Option<&str>) -> AuthConfig {
        AuthConfig {
            method,
            api_key: api_key.map(str::to_string),
            bootstrap_admin: None,
        }
    }

    #[test]
    fn test_create_authenticator_none() {
        let auth = create_authenticator(&auth_config(AuthMethod::None, None), users()).unwrap();
        assert_eq!(auth.method_name(), "none");
    }

    #[test]
    fn test_create_authenticator_api_key() {
        let config = auth_config(AuthMethod::ApiKey, Some("secret-key"));
        let auth = create_authenticator(&config, users()).unwrap();
        assert_eq!(auth.method_name(), "api_key");
    }

    #[test]
    fn test_create_authenticator_api_key_missing_key() {
        let result = create_authenticator(&auth_config(AuthMethod::ApiKey, None), users());
        assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
    }

    #[test]
    fn test_create_authenticator_token() {
        let auth = create_authenticator(&auth_config(AuthMethod::Token, None), users()).unwrap();
        assert_eq!(auth.method_name(), "token");
    }
}
