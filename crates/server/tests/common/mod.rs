//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock external clients and a mock task queue injected, backed by
//! SQLite stores in a temporary directory.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use marquee_core::config::{AuthConfig, CacheConfig, DatabaseConfig, ServerConfig, TasksConfig};
use marquee_core::testing::{MockClientFactory, MockTaskQueue};
use marquee_core::users::{ensure_user, login};
use marquee_core::{
    create_authenticator, AuthMethod, Config, Settings, SettingsStore, SqliteSettingsStore,
    SqliteUserStore, SqliteWatchStore,
};

/// Re-export fixtures for test convenience
pub use marquee_core::testing::fixtures;

/// Test fixture with mock TMDB, Jackett and Transmission clients.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_watch_movie() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/watch-movie", json!({
///         "tmdb_movie_id": 603,
///         "name": "The Matrix"
///     })).await;
///
///     assert_eq!(response.status, 201);
///     assert_eq!(fixture.tasks.count("watch_movie"), 1);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock catalog, indexer and download daemon
    pub clients: MockClientFactory,
    /// Captures every enqueued task
    pub tasks: Arc<MockTaskQueue>,
    pub settings: Arc<SqliteSettingsStore>,
    pub watches: Arc<SqliteWatchStore>,
    pub users: Arc<SqliteUserStore>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub auth_method: AuthMethod,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub tmdb_configuration_max_age_hours: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            auth_method: AuthMethod::None,
            api_key: None,
            cache_ttl_secs: CacheConfig::default().ttl_secs,
            tmdb_configuration_max_age_hours: TasksConfig::default()
                .tmdb_configuration_max_age_hours,
        }
    }
}

impl TestConfig {
    /// Per-user token authentication.
    pub fn with_token_auth() -> Self {
        Self {
            auth_method: AuthMethod::Token,
            ..Self::default()
        }
    }

    /// Shared API key authentication.
    pub fn with_api_key(key: &str) -> Self {
        Self {
            auth_method: AuthMethod::ApiKey,
            api_key: Some(key.to_string()),
            ..Self::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks and no authentication.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = AuthConfig {
            method: test_config.auth_method,
            api_key: test_config.api_key,
            bootstrap_admin: None,
        };
        let config = Config {
            auth: auth.clone(),
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            tasks: TasksConfig {
                enabled: false,
                tmdb_configuration_max_age_hours: test_config.tmdb_configuration_max_age_hours,
                ..TasksConfig::default()
            },
            cache: CacheConfig {
                ttl_secs: test_config.cache_ttl_secs,
            },
        };

        let users =
            Arc::new(SqliteUserStore::new(&db_path).expect("Failed to create user store"));
        let settings =
            Arc::new(SqliteSettingsStore::new(&db_path).expect("Failed to create settings store"));
        let watches =
            Arc::new(SqliteWatchStore::new(&db_path).expect("Failed to create watch store"));

        let clients = MockClientFactory::new();
        let tasks = Arc::new(MockTaskQueue::new());

        let authenticator =
            create_authenticator(&auth, users.clone()).expect("Failed to create authenticator");

        let state = Arc::new(marquee_server::state::AppState::new(
            config,
            authenticator,
            users.clone(),
            settings.clone(),
            watches.clone(),
            tasks.clone(),
            Arc::new(clients.clone()),
        ));

        let router = marquee_server::api::create_router(state);

        Self {
            router,
            clients,
            tasks,
            settings,
            watches,
            users,
            temp_dir,
        }
    }

    /// Store the default settings record.
    pub fn create_settings(&self) -> Settings {
        self.settings
            .create(fixtures::settings_input())
            .expect("Failed to create settings")
    }

    /// Create a user and return a fresh API token for it.
    pub fn user_token(&self, username: &str, is_staff: bool) -> String {
        ensure_user(self.users.as_ref(), username, "password123", is_staff)
            .expect("Failed to create user");
        let (_, token) =
            login(self.users.as_ref(), username, "password123").expect("Failed to log in");
        token
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body), None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None, None).await
    }

    /// Send a GET request authenticated with `Authorization: Token <token>`.
    pub async fn get_as(&self, token: &str, path: &str) -> TestResponse {
        self.request("GET", path, None, Some(token)).await
    }

    /// Send a POST request authenticated with `Authorization: Token <token>`.
    pub async fn post_as(&self, token: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), Some(token)).await
    }

    /// Send a PUT request authenticated with `Authorization: Token <token>`.
    pub async fn put_as(&self, token: &str, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), Some(token)).await
    }

    /// Send a DELETE request authenticated with `Authorization: Token <token>`.
    pub async fn delete_as(&self, token: &str, path: &str) -> TestResponse {
        self.request("DELETE", path, None, Some(token)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            request_builder = request_builder.header("Authorization", format!("Token {token}"));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
