//! Time-based cache for slow read-only routes (catalog and indexer searches).
//!
//! Entries are keyed by method, path and query string. Only `200 OK` responses
//! are stored; an expired entry is replaced by the next successful response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics::CACHE_LOOKUPS_TOTAL;
use crate::state::AppState;

/// Largest body the cache will buffer.
const MAX_CACHED_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
    stored_at: Instant,
}

impl CachedResponse {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, self.body).into_response();
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A fresh entry for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .cloned()
    }

    pub async fn insert(&self, key: String, content_type: Option<HeaderValue>, body: Bytes) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CachedResponse {
                content_type,
                body,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn cache_key(request: &Request<Body>) -> String {
    let uri = request.uri();
    match uri.query() {
        Some(query) => format!("{} {}?{}", request.method(), uri.path(), query),
        None => format!("{} {}", request.method(), uri.path()),
    }
}

/// Serve from the cache when a fresh entry exists, otherwise run the handler
/// and store a successful response.
pub async fn cache_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cache = state.cache();
    let key = cache_key(&request);

    if let Some(cached) = cache.get(&key).await {
        CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
        debug!(key = %key, "Response cache hit");
        return cached.into_response();
    }
    CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to buffer response for cache");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    cache
        .insert(
            key,
            parts.headers.get(header::CONTENT_TYPE).cloned(),
            bytes.clone(),
        )
        .await;

    Response::from_parts(parts, Body::from(bytes))
}
