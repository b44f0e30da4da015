use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::cache::cache_middleware;
use super::middleware::{auth_middleware, metrics_middleware};
use super::{
    auth, handlers, media, settings, torrents, users, watch_movie, watch_tv_episode, watch_tv_show,
};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Frontend static files path (configurable via env)
    let frontend_dir =
        std::env::var("FRONTEND_DIR").unwrap_or_else(|_| "frontend/dist".to_string());

    // Slow catalog and indexer lookups, served from the response cache
    let cached_routes = Router::new()
        .route("/search/media", get(media::search_media))
        .route(
            "/search/media/{media_type}/{media_id}",
            get(media::media_detail),
        )
        .route("/search/torrents", get(media::search_torrents))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            cache_middleware,
        ));

    let protected_routes = Router::new()
        .route("/config", get(handlers::get_config))
        // Current user
        .route("/user", get(users::list_users))
        .route("/user/{id}", get(users::get_user))
        // Settings
        .route(
            "/settings",
            get(settings::list_settings).post(settings::create_settings),
        )
        .route(
            "/settings/{id}",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/settings/{id}/verify", get(settings::verify_settings))
        // Movie watches
        .route(
            "/watch-movie",
            get(watch_movie::list_movies).post(watch_movie::create_movie),
        )
        .route(
            "/watch-movie/{id}",
            get(watch_movie::get_movie)
                .put(watch_movie::update_movie)
                .patch(watch_movie::update_movie)
                .delete(watch_movie::delete_movie),
        )
        .route(
            "/watch-movie/{id}/blacklist-auto-retry",
            post(watch_movie::blacklist_auto_retry),
        )
        // TV show watches
        .route(
            "/watch-tv-show",
            get(watch_tv_show::list_shows).post(watch_tv_show::create_show),
        )
        .route(
            "/watch-tv-show/{id}",
            get(watch_tv_show::get_show)
                .put(watch_tv_show::update_show)
                .patch(watch_tv_show::update_show)
                .delete(watch_tv_show::delete_show),
        )
        .route(
            "/watch-tv-show/{id}/entire-season",
            get(watch_tv_show::watch_entire_season).post(watch_tv_show::watch_entire_season),
        )
        // TV episode watches
        .route(
            "/watch-tv-episode",
            get(watch_tv_episode::list_episodes).post(watch_tv_episode::create_episode),
        )
        .route(
            "/watch-tv-episode/{id}",
            get(watch_tv_episode::get_episode)
                .put(watch_tv_episode::update_episode)
                .patch(watch_tv_episode::update_episode)
                .delete(watch_tv_episode::delete_episode),
        )
        // Torrents
        .route("/download/torrents", post(torrents::download_torrent))
        .route("/current/torrents", get(torrents::current_torrents))
        .route(
            "/current/torrents/{torrent_id}",
            get(torrents::current_torrent),
        )
        .merge(cached_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth", post(auth::login))
        .merge(protected_routes)
        .fallback(handlers::api_not_found);

    // Serve frontend with SPA fallback
    let index_path = format!("{}/index.html", frontend_dir);
    let serve_dir = ServeDir::new(&frontend_dir).fallback(ServeFile::new(&index_path));

    let app = Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .fallback_service(serve_dir)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // `/api/settings/` and `/api/settings` reach the same route. The path is
    // rewritten before routing, so this wraps the whole router.
    Router::new().fallback_service(NormalizePathLayer::trim_trailing_slash().layer(app))
}
