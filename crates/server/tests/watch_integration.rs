//! Integration tests for the watch endpoints and the tasks they queue.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixtures, TestConfig, TestFixture};
use marquee_core::testing::RecordedRemove;
use marquee_core::torrent_client::TorrentClientError;
use marquee_core::watch::{NewWatchMovie, TorrentAssignment, WatchTarget};
use marquee_core::{Task, WatchStore};

const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

fn seeded_movie(fixture: &TestFixture, torrent_id: i64) -> i64 {
    let movie = fixture
        .watches
        .create_movie(NewWatchMovie {
            user: "anonymous".to_string(),
            tmdb_movie_id: 603,
            name: "The Matrix".to_string(),
            poster_image_url: None,
        })
        .unwrap();
    fixture
        .watches
        .assign_torrent(
            WatchTarget::Movie(movie.id),
            Some(TorrentAssignment {
                torrent_id,
                torrent_hash: HASH.to_string(),
                torrent_name: "The.Matrix.1999.1080p".to_string(),
            }),
        )
        .unwrap();
    movie.id
}

async fn create_show(fixture: &TestFixture, tmdb_show_id: i64) -> i64 {
    let response = fixture
        .post(
            "/api/watch-tv-show",
            json!({"tmdb_show_id": tmdb_show_id, "name": "Firefly"}),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);
    response.body["id"].as_i64().unwrap()
}

// =============================================================================
// Movies
// =============================================================================

#[tokio::test]
async fn test_create_movie_enqueues_one_task() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/watch-movie",
            json!({"tmdb_movie_id": 603, "name": "The Matrix"}),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["name"], "The Matrix");
    assert_eq!(response.body["collected"], false);
    assert!(response.body["torrent_hash"].is_null());

    let id = response.body["id"].as_i64().unwrap();
    assert_eq!(
        fixture.tasks.enqueued(),
        vec![Task::WatchMovie { watch_movie_id: id }]
    );
}

#[tokio::test]
async fn test_create_movie_missing_fields() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/api/watch-movie", json!({})).await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["tmdb_movie_id"].is_array());
    assert!(response.body["name"].is_array());
    assert!(fixture.tasks.enqueued().is_empty());
}

#[tokio::test]
async fn test_create_movie_wrong_field_type() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/watch-movie",
            json!({"tmdb_movie_id": "abc", "name": "The Matrix"}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    let messages = response.body["tmdb_movie_id"].as_array().unwrap();
    assert!(messages[0].as_str().unwrap().contains("invalid type"));
    assert!(fixture.tasks.enqueued().is_empty());
}

#[tokio::test]
async fn test_create_movie_malformed_json() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_raw("/api/watch-movie", "{not json").await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["non_field_errors"][0]
        .as_str()
        .unwrap()
        .starts_with("JSON parse error"));
}

#[tokio::test]
async fn test_update_and_delete_movie() {
    let fixture = TestFixture::new().await;
    let created = fixture
        .post("/api/watch-movie", json!({"tmdb_movie_id": 1, "name": "Alien"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();

    let response = fixture
        .patch(&format!("/api/watch-movie/{id}"), json!({"collected": true}))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["collected"], true);
    assert!(response.body["collected_at"].is_string());

    let response = fixture.delete(&format!("/api/watch-movie/{id}")).await;
    assert_status!(response, StatusCode::NO_CONTENT);

    let response = fixture.get(&format!("/api/watch-movie/{id}")).await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blacklist_auto_retry() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    let id = seeded_movie(&fixture, 7);
    fixture
        .clients
        .torrent_client
        .add_mock_torrent(fixtures::torrent_info(7, HASH, 0.3))
        .await;

    let response = fixture
        .post_empty(&format!("/api/watch-movie/{id}/blacklist-auto-retry"))
        .await;

    assert_status!(response, StatusCode::OK);
    assert!(response.body["torrent_id"].is_null());
    assert!(response.body["torrent_hash"].is_null());
    assert!(response.body["torrent_name"].is_null());

    assert!(fixture.watches.is_blacklisted(HASH).unwrap());
    assert_eq!(fixture.tasks.count("watch_movie"), 1);
    assert_eq!(
        fixture.clients.torrent_client.removed_torrents().await,
        vec![RecordedRemove {
            ids: vec![7],
            delete_data: true,
        }]
    );
    assert!(!fixture.clients.torrent_client.has_torrent(7).await);
}

#[tokio::test]
async fn test_blacklist_auto_retry_keeps_changes_when_removal_fails() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    let id = seeded_movie(&fixture, 7);
    let daemon = &fixture.clients.torrent_client;
    daemon
        .add_mock_torrent(fixtures::torrent_info(7, HASH, 0.3))
        .await;
    daemon
        .set_next_error(TorrentClientError::ConnectionFailed("refused".to_string()))
        .await;

    let response = fixture
        .post_empty(&format!("/api/watch-movie/{id}/blacklist-auto-retry"))
        .await;

    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["error"].as_str().unwrap().contains("refused"));

    // Blacklist, cleared torrent and new search are already committed
    assert!(fixture.watches.is_blacklisted(HASH).unwrap());
    let movie = fixture.watches.get_movie(id).unwrap().unwrap();
    assert!(movie.torrent_id.is_none());
    assert!(movie.torrent_hash.is_none());
    assert_eq!(
        fixture.tasks.enqueued(),
        vec![Task::WatchMovie { watch_movie_id: id }]
    );
    assert!(daemon.has_torrent(7).await);
}

#[tokio::test]
async fn test_blacklist_auto_retry_without_torrent() {
    let fixture = TestFixture::new().await;
    let created = fixture
        .post("/api/watch-movie", json!({"tmdb_movie_id": 1, "name": "Alien"}))
        .await;
    let id = created.body["id"].as_i64().unwrap();
    fixture.tasks.clear();

    let response = fixture
        .post_empty(&format!("/api/watch-movie/{id}/blacklist-auto-retry"))
        .await;

    assert_status!(response, StatusCode::OK);
    assert!(fixture.watches.blacklisted_hashes().unwrap().is_empty());
    assert_eq!(fixture.tasks.count("watch_movie"), 1);
    assert!(fixture
        .clients
        .torrent_client
        .removed_torrents()
        .await
        .is_empty());
}

#[tokio::test]
async fn test_blacklist_auto_retry_unknown_movie() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_empty("/api/watch-movie/999/blacklist-auto-retry")
        .await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(fixture.tasks.enqueued().is_empty());
}

// =============================================================================
// TV shows and episodes
// =============================================================================

#[tokio::test]
async fn test_create_show_enqueues_nothing() {
    let fixture = TestFixture::new().await;

    create_show(&fixture, 1437).await;

    assert!(fixture.tasks.enqueued().is_empty());
    let response = fixture.get("/api/watch-tv-show").await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_watch_entire_season() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    fixture
        .clients
        .catalog
        .add_season(1437, fixtures::tmdb_season(1, 10))
        .await;
    let show_id = create_show(&fixture, 1437).await;

    let path = format!("/api/watch-tv-show/{show_id}/entire-season?season_number=1");
    let response = fixture.get(&path).await;

    assert_status!(response, StatusCode::OK);
    let episodes = response.body.as_array().unwrap();
    assert_eq!(episodes.len(), 10);
    assert!(episodes.iter().all(|e| e["season_number"] == 1));
    assert_eq!(fixture.tasks.count("watch_tv_show_season"), 1);
    assert_eq!(fixture.tasks.count("watch_tv_episode"), 0);

    // A second call reuses the existing rows
    let response = fixture.get(&path).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 10);
    assert_eq!(fixture.tasks.count("watch_tv_show_season"), 2);
}

#[tokio::test]
async fn test_watch_entire_season_lists_every_episode_of_the_show() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    fixture
        .clients
        .catalog
        .add_season(1437, fixtures::tmdb_season(1, 3))
        .await;
    let show_id = create_show(&fixture, 1437).await;
    let response = fixture
        .post(
            "/api/watch-tv-episode",
            json!({
                "watch_tv_show": show_id,
                "tmdb_episode_id": 2005,
                "season_number": 2,
                "episode_number": 5,
            }),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);

    let response = fixture
        .get(&format!(
            "/api/watch-tv-show/{show_id}/entire-season?season_number=1"
        ))
        .await;

    assert_status!(response, StatusCode::OK);
    let episodes = response.body.as_array().unwrap();
    assert_eq!(episodes.len(), 4);
    assert_eq!(
        episodes.iter().filter(|e| e["season_number"] == 1).count(),
        3
    );
    assert!(episodes
        .iter()
        .any(|e| e["season_number"] == 2 && e["tmdb_episode_id"] == 2005));
}

#[tokio::test]
async fn test_watch_entire_season_from_json_body() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    fixture
        .clients
        .catalog
        .add_season(1437, fixtures::tmdb_season(2, 4))
        .await;
    let show_id = create_show(&fixture, 1437).await;

    let response = fixture
        .post(
            &format!("/api/watch-tv-show/{show_id}/entire-season"),
            json!({"season_number": 2}),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 4);
    assert_eq!(
        fixture.tasks.enqueued(),
        vec![Task::WatchTvShowSeason {
            watch_tv_show_id: show_id,
            season_number: 2,
        }]
    );
}

#[tokio::test]
async fn test_watch_entire_season_requires_season_number() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    let show_id = create_show(&fixture, 1437).await;

    let response = fixture
        .get(&format!("/api/watch-tv-show/{show_id}/entire-season"))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({"season_number": ["This field is required"]})
    );
    assert!(fixture.tasks.enqueued().is_empty());

    let response = fixture
        .get(&format!("/api/watch-tv-episode?watch_tv_show={show_id}"))
        .await;
    assert_eq!(response.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_watch_entire_season_unknown_season() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    let show_id = create_show(&fixture, 1437).await;

    let response = fixture
        .get(&format!(
            "/api/watch-tv-show/{show_id}/entire-season?season_number=9"
        ))
        .await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(fixture.tasks.enqueued().is_empty());
}

#[tokio::test]
async fn test_create_episode() {
    let fixture = TestFixture::new().await;
    let show_id = create_show(&fixture, 1437).await;
    let body = json!({
        "watch_tv_show": show_id,
        "tmdb_episode_id": 1001,
        "season_number": 1,
        "episode_number": 1,
    });

    let response = fixture.post("/api/watch-tv-episode", body.clone()).await;
    assert_status!(response, StatusCode::CREATED);
    let id = response.body["id"].as_i64().unwrap();
    assert_eq!(
        fixture.tasks.enqueued(),
        vec![Task::WatchTvEpisode {
            watch_tv_episode_id: id
        }]
    );

    let response = fixture.post("/api/watch-tv-episode", body).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["non_field_errors"].is_array());
    assert_eq!(fixture.tasks.count("watch_tv_episode"), 1);
}

#[tokio::test]
async fn test_create_episode_for_unknown_show() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/watch-tv-episode",
            json!({
                "watch_tv_show": 42,
                "tmdb_episode_id": 1001,
                "season_number": 1,
                "episode_number": 1,
            }),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["watch_tv_show"].is_array());
    assert!(fixture.tasks.enqueued().is_empty());
}

#[tokio::test]
async fn test_delete_show_removes_episodes() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    fixture
        .clients
        .catalog
        .add_season(1437, fixtures::tmdb_season(1, 3))
        .await;
    let show_id = create_show(&fixture, 1437).await;
    fixture
        .get(&format!(
            "/api/watch-tv-show/{show_id}/entire-season?season_number=1"
        ))
        .await;

    let response = fixture.delete(&format!("/api/watch-tv-show/{show_id}")).await;
    assert_status!(response, StatusCode::NO_CONTENT);

    let response = fixture.get("/api/watch-tv-episode").await;
    assert_eq!(response.body.as_array().unwrap().len(), 0);
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_other_users_watches_are_read_only() {
    let fixture = TestFixture::with_config(TestConfig::with_token_auth()).await;
    let alice = fixture.user_token("alice", false);
    let bob = fixture.user_token("bob", false);

    let created = fixture
        .post_as(
            &alice,
            "/api/watch-movie",
            json!({"tmdb_movie_id": 603, "name": "The Matrix"}),
        )
        .await;
    assert_status!(created, StatusCode::CREATED);
    assert_eq!(created.body["user"], "alice");
    let path = format!("/api/watch-movie/{}", created.body["id"]);

    let response = fixture.get_as(&bob, &path).await;
    assert_status!(response, StatusCode::OK);

    let response = fixture
        .put_as(&bob, &path, json!({"name": "Stolen"}))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.delete_as(&bob, &path).await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let admin = fixture.user_token("admin", true);
    let response = fixture.delete_as(&admin, &path).await;
    assert_status!(response, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_watch_endpoints_require_token() {
    let fixture = TestFixture::with_config(TestConfig::with_token_auth()).await;

    let response = fixture.get("/api/watch-movie").await;

    assert_status!(response, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_trailing_slash_paths() {
    let fixture = TestFixture::new().await;
    fixture.create_settings();
    fixture
        .clients
        .catalog
        .add_season(1437, fixtures::tmdb_season(1, 2))
        .await;

    let response = fixture
        .post(
            "/api/watch-movie/",
            json!({"tmdb_movie_id": 603, "name": "The Matrix"}),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);
    let id = response.body["id"].as_i64().unwrap();

    let response = fixture.get("/api/watch-movie/").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    let response = fixture.get(&format!("/api/watch-movie/{id}/")).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["id"], id);

    let show_id = create_show(&fixture, 1437).await;
    let response = fixture
        .get(&format!(
            "/api/watch-tv-show/{show_id}/entire-season/?season_number=1"
        ))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 2);

    let response = fixture.get("/api/settings/").await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_api_path_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/watch-movies").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");

    let response = fixture.get("/api/watch-movie/1/nope/").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");
}
