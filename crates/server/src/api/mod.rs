pub mod auth;
pub mod cache;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod torrents;
pub mod users;
pub mod watch_movie;
pub mod watch_tv_episode;
pub mod watch_tv_show;

pub use error::ApiError;
pub use routes::create_router;
