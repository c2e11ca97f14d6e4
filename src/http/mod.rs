//! HTTP surface: health and leaderboard reads

pub mod routes;

pub use routes::build_router;
