//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::leaderboard::LeaderboardService;
use crate::store::{ScoreStore, SupabaseClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub leaderboard: LeaderboardService<ScoreStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // The leaderboard backend is optional; its absence is decided here,
        // once, and every read degrades to empty from then on
        let store = config
            .supabase()
            .map(|(url, key)| ScoreStore::new(SupabaseClient::new(url, key)));
        let leaderboard = LeaderboardService::new(store);

        let sessions = Arc::new(SessionRegistry::new());

        Self {
            config,
            leaderboard,
            sessions,
        }
    }
}
