//! HTTP route definitions

use axum::{
    extract::{Query, State},
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::leaderboard::{
    display_rows, empty_placeholder, LeaderboardEntry, LeaderboardRow, LeaderboardScope,
    DEFAULT_LIMIT,
};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/leaderboard/top", get(top_scores_handler))
        .route("/leaderboard/daily", get(daily_scores_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    leaderboard_available: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        leaderboard_available: state.leaderboard.is_available(),
    })
}

// ============================================================================
// Leaderboard endpoints
// ============================================================================

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

#[derive(Serialize)]
struct LeaderboardResponse {
    scope: LeaderboardScope,
    rows: Vec<LeaderboardRow>,
    /// Present when there is nothing to show
    placeholder: Option<String>,
}

async fn top_scores_handler(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<LeaderboardResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.leaderboard.fetch_top_scores(limit).await;
    leaderboard_response(LeaderboardScope::AllTime, &entries)
}

async fn daily_scores_handler(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<LeaderboardResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.leaderboard.fetch_daily_top_scores(limit).await;
    leaderboard_response(LeaderboardScope::Daily, &entries)
}

fn leaderboard_response(
    scope: LeaderboardScope,
    entries: &[LeaderboardEntry],
) -> Json<LeaderboardResponse> {
    let rows = display_rows(entries);
    let placeholder = empty_placeholder(&rows);

    Json(LeaderboardResponse {
        scope,
        rows,
        placeholder,
    })
}
