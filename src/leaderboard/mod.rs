//! Leaderboard retrieval protocol and score submission

pub mod service;
pub mod view;

pub use service::{
    validate_submission, LeaderboardEntry, LeaderboardScope, LeaderboardService, NewScore,
    ScoreBackend, ScoreRow, SubmitError, SubmitRejection, DEFAULT_LIMIT,
};
pub use view::{display_rows, empty_placeholder, LeaderboardRow};
