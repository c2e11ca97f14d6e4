//! Leaderboard reads and score submission.
//!
//! Both read operations follow the same two-phase policy: try the
//! server-side ranking procedure first, and only if that errors fall back to
//! a direct filtered/sorted query with client-side rank assignment. Read
//! failures are never surfaced to callers; they degrade to an empty list.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::util::time::start_of_local_day;

/// Number of rows fetched when the caller does not ask for more
pub const DEFAULT_LIMIT: u32 = 10;

/// Which leaderboard view is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardScope {
    AllTime,
    Daily,
}

/// A ranked leaderboard entry, as displayed to players.
/// Rank is a read-time attribute: the ranking procedure returns it, the
/// fallback path computes it from row order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub email: String,
    pub player_name: Option<String>,
    pub score: u32,
    pub date: DateTime<Utc>,
    pub rank: u32,
}

/// A raw leaderboard row from the fallback query (no rank yet)
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRow {
    pub id: i64,
    pub email: String,
    pub player_name: Option<String>,
    pub score: u32,
    pub date: DateTime<Utc>,
}

/// A finished game's score, ready for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewScore {
    pub email: String,
    pub player_name: Option<String>,
    pub score: u32,
    pub date: DateTime<Utc>,
    pub listserv_consent: bool,
}

impl NewScore {
    /// Build a submission record. The player name is trimmed and an empty
    /// name becomes null, matching what the leaderboard table expects.
    pub fn new(email: &str, player_name: &str, score: u32) -> Self {
        let trimmed = player_name.trim();
        Self {
            email: email.to_string(),
            player_name: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            score,
            date: Utc::now(),
            listserv_consent: true,
        }
    }
}

/// Storage operations the leaderboard needs from the external service.
/// Production uses the Supabase REST store; tests substitute a mock.
pub trait ScoreBackend: Send + Sync {
    /// Phase 1: the server-side ranking procedure (rows arrive ranked)
    fn ranked_top_scores(
        &self,
        scope: LeaderboardScope,
        limit: u32,
    ) -> impl Future<Output = anyhow::Result<Vec<LeaderboardEntry>>> + Send;

    /// Phase 2: raw rows ordered by score descending, optionally filtered
    /// to entries at or after `since`
    fn score_rows(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> impl Future<Output = anyhow::Result<Vec<ScoreRow>>> + Send;

    /// Insert a newly submitted score
    fn insert_score(&self, score: &NewScore) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Assign 1-based ranks in row order to fallback query results
pub fn assign_ranks(rows: Vec<ScoreRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            id: row.id,
            email: row.email,
            player_name: row.player_name,
            score: row.score,
            date: row.date,
            rank: index as u32 + 1,
        })
        .collect()
}

/// Validate a submission locally, before anything touches the network
pub fn validate_submission(email: &str, consent: bool) -> Result<(), SubmitRejection> {
    if email.is_empty() || !email.contains('@') {
        return Err(SubmitRejection::InvalidEmail);
    }
    if !consent {
        return Err(SubmitRejection::ConsentRequired);
    }
    Ok(())
}

/// Local validation failures, worded for the player
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please agree to join the listserv to submit your score")]
    ConsentRequired,
}

/// Submission failures that reached (or could not reach) the service
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("leaderboard service is not configured")]
    Unavailable,

    #[error(transparent)]
    Backend(anyhow::Error),
}

/// Leaderboard operations over an optional backend. Availability is decided
/// once at construction; an unconfigured backend turns every read into an
/// empty result and every submission into a retryable failure.
#[derive(Clone)]
pub struct LeaderboardService<B> {
    backend: Option<B>,
}

impl<B: ScoreBackend> LeaderboardService<B> {
    pub fn new(backend: Option<B>) -> Self {
        Self { backend }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Fetch the all-time top scores. Never fails; degrades to empty.
    pub async fn fetch_top_scores(&self, limit: u32) -> Vec<LeaderboardEntry> {
        self.fetch(LeaderboardScope::AllTime, limit).await
    }

    /// Fetch today's top scores. Never fails; degrades to empty.
    pub async fn fetch_daily_top_scores(&self, limit: u32) -> Vec<LeaderboardEntry> {
        self.fetch(LeaderboardScope::Daily, limit).await
    }

    pub async fn fetch_scope(&self, scope: LeaderboardScope, limit: u32) -> Vec<LeaderboardEntry> {
        self.fetch(scope, limit).await
    }

    async fn fetch(&self, scope: LeaderboardScope, limit: u32) -> Vec<LeaderboardEntry> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return Vec::new(),
        };

        match backend.ranked_top_scores(scope, limit).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    error = %err,
                    ?scope,
                    "Ranking procedure failed, falling back to direct query"
                );

                let since = match scope {
                    LeaderboardScope::AllTime => None,
                    LeaderboardScope::Daily => Some(start_of_local_day()),
                };

                match backend.score_rows(since, limit).await {
                    Ok(rows) => assign_ranks(rows),
                    Err(err) => {
                        error!(error = %err, ?scope, "Fallback query also failed");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Submit a validated score record to the external store
    pub async fn submit_score(&self, record: &NewScore) -> Result<(), SubmitError> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return Err(SubmitError::Unavailable),
        };

        backend
            .insert_score(record)
            .await
            .map_err(SubmitError::Backend)
    }

    /// Startup connectivity check: one cheap query, logged and forgotten.
    /// A failure here never stops the game from running.
    pub async fn probe(&self) {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return,
        };

        match backend.score_rows(None, 1).await {
            Ok(_) => info!("Leaderboard connectivity check passed"),
            Err(err) => warn!(error = %err, "Leaderboard connectivity check failed"),
        }
    }
}
