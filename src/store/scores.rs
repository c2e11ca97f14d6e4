//! Leaderboard table access over the Supabase REST API

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::leaderboard::{LeaderboardEntry, LeaderboardScope, NewScore, ScoreBackend, ScoreRow};

use super::supabase::SupabaseClient;

const TABLE: &str = "leaderboard";
const SELECT_COLUMNS: &str = "id,email,score,date,player_name";

/// Parameters for the ranking procedures
#[derive(Debug, Serialize)]
struct RankedParams {
    limit_count: u32,
}

/// Score store backed by the Supabase `leaderboard` table and its
/// `get_top_scores` / `get_daily_top_scores` procedures
#[derive(Clone)]
pub struct ScoreStore {
    client: SupabaseClient,
}

impl ScoreStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn ranking_procedure(scope: LeaderboardScope) -> &'static str {
        match scope {
            LeaderboardScope::AllTime => "get_top_scores",
            LeaderboardScope::Daily => "get_daily_top_scores",
        }
    }

    fn fallback_query(since: Option<DateTime<Utc>>, limit: u32) -> String {
        // Secondary key date.asc is the documented tie-break for equal scores
        let mut query = format!("select={SELECT_COLUMNS}&order=score.desc,date.asc&limit={limit}");
        if let Some(since) = since {
            // The Z suffix keeps the timestamp URL-safe (no '+')
            let bound = since.to_rfc3339_opts(SecondsFormat::Secs, true);
            query.push_str(&format!("&date=gte.{bound}"));
        }
        query
    }
}

impl ScoreBackend for ScoreStore {
    async fn ranked_top_scores(
        &self,
        scope: LeaderboardScope,
        limit: u32,
    ) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let function = Self::ranking_procedure(scope);
        let params = RankedParams { limit_count: limit };
        let entries = self.client.rpc(function, &params).await?;
        Ok(entries)
    }

    async fn score_rows(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> anyhow::Result<Vec<ScoreRow>> {
        let query = Self::fallback_query(since, limit);
        let rows = self.client.get(TABLE, &query).await?;
        Ok(rows)
    }

    async fn insert_score(&self, score: &NewScore) -> anyhow::Result<()> {
        self.client.insert(TABLE, score).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fallback_query_orders_and_limits() {
        let query = ScoreStore::fallback_query(None, 10);
        assert_eq!(
            query,
            "select=id,email,score,date,player_name&order=score.desc,date.asc&limit=10"
        );
    }

    #[test]
    fn daily_fallback_query_filters_from_midnight() {
        let since = Utc.with_ymd_and_hms(2025, 3, 27, 0, 0, 0).unwrap();
        let query = ScoreStore::fallback_query(Some(since), 5);
        assert!(query.ends_with("&date=gte.2025-03-27T00:00:00Z"));
        assert!(query.contains("limit=5"));
    }

    #[test]
    fn scopes_map_to_their_procedures() {
        assert_eq!(
            ScoreStore::ranking_procedure(LeaderboardScope::AllTime),
            "get_top_scores"
        );
        assert_eq!(
            ScoreStore::ranking_procedure(LeaderboardScope::Daily),
            "get_daily_top_scores"
        );
    }
}
