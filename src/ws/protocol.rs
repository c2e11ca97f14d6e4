//! WebSocket protocol message definitions
//! These are the wire types between the game core and the rendering client

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::session::GamePhase;
use crate::leaderboard::{LeaderboardRow, LeaderboardScope};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start moving left (left arrow pressed)
    MoveLeft,

    /// Start moving right (right arrow pressed)
    MoveRight,

    /// Stop horizontal movement (arrow released)
    StopMove,

    /// Restart after game over
    Restart,

    /// The client viewport changed
    Resize {
        width: f32,
        height: f32,
    },

    /// Submit the finished game's score to the leaderboard
    SubmitScore {
        email: String,
        /// Optional display name; blank means "mask my email instead"
        player_name: String,
        listserv_consent: bool,
    },

    /// Request leaderboard rows for one of the tabs
    FetchLeaderboard {
        scope: LeaderboardScope,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        server_time: u64,
    },

    /// Game state snapshot (sent at regular intervals)
    Snapshot {
        /// Simulation tick number
        tick: u64,
        phase: GamePhase,
        score: u32,
        player: PlayerView,
        obstacles: Vec<ObstacleView>,
    },

    /// The run just ended
    GameOver {
        score: u32,
    },

    /// Show the score-submission prompt (sent once, shortly after game over)
    SubmitPrompt {
        score: u32,
    },

    /// Submission blocked by local validation
    SubmitRejected {
        reason: String,
    },

    /// The score was stored; the client hides the prompt and clears fields
    SubmitAccepted,

    /// The score could not be stored; the prompt stays up for a retry
    SubmitFailed {
        message: String,
    },

    /// Display rows for the requested leaderboard tab
    Leaderboard {
        scope: LeaderboardScope,
        rows: Vec<LeaderboardRow>,
        /// Present when there are no rows to show
        placeholder: Option<String>,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    /// Current movement direction (-1, 0 or 1)
    pub direction: i8,
    pub size: f32,
}

/// Obstacle state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"move_left"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::MoveLeft));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"fetch_leaderboard","scope":"daily"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::FetchLeaderboard {
                scope: LeaderboardScope::Daily
            }
        ));
    }

    #[test]
    fn submit_score_round_trips() {
        let msg = ClientMsg::SubmitScore {
            email: "a@b.com".to_string(),
            player_name: "Al".to_string(),
            listserv_consent: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"submit_score""#));
        assert!(json.contains(r#""listserv_consent":true"#));
    }
}
