//! Game simulation modules

pub mod entity;
pub mod session;
pub mod snapshot;

pub use entity::Viewport;
pub use session::{GamePhase, GameSession, GameState, SessionHandle, SessionRegistry};

use crate::leaderboard::{LeaderboardScope, NewScore};
use crate::ws::protocol::ClientMsg;

/// Client input delivered to the session's tick loop
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Network work requested by the simulation. The tick loop never performs
/// these itself; an effects driver resolves them asynchronously and pushes
/// the outcome onto the session's outbound channel.
#[derive(Debug, Clone)]
pub enum SessionEffect {
    /// Store a validated score record
    SubmitScore(NewScore),
    /// Fetch display rows for a leaderboard tab
    FetchLeaderboard { scope: LeaderboardScope },
}
