//! Per-connection game state and the authoritative tick loop

use std::time::Duration;

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::leaderboard::{validate_submission, NewScore};
use crate::util::time::{unix_millis, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::entity::{Obstacle, Player, Viewport};
use super::snapshot::{snapshot, FrameBuilder};
use super::{SessionEffect, SessionInput};

/// Ticks between obstacle spawns
pub const SPAWN_INTERVAL_TICKS: u64 = 90;

/// Ticks spent on the game-over screen before the submission prompt appears
pub const PROMPT_DELAY_TICKS: u64 = SIMULATION_TPS as u64;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Simulation running
    Playing,
    /// Run ended, waiting for restart or score submission
    GameOver,
}

/// Events produced by a simulation tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// An obstacle hit the player this tick
    GameOver { score: u32 },
    /// The game-over display delay elapsed; surface the submission prompt
    SubmitPromptDue { score: u32 },
}

/// Simulation state for one game session (authoritative)
pub struct GameState {
    pub viewport: Viewport,
    pub player: Player,
    /// Active obstacles in spawn order
    pub obstacles: Vec<Obstacle>,
    pub score: u32,
    pub phase: GamePhase,
    /// Frame counter; advances only while playing
    pub frame: u64,
    game_over_ticks: u64,
    prompt_surfaced: bool,
    rng: ChaCha8Rng,
}

impl GameState {
    pub fn new(viewport: Viewport, seed: u64) -> Self {
        Self {
            viewport,
            player: Player::new(viewport),
            obstacles: Vec::new(),
            score: 0,
            phase: GamePhase::Playing,
            frame: 0,
            game_over_ticks: 0,
            prompt_surfaced: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Run a single simulation tick
    pub fn tick(&mut self) -> Vec<TickEvent> {
        let mut events = Vec::new();

        match self.phase {
            GamePhase::Playing => {
                self.frame += 1;

                if self.frame % SPAWN_INTERVAL_TICKS == 0 {
                    self.obstacles.push(Obstacle::spawn(&mut self.rng, self.viewport));
                }

                self.player.advance(self.viewport);

                // Advance every obstacle, test every one for a hit, and prune
                // the ones that left the screen. All hits in a tick collapse
                // into the same transition.
                let viewport = self.viewport;
                let player = &self.player;
                let mut hit = false;
                let mut exited = 0u32;
                self.obstacles.retain_mut(|obstacle| {
                    obstacle.advance();
                    if obstacle.hits(player) {
                        hit = true;
                    }
                    if obstacle.is_offscreen(viewport) {
                        exited += 1;
                        false
                    } else {
                        true
                    }
                });
                self.score += exited;

                if hit {
                    self.phase = GamePhase::GameOver;
                    self.game_over_ticks = 0;
                    self.prompt_surfaced = false;
                    events.push(TickEvent::GameOver { score: self.score });
                }
            }
            GamePhase::GameOver => {
                // Entities are frozen; only the prompt timer runs
                self.game_over_ticks += 1;
                if !self.prompt_surfaced && self.game_over_ticks >= PROMPT_DELAY_TICKS {
                    self.prompt_surfaced = true;
                    events.push(TickEvent::SubmitPromptDue { score: self.score });
                }
            }
        }

        events
    }

    /// Set the player's movement direction
    pub fn steer(&mut self, direction: i8) {
        self.player.steer(direction);
    }

    /// Restart after game over. Returns false (and does nothing) while the
    /// game is still running.
    pub fn restart(&mut self) -> bool {
        if self.phase != GamePhase::GameOver {
            return false;
        }
        let seed = self.rng.gen();
        *self = GameState::new(self.viewport, seed);
        true
    }

    /// Apply a new viewport and recreate the player from it. Direction is
    /// deliberately not preserved.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
        self.player = Player::new(self.viewport);
    }
}

/// Handle to a running session's channels
pub struct SessionHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<SessionInput>,
    pub outbound_tx: broadcast::Sender<ServerMsg>,
    /// Consumed by the effects driver that services network requests
    pub effects_rx: mpsc::Receiver<SessionEffect>,
}

/// Registry of live sessions, for the health endpoint
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionInfo>,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub started_at: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn register(&self, id: Uuid) {
        self.sessions.insert(
            id,
            SessionInfo {
                started_at: unix_millis(),
            },
        );
    }

    pub fn unregister(&self, id: &Uuid) {
        if let Some((_, info)) = self.sessions.remove(id) {
            let duration_ms = unix_millis().saturating_sub(info.started_at);
            info!(session_id = %id, duration_ms, "Session unregistered");
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One player's authoritative game session
pub struct GameSession {
    id: Uuid,
    state: GameState,
    input_rx: mpsc::Receiver<SessionInput>,
    outbound_tx: broadcast::Sender<ServerMsg>,
    effects_tx: mpsc::Sender<SessionEffect>,
    frames: FrameBuilder,
}

impl GameSession {
    /// Create a session and the channel handle the connection layer wires up
    pub fn new(id: Uuid, viewport: Viewport, seed: u64) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (outbound_tx, _) = broadcast::channel(64);
        let (effects_tx, effects_rx) = mpsc::channel(16);

        let handle = SessionHandle {
            id,
            input_tx,
            outbound_tx: outbound_tx.clone(),
            effects_rx,
        };

        let frame_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let session = Self {
            id,
            state: GameState::new(viewport, seed),
            input_rx,
            outbound_tx,
            effects_tx,
            frames: FrameBuilder::new(frame_interval),
        };

        (session, handle)
    }

    /// Run the authoritative tick loop until the client disconnects
    pub async fn run(mut self) {
        info!(session_id = %self.id, "Game session started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            // Drain input queue; a closed channel means the client is gone
            if !self.process_inputs() {
                break;
            }

            for event in self.state.tick() {
                match event {
                    TickEvent::GameOver { score } => {
                        info!(session_id = %self.id, score, "Game over");
                        self.frames.force_next();
                        let _ = self.outbound_tx.send(ServerMsg::GameOver { score });
                    }
                    TickEvent::SubmitPromptDue { score } => {
                        let _ = self.outbound_tx.send(ServerMsg::SubmitPrompt { score });
                    }
                }
            }

            if self.frames.should_send() {
                let _ = self.outbound_tx.send(snapshot(&self.state));
            }
        }

        info!(session_id = %self.id, "Game session closed");
    }

    /// Process all pending inputs. Returns false once the input channel is
    /// closed.
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => self.apply(input),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, input: SessionInput) {
        match input.msg {
            ClientMsg::MoveLeft => self.state.steer(-1),
            ClientMsg::MoveRight => self.state.steer(1),
            ClientMsg::StopMove => self.state.steer(0),
            ClientMsg::Restart => {
                if self.state.restart() {
                    info!(session_id = %self.id, "Game restarted");
                    self.frames.force_next();
                }
            }
            ClientMsg::Resize { width, height } => {
                self.state.resize(width, height);
                self.frames.force_next();
            }
            ClientMsg::SubmitScore {
                email,
                player_name,
                listserv_consent,
            } => self.handle_submit(&email, &player_name, listserv_consent),
            ClientMsg::FetchLeaderboard { scope } => {
                if self
                    .effects_tx
                    .try_send(SessionEffect::FetchLeaderboard { scope })
                    .is_err()
                {
                    warn!(session_id = %self.id, "Dropped leaderboard fetch, effects queue full");
                }
            }
            ClientMsg::Ping { t } => {
                let _ = self.outbound_tx.send(ServerMsg::Pong { t });
            }
        }
    }

    /// Validate locally, then hand the record to the effects driver. The
    /// score is the session's own, never a client claim.
    fn handle_submit(&mut self, email: &str, player_name: &str, consent: bool) {
        if self.state.phase != GamePhase::GameOver {
            warn!(session_id = %self.id, "Score submission ignored outside game over");
            return;
        }

        if let Err(rejection) = validate_submission(email, consent) {
            let _ = self.outbound_tx.send(ServerMsg::SubmitRejected {
                reason: rejection.to_string(),
            });
            return;
        }

        let record = NewScore::new(email, player_name, self.state.score);
        if self
            .effects_tx
            .try_send(SessionEffect::SubmitScore(record))
            .is_err()
        {
            warn!(session_id = %self.id, "Dropped score submission, effects queue full");
            let _ = self.outbound_tx.send(ServerMsg::SubmitFailed {
                message: "There was an error submitting your score. Please try again.".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::LeaderboardScope;

    fn test_state() -> GameState {
        GameState::new(Viewport::new(800.0, 600.0), 42)
    }

    fn obstacle(x: f32, y: f32, size: f32, speed: f32) -> Obstacle {
        Obstacle { x, y, size, speed }
    }

    fn input(msg: ClientMsg) -> SessionInput {
        SessionInput {
            msg,
            received_at: unix_millis(),
        }
    }

    #[test]
    fn obstacles_spawn_on_the_interval() {
        let mut state = test_state();
        for _ in 0..SPAWN_INTERVAL_TICKS - 1 {
            state.tick();
        }
        assert!(state.obstacles.is_empty());

        state.tick();
        assert_eq!(state.obstacles.len(), 1);
    }

    #[test]
    fn score_increments_once_per_exited_obstacle() {
        let mut state = test_state();
        // Below the player's hitbox, one tick away from leaving the screen
        state.obstacles.push(obstacle(100.0, 624.0, 25.0, 5.0));

        let events = state.tick();
        assert!(events.is_empty());
        assert_eq!(state.score, 1);
        assert!(state.obstacles.is_empty());

        state.tick();
        assert_eq!(state.score, 1);
    }

    #[test]
    fn collision_transitions_to_game_over() {
        let mut state = test_state();
        let player_x = state.player.x;
        let player_y = state.player.y;
        state.obstacles.push(obstacle(player_x, player_y, 20.0, 3.0));

        let events = state.tick();
        assert_eq!(events, vec![TickEvent::GameOver { score: 0 }]);
        assert_eq!(state.phase, GamePhase::GameOver);

        // Entities are frozen after the transition
        let y = state.obstacles[0].y;
        state.tick();
        assert_eq!(state.obstacles[0].y, y);
        assert_eq!(state.frame, 1);
    }

    #[test]
    fn simultaneous_collisions_fire_one_transition() {
        let mut state = test_state();
        let player_x = state.player.x;
        let player_y = state.player.y;
        state.obstacles.push(obstacle(player_x, player_y, 20.0, 3.0));
        state.obstacles.push(obstacle(player_x, player_y - 5.0, 25.0, 3.0));

        let events = state.tick();
        assert_eq!(events, vec![TickEvent::GameOver { score: 0 }]);
    }

    #[test]
    fn exits_still_score_in_the_transition_tick() {
        let mut state = test_state();
        let player_x = state.player.x;
        let player_y = state.player.y;
        state.obstacles.push(obstacle(player_x, player_y, 20.0, 3.0));
        state.obstacles.push(obstacle(100.0, 624.0, 25.0, 5.0));

        let events = state.tick();
        assert_eq!(events, vec![TickEvent::GameOver { score: 1 }]);
        assert_eq!(state.score, 1);
        assert_eq!(state.obstacles.len(), 1);
    }

    #[test]
    fn prompt_surfaces_once_after_the_delay() {
        let mut state = test_state();
        let player_x = state.player.x;
        let player_y = state.player.y;
        state.obstacles.push(obstacle(player_x, player_y, 20.0, 3.0));
        state.tick();
        assert_eq!(state.phase, GamePhase::GameOver);

        let mut prompts = 0;
        for _ in 0..PROMPT_DELAY_TICKS * 3 {
            for event in state.tick() {
                if matches!(event, TickEvent::SubmitPromptDue { .. }) {
                    prompts += 1;
                }
            }
        }
        assert_eq!(prompts, 1);
    }

    #[test]
    fn restart_resets_the_run() {
        let mut state = test_state();
        state.score = 7;
        state.frame = 123;
        state.phase = GamePhase::GameOver;
        state.obstacles.push(obstacle(100.0, 300.0, 25.0, 5.0));

        assert!(state.restart());
        assert_eq!(state.score, 0);
        assert_eq!(state.frame, 0);
        assert!(state.obstacles.is_empty());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn restart_is_ignored_while_playing() {
        let mut state = test_state();
        state.score = 3;
        assert!(!state.restart());
        assert_eq!(state.score, 3);
    }

    #[test]
    fn resize_recreates_the_player() {
        let mut state = test_state();
        state.steer(1);
        state.resize(1000.0, 700.0);

        assert_eq!(state.viewport, Viewport::new(1000.0, 700.0));
        assert_eq!(state.player.x, 500.0);
        assert_eq!(state.player.direction, 0);
    }

    #[test]
    fn submission_uses_the_server_score() {
        let (mut session, mut handle) = GameSession::new(Uuid::new_v4(), Viewport::new(800.0, 600.0), 1);
        session.state.score = 42;
        session.state.phase = GamePhase::GameOver;

        session.apply(input(ClientMsg::SubmitScore {
            email: "a@b.com".to_string(),
            player_name: "Al".to_string(),
            listserv_consent: true,
        }));

        match handle.effects_rx.try_recv() {
            Ok(SessionEffect::SubmitScore(record)) => {
                assert_eq!(record.score, 42);
                assert_eq!(record.player_name.as_deref(), Some("Al"));
            }
            other => panic!("expected submit effect, got {other:?}"),
        }
    }

    #[test]
    fn invalid_submission_is_rejected_before_any_effect() {
        let (mut session, mut handle) = GameSession::new(Uuid::new_v4(), Viewport::new(800.0, 600.0), 1);
        session.state.phase = GamePhase::GameOver;
        let mut outbound = handle.outbound_tx.subscribe();

        session.apply(input(ClientMsg::SubmitScore {
            email: "not-an-email".to_string(),
            player_name: String::new(),
            listserv_consent: true,
        }));

        assert!(handle.effects_rx.try_recv().is_err());
        match outbound.try_recv() {
            Ok(ServerMsg::SubmitRejected { reason }) => {
                assert_eq!(reason, "Please enter a valid email address");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn submission_is_ignored_while_playing() {
        let (mut session, mut handle) = GameSession::new(Uuid::new_v4(), Viewport::new(800.0, 600.0), 1);

        session.apply(input(ClientMsg::SubmitScore {
            email: "a@b.com".to_string(),
            player_name: String::new(),
            listserv_consent: true,
        }));

        assert!(handle.effects_rx.try_recv().is_err());
    }

    #[test]
    fn fetch_request_becomes_an_effect() {
        let (mut session, mut handle) = GameSession::new(Uuid::new_v4(), Viewport::new(800.0, 600.0), 1);

        session.apply(input(ClientMsg::FetchLeaderboard {
            scope: LeaderboardScope::Daily,
        }));

        match handle.effects_rx.try_recv() {
            Ok(SessionEffect::FetchLeaderboard { scope }) => {
                assert_eq!(scope, LeaderboardScope::Daily);
            }
            other => panic!("expected fetch effect, got {other:?}"),
        }
    }
}
