//! Snapshot cadence and frame building.
//!
//! Snapshots are the `display` half of the rendering collaborator: they are
//! built from game state and never feed anything back into it.

use crate::ws::protocol::{ObstacleView, PlayerView, ServerMsg};

use super::session::GameState;

/// Decides which ticks get a snapshot. The simulation runs faster than the
/// wire needs; important transitions force the next frame out immediately.
pub struct FrameBuilder {
    /// Tick counter since last snapshot
    ticks_since_frame: u32,
    /// Snapshot interval in ticks
    frame_interval: u32,
}

impl FrameBuilder {
    pub fn new(frame_interval: u32) -> Self {
        Self {
            ticks_since_frame: 0,
            frame_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_frame += 1;
        if self.ticks_since_frame >= self.frame_interval {
            self.ticks_since_frame = 0;
            true
        } else {
            false
        }
    }

    /// Force a snapshot on the next check (used for phase transitions)
    pub fn force_next(&mut self) {
        self.ticks_since_frame = self.frame_interval;
    }
}

/// Build a snapshot message from the current game state
pub fn snapshot(state: &GameState) -> ServerMsg {
    ServerMsg::Snapshot {
        tick: state.frame,
        phase: state.phase,
        score: state.score,
        player: PlayerView {
            x: state.player.x,
            y: state.player.y,
            direction: state.player.direction,
            size: state.player.size,
        },
        obstacles: state
            .obstacles
            .iter()
            .map(|o| ObstacleView {
                x: o.x,
                y: o.y,
                size: o.size,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Viewport;
    use crate::game::session::GamePhase;

    #[test]
    fn frames_go_out_on_the_interval() {
        let mut frames = FrameBuilder::new(3);
        assert!(!frames.should_send());
        assert!(!frames.should_send());
        assert!(frames.should_send());
        assert!(!frames.should_send());
    }

    #[test]
    fn force_next_overrides_the_cadence() {
        let mut frames = FrameBuilder::new(3);
        frames.force_next();
        assert!(frames.should_send());
    }

    #[test]
    fn snapshot_mirrors_state() {
        let mut state = GameState::new(Viewport::new(800.0, 600.0), 5);
        state.score = 9;
        state.tick();

        match snapshot(&state) {
            ServerMsg::Snapshot {
                tick,
                phase,
                score,
                player,
                obstacles,
            } => {
                assert_eq!(tick, 1);
                assert_eq!(phase, GamePhase::Playing);
                assert_eq!(score, 9);
                assert_eq!(player.x, 400.0);
                assert!(obstacles.is_empty());
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }
}
