//! Player and obstacle movement and collision rules

use rand::Rng;

/// Player horizontal speed per tick
pub const PLAYER_SPEED: f32 = 8.0;
/// Vertical offset of the player above the viewport bottom
pub const PLAYER_BOTTOM_OFFSET: f32 = 100.0;

/// Player hitbox half-width
const PLAYER_HALF_WIDTH: f32 = 15.0;
/// Player hitbox extent above the anchor point
const PLAYER_BOX_ABOVE: f32 = 70.0;
/// Player hitbox extent below the anchor point
const PLAYER_BOX_BELOW: f32 = 30.0;

/// Horizontal margin kept clear of the viewport edges when spawning
const SPAWN_MARGIN: f32 = 40.0;
/// Obstacles spawn just above the visible area
const SPAWN_Y: f32 = -20.0;
/// Horizontal hitbox padding around an obstacle
const OBSTACLE_BOX_PAD: f32 = 10.0;
/// Obstacle hitbox half-height
const OBSTACLE_HALF_HEIGHT: f32 = 10.0;

/// Smallest viewport side we accept from a client; keeps the spawn range
/// and the player clamp range non-empty
const MIN_VIEWPORT_SIDE: f32 = 160.0;

/// Viewport dimensions as reported by the rendering client
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(MIN_VIEWPORT_SIDE),
            height: height.max(MIN_VIEWPORT_SIDE),
        }
    }
}

/// The player-controlled sprite. Vertical position is fixed; only the
/// horizontal axis responds to input.
#[derive(Debug, Clone)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub direction: i8,
    pub size: f32,
}

impl Player {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            x: viewport.width / 2.0,
            y: viewport.height - PLAYER_BOTTOM_OFFSET,
            speed: PLAYER_SPEED,
            direction: 0,
            size: viewport.width.min(viewport.height) * 0.1,
        }
    }

    /// Set the movement direction; the protocol restricts input to
    /// {-1, 0, 1}
    pub fn steer(&mut self, direction: i8) {
        self.direction = direction;
    }

    /// Advance one tick and clamp to the viewport bounds
    pub fn advance(&mut self, viewport: Viewport) {
        self.x += self.direction as f32 * self.speed;
        let min = self.size;
        let max = (viewport.width - self.size).max(min);
        self.x = self.x.clamp(min, max);
    }
}

/// A falling obstacle
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed: f32,
}

impl Obstacle {
    /// Spawn at a random horizontal position just above the viewport,
    /// with randomized size and fall speed
    pub fn spawn(rng: &mut impl Rng, viewport: Viewport) -> Self {
        Self {
            x: rng.gen_range(SPAWN_MARGIN..viewport.width - SPAWN_MARGIN),
            y: SPAWN_Y,
            size: rng.gen_range(20.0..30.0),
            speed: rng.gen_range(3.0..7.0),
        }
    }

    /// Fall one tick
    pub fn advance(&mut self) {
        self.y += self.speed;
    }

    /// True once the obstacle has passed below the viewport bottom
    pub fn is_offscreen(&self, viewport: Viewport) -> bool {
        self.y > viewport.height + self.size
    }

    /// Axis-aligned bounding-box overlap test against the player
    pub fn hits(&self, player: &Player) -> bool {
        let player_left = player.x - PLAYER_HALF_WIDTH;
        let player_right = player.x + PLAYER_HALF_WIDTH;
        let player_top = player.y - PLAYER_BOX_ABOVE;
        let player_bottom = player.y + PLAYER_BOX_BELOW;

        let left = self.x - self.size / 2.0 - OBSTACLE_BOX_PAD;
        let right = self.x + self.size / 2.0 + OBSTACLE_BOX_PAD;
        let top = self.y - OBSTACLE_HALF_HEIGHT;
        let bottom = self.y + OBSTACLE_HALF_HEIGHT;

        !(right < player_left || left > player_right || bottom < player_top || top > player_bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn obstacle_at(x: f32, y: f32, size: f32) -> Obstacle {
        Obstacle {
            x,
            y,
            size,
            speed: 5.0,
        }
    }

    fn player_at(x: f32, y: f32) -> Player {
        let mut player = Player::new(viewport());
        player.x = x;
        player.y = y;
        player
    }

    #[test]
    fn overlapping_boxes_collide() {
        // Player box x in [385, 415], y in [430, 530];
        // obstacle box x in [375, 425], y in [490, 510]
        let player = player_at(400.0, 500.0);
        assert!(obstacle_at(400.0, 500.0, 20.0).hits(&player));
    }

    #[test]
    fn distant_obstacle_does_not_collide() {
        let player = player_at(400.0, 500.0);
        assert!(!obstacle_at(400.0, 0.0, 20.0).hits(&player));
    }

    #[test]
    fn horizontal_separation_prevents_collision() {
        let player = player_at(400.0, 500.0);
        // Obstacle half-extent is size/2 + 10 = 20; player's left edge is 385
        assert!(!obstacle_at(364.0, 500.0, 20.0).hits(&player));
        // Touching edges still count as overlap
        assert!(obstacle_at(365.0, 500.0, 20.0).hits(&player));
    }

    #[test]
    fn offscreen_requires_passing_below_plus_size() {
        let vp = viewport();
        let mut obstacle = obstacle_at(100.0, 600.0, 25.0);
        assert!(!obstacle.is_offscreen(vp));
        obstacle.y = 625.0;
        assert!(!obstacle.is_offscreen(vp));
        obstacle.y = 625.5;
        assert!(obstacle.is_offscreen(vp));
    }

    #[test]
    fn player_is_clamped_to_viewport() {
        let vp = viewport();
        let mut player = Player::new(vp);
        player.steer(-1);
        for _ in 0..200 {
            player.advance(vp);
        }
        assert_eq!(player.x, player.size);

        player.steer(1);
        for _ in 0..400 {
            player.advance(vp);
        }
        assert_eq!(player.x, vp.width - player.size);
    }

    #[test]
    fn advance_with_zero_direction_is_idempotent() {
        let vp = viewport();
        let mut player = Player::new(vp);
        let x = player.x;
        player.advance(vp);
        player.advance(vp);
        assert_eq!(player.x, x);
    }

    #[test]
    fn spawned_obstacles_stay_in_range() {
        let vp = viewport();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let obstacle = Obstacle::spawn(&mut rng, vp);
            assert!(obstacle.x >= 40.0 && obstacle.x < vp.width - 40.0);
            assert!(obstacle.size >= 20.0 && obstacle.size < 30.0);
            assert!(obstacle.speed >= 3.0 && obstacle.speed < 7.0);
            assert_eq!(obstacle.y, -20.0);
        }
    }

    proptest! {
        /// No input sequence can push the player outside the viewport
        #[test]
        fn player_never_leaves_bounds(steps in proptest::collection::vec(-1i8..=1, 0..300)) {
            let vp = viewport();
            let mut player = Player::new(vp);
            for step in steps {
                player.steer(step);
                player.advance(vp);
                prop_assert!(player.x >= player.size);
                prop_assert!(player.x <= vp.width - player.size);
            }
        }
    }
}
