use bevy::prelude::*;

use crate::state::{GameSet, GameState};

pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            sync_body_transforms
                .in_set(GameSet::Movement)
                .after(MovementSystems)
                .run_if(in_state(GameState::Playing)),
        );
    }
}

/// Set containing every system that integrates a `KinematicBody`. Transform
/// syncing runs after all of them.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MovementSystems;

/// Shared physics state for anything that moves under its own power.
///
/// `pos` is the authoritative sub-pixel position of the body's bottom-left
/// corner in world space (y up); `rect()` derives the integer-aligned bounding
/// box used for collision and drawing by rounding it. `direction.x` holds the
/// intent axis (-1/0/1), `direction.y` the vertical velocity in
/// reference-frame units.
#[derive(Component, Debug, Clone)]
pub struct KinematicBody {
    pub pos: Vec2,
    pub size: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub gravity: f32,
    pub on_floor: bool,
}

impl KinematicBody {
    pub fn new(pos: Vec2, size: Vec2, speed: f32, gravity: f32) -> Self {
        Self {
            pos,
            size,
            direction: Vec2::ZERO,
            speed,
            gravity,
            on_floor: false,
        }
    }

    pub fn rect(&self) -> Rect {
        let min = self.pos.round();
        Rect::from_corners(min, min + self.size)
    }

    /// One frame of integration: horizontal motion and resolution first, then
    /// gravity and vertical resolution. The order is load-bearing; swapping it
    /// lets diagonal motion catch on tile corners.
    ///
    /// Vertical position advances by `direction.y * dt * reference_fps` while
    /// gravity accumulates plain `dt`. The extra frame-rate factor is a tuning
    /// constant the jump arcs were built around; do not "fix" it.
    pub fn move_and_collide(&mut self, solids: &[Rect], dt: f32, reference_fps: f32) -> MoveResult {
        self.pos.x += self.direction.x * self.speed * dt;
        self.horizontal_collisions(solids);

        self.direction.y -= self.gravity * dt;
        self.pos.y += self.direction.y * dt * reference_fps;
        let landed = self.vertical_collisions(solids);

        MoveResult { landed }
    }

    fn horizontal_collisions(&mut self, solids: &[Rect]) {
        for collider in solids {
            if !rects_overlap(self.rect(), *collider) {
                continue;
            }
            if self.direction.x < 0.0 {
                self.pos.x = collider.max.x;
            }
            if self.direction.x > 0.0 {
                self.pos.x = collider.min.x - self.size.x;
            }
        }
    }

    fn vertical_collisions(&mut self, solids: &[Rect]) -> bool {
        let mut landed = false;

        for collider in solids {
            if !rects_overlap(self.rect(), *collider) {
                continue;
            }
            if self.direction.y < 0.0 {
                // Falling: settle on top of the collider.
                self.pos.y = collider.max.y;
                self.direction.y = 0.0;
                self.on_floor = true;
                landed = true;
            } else if self.direction.y > 0.0 {
                // Rising: bump the head against its underside.
                self.pos.y = collider.min.y - self.size.y;
                self.direction.y = 0.0;
            }
        }

        // Walking off a ledge: still flagged as grounded but gravity has
        // taken hold again.
        if self.on_floor && self.direction.y != 0.0 {
            self.on_floor = false;
        }

        landed
    }
}

/// What one call to `move_and_collide` observed. `landed` is true whenever a
/// downward collision settled the body this frame; callers decide whether that
/// counts as a fresh landing (dust particles, double-jump reset).
pub struct MoveResult {
    pub landed: bool,
}

pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !a.intersect(b).is_empty()
}

/// Copies each body's derived rect center into its sprite transform. Only x/y
/// are written; z stays whatever layer the entity was spawned on.
pub fn sync_body_transforms(mut query: Query<(&KinematicBody, &mut Transform)>) {
    for (body, mut transform) in &mut query {
        let center = body.rect().center();
        transform.translation.x = center.x;
        transform.translation.y = center.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REFERENCE_FPS;

    const DT: f32 = 1.0 / 60.0;

    fn floor_tile() -> Rect {
        // Tile directly under a body standing at y = 576.
        Rect::from_corners(Vec2::new(0.0, 512.0), Vec2::new(640.0, 576.0))
    }

    fn standing_body() -> KinematicBody {
        let mut body = KinematicBody::new(
            Vec2::new(128.0, 576.0),
            Vec2::new(64.0, 64.0),
            8.0 * REFERENCE_FPS,
            0.8 * REFERENCE_FPS,
        );
        body.on_floor = true;
        body
    }

    #[test]
    fn resting_body_stays_on_floor() {
        let solids = [floor_tile()];

        for dt in [1.0 / 30.0, 1.0 / 50.0, 1.0 / 60.0] {
            let mut body = standing_body();
            let result = body.move_and_collide(&solids, dt, REFERENCE_FPS);

            assert!(body.on_floor, "lost floor contact at dt={dt}");
            assert!(result.landed);
            assert_eq!(body.pos.y, 576.0);
            assert_eq!(body.direction.y, 0.0);
        }
    }

    #[test]
    fn horizontal_resolution_never_leaves_overlap() {
        let wall = Rect::from_corners(Vec2::new(320.0, 512.0), Vec2::new(384.0, 768.0));
        let solids = [floor_tile(), wall];

        let mut body = standing_body();
        body.direction.x = 1.0;

        for _ in 0..120 {
            body.move_and_collide(&solids, DT, REFERENCE_FPS);
            assert!(!rects_overlap(body.rect(), wall));
        }

        // Pinned flush against the wall's left face.
        assert_eq!(body.pos.x, wall.min.x - body.size.x);

        body.direction.x = -1.0;
        for _ in 0..120 {
            body.move_and_collide(&solids, DT, REFERENCE_FPS);
            assert!(!rects_overlap(body.rect(), wall));
        }
    }

    #[test]
    fn jump_impulse_clears_the_floor() {
        let solids = [floor_tile()];
        let mut body = standing_body();

        body.direction.y = 20.0;
        assert_eq!(body.direction.y, 20.0);

        body.move_and_collide(&solids, DT, REFERENCE_FPS);
        assert!(!body.on_floor);
        assert!(body.pos.y > 576.0);
    }

    #[test]
    fn rising_body_bumps_its_head() {
        let ceiling = Rect::from_corners(Vec2::new(0.0, 704.0), Vec2::new(640.0, 768.0));
        let solids = [floor_tile(), ceiling];

        let mut body = standing_body();
        body.direction.y = 20.0;

        for _ in 0..10 {
            body.move_and_collide(&solids, DT, REFERENCE_FPS);
            assert!(!rects_overlap(body.rect(), ceiling));
        }

        // The impulse is large enough to reach the ceiling well within ten
        // frames, so the body must have been clamped under it at some point.
        assert!(body.pos.y <= ceiling.min.y - body.size.y);
    }

    #[test]
    fn falling_body_lands_and_reports_it() {
        let solids = [floor_tile()];
        let mut body = KinematicBody::new(
            Vec2::new(128.0, 700.0),
            Vec2::new(64.0, 64.0),
            8.0 * REFERENCE_FPS,
            0.8 * REFERENCE_FPS,
        );

        let mut landed = false;
        for _ in 0..120 {
            landed |= body.move_and_collide(&solids, DT, REFERENCE_FPS).landed;
        }

        assert!(landed);
        assert!(body.on_floor);
        assert_eq!(body.pos.y, 576.0);
    }
}
