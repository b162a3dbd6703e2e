//! Patrolling enemies: constant-speed walkers that turn around at invisible
//! blocker rectangles and briefly stagger when hit.

use bevy::prelude::*;
use rand::{thread_rng, Rng};

use crate::animation::{HitFlicker, SpriteAnimation};
use crate::collision::ColliderSet;
use crate::config::GameConfig;
use crate::level::LevelScoped;
use crate::movement::{rects_overlap, KinematicBody, MovementSystems};
use crate::state::GameSet;
use crate::timer::Countdown;

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            patrol_enemies
                .in_set(GameSet::Movement)
                .in_set(MovementSystems),
        );
    }
}

#[derive(Component)]
pub struct Enemy {
    pub monster_name: String,
    pub health: i32,
    pub vulnerable: bool,
    pub invulnerability: Countdown,
}

impl Enemy {
    pub fn new(monster_name: impl Into<String>, health: i32) -> Self {
        Self {
            monster_name: monster_name.into(),
            health,
            vulnerable: true,
            invulnerability: Countdown::from_millis(350),
        }
    }

    /// A hit only lands while vulnerable; landing one opens a short
    /// invulnerability window so a single swing doesn't multi-hit.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if !self.vulnerable {
            return false;
        }

        self.health -= amount;
        self.vulnerable = false;
        self.invulnerability.activate();
        true
    }
}

/// Patrol speed is rolled once per instance, in the same reference-frame
/// units the player's movement constants use.
pub fn roll_patrol_speed(reference_fps: f32) -> f32 {
    thread_rng().gen_range(3..=5) as f32 * reference_fps
}

/// One step of patrol movement: walk along the facing, reverse on touching
/// any blocker rectangle.
pub fn patrol_step(body: &mut KinematicBody, blockers: &[Rect], dt: f32) {
    body.pos.x += body.direction.x * body.speed * dt;
    if blockers
        .iter()
        .any(|blocker| rects_overlap(body.rect(), *blocker))
    {
        body.direction.x = -body.direction.x;
    }
}

fn patrol_enemies(
    time: Res<Time>,
    colliders: Res<ColliderSet>,
    mut query: Query<(
        &mut Enemy,
        &mut KinematicBody,
        &mut SpriteAnimation,
        &mut HitFlicker,
    )>,
) {
    let dt = time.delta_seconds();

    for (mut enemy, mut body, mut animation, mut flicker) in &mut query {
        if enemy.invulnerability.tick(dt) {
            enemy.vulnerable = true;
        }

        // Hit-stun: a freshly hit enemy holds still until the window closes.
        if enemy.vulnerable {
            patrol_step(&mut body, &colliders.blockers, dt);
        }

        let facing = if body.direction.x >= 0.0 { "right" } else { "left" };
        let key = format!("{}_{facing}_run", enemy.monster_name);
        if animation.key != key {
            animation.key = key;
        }

        flicker.on = !enemy.vulnerable;
    }
}

/// Spawns a monster at `pos` (bottom-left corner, world space), walking right.
pub fn spawn_enemy(commands: &mut Commands, config: &GameConfig, monster_name: &str, pos: Vec2) {
    let mut body = KinematicBody::new(
        pos,
        config.enemy.size,
        roll_patrol_speed(config.reference_fps),
        0.0,
    );
    body.direction.x = 1.0;

    commands.spawn((
        Name::new(format!("Enemy:{monster_name}")),
        Enemy::new(monster_name, config.enemy.health),
        LevelScoped,
        body,
        SpriteBundle {
            sprite: Sprite {
                custom_size: Some(config.enemy.size),
                ..default()
            },
            transform: Transform::from_translation(
                (pos + config.enemy.size * 0.5).extend(config.layers.main),
            ),
            ..default()
        },
        SpriteAnimation::looping(
            format!("{monster_name}_right_run"),
            config.enemy.animation_fps,
        ),
        HitFlicker::default(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REFERENCE_FPS;

    #[test]
    fn patrol_reverses_on_blockers() {
        let mut body = KinematicBody::new(
            Vec2::new(100.0, 0.0),
            Vec2::new(64.0, 64.0),
            4.0 * REFERENCE_FPS,
            0.0,
        );
        body.direction.x = 1.0;

        let blockers = [Rect::from_corners(
            Vec2::new(200.0, 0.0),
            Vec2::new(264.0, 64.0),
        )];
        let dt = 1.0 / 60.0;

        for _ in 0..20 {
            patrol_step(&mut body, &blockers, dt);
        }

        // The walker must have met the blocker and turned back west.
        assert_eq!(body.direction.x, -1.0);
        assert!(body.pos.x < 200.0);
    }

    #[test]
    fn patrol_speed_stays_in_band() {
        for _ in 0..64 {
            let speed = roll_patrol_speed(REFERENCE_FPS);
            assert!((3.0 * REFERENCE_FPS..=5.0 * REFERENCE_FPS).contains(&speed));
        }
    }

    #[test]
    fn damage_respects_the_invulnerability_window() {
        let mut enemy = Enemy::new("mushroom", 50);

        assert!(enemy.take_damage(25));
        assert_eq!(enemy.health, 25);
        assert!(!enemy.vulnerable);

        // Bounces off while the window is open.
        assert!(!enemy.take_damage(25));
        assert_eq!(enemy.health, 25);

        // Window closes, the next swing lands.
        enemy.invulnerability.tick(0.4);
        enemy.vulnerable = true;
        assert!(enemy.take_damage(25));
        assert_eq!(enemy.health, 0);
    }
}
