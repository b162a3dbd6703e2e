//! Cross-entity damage resolution, run by the orchestrator after every body
//! has finished integrating: enemy contact hurts the player, the live weapon
//! hitbox hurts enemies, and deaths turn into particles plus despawns.

use bevy::prelude::*;

use crate::enemy::Enemy;
use crate::level::LevelState;
use crate::movement::{rects_overlap, KinematicBody};
use crate::particles::{ParticleKind, SpawnParticles};
use crate::player::Player;
use crate::state::GameSet;
use crate::weapon::Weapon;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                tick_level_timers,
                damage_player_on_contact,
                apply_attack_damage,
                despawn_dead_enemies,
            )
                .chain()
                .in_set(CombatSystems)
                .in_set(GameSet::Effects),
        );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombatSystems;

/// Touching any enemy costs one heart and kicks off the screen shake. At zero
/// health the player bursts into particles, leaves the world, and the
/// orchestrator's death countdown starts pacing the respawn fade.
fn damage_player_on_contact(
    mut commands: Commands,
    mut level_state: ResMut<LevelState>,
    mut particle_events: EventWriter<SpawnParticles>,
    mut players: Query<(Entity, &mut Player, &KinematicBody)>,
    enemies: Query<&KinematicBody, (With<Enemy>, Without<Player>)>,
) {
    let Ok((player_entity, mut player, body)) = players.get_single_mut() else {
        return;
    };
    let player_rect = body.rect();

    for enemy_body in &enemies {
        if !rects_overlap(player_rect, enemy_body.rect()) {
            continue;
        }

        // The first contact this frame closes the vulnerability window; any
        // simultaneous overlaps are absorbed by it.
        if !player.take_damage(1) {
            break;
        }
        level_state.start_screen_shake();

        if player.health <= 0 {
            particle_events.send(SpawnParticles {
                kind: ParticleKind::PlayerDeath,
                pos: Vec2::new(player_rect.min.x, player_rect.max.y),
            });
            commands.entity(player_entity).despawn_recursive();
            level_state.timers.player_death.activate();
            break;
        }
    }
}

/// The live hitbox damages every enemy it overlaps. Per-enemy invulnerability
/// keeps one swing from draining a target over multiple frames.
fn apply_attack_damage(
    level_state: Res<LevelState>,
    weapons: Query<&Weapon>,
    players: Query<&Player>,
    mut enemies: Query<(&mut Enemy, &KinematicBody)>,
) {
    let Some(attack_entity) = level_state.current_attack else {
        return;
    };
    let Ok(weapon) = weapons.get(attack_entity) else {
        return;
    };
    let Ok(player) = players.get_single() else {
        return;
    };

    for (mut enemy, body) in &mut enemies {
        if rects_overlap(weapon.rect, body.rect()) {
            enemy.take_damage(player.damage);
        }
    }
}

fn despawn_dead_enemies(
    mut commands: Commands,
    mut particle_events: EventWriter<SpawnParticles>,
    enemies: Query<(Entity, &Enemy, &KinematicBody)>,
) {
    for (entity, enemy, body) in &enemies {
        if enemy.health > 0 {
            continue;
        }

        let rect = body.rect();
        particle_events.send(SpawnParticles {
            kind: ParticleKind::MonsterDeath(enemy.monster_name.clone()),
            pos: Vec2::new(rect.min.x, rect.max.y),
        });
        commands.entity(entity).despawn_recursive();
    }
}

fn tick_level_timers(time: Res<Time>, mut level_state: ResMut<LevelState>) {
    level_state.tick_timers(time.delta_seconds());
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec2;

    use crate::config::GameConfig;
    use crate::level::LevelState;
    use crate::movement::KinematicBody;
    use crate::player::Player;

    /// Full death sequence: three unguarded hits empty the health bar, and
    /// the orchestrator's death countdown then raises the respawn flag.
    #[test]
    fn three_hits_kill_and_schedule_the_respawn() {
        let config = GameConfig::default();
        let tuning = &config.player;
        let mut player = Player::new(tuning.max_health, tuning.damage);
        let mut body = KinematicBody::new(
            Vec2::new(128.0, 576.0),
            tuning.size,
            tuning.speed,
            tuning.gravity,
        );
        let mut state = LevelState::default();

        for expected_health in [2, 1, 0] {
            assert!(player.take_damage(1));
            state.start_screen_shake();
            assert_eq!(player.health, expected_health);

            if player.health > 0 {
                // Let the invulnerability window run out before the next hit.
                player.tick_timers(&mut body, tuning, 0.6);
                assert!(player.vulnerable);
            }
        }

        assert_eq!(player.health, 0);
        state.timers.player_death.activate();

        state.tick_timers(1.0);
        assert!(!state.respawn);
        state.tick_timers(0.6);
        assert!(state.respawn);
    }

    #[test]
    fn guarded_hit_does_not_drain_health() {
        let config = GameConfig::default();
        let mut player = Player::new(config.player.max_health, config.player.damage);

        assert!(player.take_damage(1));
        // Second contact in the same window bounces off.
        assert!(!player.take_damage(1));
        assert_eq!(player.health, config.player.max_health - 1);
    }
}
