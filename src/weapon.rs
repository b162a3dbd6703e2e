//! Transient melee hitboxes.
//!
//! An attack spawns one directional weapon sprite next to the player; it
//! exists only for damage queries and disappears when the swing timer runs
//! out. Spawning and destruction go through events so the player never
//! touches the orchestrator's entity collections directly.

use bevy::prelude::*;

use crate::animation::SpriteAnimation;
use crate::config::GameConfig;
use crate::level::{LevelScoped, LevelState};
use crate::movement::KinematicBody;
use crate::player::Player;
use crate::state::GameSet;

pub struct WeaponPlugin;

impl Plugin for WeaponPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SpawnAttack>()
            .add_event::<DespawnAttack>()
            .add_systems(
                Update,
                (spawn_attack, despawn_attack)
                    .chain()
                    .in_set(WeaponSystems)
                    .in_set(GameSet::Effects),
            );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeaponSystems;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackDirection {
    Left,
    Right,
    Top,
    Bottom,
}

impl AttackDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }

    pub fn animation_key(self) -> String {
        format!("{}_sword_effect", self.as_str())
    }
}

/// Intent: the player started a swing in the given direction.
#[derive(Event, Debug, Clone)]
pub struct SpawnAttack {
    pub direction: AttackDirection,
}

/// Intent: the swing timer expired; remove the live hitbox.
#[derive(Event, Debug, Clone)]
pub struct DespawnAttack;

/// A live hitbox. The rect is fixed at spawn; the swing is too short for
/// drift to matter.
#[derive(Component)]
pub struct Weapon {
    pub rect: Rect,
}

/// Places the hitbox flush against the attacker's bounding box: side swings
/// align with the top edge, vertical swings cover the full width.
pub fn weapon_rect(attacker: Rect, direction: AttackDirection, size: Vec2) -> Rect {
    let min = match direction {
        AttackDirection::Right => Vec2::new(attacker.max.x, attacker.max.y - size.y),
        AttackDirection::Left => Vec2::new(attacker.min.x - size.x, attacker.max.y - size.y),
        AttackDirection::Top => Vec2::new(attacker.min.x, attacker.max.y),
        AttackDirection::Bottom => Vec2::new(attacker.min.x, attacker.min.y - size.y),
    };
    Rect::from_corners(min, min + size)
}

fn spawn_attack(
    mut commands: Commands,
    mut events: EventReader<SpawnAttack>,
    config: Res<GameConfig>,
    mut level_state: ResMut<LevelState>,
    players: Query<&KinematicBody, With<Player>>,
) {
    for event in events.read() {
        // One live hitbox at a time.
        if level_state.current_attack.is_some() {
            continue;
        }
        let Ok(body) = players.get_single() else {
            continue;
        };

        let rect = weapon_rect(body.rect(), event.direction, config.weapon_size);
        let entity = commands
            .spawn((
                Name::new("Weapon"),
                Weapon { rect },
                LevelScoped,
                SpriteBundle {
                    sprite: Sprite {
                        custom_size: Some(rect.size()),
                        ..default()
                    },
                    transform: Transform::from_translation(
                        rect.center().extend(config.layers.main),
                    ),
                    ..default()
                },
                SpriteAnimation::looping(
                    event.direction.animation_key(),
                    config.player.animation_fps * 3.0,
                ),
            ))
            .id();

        level_state.current_attack = Some(entity);
    }
}

fn despawn_attack(
    mut commands: Commands,
    mut events: EventReader<DespawnAttack>,
    mut level_state: ResMut<LevelState>,
) {
    for _ in events.read() {
        if let Some(entity) = level_state.current_attack.take() {
            if let Some(entity_commands) = commands.get_entity(entity) {
                entity_commands.despawn_recursive();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attacker() -> Rect {
        Rect::from_corners(Vec2::new(128.0, 576.0), Vec2::new(192.0, 640.0))
    }

    #[test]
    fn side_swings_hug_the_attacker() {
        let size = Vec2::new(64.0, 64.0);

        let right = weapon_rect(attacker(), AttackDirection::Right, size);
        assert_eq!(right.min, Vec2::new(192.0, 576.0));

        let left = weapon_rect(attacker(), AttackDirection::Left, size);
        assert_eq!(left.max, Vec2::new(128.0, 640.0));
    }

    #[test]
    fn vertical_swings_cover_above_and_below() {
        let size = Vec2::new(64.0, 64.0);

        let top = weapon_rect(attacker(), AttackDirection::Top, size);
        assert_eq!(top.min, Vec2::new(128.0, 640.0));

        let bottom = weapon_rect(attacker(), AttackDirection::Bottom, size);
        assert_eq!(bottom.max, Vec2::new(192.0, 576.0));
    }

    #[test]
    fn direction_keys_match_the_frame_folders() {
        assert_eq!(
            AttackDirection::Top.animation_key(),
            "top_sword_effect"
        );
        assert_eq!(
            AttackDirection::Left.animation_key(),
            "left_sword_effect"
        );
    }
}
