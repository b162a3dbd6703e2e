//! High-level plugin composition.
//!
//! `GreenwoodPlatformerPlugin` glues together every domain plugin (level,
//! player, enemies, combat, camera, ...) and pins down frame ordering: the
//! Input → Movement → Effects chain guarantees all bodies finish integrating
//! before cross-entity collision queries run, and within Effects the weapon,
//! combat, interaction, fade, and particle stages run in a fixed order.

use bevy::prelude::*;

use crate::animation::AnimationPlugin;
use crate::camera::{CameraPlugin, FollowCamera};
use crate::collision::{ColliderSet, CollisionPlugin};
use crate::combat::{CombatPlugin, CombatSystems};
use crate::config::GameConfig;
use crate::enemy::EnemyPlugin;
use crate::level::{Checkpoint, ExitTile, InteractionSystems, LevelPlugin};
use crate::movement::{KinematicBody, MovementPlugin};
use crate::particles::{ParticleSystems, ParticlesPlugin};
use crate::player::PlayerPlugin;
use crate::state::{toggle_pause, GameSet, GameState};
use crate::transition::{FadeSystems, TransitionPlugin};
use crate::ui::UiPlugin;
use crate::weapon::{Weapon, WeaponPlugin, WeaponSystems};

pub struct GreenwoodPlatformerPlugin;

impl Plugin for GreenwoodPlatformerPlugin {
    fn build(&self, app: &mut App) {
        let config = GameConfig::default();

        app.init_state::<GameState>()
            .insert_resource(ClearColor(config.bg_color))
            .insert_resource(config)
            .add_plugins((
                LevelPlugin,      // LDtk plumbing, map population, exits/checkpoints.
                CollisionPlugin,  // Static collider set rebuilds.
                MovementPlugin,   // Kinematic body transform syncing.
                PlayerPlugin,     // Input and the avatar's state machine.
                EnemyPlugin,      // Patrol movement.
                WeaponPlugin,     // Attack hitbox lifecycle.
                CombatPlugin,     // Cross-entity damage resolution.
                ParticlesPlugin,  // One-shot effects.
                AnimationPlugin,  // Frame folders + sprite playback.
                CameraPlugin,     // Dead-zone follow + screen shake.
                TransitionPlugin, // Respawn fade.
                UiPlugin,         // Hearts HUD + pause overlay.
            ))
            .configure_sets(
                Update,
                (GameSet::Input, GameSet::Movement, GameSet::Effects)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            // The orchestrator's frame order within Effects: hitboxes
            // materialise, damage resolves, interactions trigger, the fade
            // advances, then requested particles spawn.
            .configure_sets(
                Update,
                (
                    WeaponSystems,
                    CombatSystems,
                    InteractionSystems,
                    FadeSystems,
                    ParticleSystems,
                )
                    .chain()
                    .in_set(GameSet::Effects),
            )
            .add_systems(Startup, setup_camera)
            .add_systems(Update, toggle_pause)
            .add_systems(
                Update,
                draw_debug_overlay
                    .after(GameSet::Effects)
                    .run_if(debug_enabled),
            );
    }
}

/// Spawns the primary 2D camera tagged for the follow system.
fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("MainCamera"),
        Camera2dBundle::default(),
        FollowCamera,
    ));
}

fn debug_enabled(config: Res<GameConfig>) -> bool {
    config.debug
}

/// Outlines every rectangle the game reasons about: bodies, the live weapon
/// hitbox, static colliders, and interaction zones.
fn draw_debug_overlay(
    mut gizmos: Gizmos,
    colliders: Res<ColliderSet>,
    bodies: Query<&KinematicBody>,
    weapons: Query<&Weapon>,
    checkpoints: Query<&Checkpoint>,
    exits: Query<&ExitTile>,
) {
    for rect in colliders.solids.iter().chain(colliders.blockers.iter()) {
        gizmos.rect_2d(rect.center(), 0.0, rect.size(), Color::srgb(0.4, 0.4, 0.4));
    }
    for body in &bodies {
        let rect = body.rect();
        gizmos.rect_2d(rect.center(), 0.0, rect.size(), Color::WHITE);
    }
    for weapon in &weapons {
        gizmos.rect_2d(
            weapon.rect.center(),
            0.0,
            weapon.rect.size(),
            Color::srgb(1.0, 0.3, 0.3),
        );
    }
    for checkpoint in &checkpoints {
        gizmos.rect_2d(
            checkpoint.rect.center(),
            0.0,
            checkpoint.rect.size(),
            Color::srgb(0.3, 1.0, 0.3),
        );
    }
    for exit in &exits {
        gizmos.rect_2d(
            exit.rect.center(),
            0.0,
            exit.rect.size(),
            Color::srgb(1.0, 1.0, 0.3),
        );
    }
}
