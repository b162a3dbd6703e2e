//! One-shot particle effects (jump dust, death bursts).
//!
//! Entities never spawn particles themselves; they enqueue a
//! `SpawnParticles` intent and the orchestrator materialises the sprites at a
//! fixed point in the frame. The effect entity despawns itself when its
//! animation finishes.

use bevy::prelude::*;

use crate::animation::SpriteAnimation;
use crate::config::GameConfig;
use crate::level::LevelScoped;
use crate::state::GameSet;

pub struct ParticlesPlugin;

impl Plugin for ParticlesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SpawnParticles>().add_systems(
            Update,
            spawn_particles.in_set(ParticleSystems).in_set(GameSet::Effects),
        );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticleSystems;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleKind {
    BeforeJump,
    AfterJump,
    PlayerDeath,
    MonsterDeath(String),
}

impl ParticleKind {
    pub fn animation_key(&self) -> String {
        match self {
            Self::BeforeJump => "before_jump".to_owned(),
            Self::AfterJump => "after_jump".to_owned(),
            Self::PlayerDeath => "player_death".to_owned(),
            Self::MonsterDeath(monster) => format!("{monster}_death"),
        }
    }
}

/// Intent: play a particle effect with its top-left corner at `pos`.
#[derive(Event, Debug, Clone)]
pub struct SpawnParticles {
    pub kind: ParticleKind,
    pub pos: Vec2,
}

#[derive(Component)]
pub struct ParticleEffect;

fn spawn_particles(
    mut commands: Commands,
    mut events: EventReader<SpawnParticles>,
    config: Res<GameConfig>,
) {
    for event in events.read() {
        let size = Vec2::splat(config.tile_size);
        let center = event.pos + Vec2::new(size.x, -size.y) * 0.5;

        commands.spawn((
            Name::new("Particles"),
            ParticleEffect,
            LevelScoped,
            SpriteBundle {
                sprite: Sprite {
                    custom_size: Some(size),
                    ..default()
                },
                transform: Transform::from_translation(center.extend(config.layers.main)),
                ..default()
            },
            SpriteAnimation::once(
                event.kind.animation_key(),
                0.15 * config.reference_fps,
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_animation_keys() {
        assert_eq!(ParticleKind::BeforeJump.animation_key(), "before_jump");
        assert_eq!(ParticleKind::AfterJump.animation_key(), "after_jump");
        assert_eq!(ParticleKind::PlayerDeath.animation_key(), "player_death");
        assert_eq!(
            ParticleKind::MonsterDeath("mushroom".to_owned()).animation_key(),
            "mushroom_death"
        );
    }
}
