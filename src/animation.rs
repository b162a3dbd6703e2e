//! Folder-based animation library and sprite playback.
//!
//! Every animation is a directory of sequentially named image frames. During
//! the Loading state each directory is queued as a Bevy folder load; once all
//! folders resolve, the handles are sorted by path and cached in the
//! `AnimationLibrary` resource, which keeps the underlying image assets alive
//! for the rest of the run.

use std::collections::HashMap;

use bevy::asset::{LoadedFolder, RecursiveDependencyLoadState};
use bevy::prelude::*;

use crate::config::GameConfig;
use crate::state::{GameSet, GameState};

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AnimationLibrary>()
            .add_systems(OnEnter(GameState::Loading), queue_animation_folders)
            .add_systems(
                Update,
                resolve_animation_folders.run_if(in_state(GameState::Loading)),
            )
            .add_systems(
                Update,
                (animate_sprites, apply_hit_flicker)
                    .chain()
                    .in_set(GameSet::Movement)
                    .after(crate::movement::MovementSystems),
            );
    }
}

/// Caches the frame sequences for every animation key, e.g. `right_run`,
/// `mushroom_death`, `water`. Keys are resolved once at load time; gameplay
/// code only ever looks up slices of image handles.
#[derive(Resource, Default)]
pub struct AnimationLibrary {
    folders: HashMap<String, Handle<LoadedFolder>>,
    frames: HashMap<String, Vec<Handle<Image>>>,
    ready: bool,
}

impl AnimationLibrary {
    pub fn frames(&self, key: &str) -> Option<&[Handle<Image>]> {
        self.frames.get(key).map(Vec::as_slice)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Which directory backs each animation key. The player and weapon sheets
/// live under `textures/player`, monsters under `textures/enemies/<name>`.
fn animation_sources(config: &GameConfig) -> Vec<(String, String)> {
    let mut sources = Vec::new();

    for facing in ["left", "right"] {
        for action in ["idle", "run", "jump", "fall", "attack"] {
            let key = format!("{facing}_{action}");
            sources.push((key.clone(), format!("textures/player/{key}")));
        }
    }

    for direction in ["left", "right", "top", "bottom"] {
        let key = format!("{direction}_sword_effect");
        sources.push((key.clone(), format!("textures/player/{key}")));
    }

    sources.push(("player_death".to_owned(), "textures/player/death".to_owned()));
    sources.push((
        "before_jump".to_owned(),
        "textures/particles/before_jump".to_owned(),
    ));
    sources.push((
        "after_jump".to_owned(),
        "textures/particles/after_jump".to_owned(),
    ));
    sources.push(("water".to_owned(), "textures/water".to_owned()));

    for monster in &config.monsters {
        for facing in ["left", "right"] {
            sources.push((
                format!("{monster}_{facing}_run"),
                format!("textures/enemies/{monster}/{facing}_run"),
            ));
        }
        sources.push((
            format!("{monster}_death"),
            format!("textures/enemies/{monster}/death"),
        ));
    }

    sources
}

fn queue_animation_folders(
    asset_server: Res<AssetServer>,
    config: Res<GameConfig>,
    mut library: ResMut<AnimationLibrary>,
) {
    for (key, path) in animation_sources(&config) {
        library.folders.insert(key, asset_server.load_folder(path));
    }
}

/// Polls the queued folders each loading frame. A folder that fails to load
/// is fatal: the game refuses to start with missing art rather than rendering
/// partially.
fn resolve_animation_folders(
    asset_server: Res<AssetServer>,
    folder_assets: Res<Assets<LoadedFolder>>,
    mut library: ResMut<AnimationLibrary>,
) {
    if library.ready {
        return;
    }

    let mut all_loaded = true;

    let keys: Vec<String> = library.folders.keys().cloned().collect();
    for key in keys {
        if library.frames.contains_key(&key) {
            continue;
        }

        let handle = library.folders[&key].clone();
        match asset_server.get_recursive_dependency_load_state(handle.id()) {
            Some(RecursiveDependencyLoadState::Loaded) => {
                let Some(folder) = folder_assets.get(&handle) else {
                    all_loaded = false;
                    continue;
                };

                let mut frames: Vec<(String, Handle<Image>)> = folder
                    .handles
                    .iter()
                    .filter_map(|untyped| {
                        let path = untyped.path()?.to_string();
                        Some((path, untyped.clone().typed::<Image>()))
                    })
                    .collect();
                frames.sort_by(|a, b| a.0.cmp(&b.0));

                if frames.is_empty() {
                    error!("Animation folder for '{key}' contains no frames.");
                    panic!("missing animation frames: {key}");
                }

                library
                    .frames
                    .insert(key, frames.into_iter().map(|(_, handle)| handle).collect());
            }
            Some(RecursiveDependencyLoadState::Failed) => {
                error!("Failed to load animation folder for '{key}'.");
                panic!("missing animation folder: {key}");
            }
            _ => {
                all_loaded = false;
            }
        }
    }

    if all_loaded {
        library.ready = true;
        info!("Loaded {} animation sets.", library.frames.len());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationMode {
    /// Wrap back to frame zero past the end.
    Loop,
    /// Despawn the entity once the last frame has played.
    Once,
}

/// Frame-sequence playback state. `frame_index` advances by `fps * dt` and
/// truncates to pick the displayed frame, so playback speed is independent of
/// the render frame rate.
#[derive(Component)]
pub struct SpriteAnimation {
    pub key: String,
    pub frame_index: f32,
    pub fps: f32,
    pub mode: AnimationMode,
}

impl SpriteAnimation {
    pub fn looping(key: impl Into<String>, fps: f32) -> Self {
        Self {
            key: key.into(),
            frame_index: 0.0,
            fps,
            mode: AnimationMode::Loop,
        }
    }

    pub fn once(key: impl Into<String>, fps: f32) -> Self {
        Self {
            key: key.into(),
            frame_index: 0.0,
            fps,
            mode: AnimationMode::Once,
        }
    }
}

pub fn animate_sprites(
    time: Res<Time>,
    library: Res<AnimationLibrary>,
    mut commands: Commands,
    mut query: Query<(Entity, &mut SpriteAnimation, &mut Handle<Image>)>,
) {
    let dt = time.delta_seconds();

    for (entity, mut animation, mut texture) in &mut query {
        let Some(frames) = library.frames(&animation.key) else {
            continue;
        };
        if frames.is_empty() {
            continue;
        }

        animation.frame_index += animation.fps * dt;
        if animation.frame_index >= frames.len() as f32 {
            match animation.mode {
                AnimationMode::Loop => animation.frame_index = 0.0,
                AnimationMode::Once => {
                    commands.entity(entity).despawn_recursive();
                    continue;
                }
            }
        }

        *texture = frames[animation.frame_index as usize].clone();
    }
}

/// Marks a sprite that blinks while its owner is in an invulnerability
/// window. The flag is driven by the player/enemy update systems.
#[derive(Component, Default)]
pub struct HitFlicker {
    pub on: bool,
}

pub fn apply_hit_flicker(time: Res<Time>, mut query: Query<(&HitFlicker, &mut Sprite)>) {
    for (flicker, mut sprite) in &mut query {
        let alpha = if flicker.on {
            wave_alpha(time.elapsed_seconds() * 1000.0)
        } else {
            1.0
        };
        sprite.color.set_alpha(alpha);
    }
}

/// Square wave over wall-clock milliseconds: opaque while sin(ms) is
/// non-negative, invisible otherwise. A harsh flicker cue, not a fade.
pub fn wave_alpha(ms: f32) -> f32 {
    if ms.sin() >= 0.0 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_alpha_is_a_square_wave() {
        // sin(1) > 0, sin(4) < 0 (radians).
        assert_eq!(wave_alpha(1.0), 1.0);
        assert_eq!(wave_alpha(4.0), 0.0);
        assert_eq!(wave_alpha(0.0), 1.0);
    }

    #[test]
    fn player_sources_cover_every_status() {
        let config = GameConfig::default();
        let sources = animation_sources(&config);

        for facing in ["left", "right"] {
            for action in ["idle", "run", "jump", "fall", "attack"] {
                let key = format!("{facing}_{action}");
                assert!(
                    sources.iter().any(|(k, _)| k == &key),
                    "no animation source for {key}"
                );
            }
        }

        assert!(sources.iter().any(|(k, _)| k == "mushroom_death"));
        assert!(sources.iter().any(|(k, _)| k == "water"));
    }
}
