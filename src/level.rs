//! LDtk level orchestration: project loading, level metadata tracking, map
//! population, and the cross-entity interactions the level owns (checkpoints
//! and exits).
//!
//! Persistent state lives in Bevy resources (`LevelSetup`, `LevelAssets`,
//! `LevelState`, `LevelRegistry`); entity collections are owned by the ECS and
//! torn down wholesale when a level despawns.

use std::collections::HashMap;

use bevy::asset::LoadState;
use bevy::math::IVec2;
use bevy::prelude::*;
use bevy_ecs_ldtk::ldtk::FieldValue;
use bevy_ecs_ldtk::prelude::*;
use bevy_ecs_ldtk::utils::ldtk_pixel_coords_to_translation;
use bevy_ecs_ldtk::LevelIid;

use crate::animation::{AnimationLibrary, SpriteAnimation};
use crate::config::GameConfig;
use crate::movement::{rects_overlap, KinematicBody};
use crate::player::Player;
use crate::state::{GameSet, GameState};
use crate::timer::Countdown;

/// Registers LDtk asset plumbing, map population, and interaction systems.
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(LevelSetup::default())
            .init_resource::<LevelAssets>()
            .init_resource::<LevelState>()
            .init_resource::<LevelRegistry>()
            .insert_resource(LevelSelection::index(0))
            .insert_resource(LdtkSettings {
                level_spawn_behavior: LevelSpawnBehavior::UseWorldTranslation {
                    load_level_neighbors: false,
                },
                set_clear_color: SetClearColor::No,
                ..default()
            })
            .add_plugins(LdtkPlugin)
            .add_systems(OnEnter(GameState::Loading), spawn_world)
            .add_systems(
                Update,
                monitor_level_loading.run_if(in_state(GameState::Loading)),
            )
            .add_systems(Update, refresh_level_metadata)
            .add_systems(
                Update,
                (checkpoint_collision, exit_collision)
                    .chain()
                    .in_set(InteractionSystems)
                    .in_set(GameSet::Effects),
            )
            .add_systems(
                PostUpdate,
                (
                    cache_level_transform,
                    process_level_entities,
                    populate_water,
                    cleanup_on_level_despawn,
                )
                    .chain(),
            );
    }
}

/// Cross-entity interaction checks (checkpoints, exits). Ordered after combat
/// by `app.rs`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionSystems;

/// Which LDtk project to load and which level to start in.
#[derive(Resource, Clone)]
pub struct LevelSetup {
    pub project_path: String,
    pub start_level: String,
}

impl Default for LevelSetup {
    fn default() -> Self {
        Self {
            project_path: "levels/greenwood.ldtk".to_owned(),
            start_level: "map_one".to_owned(),
        }
    }
}

/// Mirror of the currently loaded level's metadata. Optional fields become
/// `Some` once assets are available; camera, collision, and map population
/// read these without owning the LDtk structures.
#[derive(Resource, Default)]
pub struct LevelAssets {
    pub project: Option<Handle<LdtkProject>>,
    pub project_path: Option<String>,
    pub level_identifier: Option<String>,
    pub level_iid: Option<String>,
    pub level_origin: Option<Vec2>,
    pub level_size: Option<Vec2>,
}

/// Marker on the LDtk world entity so it can be respawned or torn down
/// without dangling children.
#[derive(Component)]
pub struct LevelRoot;

/// Marker for entities that belong to the current map (enemies, water tiles,
/// weapon hitboxes, particles, interaction zones). All of them are despawned
/// together when the level unloads.
#[derive(Component)]
pub struct LevelScoped;

/// The checkpoint the player reaches through; a death fades out and reloads
/// this level at this position.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSnapshot {
    pub level: String,
    pub pos: Vec2,
}

/// Countdowns owned by the orchestrator itself.
pub struct LevelTimers {
    pub screen_shake: Countdown,
    pub player_death: Countdown,
}

impl Default for LevelTimers {
    fn default() -> Self {
        Self {
            screen_shake: Countdown::from_millis(300),
            player_death: Countdown::from_millis(1500),
        }
    }
}

/// Mutable per-run level state: where we are, where deaths return to, and the
/// flags the camera and fade systems react to.
#[derive(Resource)]
pub struct LevelState {
    pub current_level: String,
    pub last_checkpoint: Option<CheckpointSnapshot>,
    pub current_attack: Option<Entity>,
    pub screen_shake: bool,
    pub respawn: bool,
    pub timers: LevelTimers,
}

impl Default for LevelState {
    fn default() -> Self {
        Self {
            current_level: LevelSetup::default().start_level,
            last_checkpoint: None,
            current_attack: None,
            screen_shake: false,
            respawn: false,
            timers: LevelTimers::default(),
        }
    }
}

impl LevelState {
    pub fn start_screen_shake(&mut self) {
        self.screen_shake = true;
        self.timers.screen_shake.activate();
    }

    /// Advances the orchestrator's own countdowns; called once per frame
    /// after all sprite updates.
    pub fn tick_timers(&mut self, dt: f32) {
        if self.timers.screen_shake.tick(dt) {
            self.screen_shake = false;
        }
        if self.timers.player_death.tick(dt) {
            self.respawn = true;
        }
    }

    /// Crossing an exit: switch the current level and look up where the
    /// player reappears given where they came from.
    pub fn cross_exit(&mut self, exit: &ExitTile, registry: &LevelRegistry) -> Option<Vec2> {
        let spawn = registry.spawn_point(&exit.new_level, &exit.current_level);
        self.current_level = exit.new_level.clone();
        spawn
    }
}

/// Static mapping from destination level to per-origin spawn positions.
#[derive(Resource)]
pub struct LevelRegistry {
    spawn_points: HashMap<String, HashMap<String, Vec2>>,
}

impl Default for LevelRegistry {
    fn default() -> Self {
        let mut spawn_points = HashMap::new();
        spawn_points.insert(
            "map_one".to_owned(),
            HashMap::from([("map_two".to_owned(), Vec2::new(128.0, 576.0))]),
        );
        spawn_points.insert(
            "map_two".to_owned(),
            HashMap::from([("map_one".to_owned(), Vec2::new(64.0, 128.0))]),
        );
        Self { spawn_points }
    }
}

impl LevelRegistry {
    pub fn spawn_point(&self, destination: &str, origin: &str) -> Option<Vec2> {
        self.spawn_points
            .get(destination)
            .and_then(|origins| origins.get(origin))
            .copied()
    }
}

/// Invisible trigger zone recording which level it belongs to.
#[derive(Component, Debug, Clone)]
pub struct Checkpoint {
    pub level_name: String,
    pub rect: Rect,
}

/// Trigger zone that moves the player to another level on contact.
#[derive(Component, Debug, Clone)]
pub struct ExitTile {
    pub current_level: String,
    pub new_level: String,
    pub rect: Rect,
}

fn spawn_world(
    mut commands: Commands,
    world: Query<Entity, With<LevelRoot>>,
    asset_server: Res<AssetServer>,
    setup: Res<LevelSetup>,
    mut level_assets: ResMut<LevelAssets>,
    mut level_state: ResMut<LevelState>,
    mut selection: ResMut<LevelSelection>,
) {
    // Tear down any previously spawned LDtk world before loading another one.
    for entity in &world {
        commands.entity(entity).despawn_recursive();
    }

    let project_handle: Handle<LdtkProject> = asset_server.load(setup.project_path.clone());
    level_assets.project = Some(project_handle.clone());
    level_assets.project_path = Some(setup.project_path.clone());

    level_state.current_level = setup.start_level.clone();
    *selection = LevelSelection::Identifier(setup.start_level.clone());

    commands.spawn((
        LevelRoot,
        Name::new("LevelRoot"),
        LdtkWorldBundle {
            ldtk_handle: project_handle,
            ..default()
        },
    ));
}

/// Waits for the LDtk project and the animation folders, caches the starting
/// level's metadata, then hands control to gameplay. A missing or broken
/// project is fatal; the game never starts half-rendered.
fn monitor_level_loading(
    asset_server: Res<AssetServer>,
    mut level_assets: ResMut<LevelAssets>,
    projects: Res<Assets<LdtkProject>>,
    setup: Res<LevelSetup>,
    library: Res<AnimationLibrary>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(project_handle) = level_assets.project.clone() else {
        return;
    };

    match asset_server.get_load_state(project_handle.id()) {
        Some(LoadState::Loaded) => {
            if !library.is_ready() {
                return;
            }

            if let Some(project) = projects.get(&project_handle) {
                let level = project
                    .json_data()
                    .levels
                    .iter()
                    .find(|level| level.identifier == setup.start_level)
                    .unwrap_or_else(|| {
                        panic!("LDtk project has no level named '{}'", setup.start_level)
                    });
                cache_level_metadata(&mut level_assets, level);
            }

            info!("Level '{}' loaded; entering gameplay.", setup.start_level);
            next_state.set(GameState::Playing);
        }
        Some(LoadState::Failed(_)) => {
            let path = level_assets.project_path.as_deref().unwrap_or("<unknown>");
            error!("Unable to load LDtk project at '{path}'.");
            panic!("missing or malformed level data: {path}");
        }
        _ => {}
    }
}

fn cache_level_metadata(level_assets: &mut LevelAssets, level: &bevy_ecs_ldtk::ldtk::Level) {
    let origin = ldtk_pixel_coords_to_translation(
        IVec2::new(level.world_x, level.world_y + level.px_hei),
        0,
    );

    level_assets.level_identifier = Some(level.identifier.clone());
    level_assets.level_iid = Some(level.iid.clone());
    level_assets.level_origin = Some(origin);
    level_assets.level_size = Some(Vec2::new(level.px_wid as f32, level.px_hei as f32));
}

/// Follows `LevelState::current_level` changes (exit crossings, checkpoint
/// respawns) by re-reading the project metadata for the new level.
fn refresh_level_metadata(
    level_state: Res<LevelState>,
    projects: Res<Assets<LdtkProject>>,
    mut level_assets: ResMut<LevelAssets>,
    mut last_seen: Local<Option<String>>,
) {
    if last_seen.as_deref() == Some(level_state.current_level.as_str()) {
        return;
    }

    let Some(project_handle) = level_assets.project.clone() else {
        return;
    };
    let Some(project) = projects.get(&project_handle) else {
        return;
    };
    let Some(level) = project
        .json_data()
        .levels
        .iter()
        .find(|level| level.identifier == level_state.current_level)
    else {
        warn!(
            "Current level '{}' is not in the LDtk project.",
            level_state.current_level
        );
        return;
    };

    cache_level_metadata(&mut level_assets, level);
    *last_seen = Some(level_state.current_level.clone());
}

/// When LDtk instantiates a level entity, capture its world transform so the
/// cached origin matches where the level actually sits in Bevy coordinates.
pub fn cache_level_transform(
    mut level_assets: ResMut<LevelAssets>,
    level_query: Query<(&GlobalTransform, &LevelIid), Added<LevelIid>>,
) {
    for (transform, iid) in &level_query {
        let matches_current_level = level_assets
            .level_iid
            .as_ref()
            .map(|target| target == iid.get())
            .unwrap_or(true);

        if matches_current_level {
            level_assets.level_origin = Some(transform.translation().truncate());
        }
    }
}

/// World-space bounding box of an LDtk entity object. `px` is the object's
/// top-left corner in level pixel space (y down), hence the height flip.
pub fn entity_world_rect(instance: &EntityInstance, level_origin: Vec2, level_height: f32) -> Rect {
    let size = Vec2::new(instance.width as f32, instance.height as f32);
    let min = level_origin
        + Vec2::new(
            instance.px.x as f32,
            level_height - instance.px.y as f32 - size.y,
        );
    Rect::from_corners(min, min + size)
}

fn string_field(instance: &EntityInstance, name: &str) -> Option<String> {
    instance
        .field_instances
        .iter()
        .find(|field| field.identifier == name)
        .and_then(|field| match &field.value {
            FieldValue::String(value) => value.clone(),
            _ => None,
        })
}

/// Turns freshly spawned LDtk entity objects into gameplay entities: enemies,
/// checkpoints, and exits. `Collider` objects are consumed by the collision
/// rebuild instead. Missing fields are map-authoring errors and fatal.
fn process_level_entities(
    mut commands: Commands,
    config: Res<GameConfig>,
    level_assets: Res<LevelAssets>,
    level_state: Res<LevelState>,
    query: Query<&EntityInstance, Added<EntityInstance>>,
) {
    if query.is_empty() {
        return;
    }

    let origin = level_assets.level_origin.unwrap_or(Vec2::ZERO);
    let level_height = level_assets.level_size.map(|size| size.y).unwrap_or(0.0);

    for instance in &query {
        let rect = entity_world_rect(instance, origin, level_height);

        match instance.identifier.as_str() {
            "Enemy" => {
                let monster = string_field(instance, "monster").unwrap_or_else(|| {
                    panic!("Enemy object at {:?} is missing its monster field", instance.px)
                });
                crate::enemy::spawn_enemy(&mut commands, &config, &monster, rect.min);
            }
            "Checkpoint" => {
                commands.spawn((
                    Name::new("Checkpoint"),
                    LevelScoped,
                    Checkpoint {
                        level_name: level_state.current_level.clone(),
                        rect,
                    },
                ));
            }
            "Exit" => {
                let destination = string_field(instance, "destination").unwrap_or_else(|| {
                    panic!("Exit object at {:?} is missing its destination field", instance.px)
                });
                commands.spawn((
                    Name::new("Exit"),
                    LevelScoped,
                    ExitTile {
                        current_level: level_state.current_level.clone(),
                        new_level: destination,
                        rect,
                    },
                ));
            }
            _ => {}
        }
    }
}

/// Spawns the animated, alpha-blended water decoration over the map's Water
/// IntGrid cells once a level has finished spawning.
fn populate_water(
    mut commands: Commands,
    mut events: EventReader<LevelEvent>,
    int_cells: Query<(&GridCoords, &IntGridCell, &Parent)>,
    layers: Query<&LayerMetadata>,
    config: Res<GameConfig>,
    level_assets: Res<LevelAssets>,
) {
    if !events
        .read()
        .any(|event| matches!(event, LevelEvent::Spawned(_)))
    {
        return;
    }

    let origin = level_assets.level_origin.unwrap_or(Vec2::ZERO);
    let tile = config.tile_size;

    for (coords, cell, parent) in &int_cells {
        if cell.value <= 0 {
            continue;
        }
        let Ok(layer) = layers.get(parent.get()) else {
            continue;
        };
        if layer.identifier != "Water" {
            continue;
        }

        let min = origin + Vec2::new(coords.x as f32, coords.y as f32) * tile;
        commands.spawn((
            Name::new("Water"),
            LevelScoped,
            SpriteBundle {
                sprite: Sprite {
                    custom_size: Some(Vec2::splat(tile)),
                    color: Color::srgba(1.0, 1.0, 1.0, 150.0 / 255.0),
                    ..default()
                },
                transform: Transform::from_translation(
                    (min + Vec2::splat(tile * 0.5)).extend(config.layers.water),
                ),
                ..default()
            },
            SpriteAnimation::looping("water", 5.0),
        ));
    }
}

/// Full teardown of per-map entities whenever LDtk despawns a level: enemies,
/// water, particles, interaction zones, and any live attack hitbox.
fn cleanup_on_level_despawn(
    mut commands: Commands,
    mut events: EventReader<LevelEvent>,
    scoped: Query<Entity, With<LevelScoped>>,
    mut level_state: ResMut<LevelState>,
) {
    if !events
        .read()
        .any(|event| matches!(event, LevelEvent::Despawned(_)))
    {
        return;
    }

    for entity in &scoped {
        commands.entity(entity).despawn_recursive();
    }
    level_state.current_attack = None;
}

/// Stores the last checkpoint the player touched; deaths return here.
fn checkpoint_collision(
    mut level_state: ResMut<LevelState>,
    players: Query<&KinematicBody, With<Player>>,
    checkpoints: Query<&Checkpoint>,
) {
    let Ok(body) = players.get_single() else {
        return;
    };
    let player_rect = body.rect();

    for checkpoint in &checkpoints {
        if rects_overlap(player_rect, checkpoint.rect) {
            level_state.last_checkpoint = Some(CheckpointSnapshot {
                level: checkpoint.level_name.clone(),
                pos: checkpoint.rect.min,
            });
        }
    }
}

/// Crossing an exit swaps the selected LDtk level and teleports the player to
/// the registry's spawn point for that origin/destination pair.
fn exit_collision(
    mut level_state: ResMut<LevelState>,
    registry: Res<LevelRegistry>,
    mut selection: ResMut<LevelSelection>,
    mut players: Query<&mut KinematicBody, With<Player>>,
    exits: Query<&ExitTile>,
) {
    let Ok(mut body) = players.get_single_mut() else {
        return;
    };
    let player_rect = body.rect();

    let Some(exit) = exits
        .iter()
        .find(|exit| rects_overlap(player_rect, exit.rect))
        .cloned()
    else {
        return;
    };

    info!(
        "Crossing exit from '{}' to '{}'.",
        exit.current_level, exit.new_level
    );

    let spawn = level_state.cross_exit(&exit, &registry);
    *selection = LevelSelection::Identifier(level_state.current_level.clone());

    match spawn {
        Some(spawn) => {
            body.pos = spawn;
            body.direction = Vec2::ZERO;
        }
        None => warn!(
            "No registry spawn point for '{}' from '{}'; keeping player position.",
            exit.new_level, exit.current_level
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_an_exit_switches_level_and_spawn() {
        let registry = LevelRegistry::default();
        let mut state = LevelState::default();
        assert_eq!(state.current_level, "map_one");

        let exit = ExitTile {
            current_level: "map_one".to_owned(),
            new_level: "map_two".to_owned(),
            rect: Rect::from_corners(Vec2::new(1216.0, 576.0), Vec2::new(1280.0, 704.0)),
        };

        let spawn = state.cross_exit(&exit, &registry);

        assert_eq!(state.current_level, "map_two");
        assert_eq!(spawn, Some(Vec2::new(64.0, 128.0)));
    }

    #[test]
    fn unknown_exit_pair_has_no_spawn_point() {
        let registry = LevelRegistry::default();
        let mut state = LevelState::default();

        let exit = ExitTile {
            current_level: "map_one".to_owned(),
            new_level: "map_nine".to_owned(),
            rect: Rect::default(),
        };

        assert_eq!(state.cross_exit(&exit, &registry), None);
        assert_eq!(state.current_level, "map_nine");
    }

    #[test]
    fn screen_shake_clears_itself() {
        let mut state = LevelState::default();
        state.start_screen_shake();
        assert!(state.screen_shake);

        state.tick_timers(0.1);
        assert!(state.screen_shake);
        state.tick_timers(0.25);
        assert!(!state.screen_shake);
    }

    #[test]
    fn player_death_timer_raises_the_respawn_flag() {
        let mut state = LevelState::default();
        state.timers.player_death.activate();

        state.tick_timers(1.0);
        assert!(!state.respawn);
        state.tick_timers(0.6);
        assert!(state.respawn);
    }

    #[test]
    fn entity_rects_flip_from_ldtk_pixel_space() {
        let instance = EntityInstance {
            px: IVec2::new(256, 128),
            width: 64,
            height: 128,
            ..Default::default()
        };

        // Level is 704px tall with its origin at the world origin: a y-down
        // top edge of 128 puts the object's bottom at 704 - 128 - 128 = 448.
        let rect = entity_world_rect(&instance, Vec2::ZERO, 704.0);
        assert_eq!(rect.min, Vec2::new(256.0, 448.0));
        assert_eq!(rect.max, Vec2::new(320.0, 576.0));
    }
}
