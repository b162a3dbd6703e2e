//! Heads-up display and pause overlay.
//!
//! The HUD is a single row of heart icons in the top-left corner, one per
//! maximum health point, switching between full and empty art as the player
//! takes damage. UI entities live in Bevy's UI tree and are dropped wholesale
//! when despawned.

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::player::Player;
use crate::state::GameState;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HudAssets>()
            .add_systems(OnEnter(GameState::Loading), load_hud_assets)
            .add_systems(OnEnter(GameState::Playing), spawn_health_bar)
            .add_systems(
                Update,
                update_health_bar.run_if(in_state(GameState::Playing)),
            )
            .add_systems(OnEnter(GameState::Paused), spawn_pause_menu)
            .add_systems(OnExit(GameState::Paused), despawn_pause_menu);
    }
}

/// Keeps the heart art alive for the whole run; handles are cheap clones into
/// Bevy's asset storage.
#[derive(Resource, Default)]
pub struct HudAssets {
    pub full_heart: Handle<Image>,
    pub empty_heart: Handle<Image>,
}

fn load_hud_assets(asset_server: Res<AssetServer>, mut hud: ResMut<HudAssets>) {
    hud.full_heart = asset_server.load("textures/ui/heart_full.png");
    hud.empty_heart = asset_server.load("textures/ui/heart_empty.png");
}

#[derive(Component)]
struct HealthBar;

/// Index of a heart slot, left to right.
#[derive(Component)]
struct HeartIcon(usize);

fn spawn_health_bar(
    mut commands: Commands,
    config: Res<GameConfig>,
    hud: Res<HudAssets>,
    existing: Query<Entity, With<HealthBar>>,
) {
    if !existing.is_empty() {
        return;
    }

    commands
        .spawn((
            HealthBar,
            Name::new("HealthBar"),
            NodeBundle {
                style: Style {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    left: Val::Px(10.0),
                    flex_direction: FlexDirection::Row,
                    column_gap: Val::Px(10.0),
                    ..default()
                },
                ..default()
            },
        ))
        .with_children(|parent| {
            for index in 0..config.player.max_health.max(0) as usize {
                parent.spawn((
                    HeartIcon(index),
                    ImageBundle {
                        image: UiImage::new(hud.full_heart.clone()),
                        style: Style {
                            width: Val::Px(32.0),
                            height: Val::Px(32.0),
                            ..default()
                        },
                        ..default()
                    },
                ));
            }
        });
}

/// Hearts up to the current health show full art, the rest empty. With the
/// player gone (death fade) every heart reads empty.
fn update_health_bar(
    hud: Res<HudAssets>,
    players: Query<&Player>,
    mut hearts: Query<(&HeartIcon, &mut UiImage)>,
) {
    let health = players
        .get_single()
        .map(|player| player.health)
        .unwrap_or(0);

    for (icon, mut image) in &mut hearts {
        let handle = if (icon.0 as i32) < health {
            hud.full_heart.clone()
        } else {
            hud.empty_heart.clone()
        };
        if image.texture != handle {
            image.texture = handle;
        }
    }
}

#[derive(Component)]
struct PauseMenu;

/// Full-screen dimmed node with centered text, alive only while paused.
fn spawn_pause_menu(mut commands: Commands) {
    commands
        .spawn((
            PauseMenu,
            Name::new("PauseMenu"),
            NodeBundle {
                background_color: BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
                style: Style {
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    align_items: AlignItems::Center,
                    justify_content: JustifyContent::Center,
                    ..default()
                },
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn(TextBundle::from_section(
                "Paused\nPress ESC to resume",
                TextStyle {
                    font_size: 36.0,
                    color: Color::srgba(0.9, 0.9, 0.9, 1.0),
                    ..default()
                },
            ));
        });
}

fn despawn_pause_menu(mut commands: Commands, query: Query<Entity, With<PauseMenu>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}
