//! Immutable startup configuration.
//!
//! Every tuning constant lives in one `GameConfig` resource built once before
//! the app runs. Systems receive it through `Res<GameConfig>`; nothing mutates
//! it afterwards, so gameplay numbers stay consistent frame to frame.

use bevy::prelude::*;

/// Frame rate the movement constants were tuned against. Velocities are
/// expressed in these units so integration stays stable under variable `dt`.
pub const REFERENCE_FPS: f32 = 60.0;

#[derive(Resource, Clone)]
pub struct GameConfig {
    pub screen_size: Vec2,
    pub tile_size: f32,
    pub reference_fps: f32,
    pub bg_color: Color,
    pub camera_borders: CameraBorders,
    pub layers: DrawLayers,
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub weapon_size: Vec2,
    pub monsters: Vec<String>,
    pub gamepad_deadzone: f32,
    pub debug: bool,
}

/// Screen-space margins framing the camera dead zone. The player can roam
/// inside the zone without moving the camera; pushing an edge drags it along.
#[derive(Clone, Copy)]
pub struct CameraBorders {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Z values for sprites this crate spawns itself. LDtk tile layers keep their
/// own depth; these only order the entities layered on top of them.
#[derive(Clone, Copy)]
pub struct DrawLayers {
    pub main: f32,
    pub water: f32,
    pub overlay: f32,
}

#[derive(Clone)]
pub struct PlayerTuning {
    pub size: Vec2,
    pub speed: f32,
    pub gravity: f32,
    pub jump_speed: f32,
    pub max_health: i32,
    pub damage: i32,
    pub animation_fps: f32,
    pub default_spawn: Vec2,
}

#[derive(Clone)]
pub struct EnemyTuning {
    pub size: Vec2,
    pub health: i32,
    pub animation_fps: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_size: Vec2::new(1280.0, 720.0),
            tile_size: 64.0,
            reference_fps: REFERENCE_FPS,
            bg_color: Color::srgb_u8(0x06, 0x0c, 0x17),
            camera_borders: CameraBorders {
                left: 590.0,
                right: 590.0,
                top: 310.0,
                bottom: 310.0,
            },
            layers: DrawLayers {
                main: 10.0,
                water: 11.0,
                overlay: 1000.0,
            },
            player: PlayerTuning {
                size: Vec2::new(64.0, 64.0),
                speed: 8.0 * REFERENCE_FPS,
                gravity: 0.8 * REFERENCE_FPS,
                jump_speed: 20.0,
                max_health: 3,
                damage: 25,
                animation_fps: 4.0,
                default_spawn: Vec2::new(128.0, 576.0),
            },
            enemy: EnemyTuning {
                size: Vec2::new(64.0, 64.0),
                health: 50,
                animation_fps: 6.0,
            },
            weapon_size: Vec2::new(64.0, 64.0),
            monsters: vec!["mushroom".to_owned()],
            gamepad_deadzone: 0.3,
            debug: false,
        }
    }
}
