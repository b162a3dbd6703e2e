//! Application entry point: composes the Bevy runtime, core plugins, and
//! window configuration, then defers to the `GreenwoodPlatformerPlugin`
//! defined in `app.rs`.

mod animation;
mod app;
mod camera;
mod collision;
mod combat;
mod config;
mod enemy;
mod level;
mod movement;
mod particles;
mod player;
mod state;
mod timer;
mod transition;
mod ui;
mod weapon;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod wasm;

use app::GreenwoodPlatformerPlugin;
use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::render::texture::ImagePlugin;
use bevy::window::{Window, WindowResizeConstraints, WindowResolution};

fn main() {
    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    wasm::set_panic_hook();

    // The logical resolution stays at 1280×720 so the map's pixel grid maps
    // 1:1 to Bevy world units. Resizing is allowed, but constraints keep the
    // window from collapsing to unusable sizes.
    let primary_window = Window {
        title: "Greenwood Platformer".to_string(),
        resolution: WindowResolution::new(1280.0, 720.0),
        resizable: true,
        resize_constraints: WindowResizeConstraints {
            min_width: 640.0,
            min_height: 360.0,
            max_width: f32::INFINITY,
            max_height: f32::INFINITY,
        },
        canvas: cfg!(all(target_arch = "wasm32", feature = "web"))
            .then(|| "#bevy-canvas".to_owned()),
        ..default()
    };

    // `DefaultPlugins` spins up rendering, input, windowing, etc. Pixel art
    // wants nearest-neighbor sampling; asset hot-reloading stays on for
    // desktop builds and off on the web.
    let mut default_plugins = DefaultPlugins
        .set(WindowPlugin {
            primary_window: Some(primary_window),
            ..default()
        })
        .set(ImagePlugin::default_nearest());

    #[cfg(not(target_arch = "wasm32"))]
    {
        default_plugins = default_plugins.set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(true),
            ..default()
        });
    }

    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    {
        default_plugins = default_plugins.set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(false),
            ..default()
        });
    }

    App::new()
        .add_plugins(default_plugins)
        .add_plugins(GreenwoodPlatformerPlugin)
        .run();
}
