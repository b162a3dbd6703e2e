//! Dead-zone camera. The view stays put while the player roams a
//! screen-centered rectangle; pushing one of its edges drags the camera
//! along. Taking damage jitters the whole frame for a few tenths of a second.

use bevy::prelude::*;
use rand::{thread_rng, Rng};

use crate::config::GameConfig;
use crate::level::LevelState;
use crate::movement::KinematicBody;
use crate::player::Player;
use crate::state::{GameSet, GameState};

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DeadZone>().add_systems(
            Update,
            follow_player_camera
                .after(GameSet::Effects)
                .run_if(in_state(GameState::Playing))
                .run_if(has_player_and_camera),
        );
    }
}

/// Marker so the follow system can locate the camera entity without relying
/// on names.
#[derive(Component)]
pub struct FollowCamera;

/// World-space dead zone; `None` until the first frame centers it on the
/// player.
#[derive(Resource, Default)]
pub struct DeadZone {
    pub rect: Option<Rect>,
}

/// Only schedule the follow system when both a player and a camera exist;
/// during death/respawn the player entity is briefly missing.
fn has_player_and_camera(
    players: Query<Entity, With<Player>>,
    cameras: Query<Entity, With<FollowCamera>>,
) -> bool {
    !players.is_empty() && !cameras.is_empty()
}

/// Shifts `zone` the minimal distance needed for `target` to fit inside it.
/// The zone's size never changes.
pub fn push_dead_zone(zone: &mut Rect, target: Rect) {
    let size = zone.size();

    if target.min.x < zone.min.x {
        zone.min.x = target.min.x;
        zone.max.x = zone.min.x + size.x;
    }
    if target.max.x > zone.max.x {
        zone.max.x = target.max.x;
        zone.min.x = zone.max.x - size.x;
    }
    if target.min.y < zone.min.y {
        zone.min.y = target.min.y;
        zone.max.y = zone.min.y + size.y;
    }
    if target.max.y > zone.max.y {
        zone.max.y = target.max.y;
        zone.min.y = zone.max.y - size.y;
    }
}

fn follow_player_camera(
    config: Res<GameConfig>,
    level_state: Res<LevelState>,
    mut dead_zone: ResMut<DeadZone>,
    players: Query<&KinematicBody, With<Player>>,
    mut cameras: Query<&mut Transform, With<FollowCamera>>,
) {
    let Ok(body) = players.get_single() else {
        return;
    };
    let Ok(mut transform) = cameras.get_single_mut() else {
        return;
    };

    let borders = config.camera_borders;
    let zone_size = config.screen_size
        - Vec2::new(borders.left + borders.right, borders.top + borders.bottom);
    let player_rect = body.rect();

    let mut zone = dead_zone
        .rect
        .unwrap_or_else(|| Rect::from_center_size(player_rect.center(), zone_size));
    push_dead_zone(&mut zone, player_rect);
    dead_zone.rect = Some(zone);

    // The visible area's bottom-left corner sits `borders` away from the
    // zone; center the camera on it.
    let view_min = zone.min - Vec2::new(borders.left, borders.bottom);
    let center = view_min + config.screen_size * 0.5;
    transform.translation.x = center.x;
    transform.translation.y = center.y;

    if level_state.screen_shake {
        let mut rng = thread_rng();
        transform.translation.x += rng.gen_range(-4.0..=4.0);
        transform.translation.y += rng.gen_range(-4.0..=4.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Rect {
        Rect::from_corners(Vec2::new(100.0, 100.0), Vec2::new(200.0, 200.0))
    }

    #[test]
    fn target_inside_leaves_the_zone_alone() {
        let mut z = zone();
        push_dead_zone(
            &mut z,
            Rect::from_corners(Vec2::new(120.0, 120.0), Vec2::new(160.0, 160.0)),
        );
        assert_eq!(z, zone());
    }

    #[test]
    fn pushing_an_edge_drags_the_zone() {
        let mut z = zone();
        push_dead_zone(
            &mut z,
            Rect::from_corners(Vec2::new(180.0, 120.0), Vec2::new(240.0, 160.0)),
        );
        assert_eq!(z.max.x, 240.0);
        assert_eq!(z.min.x, 140.0);
        // Vertical edges untouched.
        assert_eq!(z.min.y, 100.0);

        let mut z = zone();
        push_dead_zone(
            &mut z,
            Rect::from_corners(Vec2::new(60.0, 60.0), Vec2::new(110.0, 110.0)),
        );
        assert_eq!(z.min, Vec2::new(60.0, 60.0));
        assert_eq!(z.size(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn zone_size_is_preserved_under_large_jumps() {
        let mut z = zone();
        push_dead_zone(
            &mut z,
            Rect::from_corners(Vec2::new(5000.0, -3000.0), Vec2::new(5050.0, -2950.0)),
        );
        assert_eq!(z.size(), Vec2::new(100.0, 100.0));
        assert!(z.contains(Vec2::new(5025.0, -2975.0)));
    }
}
