use bevy::prelude::*;
use bevy_ecs_ldtk::prelude::*;

use crate::config::GameConfig;
use crate::level::{entity_world_rect, LevelAssets};

pub struct CollisionPlugin;

impl Plugin for CollisionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ColliderSet>().add_systems(
            PostUpdate,
            rebuild_collider_set
                .after(crate::level::cache_level_transform)
                .in_set(CollisionSystems),
        );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollisionSystems;

/// Static collision geometry of the loaded level, in world space.
///
/// `solids` stop kinematic bodies; `blockers` are the invisible `Collider`
/// objects from the map's Enemies layer that only turn patrolling enemies
/// around.
#[derive(Resource, Default)]
pub struct ColliderSet {
    pub solids: Vec<Rect>,
    pub blockers: Vec<Rect>,
}

impl ColliderSet {
    pub fn clear(&mut self) {
        self.solids.clear();
        self.blockers.clear();
    }
}

/// Rebuilds the collider set whenever LDtk finishes spawning a level, and
/// clears it when one despawns. Terrain tiles come from the `Terrain` IntGrid
/// layer; blockers from `Collider` entity objects.
fn rebuild_collider_set(
    mut events: EventReader<LevelEvent>,
    int_cells: Query<(&GridCoords, &IntGridCell, &Parent)>,
    layers: Query<&LayerMetadata>,
    entity_instances: Query<&EntityInstance>,
    config: Res<GameConfig>,
    level_assets: Res<LevelAssets>,
    mut colliders: ResMut<ColliderSet>,
) {
    let mut needs_rebuild = false;
    let mut should_clear = false;

    for event in events.read() {
        match event {
            LevelEvent::Spawned(_) => {
                needs_rebuild = true;
            }
            LevelEvent::Despawned(_) => {
                should_clear = true;
            }
            _ => {}
        }
    }

    if should_clear {
        colliders.clear();
    }

    if !needs_rebuild {
        return;
    }

    let origin = level_assets.level_origin.unwrap_or(Vec2::ZERO);
    let level_height = level_assets.level_size.map(|size| size.y).unwrap_or(0.0);
    let tile = config.tile_size;

    colliders.clear();

    for (coords, cell, parent) in &int_cells {
        if cell.value <= 0 {
            continue;
        }

        let Ok(layer) = layers.get(parent.get()) else {
            continue;
        };
        if layer.identifier != "Terrain" {
            continue;
        }

        let min = origin + Vec2::new(coords.x as f32, coords.y as f32) * tile;
        colliders
            .solids
            .push(Rect::from_corners(min, min + Vec2::splat(tile)));
    }

    for instance in &entity_instances {
        if instance.identifier == "Collider" {
            colliders
                .blockers
                .push(entity_world_rect(instance, origin, level_height));
        }
    }

    if colliders.solids.is_empty() {
        warn!(
            "Collider set is empty. Ensure the LDtk Terrain IntGrid layer marks solid tiles with a non-zero value."
        );
    }
}
