use overworld_rendering::{
    DebugRect, HudPresentation, MessagePresentation, RenderingError, Scene, SpritePresentation,
    TileGridPresentation, ATTACK_COLOR, COLLISION_COLOR, DEFENSE_COLOR,
};
use overworld_world::{
    query::{self, BoundsKind},
    Combatant, World,
};

/// Builds the scene describing the world's current state.
pub(crate) fn build(world: &World, show_debug: bool) -> Result<Scene, RenderingError> {
    let mut scene = Scene::new(tile_grid(world)?, query::camera(world).view());
    scene.show_debug = show_debug;
    refresh(&mut scene, world)?;
    Ok(scene)
}

/// Rewrites `scene` from the world's current state.
pub(crate) fn refresh(scene: &mut Scene, world: &World) -> Result<(), RenderingError> {
    scene.tiles = tile_grid(world)?;
    scene.view = query::camera(world).view();
    scene.sprites = query::sprites(world)
        .into_iter()
        .map(|sprite| SpritePresentation {
            entity: sprite.entity.get(),
            frame: sprite.frame,
            position: sprite.position,
        })
        .collect();
    scene.debug = if scene.show_debug {
        query::debug_bounds(world)
            .into_iter()
            .map(|bounds| DebugRect {
                rect: bounds.rect,
                color: match bounds.kind {
                    BoundsKind::Collision => COLLISION_COLOR,
                    BoundsKind::Defense => DEFENSE_COLOR,
                    BoundsKind::Attack => ATTACK_COLOR,
                },
            })
            .collect()
    } else {
        Vec::new()
    };

    let player = query::player(world);
    scene.hud = HudPresentation {
        health: player.health(),
        max_health: player.max_health(),
        resources: player.resources(),
    };
    scene.message = query::active_message(world).map(|(name, text)| MessagePresentation {
        name: name.to_owned(),
        text: text.to_owned(),
    });
    scene.paused = query::is_paused(world);
    Ok(())
}

fn tile_grid(world: &World) -> Result<TileGridPresentation, RenderingError> {
    let layer = query::tiles(world);
    let (tile_width, tile_height) = query::tile_size(world);
    let mut tiles = Vec::with_capacity(layer.columns() as usize * layer.rows() as usize);
    for row in 0..layer.rows() {
        for column in 0..layer.columns() {
            tiles.push(layer.tile(column, row).unwrap_or_default());
        }
    }
    TileGridPresentation::new(layer.columns(), layer.rows(), tile_width, tile_height, tiles)
}
