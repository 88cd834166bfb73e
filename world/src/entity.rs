//! Capability traits shared by everything that lives in a chunk.

use glam::Vec2;
use overworld_core::{Direction, EntityId, Rect};
use overworld_system_animation::FrameKey;

/// Entities with a place in the world.
pub trait Positioned {
    /// Identifier unique within the chunk.
    fn id(&self) -> EntityId;

    /// Lower-left corner of the sprite.
    fn position(&self) -> Vec2;

    /// Sprite width and height.
    fn size(&self) -> (u32, u32);

    /// Facing direction.
    fn direction(&self) -> Direction;

    /// Terrain footprint.
    fn collision_bounds(&self) -> Rect;

    /// Sprite rectangle.
    fn sprite_bounds(&self) -> Rect {
        let position = self.position();
        let (width, height) = self.size();
        Rect::new(position.x, position.y, width as f32, height as f32)
    }

    /// Center of the sprite.
    fn center(&self) -> Vec2 {
        self.sprite_bounds().center()
    }
}

/// Entities drawn from an animation set.
pub trait Animated {
    /// Frame to display this step, if the sheet has one.
    fn frame(&self) -> Option<&FrameKey>;

    /// Advances animation time without evaluating behavior.
    fn animate(&mut self, delta: f32);
}

/// Entities that fight and can be hit.
pub trait Combatant: Positioned {
    /// Current health.
    fn health(&self) -> i32;

    /// Health at spawn.
    fn max_health(&self) -> i32;

    /// Region where the entity can be hit.
    fn defense_bounds(&self) -> Rect;

    /// Melee hitbox while a swing is active.
    fn attack_bounds(&self) -> Option<Rect>;

    /// Reports whether the active swing can land this step.
    fn melee_ready(&self) -> bool;

    /// Records that the active swing connected.
    fn mark_melee_landed(&mut self);

    /// Applies one point of damage from the given direction.
    fn hit(&mut self, direction: Direction);

    /// Reports whether the entity is playing its death animation.
    fn is_expiring(&self) -> bool;
}

/// Melee hitbox extending `reach` beyond `defense` on the facing side.
pub(crate) fn melee_box(defense: Rect, direction: Direction, reach: f32) -> Rect {
    match direction {
        Direction::Left => Rect::new(defense.x - reach, defense.y, reach, defense.height),
        Direction::Right => Rect::new(defense.right(), defense.y, reach, defense.height),
        Direction::Up => Rect::new(defense.x, defense.top(), defense.width, reach),
        Direction::Down => Rect::new(defense.x, defense.y - reach, defense.width, reach),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn melee_box_touches_defense_on_facing_side() {
        let defense = Rect::new(10.0, 10.0, 4.0, 6.0);
        let right = melee_box(defense, Direction::Right, 3.0);
        assert_eq!(right, Rect::new(14.0, 10.0, 3.0, 6.0));
        let down = melee_box(defense, Direction::Down, 3.0);
        assert_eq!(down, Rect::new(10.0, 7.0, 4.0, 3.0));
        assert!(!down.overlaps(&defense));
    }
}
