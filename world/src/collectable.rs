//! Pickups and animated scenery.

use std::sync::Arc;

use glam::Vec2;
use overworld_core::{Action, Direction, EntityId, Rect};
use overworld_system_animation::{AnimationSet, AnimationState, FrameKey};

use crate::{
    config::CollectableTemplate,
    entity::{Animated, Positioned},
};

/// Item that grants resources when the player walks over it.
#[derive(Clone, Debug)]
pub struct Collectable {
    id: EntityId,
    name: String,
    template: Arc<CollectableTemplate>,
    clips: Arc<AnimationSet<Action>>,
    position: Vec2,
    active: bool,
    animation: AnimationState<Action>,
}

impl Collectable {
    pub(crate) fn new(
        id: EntityId,
        name: String,
        template: Arc<CollectableTemplate>,
        clips: Arc<AnimationSet<Action>>,
        position: Vec2,
        active: bool,
    ) -> Self {
        Self {
            id,
            name,
            template,
            clips,
            position,
            active,
            animation: AnimationState::new(Action::IdleMove),
        }
    }

    /// Map-assigned name, unique within the chunk.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources granted on pickup.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.template.value
    }

    /// Reports whether the item can be seen and picked up.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl Positioned for Collectable {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> (u32, u32) {
        (self.template.width, self.template.height)
    }

    fn direction(&self) -> Direction {
        Direction::Down
    }

    fn collision_bounds(&self) -> Rect {
        self.sprite_bounds()
    }
}

impl Animated for Collectable {
    fn frame(&self) -> Option<&FrameKey> {
        if !self.active {
            return None;
        }
        self.animation.current_frame(&self.clips, Direction::Down)
    }

    fn animate(&mut self, delta: f32) {
        self.animation.update(delta);
    }
}

/// Looping decoration that also blocks walkers and projectiles.
#[derive(Clone, Debug)]
pub struct AnimatedObstacle {
    id: EntityId,
    bounds: Rect,
    clips: Arc<AnimationSet<Action>>,
    animation: AnimationState<Action>,
}

impl AnimatedObstacle {
    pub(crate) fn new(id: EntityId, bounds: Rect, clips: Arc<AnimationSet<Action>>) -> Self {
        Self {
            id,
            bounds,
            clips,
            animation: AnimationState::new(Action::IdleMove),
        }
    }

    /// Blocking rectangle.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }
}

impl Positioned for AnimatedObstacle {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.bounds.origin()
    }

    fn size(&self) -> (u32, u32) {
        (self.bounds.width as u32, self.bounds.height as u32)
    }

    fn direction(&self) -> Direction {
        Direction::Down
    }

    fn collision_bounds(&self) -> Rect {
        self.bounds
    }
}

impl Animated for AnimatedObstacle {
    fn frame(&self) -> Option<&FrameKey> {
        self.animation.current_frame(&self.clips, Direction::Down)
    }

    fn animate(&mut self, delta: f32) {
        self.animation.update(delta);
    }
}
