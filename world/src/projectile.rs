//! Player-launched projectiles.

use std::sync::Arc;

use glam::Vec2;
use overworld_core::{Direction, EntityId, ProjectileAction, Rect};
use overworld_system_animation::{AnimationSet, AnimationState, FrameKey};

use crate::{
    config::ProjectileConfig,
    entity::{Animated, Positioned},
    movement::Terrain,
};

/// Remaining range treated as exhausted, absorbing float drift.
const RANGE_EPSILON: f32 = 1e-3;

/// Projectile travelling in a straight line until range or terrain stops it.
#[derive(Clone, Debug)]
pub struct Projectile {
    id: EntityId,
    config: Arc<ProjectileConfig>,
    clips: Arc<AnimationSet<ProjectileAction>>,
    position: Vec2,
    direction: Direction,
    remaining: f32,
    travelled: f32,
    animation: AnimationState<ProjectileAction>,
    expired: bool,
}

impl Projectile {
    /// Creates a projectile whose sprite is centered on `origin`.
    pub(crate) fn launch(
        id: EntityId,
        config: Arc<ProjectileConfig>,
        clips: Arc<AnimationSet<ProjectileAction>>,
        origin: Vec2,
        direction: Direction,
    ) -> Self {
        let half = Vec2::new(config.width as f32, config.height as f32) * 0.5;
        Self {
            id,
            remaining: config.range,
            position: origin - half,
            config,
            clips,
            direction,
            travelled: 0.0,
            animation: AnimationState::new(ProjectileAction::Initialising),
            expired: false,
        }
    }

    /// Current action.
    #[must_use]
    pub fn action(&self) -> ProjectileAction {
        self.animation.action()
    }

    /// Distance covered since launch.
    #[must_use]
    pub const fn travelled(&self) -> f32 {
        self.travelled
    }

    /// Reports whether the projectile can still hit something.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.animation.action().in_flight()
    }

    /// Reports whether dissipation finished.
    #[must_use]
    pub const fn expire_complete(&self) -> bool {
        self.expired
    }

    /// Region used for terrain and monster tests.
    #[must_use]
    pub fn hit_bounds(&self) -> Rect {
        self.config.collision.at(self.position)
    }

    /// Stops the projectile and starts dissipating.
    pub(crate) fn expire(&mut self) {
        let _ = self.animation.update_action(ProjectileAction::Expiring);
    }

    /// Runs one fixed step.
    pub(crate) fn update(&mut self, delta: f32, terrain: &Terrain<'_>, bounds: &Rect) {
        if self.expired {
            return;
        }
        self.animation.update(delta);

        match self.animation.action() {
            ProjectileAction::Expiring => {
                if self.animation.elapsed() >= self.config.dissipation {
                    self.expired = true;
                }
            }
            action => {
                if action == ProjectileAction::Initialising
                    && self.animation.is_complete(&self.clips, self.direction)
                {
                    let _ = self.animation.update_action(ProjectileAction::Looping);
                }

                let travel = (self.config.speed * delta).min(self.remaining);
                self.position += self.direction.unit() * travel;
                self.remaining -= travel;
                self.travelled += travel;

                let hit = self.hit_bounds();
                if self.remaining <= RANGE_EPSILON
                    || terrain.collides(&hit)
                    || !bounds.overlaps(&hit)
                {
                    self.expire();
                }
            }
        }
    }
}

impl Positioned for Projectile {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn collision_bounds(&self) -> Rect {
        self.hit_bounds()
    }
}

impl Animated for Projectile {
    fn frame(&self) -> Option<&FrameKey> {
        if self.expired {
            return None;
        }
        self.animation.current_frame(&self.clips, self.direction)
    }

    fn animate(&mut self, delta: f32) {
        self.animation.update(delta);
    }
}
