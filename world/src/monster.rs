//! Monster state machine and wandering behavior.

use std::sync::Arc;

use glam::Vec2;
use overworld_core::{Action, Direction, EntityId, Rect, SoundCue};
use overworld_system_animation::{AnimationSet, AnimationState, FrameKey};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp1};

use crate::{
    config::MonsterTemplate,
    entity::{melee_box, Animated, Combatant, Positioned},
    movement::{self, Terrain},
};

/// Shortest time spent idling or walking before a wanderer reconsiders.
pub(crate) const MIN_RAND_TIME: f32 = 0.5;
/// Longest time spent idling or walking before a wanderer reconsiders.
pub(crate) const MAX_RAND_TIME: f32 = 2.0;
/// Mean of the exponential part of a wander duration.
const WANDER_MEAN_EXTRA: f32 = 0.5;

/// Outcomes of a monster step that the world must act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MonsterSignal {
    Sound(SoundCue),
}

/// Surroundings a monster reacts to during one step.
pub(crate) struct MonsterContext<'a, 'r> {
    pub(crate) target: Option<Vec2>,
    pub(crate) terrain: Terrain<'a>,
    pub(crate) bounds: Rect,
    pub(crate) rng: &'r mut ChaCha8Rng,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Wander {
    moving: bool,
    timer: f32,
}

/// Hostile or decorative creature placed by the map.
#[derive(Clone, Debug)]
pub struct Monster {
    id: EntityId,
    name: String,
    template: Arc<MonsterTemplate>,
    clips: Arc<AnimationSet<Action>>,
    position: Vec2,
    direction: Direction,
    health: i32,
    aggressive: bool,
    active: bool,
    animation: AnimationState<Action>,
    melee_landed: bool,
    cooldown: f32,
    wander: Wander,
    expired: bool,
}

impl Monster {
    pub(crate) fn new(
        id: EntityId,
        name: String,
        template: Arc<MonsterTemplate>,
        clips: Arc<AnimationSet<Action>>,
        position: Vec2,
        active: bool,
    ) -> Self {
        Self {
            id,
            name,
            health: template.health,
            aggressive: template.aggressive,
            cooldown: template.melee_cooldown,
            template,
            clips,
            position,
            direction: Direction::Down,
            active,
            animation: AnimationState::new(Action::IdleMove),
            melee_landed: false,
            wander: Wander {
                moving: false,
                timer: 0.0,
            },
            expired: false,
        }
    }

    /// Map-assigned name, unique within the chunk.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map `type` selecting the template.
    #[must_use]
    pub fn kind(&self) -> u32 {
        self.template.kind
    }

    /// Current action.
    #[must_use]
    pub fn action(&self) -> Action {
        self.animation.action()
    }

    /// Reports whether the monster hunts the player.
    #[must_use]
    pub const fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Reports whether the monster takes part in the simulation.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Reports whether the monster only wanders for decoration.
    #[must_use]
    pub fn is_decorative(&self) -> bool {
        self.template.decorative
    }

    /// Reports whether the death animation finished.
    #[must_use]
    pub const fn expire_complete(&self) -> bool {
        self.expired
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub(crate) fn set_aggressive(&mut self, aggressive: bool) {
        self.aggressive = aggressive;
    }

    pub(crate) fn restore(
        &mut self,
        active: bool,
        position: Vec2,
        direction: Direction,
        health: i32,
        aggressive: bool,
    ) {
        self.active = active;
        self.position = position;
        self.direction = direction;
        self.health = health;
        self.aggressive = aggressive;
    }

    /// Runs one fixed step of the state machine.
    pub(crate) fn update(
        &mut self,
        delta: f32,
        context: &mut MonsterContext<'_, '_>,
        out: &mut Vec<MonsterSignal>,
    ) {
        if !self.active || self.expired {
            return;
        }
        self.animation.update(delta);

        if self.template.decorative {
            self.wander(delta, context);
            return;
        }

        self.cooldown += delta;
        let action = self.animation.action();
        if action == Action::Expiring {
            if self.animation.is_complete(&self.clips, self.direction) {
                self.expired = true;
            }
            return;
        }

        if self.health <= 0 && action != Action::Knockback {
            let _ = self.animation.update_action(Action::Expiring);
            out.push(MonsterSignal::Sound(SoundCue::MonsterDeath));
            return;
        }

        match action {
            Action::Melee | Action::Special => {
                if self.animation.is_complete(&self.clips, self.direction) {
                    let _ = self.animation.update_action(Action::IdleMove);
                    self.cooldown = 0.0;
                }
            }
            Action::Knockback => {
                let push =
                    self.direction.opposite().unit() * self.template.knockback_speed * delta;
                let terrain = context.terrain.fenced(context.bounds);
                let _ = movement::try_move(
                    &mut self.position,
                    &self.template.collision,
                    push,
                    &terrain,
                );
                if self.animation.is_complete(&self.clips, self.direction) {
                    let _ = self.animation.update_action(Action::IdleMove);
                }
            }
            Action::IdleMove => match context.target {
                Some(target) if self.aggressive => self.chase(delta, target, context, out),
                _ => self.wander(delta, context),
            },
            Action::Expiring => {}
        }
    }

    fn chase(
        &mut self,
        delta: f32,
        target: Vec2,
        context: &MonsterContext<'_, '_>,
        out: &mut Vec<MonsterSignal>,
    ) {
        let offset = target - self.center();
        self.direction = if offset.x.abs() > offset.y.abs() {
            if offset.x < 0.0 {
                Direction::Left
            } else {
                Direction::Right
            }
        } else if offset.y < 0.0 {
            Direction::Down
        } else {
            Direction::Up
        };

        let window = self.template.attack_window;
        let (along, across) = if self.direction.is_horizontal() {
            (offset.x.abs(), offset.y.abs())
        } else {
            (offset.y.abs(), offset.x.abs())
        };
        if along <= window.along
            && across <= window.across
            && self.cooldown >= self.template.melee_cooldown
        {
            self.melee_landed = false;
            let _ = self.animation.update_action(Action::Melee);
            out.push(MonsterSignal::Sound(SoundCue::Swing));
            return;
        }

        let distance = self.template.speed * delta;
        let terrain = context.terrain.fenced(context.bounds);
        let footprint = self.template.collision;

        // A blocked x move still uses up the step.
        if offset.x.abs() > distance {
            let step = Vec2::new(distance.copysign(offset.x), 0.0);
            let _ = movement::try_move(&mut self.position, &footprint, step, &terrain);
        } else if offset.y.abs() > distance {
            let step = Vec2::new(0.0, distance.copysign(offset.y));
            let _ = movement::try_move(&mut self.position, &footprint, step, &terrain);
        }
    }

    fn wander(&mut self, delta: f32, context: &mut MonsterContext<'_, '_>) {
        self.wander.timer -= delta;
        if self.wander.timer <= 0.0 {
            self.wander.moving = !self.wander.moving;
            self.wander.timer = wander_time(context.rng);
            if self.wander.moving {
                self.direction = Direction::ALL[context.rng.gen_range(0..Direction::ALL.len())];
            }
        }
        if !self.wander.moving {
            return;
        }

        let step = self.direction.unit() * self.template.speed * delta;
        if self.template.decorative {
            self.position += step;
            self.clamp_sprite(context.bounds);
        } else {
            let terrain = context.terrain.fenced(context.bounds);
            let _ = movement::try_move(
                &mut self.position,
                &self.template.collision,
                step,
                &terrain,
            );
        }
    }

    fn clamp_sprite(&mut self, bounds: Rect) {
        let max_x = (bounds.right() - self.template.width as f32).max(bounds.x);
        let max_y = (bounds.top() - self.template.height as f32).max(bounds.y);
        self.position.x = self.position.x.clamp(bounds.x, max_x);
        self.position.y = self.position.y.clamp(bounds.y, max_y);
    }
}

/// Draws the next idle or walk duration, exponentially distributed above
/// [`MIN_RAND_TIME`] and capped at [`MAX_RAND_TIME`].
fn wander_time(rng: &mut ChaCha8Rng) -> f32 {
    let extra: f32 = Exp1.sample(rng);
    (MIN_RAND_TIME + extra * WANDER_MEAN_EXTRA).min(MAX_RAND_TIME)
}

impl Positioned for Monster {
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
        self.direction
    }

    fn collision_bounds(&self) -> Rect {
        self.template.collision.at(self.position)
    }
}

impl Animated for Monster {
    fn frame(&self) -> Option<&FrameKey> {
        if !self.active || self.expired {
            return None;
        }
        self.animation.current_frame(&self.clips, self.direction)
    }

    fn animate(&mut self, delta: f32) {
        self.animation.update(delta);
    }
}

impl Combatant for Monster {
    fn health(&self) -> i32 {
        self.health
    }

    fn max_health(&self) -> i32 {
        self.template.health
    }

    fn defense_bounds(&self) -> Rect {
        self.template.defense.at(self.position)
    }

    fn attack_bounds(&self) -> Option<Rect> {
        (self.animation.action() == Action::Melee).then(|| {
            melee_box(
                self.defense_bounds(),
                self.direction,
                self.template.melee_reach,
            )
        })
    }

    fn melee_ready(&self) -> bool {
        self.active
            && self.animation.action() == Action::Melee
            && !self.melee_landed
            && self.animation.elapsed() >= self.template.melee_delay
    }

    fn mark_melee_landed(&mut self) {
        self.melee_landed = true;
    }

    fn hit(&mut self, direction: Direction) {
        if self.is_expiring() || self.template.decorative {
            return;
        }
        self.health -= 1;
        self.aggressive = true;
        self.direction = direction;
        if self.animation.action() == Action::IdleMove && self.health > 0 {
            let _ = self.animation.update_action(Action::Knockback);
        }
    }

    fn is_expiring(&self) -> bool {
        self.expired || self.animation.action() == Action::Expiring
    }
}
