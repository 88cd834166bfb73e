//! Player state machine.

use std::sync::Arc;

use glam::Vec2;
use overworld_core::{Action, Direction, EntityId, Key, Rect, SoundCue};
use overworld_system_animation::{AnimationError, AnimationSet, AnimationState, FrameKey};
use overworld_system_input::InputSource;

use crate::{
    config::WorldConfig,
    entity::{melee_box, Animated, Combatant, Positioned},
    movement::{self, Terrain},
};

/// Identifier reserved for the player in every chunk.
pub const PLAYER_ID: EntityId = EntityId::new(0);

/// Gap kept between the player's footprint and the edge it entered through.
const EDGE_MARGIN: f32 = 1.0;

/// Outcomes of a player step that the world must act on.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PlayerSignal {
    Sound(SoundCue),
    Launch { origin: Vec2, direction: Direction },
    Dying,
    Defeated,
    LeaveChunk(Direction),
}

/// Chunk limits seen by the player during a step.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Boundary {
    pub(crate) bounds: Rect,
    pub(crate) open: [bool; 4],
    pub(crate) rendered: Direction,
}

/// The single player-controlled entity, carried between chunks.
#[derive(Clone, Debug)]
pub struct Player {
    config: Arc<WorldConfig>,
    clips: Arc<AnimationSet<Action>>,
    position: Vec2,
    direction: Direction,
    health: i32,
    resources: u32,
    animation: AnimationState<Action>,
    melee_landed: bool,
    footstep_timer: f32,
    defeated: bool,
}

impl Player {
    /// Creates a full-health player with its lower-left corner at `position`.
    pub fn spawn(config: Arc<WorldConfig>, position: Vec2) -> Result<Self, AnimationError> {
        let clips = AnimationSet::from_manifest(
            &config.animations,
            &config.player.sheet,
            &Action::ALL,
        )?;
        Ok(Self {
            health: config.player.health,
            config,
            clips: Arc::new(clips),
            position,
            direction: Direction::Down,
            resources: 0,
            animation: AnimationState::new(Action::IdleMove),
            melee_landed: false,
            footstep_timer: 0.0,
            defeated: false,
        })
    }

    /// Current action.
    #[must_use]
    pub fn action(&self) -> Action {
        self.animation.action()
    }

    /// Seconds spent in the current action.
    #[must_use]
    pub fn state_time(&self) -> f32 {
        self.animation.elapsed()
    }

    /// Collected resource count.
    #[must_use]
    pub const fn resources(&self) -> u32 {
        self.resources
    }

    /// Reports whether the death animation finished.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Adds collected resources, returning the new total.
    pub fn add_resources(&mut self, amount: u32) -> u32 {
        self.resources = self.resources.saturating_add(amount);
        self.resources
    }

    /// Overwrites persisted fields after loading a save.
    pub fn restore(&mut self, position: Vec2, direction: Direction, health: i32, resources: u32) {
        self.position = position;
        self.direction = direction;
        self.health = health;
        self.resources = resources;
    }

    /// Moves the player without collision checks.
    pub fn place(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Places the footprint just inside `region` along `edge`, keeping the other axis.
    pub fn enter_through(&mut self, edge: Direction, region: Rect) {
        let footprint = self.config.player.collision;
        match edge {
            Direction::Left => self.position.x = region.x + EDGE_MARGIN - footprint.x,
            Direction::Right => {
                self.position.x = region.right() - EDGE_MARGIN - footprint.width - footprint.x;
            }
            Direction::Down => self.position.y = region.y + EDGE_MARGIN - footprint.y,
            Direction::Up => {
                self.position.y = region.top() - EDGE_MARGIN - footprint.height - footprint.y;
            }
        }
    }

    /// Runs one fixed step of the state machine.
    pub(crate) fn update<I: InputSource>(
        &mut self,
        delta: f32,
        input: &mut I,
        terrain: &Terrain<'_>,
        boundary: &Boundary,
        out: &mut Vec<PlayerSignal>,
    ) {
        if self.defeated {
            return;
        }
        self.animation.update(delta);

        let action = self.animation.action();
        if action == Action::Expiring {
            if self.animation.is_complete(&self.clips, self.direction) {
                self.defeated = true;
                out.push(PlayerSignal::Defeated);
            }
            return;
        }

        if self.health <= 0 && action != Action::Knockback {
            self.direction = Direction::Down;
            let _ = self.animation.update_action(Action::Expiring);
            out.push(PlayerSignal::Dying);
            out.push(PlayerSignal::Sound(SoundCue::PlayerDeath));
            return;
        }

        match action {
            Action::Melee | Action::Special => {
                if self.animation.is_complete(&self.clips, self.direction) {
                    let _ = self.animation.update_action(Action::IdleMove);
                }
            }
            Action::Knockback => {
                let push =
                    self.direction.opposite().unit() * self.config.player.knockback_speed * delta;
                let fenced = terrain.fenced(boundary.bounds);
                let _ = movement::try_move(
                    &mut self.position,
                    &self.config.player.collision,
                    push,
                    &fenced,
                );
                if self.animation.is_complete(&self.clips, self.direction) {
                    let _ = self.animation.update_action(Action::IdleMove);
                    self.footstep_timer = 0.0;
                }
            }
            Action::IdleMove => self.idle_move(delta, input, terrain, boundary, out),
            Action::Expiring => {}
        }
    }

    fn idle_move<I: InputSource>(
        &mut self,
        delta: f32,
        input: &mut I,
        terrain: &Terrain<'_>,
        boundary: &Boundary,
        out: &mut Vec<PlayerSignal>,
    ) {
        if input.is_actionable(Key::Attack) && input.consume(Key::Attack) {
            self.melee_landed = false;
            let _ = self.animation.update_action(Action::Melee);
            out.push(PlayerSignal::Sound(SoundCue::Swing));
            return;
        }

        if input.is_actionable(Key::Special) && input.consume(Key::Special) {
            let _ = self.animation.update_action(Action::Special);
            let offset = self.config.projectile.launch_offsets.get(self.direction);
            out.push(PlayerSignal::Launch {
                origin: self.center() + offset,
                direction: self.direction,
            });
            out.push(PlayerSignal::Sound(SoundCue::Fireball));
            return;
        }

        if let Some(priority) = input.movement_priority() {
            self.direction = priority;
        }

        let held = input.held_directions();
        let distance = self.config.player.speed * delta;
        let moved = movement::walk(
            &mut self.position,
            &self.config.player.collision,
            &held,
            distance,
            terrain,
        );
        self.keep_inside(boundary, out);

        if moved {
            self.footstep_timer += delta;
            if self.footstep_timer >= self.config.player.footstep_interval {
                self.footstep_timer -= self.config.player.footstep_interval;
                out.push(PlayerSignal::Sound(SoundCue::Footstep));
            }
        } else {
            self.footstep_timer = 0.0;
        }
    }

    /// Clamps the footprint to the chunk, requesting a transition across open edges.
    fn keep_inside(&mut self, boundary: &Boundary, out: &mut Vec<PlayerSignal>) {
        let footprint = self.collision_bounds();
        let region = boundary.bounds;

        let crossings = [
            (Direction::Left, region.x - footprint.x),
            (Direction::Right, footprint.right() - region.right()),
            (Direction::Down, region.y - footprint.y),
            (Direction::Up, footprint.top() - region.top()),
        ];

        let mut requested = false;
        for (edge, overshoot) in crossings {
            if overshoot <= 0.0 {
                continue;
            }
            if !requested && boundary.open[edge.index()] && boundary.rendered == self.direction {
                out.push(PlayerSignal::LeaveChunk(edge));
                requested = true;
            }
            match edge {
                Direction::Left => self.position.x += overshoot,
                Direction::Right => self.position.x -= overshoot,
                Direction::Down => self.position.y += overshoot,
                Direction::Up => self.position.y -= overshoot,
            }
        }
    }
}

impl Positioned for Player {
    fn id(&self) -> EntityId {
        PLAYER_ID
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> (u32, u32) {
        (self.config.player.width, self.config.player.height)
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn collision_bounds(&self) -> Rect {
        self.config.player.collision.at(self.position)
    }
}

impl Animated for Player {
    fn frame(&self) -> Option<&FrameKey> {
        if self.defeated {
            return None;
        }
        self.animation.current_frame(&self.clips, self.direction)
    }

    fn animate(&mut self, delta: f32) {
        self.animation.update(delta);
    }
}

impl Combatant for Player {
    fn health(&self) -> i32 {
        self.health
    }

    fn max_health(&self) -> i32 {
        self.config.player.health
    }

    fn defense_bounds(&self) -> Rect {
        self.config.player.defense.at(self.position)
    }

    fn attack_bounds(&self) -> Option<Rect> {
        (self.animation.action() == Action::Melee).then(|| {
            melee_box(
                self.defense_bounds(),
                self.direction,
                self.config.player.melee_reach,
            )
        })
    }

    fn melee_ready(&self) -> bool {
        self.animation.action() == Action::Melee
            && !self.melee_landed
            && self.animation.elapsed() >= self.config.player.melee_delay
    }

    fn mark_melee_landed(&mut self) {
        self.melee_landed = true;
    }

    fn hit(&mut self, direction: Direction) {
        if self.is_expiring() {
            return;
        }
        self.health -= 1;
        self.direction = direction;
        if self.animation.action() == Action::IdleMove && self.health > 0 {
            let _ = self.animation.update_action(Action::Knockback);
        }
    }

    fn is_expiring(&self) -> bool {
        self.defeated || self.animation.action() == Action::Expiring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overworld_system_collision::ShapeSet;
    use overworld_system_input::InputState;

    const STEP: f32 = 1.0 / 120.0;

    fn player() -> Player {
        Player::spawn(Arc::new(WorldConfig::default()), Vec2::new(100.0, 100.0))
            .expect("default sheets")
    }

    fn boundary() -> Boundary {
        Boundary {
            bounds: Rect::new(0.0, 0.0, 320.0, 320.0),
            open: [true; 4],
            rendered: Direction::Down,
        }
    }

    fn step(player: &mut Player, input: &mut InputState) -> Vec<PlayerSignal> {
        let shapes = ShapeSet::default();
        let terrain = Terrain::new(&shapes, &[]);
        let mut out = Vec::new();
        player.update(STEP, input, &terrain, &boundary(), &mut out);
        out
    }

    #[test]
    fn hit_while_idle_recoils() {
        let mut player = player();
        player.hit(Direction::Left);
        assert_eq!(player.action(), Action::Knockback);
        assert_eq!(player.health(), 5);
        assert_eq!(Positioned::direction(&player), Direction::Left);
    }

    #[test]
    fn hit_while_attacking_keeps_the_swing() {
        let mut player = player();
        let mut input = InputState::new();
        input.press(Key::Attack);
        let signals = step(&mut player, &mut input);
        assert!(signals.contains(&PlayerSignal::Sound(SoundCue::Swing)));
        assert_eq!(player.action(), Action::Melee);

        player.hit(Direction::Up);
        assert_eq!(player.action(), Action::Melee);
        assert_eq!(player.health(), 5);
    }

    #[test]
    fn knockback_pushes_away_from_the_attacker() {
        let mut player = player();
        let mut input = InputState::new();
        player.hit(Direction::Right);
        let before = player.position();
        let _ = step(&mut player, &mut input);
        assert!(player.position().x < before.x);
    }

    #[test]
    fn fatal_hit_expires_on_the_next_step_and_reports_once() {
        let mut player = player();
        let mut input = InputState::new();
        player.restore(Vec2::new(100.0, 100.0), Direction::Left, 1, 0);
        player.hit(Direction::Up);
        assert_eq!(player.health(), 0);
        assert_eq!(player.action(), Action::IdleMove);

        let signals = step(&mut player, &mut input);
        assert!(signals.contains(&PlayerSignal::Dying));
        assert_eq!(player.action(), Action::Expiring);
        assert_eq!(Positioned::direction(&player), Direction::Down);

        let mut defeated = 0;
        for _ in 0..240 {
            defeated += step(&mut player, &mut input)
                .iter()
                .filter(|signal| **signal == PlayerSignal::Defeated)
                .count();
        }
        assert_eq!(defeated, 1);
        assert!(player.is_defeated());
        assert!(player.frame().is_none());
    }

    #[test]
    fn special_launches_in_facing_direction() {
        let mut player = player();
        let mut input = InputState::new();
        input.press(Key::Special);
        let signals = step(&mut player, &mut input);
        assert!(signals.iter().any(|signal| matches!(
            signal,
            PlayerSignal::Launch {
                direction: Direction::Down,
                ..
            }
        )));

        // Holding the key does not fire again once the swing ends.
        for _ in 0..120 {
            let signals = step(&mut player, &mut input);
            assert!(!signals
                .iter()
                .any(|signal| matches!(signal, PlayerSignal::Launch { .. })));
        }
    }

    #[test]
    fn crossing_an_open_edge_requests_a_transition_and_clamps() {
        let mut player = player();
        player.place(Vec2::new(-3.0, 100.0));
        let mut input = InputState::new();
        input.press(Key::Left);
        let shapes = ShapeSet::default();
        let terrain = Terrain::new(&shapes, &[]);
        let mut out = Vec::new();
        let boundary = Boundary {
            rendered: Direction::Left,
            ..boundary()
        };
        player.update(STEP, &mut input, &terrain, &boundary, &mut out);
        assert!(out.contains(&PlayerSignal::LeaveChunk(Direction::Left)));
        assert!(player.collision_bounds().x >= 0.0);
    }

    #[test]
    fn stale_rendered_facing_blocks_the_transition() {
        let mut player = player();
        player.place(Vec2::new(-3.0, 100.0));
        let mut input = InputState::new();
        input.press(Key::Left);
        let signals = step(&mut player, &mut input);
        assert!(!signals
            .iter()
            .any(|signal| matches!(signal, PlayerSignal::LeaveChunk(_))));
        assert!(player.collision_bounds().x >= 0.0);
    }

    #[test]
    fn entering_places_footprint_inside_the_edge() {
        let mut player = player();
        let region = Rect::new(0.0, 0.0, 320.0, 320.0);
        player.enter_through(Direction::Right, region);
        let footprint = player.collision_bounds();
        assert!(region.contains_rect(&footprint));
        assert!((region.right() - footprint.right() - EDGE_MARGIN).abs() < 1e-4);
    }
}
