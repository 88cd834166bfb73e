#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for one overworld chunk.
//!
//! A [`World`] owns the player, the chunk's monsters, collectables,
//! projectiles, trigger events and terrain. Adapters drive it exclusively
//! through [`apply`], which runs the fixed-step scheduler on
//! [`Command::Tick`], and read it back through the [`query`] module.

mod camera;
mod collectable;
pub mod config;
mod entity;
pub mod map;
mod monster;
mod movement;
pub mod persistence;
mod player;
mod projectile;
pub mod session;

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use glam::Vec2;
use overworld_core::{
    Action, ChunkCoord, Command, Direction, EntityId, Event, ProjectileAction, Rect, SaveValue,
    SoundCue,
};
use overworld_system_animation::AnimationSet;
use overworld_system_collision::ShapeSet;
use overworld_system_input::InputState;
use overworld_system_triggers::{EventAction, TriggerEvent, WorldProperties};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

pub use camera::Camera;
pub use collectable::{AnimatedObstacle, Collectable};
pub use entity::{Animated, Combatant, Positioned};
pub use monster::Monster;
pub use player::{Player, PLAYER_ID};
pub use projectile::Projectile;

use config::{CollectableTemplate, MonsterTemplate, ProjectileConfig, WorldConfig};
use map::{ChunkMap, LoadError, TileLayer};
use monster::{MonsterContext, MonsterSignal};
use movement::Terrain;
use persistence::{keys, SaveStore};
use player::{Boundary, PlayerSignal};

/// Chunk contents validated against the configuration, ready to be entered.
#[derive(Debug)]
pub struct PreparedChunk {
    coord: ChunkCoord,
    bounds: Rect,
    tile_size: (u32, u32),
    open_edges: [bool; 4],
    tiles: TileLayer,
    projectile_shapes: ShapeSet,
    walker_shapes: ShapeSet,
    monsters: BTreeMap<EntityId, Monster>,
    collectables: BTreeMap<EntityId, Collectable>,
    events: Vec<TriggerEvent>,
    animated: Vec<AnimatedObstacle>,
    animated_bounds: Vec<Rect>,
    rng: ChaCha8Rng,
    next_id: u32,
    music: Option<String>,
}

impl PreparedChunk {
    /// Coordinate of the prepared chunk.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World-space rectangle of the prepared chunk.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Message {
    name: String,
    text: String,
}

/// Represents the authoritative state of the loaded chunk and the player.
#[derive(Debug)]
pub struct World {
    config: Arc<WorldConfig>,
    chunk: PreparedChunk,
    player: Player,
    properties: WorldProperties,
    input: InputState,
    projectiles: Vec<Projectile>,
    projectile_config: Arc<ProjectileConfig>,
    projectile_clips: Arc<AnimationSet<ProjectileAction>>,
    slain: BTreeSet<String>,
    collected: BTreeSet<String>,
    messages: VecDeque<Message>,
    paused: bool,
    rendered_direction: Direction,
    accumulator: Duration,
    camera: Camera,
    render_order: Vec<EntityId>,
    transition: Option<Direction>,
    music_pending: Option<String>,
    tick_index: u64,
}

impl World {
    /// Validates a map against the configuration and builds its entities.
    ///
    /// `open_edges` is indexed by [`Direction::index`] and marks the edges
    /// that lead to another chunk.
    pub fn prepare(
        config: &WorldConfig,
        coord: ChunkCoord,
        map: &ChunkMap,
        open_edges: [bool; 4],
    ) -> Result<PreparedChunk, LoadError> {
        let mut monster_kinds: BTreeMap<u32, (Arc<MonsterTemplate>, Arc<AnimationSet<Action>>)> =
            BTreeMap::new();
        let mut monsters = BTreeMap::new();
        for placement in map.monsters() {
            let (template, clips) = match monster_kinds.get(&placement.kind) {
                Some(entry) => entry.clone(),
                None => {
                    let template = config.monster(placement.kind).ok_or_else(|| {
                        LoadError::UnknownMonsterType {
                            name: placement.name.clone(),
                            kind: placement.kind,
                        }
                    })?;
                    let required: &[Action] = if template.decorative {
                        &[Action::IdleMove]
                    } else {
                        &[
                            Action::IdleMove,
                            Action::Melee,
                            Action::Knockback,
                            Action::Expiring,
                        ]
                    };
                    let clips =
                        AnimationSet::from_manifest(&config.animations, &template.sheet, required)?;
                    let entry = (Arc::new(template.clone()), Arc::new(clips));
                    let _ = monster_kinds.insert(placement.kind, entry.clone());
                    entry
                }
            };
            let position = placement.anchor - Vec2::new(template.width as f32 * 0.5, 0.0);
            let id = EntityId::new(placement.object);
            let monster = Monster::new(
                id,
                placement.name.clone(),
                template,
                clips,
                position,
                !placement.hidden,
            );
            let _ = monsters.insert(id, monster);
        }

        let mut collectable_kinds: BTreeMap<
            u32,
            (Arc<CollectableTemplate>, Arc<AnimationSet<Action>>),
        > = BTreeMap::new();
        let mut collectables = BTreeMap::new();
        for placement in map.collectables() {
            let (template, clips) = match collectable_kinds.get(&placement.kind) {
                Some(entry) => entry.clone(),
                None => {
                    let template = config.collectable(placement.kind).ok_or_else(|| {
                        LoadError::UnknownCollectableType {
                            name: placement.name.clone(),
                            kind: placement.kind,
                        }
                    })?;
                    let clips = AnimationSet::from_manifest(
                        &config.animations,
                        &template.sheet,
                        &[Action::IdleMove],
                    )?;
                    let entry = (Arc::new(template.clone()), Arc::new(clips));
                    let _ = collectable_kinds.insert(placement.kind, entry.clone());
                    entry
                }
            };
            let position = placement.anchor - Vec2::new(template.width as f32 * 0.5, 0.0);
            let id = EntityId::new(placement.object);
            let collectable = Collectable::new(
                id,
                placement.name.clone(),
                template,
                clips,
                position,
                !placement.hidden,
            );
            let _ = collectables.insert(id, collectable);
        }

        for event in map.events() {
            for action in event.actions() {
                match action {
                    EventAction::Message { name } => {
                        if !config.messages.contains_key(name) {
                            return Err(LoadError::UnknownMessage {
                                event: event.id(),
                                key: name.clone(),
                            });
                        }
                    }
                    EventAction::Spawn { name } => {
                        let known = map.monsters().iter().any(|entry| &entry.name == name)
                            || map.collectables().iter().any(|entry| &entry.name == name);
                        if !known {
                            return Err(LoadError::UnknownSpawnTarget {
                                event: event.id(),
                                name: name.clone(),
                            });
                        }
                    }
                    EventAction::Set { .. } => {}
                }
            }
        }

        let mut sheets: BTreeMap<&str, Arc<AnimationSet<Action>>> = BTreeMap::new();
        let mut animated = Vec::with_capacity(map.animated().len());
        for placement in map.animated() {
            let clips = match sheets.get(placement.sheet.as_str()) {
                Some(clips) => Arc::clone(clips),
                None => {
                    let clips = Arc::new(AnimationSet::from_manifest(
                        &config.animations,
                        &placement.sheet,
                        &[Action::IdleMove],
                    )?);
                    let _ = sheets.insert(placement.sheet.as_str(), Arc::clone(&clips));
                    clips
                }
            };
            animated.push(AnimatedObstacle::new(
                EntityId::new(placement.object),
                placement.bounds,
                clips,
            ));
        }
        let animated_bounds = animated.iter().map(AnimatedObstacle::bounds).collect();

        Ok(PreparedChunk {
            coord,
            bounds: map.bounds(),
            tile_size: map.tile_size(),
            open_edges,
            tiles: map.tiles().clone(),
            projectile_shapes: map.obstacles().clone(),
            walker_shapes: ShapeSet::combined(map.obstacles(), map.groundless()),
            monsters,
            collectables,
            events: map.events().to_vec(),
            animated,
            animated_bounds,
            rng: ChaCha8Rng::seed_from_u64(config.seed ^ chunk_salt(coord)),
            next_id: map.max_object_id().saturating_add(1),
            music: map.music().map(str::to_owned),
        })
    }

    /// Creates a world around a prepared chunk and the player entering it.
    pub fn new(
        config: Arc<WorldConfig>,
        chunk: PreparedChunk,
        player: Player,
    ) -> Result<Self, LoadError> {
        let projectile_clips = AnimationSet::from_manifest(
            &config.animations,
            &config.projectile.sheet,
            &ProjectileAction::ALL,
        )?;
        let viewport = Vec2::new(config.viewport.width, config.viewport.height);
        let mut world = Self {
            rendered_direction: player.direction(),
            camera: Camera::new(viewport),
            music_pending: chunk.music.clone(),
            chunk,
            player,
            properties: WorldProperties::new(),
            input: InputState::new(),
            projectiles: Vec::new(),
            projectile_config: Arc::new(config.projectile.clone()),
            projectile_clips: Arc::new(projectile_clips),
            config,
            slain: BTreeSet::new(),
            collected: BTreeSet::new(),
            messages: VecDeque::new(),
            paused: false,
            accumulator: Duration::ZERO,
            render_order: Vec::new(),
            transition: None,
            tick_index: 0,
        };
        world.follow_camera();
        world.sort_render_order();
        info!(
            chunk = %world.chunk.coord,
            monsters = world.chunk.monsters.len(),
            collectables = world.chunk.collectables.len(),
            events = world.chunk.events.len(),
            "loaded chunk"
        );
        Ok(world)
    }

    /// Prepares the map and creates a world in one call.
    pub fn load(
        config: Arc<WorldConfig>,
        coord: ChunkCoord,
        map: &ChunkMap,
        open_edges: [bool; 4],
        player: Player,
    ) -> Result<Self, LoadError> {
        let chunk = Self::prepare(&config, coord, map, open_edges)?;
        Self::new(config, chunk, player)
    }

    /// Moves the player into another chunk through the given edge.
    ///
    /// The player, world properties, held keys and queued messages carry
    /// over; projectiles and chunk-local bookkeeping are dropped.
    pub fn enter_chunk(&mut self, chunk: PreparedChunk, edge: Direction) {
        let previous = self.chunk.coord;
        self.player.enter_through(edge, chunk.bounds);
        if chunk.music != self.chunk.music {
            self.music_pending = chunk.music.clone();
        }
        self.chunk = chunk;
        self.projectiles.clear();
        self.slain.clear();
        self.collected.clear();
        self.transition = None;
        self.rendered_direction = self.player.direction();
        self.follow_camera();
        self.sort_render_order();
        info!(from = %previous, to = %self.chunk.coord, "entered chunk");
    }

    /// Writes chunk, property and player state to the store.
    pub fn save(&self, store: &mut impl SaveStore) {
        let coord = self.chunk.coord;
        store.set(&keys::visited(coord), SaveValue::Bool(true));

        for monster in self.chunk.monsters.values() {
            let name = monster.name();
            let position = monster.position();
            store.set(
                &keys::monster(coord, name, "active"),
                SaveValue::Bool(monster.is_active()),
            );
            store.set(&keys::monster(coord, name, "x"), SaveValue::Float(position.x));
            store.set(&keys::monster(coord, name, "y"), SaveValue::Float(position.y));
            store.set(
                &keys::monster(coord, name, "direction"),
                SaveValue::Int(monster.direction().index() as i64),
            );
            store.set(
                &keys::monster(coord, name, "health"),
                SaveValue::Int(i64::from(monster.health())),
            );
            store.set(
                &keys::monster(coord, name, "aggressive"),
                SaveValue::Bool(monster.is_aggressive()),
            );
        }
        for name in &self.slain {
            store.set(&keys::monster(coord, name, "active"), SaveValue::Bool(false));
            store.set(&keys::monster(coord, name, "health"), SaveValue::Int(0));
        }

        for collectable in self.chunk.collectables.values() {
            store.set(
                &keys::collectable_active(coord, collectable.name()),
                SaveValue::Bool(collectable.is_active()),
            );
        }
        for name in &self.collected {
            store.set(&keys::collectable_active(coord, name), SaveValue::Bool(false));
        }

        for event in &self.chunk.events {
            store.set(
                &keys::event_triggered(coord, event.id()),
                SaveValue::Bool(event.is_triggered()),
            );
        }

        for (name, value) in self.properties.iter() {
            store.set(&keys::property(name), SaveValue::Text(value.to_owned()));
        }

        let position = self.player.position();
        store.set(keys::PLAYER_CHUNK_X, SaveValue::Int(i64::from(coord.x())));
        store.set(keys::PLAYER_CHUNK_Y, SaveValue::Int(i64::from(coord.y())));
        store.set(keys::PLAYER_X, SaveValue::Float(position.x));
        store.set(keys::PLAYER_Y, SaveValue::Float(position.y));
        store.set(
            keys::PLAYER_DIRECTION,
            SaveValue::Int(self.player.direction().index() as i64),
        );
        store.set(
            keys::PLAYER_HEALTH,
            SaveValue::Int(i64::from(self.player.health())),
        );
        store.set(
            keys::PLAYER_RESOURCES,
            SaveValue::Int(i64::from(self.player.resources())),
        );
    }

    /// Applies saved chunk state and world properties.
    pub fn restore(&mut self, store: &impl SaveStore) {
        let coord = self.chunk.coord;

        let mut removed = Vec::new();
        for (id, monster) in &mut self.chunk.monsters {
            let name = monster.name().to_owned();
            let Some(active) = store.get_bool(&keys::monster(coord, &name, "active")) else {
                continue;
            };
            let health = store
                .get_int(&keys::monster(coord, &name, "health"))
                .map_or(monster.health(), saturate_i32);
            if !active && health <= 0 {
                removed.push(*id);
                continue;
            }
            let position = monster.position();
            let x = store
                .get_float(&keys::monster(coord, &name, "x"))
                .unwrap_or(position.x);
            let y = store
                .get_float(&keys::monster(coord, &name, "y"))
                .unwrap_or(position.y);
            let direction = store
                .get_int(&keys::monster(coord, &name, "direction"))
                .and_then(direction_from_saved)
                .unwrap_or(monster.direction());
            let aggressive = store
                .get_bool(&keys::monster(coord, &name, "aggressive"))
                .unwrap_or(monster.is_aggressive());
            monster.restore(active, Vec2::new(x, y), direction, health, aggressive);
        }
        for id in removed {
            if let Some(monster) = self.chunk.monsters.remove(&id) {
                let _ = self.slain.insert(monster.name().to_owned());
            }
        }

        for collectable in self.chunk.collectables.values_mut() {
            if let Some(active) =
                store.get_bool(&keys::collectable_active(coord, collectable.name()))
            {
                collectable.set_active(active);
            }
        }

        for event in &mut self.chunk.events {
            if store
                .get_bool(&keys::event_triggered(coord, event.id()))
                .unwrap_or(false)
            {
                event.mark_triggered();
            }
        }

        for key in store.keys_with_prefix(keys::PROPERTY_PREFIX) {
            if let Some(value) = store.get_text(&key) {
                let _ = self
                    .properties
                    .set(&key[keys::PROPERTY_PREFIX.len()..], value);
            }
        }
        self.sort_render_order();
    }

    /// Applies saved player position, facing, health and resources.
    pub fn restore_player(&mut self, store: &impl SaveStore) {
        let position = self.player.position();
        let x = store.get_float(keys::PLAYER_X).unwrap_or(position.x);
        let y = store.get_float(keys::PLAYER_Y).unwrap_or(position.y);
        let direction = store
            .get_int(keys::PLAYER_DIRECTION)
            .and_then(direction_from_saved)
            .unwrap_or(self.player.direction());
        let health = store
            .get_int(keys::PLAYER_HEALTH)
            .map_or(self.player.health(), saturate_i32);
        let resources = store
            .get_int(keys::PLAYER_RESOURCES)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(self.player.resources());
        self.player
            .restore(Vec2::new(x, y), direction, health, resources);
        self.rendered_direction = direction;
        self.follow_camera();
        self.sort_render_order();
    }

    fn is_frozen(&self) -> bool {
        self.paused || !self.messages.is_empty()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.chunk.next_id);
        self.chunk.next_id = self.chunk.next_id.saturating_add(1);
        id
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if let Some(track) = self.music_pending.take() {
            out_events.push(Event::Music { track });
        }

        if dt > self.config.frame_ceiling() {
            warn!(?dt, "skipping frame above the delta ceiling");
            out_events.push(Event::FrameSkipped { dt });
            return;
        }

        let step = self.config.fixed_step();
        let delta = step.as_secs_f32();
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= step {
            self.accumulator -= step;
            self.step(delta, out_events);
            steps += 1;
        }

        self.sort_render_order();
        out_events.push(Event::TimeAdvanced { dt, steps });
    }

    fn step(&mut self, delta: f32, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.wrapping_add(1);

        if self.is_frozen() {
            self.step_frozen(delta);
            self.follow_camera();
            return;
        }

        self.update_player(delta, out_events);
        self.update_monsters(delta, out_events);
        for collectable in self.chunk.collectables.values_mut() {
            collectable.animate(delta);
        }
        for obstacle in &mut self.chunk.animated {
            obstacle.animate(delta);
        }
        self.update_projectiles(delta, out_events);
        self.resolve_pickups(out_events);
        self.resolve_player_melee(out_events);
        self.resolve_monster_melee(out_events);
        self.resolve_triggers(out_events);
        self.follow_camera();
    }

    fn step_frozen(&mut self, delta: f32) {
        let chunk = &mut self.chunk;
        let mut ignored = Vec::new();
        for monster in chunk.monsters.values_mut() {
            if !monster.is_decorative() {
                continue;
            }
            let mut context = MonsterContext {
                target: None,
                terrain: Terrain::new(&chunk.walker_shapes, &chunk.animated_bounds),
                bounds: chunk.bounds,
                rng: &mut chunk.rng,
            };
            monster.update(delta, &mut context, &mut ignored);
        }
        for collectable in chunk.collectables.values_mut() {
            collectable.animate(delta);
        }
        for obstacle in &mut chunk.animated {
            obstacle.animate(delta);
        }
    }

    fn update_player(&mut self, delta: f32, out_events: &mut Vec<Event>) {
        let terrain = Terrain::new(&self.chunk.walker_shapes, &self.chunk.animated_bounds);
        let boundary = Boundary {
            bounds: self.chunk.bounds,
            open: self.chunk.open_edges,
            rendered: self.rendered_direction,
        };
        let mut signals = Vec::new();
        self.player
            .update(delta, &mut self.input, &terrain, &boundary, &mut signals);

        for signal in signals {
            match signal {
                PlayerSignal::Sound(cue) => out_events.push(Event::Sound { cue }),
                PlayerSignal::Launch { origin, direction } => {
                    let id = self.allocate_id();
                    self.projectiles.push(Projectile::launch(
                        id,
                        Arc::clone(&self.projectile_config),
                        Arc::clone(&self.projectile_clips),
                        origin,
                        direction,
                    ));
                    debug!(projectile = id.get(), ?direction, "projectile launched");
                    out_events.push(Event::ProjectileLaunched {
                        projectile: id,
                        direction,
                    });
                }
                PlayerSignal::Dying => {
                    for monster in self.chunk.monsters.values_mut() {
                        monster.set_aggressive(false);
                    }
                }
                PlayerSignal::Defeated => {
                    info!("player defeated");
                    out_events.push(Event::PlayerDefeated);
                }
                PlayerSignal::LeaveChunk(direction) => {
                    if self.transition.is_none() {
                        self.transition = Some(direction);
                        info!(chunk = %self.chunk.coord, ?direction, "chunk transition requested");
                        out_events.push(Event::ChunkTransitionRequested { direction });
                    }
                }
            }
        }
    }

    fn update_monsters(&mut self, delta: f32, out_events: &mut Vec<Event>) {
        let target = (!self.player.is_expiring()).then(|| self.player.center());
        let chunk = &mut self.chunk;
        let mut signals = Vec::new();
        let mut expired = Vec::new();

        for (id, monster) in &mut chunk.monsters {
            let mut context = MonsterContext {
                target,
                terrain: Terrain::new(&chunk.walker_shapes, &chunk.animated_bounds),
                bounds: chunk.bounds,
                rng: &mut chunk.rng,
            };
            monster.update(delta, &mut context, &mut signals);
            if monster.expire_complete() {
                expired.push(*id);
            }
        }

        for signal in signals {
            match signal {
                MonsterSignal::Sound(cue) => out_events.push(Event::Sound { cue }),
            }
        }

        for id in expired {
            if let Some(monster) = chunk.monsters.remove(&id) {
                debug!(monster = id.get(), name = monster.name(), "monster slain");
                let _ = self.slain.insert(monster.name().to_owned());
                out_events.push(Event::MonsterSlain {
                    monster: id,
                    name: monster.name().to_owned(),
                });
            }
        }
    }

    fn update_projectiles(&mut self, delta: f32, out_events: &mut Vec<Event>) {
        let chunk = &mut self.chunk;
        let terrain = Terrain::new(&chunk.projectile_shapes, &chunk.animated_bounds);
        for projectile in &mut self.projectiles {
            projectile.update(delta, &terrain, &chunk.bounds);
        }

        for projectile in &mut self.projectiles {
            if !projectile.in_flight() {
                continue;
            }
            let bounds = projectile.hit_bounds();
            let Some(monster) = chunk
                .monsters
                .values_mut()
                .find(|monster| is_target(monster, &bounds))
            else {
                continue;
            };
            projectile.expire();
            monster.hit(projectile.direction().opposite());
            out_events.push(Event::Sound {
                cue: SoundCue::Impact,
            });
            out_events.push(Event::MonsterHit {
                monster: monster.id(),
                health: monster.health(),
            });
        }

        self.projectiles
            .retain(|projectile| !projectile.expire_complete());
    }

    fn resolve_pickups(&mut self, out_events: &mut Vec<Event>) {
        if self.player.is_expiring() {
            return;
        }
        let footprint = self.player.collision_bounds();
        let picked: Vec<EntityId> = self
            .chunk
            .collectables
            .values()
            .filter(|item| item.is_active() && item.collision_bounds().overlaps(&footprint))
            .map(Positioned::id)
            .collect();

        for id in picked {
            let Some(item) = self.chunk.collectables.remove(&id) else {
                continue;
            };
            let total = self.player.add_resources(item.value());
            debug!(collectable = id.get(), name = item.name(), total, "collectable picked");
            let _ = self.collected.insert(item.name().to_owned());
            out_events.push(Event::Sound {
                cue: SoundCue::Pickup,
            });
            out_events.push(Event::CollectablePicked {
                collectable: id,
                name: item.name().to_owned(),
                total,
            });
        }
    }

    fn resolve_player_melee(&mut self, out_events: &mut Vec<Event>) {
        if !self.player.melee_ready() {
            return;
        }
        let Some(attack) = self.player.attack_bounds() else {
            return;
        };
        let incoming = self.player.direction().opposite();
        let Some(monster) = self
            .chunk
            .monsters
            .values_mut()
            .find(|monster| is_target(monster, &attack))
        else {
            return;
        };

        self.player.mark_melee_landed();
        monster.hit(incoming);
        out_events.push(Event::Sound { cue: SoundCue::Hurt });
        out_events.push(Event::MonsterHit {
            monster: monster.id(),
            health: monster.health(),
        });
    }

    fn resolve_monster_melee(&mut self, out_events: &mut Vec<Event>) {
        for monster in self.chunk.monsters.values_mut() {
            if self.player.is_expiring() {
                return;
            }
            if !monster.melee_ready() {
                continue;
            }
            let Some(attack) = monster.attack_bounds() else {
                continue;
            };
            if !attack.overlaps(&self.player.defense_bounds()) {
                continue;
            }
            monster.mark_melee_landed();
            self.player.hit(monster.direction().opposite());
            out_events.push(Event::Sound { cue: SoundCue::Hurt });
            out_events.push(Event::PlayerHit {
                health: self.player.health(),
            });
        }
    }

    fn resolve_triggers(&mut self, out_events: &mut Vec<Event>) {
        if self.player.is_expiring() {
            return;
        }
        let footprint = self.player.collision_bounds();
        for index in 0..self.chunk.events.len() {
            let Some(actions) = self.chunk.events[index]
                .try_fire(&footprint, &self.properties)
                .map(<[EventAction]>::to_vec)
            else {
                continue;
            };
            let event = self.chunk.events[index].id();
            debug!(event, actions = actions.len(), "event triggered");
            out_events.push(Event::EventTriggered { event });
            for action in actions {
                self.execute(action, out_events);
            }
        }
    }

    fn execute(&mut self, action: EventAction, out_events: &mut Vec<Event>) {
        match action {
            EventAction::Message { name } => {
                let Some(text) = self.config.messages.get(&name).cloned() else {
                    return;
                };
                let shown = self.messages.is_empty();
                if shown {
                    out_events.push(Event::MessageShown {
                        name: name.clone(),
                        text: text.clone(),
                    });
                }
                self.messages.push_back(Message { name, text });
            }
            EventAction::Spawn { name } => {
                if let Some(monster) = self
                    .chunk
                    .monsters
                    .values_mut()
                    .find(|monster| monster.name() == name)
                {
                    monster.activate();
                    out_events.push(Event::EntitySpawned {
                        entity: monster.id(),
                        name,
                    });
                } else if let Some(item) = self
                    .chunk
                    .collectables
                    .values_mut()
                    .find(|item| item.name() == name)
                {
                    item.set_active(true);
                    out_events.push(Event::EntitySpawned {
                        entity: item.id(),
                        name,
                    });
                }
            }
            EventAction::Set { property, value } => {
                let _ = self.properties.set(&property, &value);
                out_events.push(Event::PropertySet {
                    name: property,
                    value,
                });
            }
        }
    }

    fn dismiss_message(&mut self, out_events: &mut Vec<Event>) {
        if self.messages.pop_front().is_none() {
            return;
        }
        out_events.push(Event::MessageDismissed);
        if let Some(next) = self.messages.front() {
            out_events.push(Event::MessageShown {
                name: next.name.clone(),
                text: next.text.clone(),
            });
        }
    }

    fn follow_camera(&mut self) {
        self.camera
            .follow(self.player.center(), self.chunk.bounds);
    }

    fn sort_render_order(&mut self) {
        let mut entries: Vec<(EntityId, f32)> = Vec::new();
        if !self.player.is_defeated() {
            entries.push((PLAYER_ID, self.player.position().y));
        }
        entries.extend(
            self.chunk
                .monsters
                .values()
                .filter(|monster| monster.is_active())
                .map(|monster| (monster.id(), monster.position().y)),
        );
        entries.extend(
            self.chunk
                .collectables
                .values()
                .filter(|item| item.is_active())
                .map(|item| (item.id(), item.position().y)),
        );
        entries.extend(
            self.chunk
                .animated
                .iter()
                .map(|obstacle| (obstacle.id(), obstacle.position().y)),
        );
        entries.extend(
            self.projectiles
                .iter()
                .map(|projectile| (projectile.id(), projectile.position().y)),
        );
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        self.render_order = entries.into_iter().map(|(id, _)| id).collect();
    }
}

fn is_target(monster: &Monster, attack: &Rect) -> bool {
    monster.is_active()
        && !monster.is_decorative()
        && !monster.is_expiring()
        && monster.defense_bounds().overlaps(attack)
}

fn chunk_salt(coord: ChunkCoord) -> u64 {
    let packed = (u64::from(coord.x() as u32) << 32) | u64::from(coord.y() as u32);
    packed.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

fn saturate_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn direction_from_saved(index: i64) -> Option<Direction> {
    usize::try_from(index).ok().and_then(Direction::from_index)
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::KeyPressed { .. } | Command::KeyReleased { .. } => {
            let _ = world.input.handle(&command);
        }
        Command::SetPaused { paused } => world.paused = paused,
        Command::DismissMessage => world.dismiss_message(out_events),
        Command::AcknowledgeRender => world.rendered_direction = world.player.direction(),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec2;
    use overworld_core::{ChunkCoord, Direction, EntityId, Rect};
    use overworld_system_animation::FrameKey;
    use overworld_system_collision::ShapeSet;
    use overworld_system_triggers::{TriggerEvent, WorldProperties};

    use super::{
        Animated, Camera, Collectable, Combatant, Monster, Player, Positioned, Projectile, World,
        PLAYER_ID,
    };
    use crate::map::TileLayer;

    /// Sprite to draw for one entity.
    #[derive(Clone, Debug, PartialEq)]
    pub struct Sprite {
        /// Entity being drawn.
        pub entity: EntityId,
        /// Frame to display.
        pub frame: FrameKey,
        /// Lower-left corner of the sprite in world space.
        pub position: Vec2,
    }

    /// Kind of debug rectangle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum BoundsKind {
        /// Terrain footprint.
        Collision,
        /// Region that can be hit.
        Defense,
        /// Active melee hitbox.
        Attack,
    }

    /// Debug rectangle attached to an entity.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct DebugBounds {
        /// Entity owning the rectangle.
        pub entity: EntityId,
        /// Meaning of the rectangle.
        pub kind: BoundsKind,
        /// Rectangle in world space.
        pub rect: Rect,
    }

    /// Coordinate of the loaded chunk.
    #[must_use]
    pub fn chunk(world: &World) -> ChunkCoord {
        world.chunk.coord
    }

    /// World-space rectangle of the loaded chunk.
    #[must_use]
    pub fn bounds(world: &World) -> Rect {
        world.chunk.bounds
    }

    /// Tile width and height in world units.
    #[must_use]
    pub fn tile_size(world: &World) -> (u32, u32) {
        world.chunk.tile_size
    }

    /// Background tiles of the loaded chunk.
    #[must_use]
    pub fn tiles(world: &World) -> &TileLayer {
        &world.chunk.tiles
    }

    /// Shapes blocking walkers.
    #[must_use]
    pub fn walker_shapes(world: &World) -> &ShapeSet {
        &world.chunk.walker_shapes
    }

    /// Shapes blocking projectiles.
    #[must_use]
    pub fn projectile_shapes(world: &World) -> &ShapeSet {
        &world.chunk.projectile_shapes
    }

    /// The player.
    #[must_use]
    pub fn player(world: &World) -> &Player {
        &world.player
    }

    /// Monsters in ascending identifier order, dormant ones included.
    pub fn monsters(world: &World) -> impl Iterator<Item = &Monster> + '_ {
        world.chunk.monsters.values()
    }

    /// Monster with the given map name.
    #[must_use]
    pub fn monster<'a>(world: &'a World, name: &str) -> Option<&'a Monster> {
        world
            .chunk
            .monsters
            .values()
            .find(|monster| monster.name() == name)
    }

    /// Collectables in ascending identifier order, dormant ones included.
    pub fn collectables(world: &World) -> impl Iterator<Item = &Collectable> + '_ {
        world.chunk.collectables.values()
    }

    /// Projectiles in launch order.
    #[must_use]
    pub fn projectiles(world: &World) -> &[Projectile] {
        &world.projectiles
    }

    /// Trigger events ordered by identifier.
    #[must_use]
    pub fn events(world: &World) -> &[TriggerEvent] {
        &world.chunk.events
    }

    /// Properties written by `set` actions.
    #[must_use]
    pub fn properties(world: &World) -> &WorldProperties {
        &world.properties
    }

    /// Names of monsters removed after dying in this chunk.
    pub fn slain(world: &World) -> impl Iterator<Item = &str> + '_ {
        world.slain.iter().map(String::as_str)
    }

    /// Conversation message currently shown, as `(name, text)`.
    #[must_use]
    pub fn active_message(world: &World) -> Option<(&str, &str)> {
        world
            .messages
            .front()
            .map(|message| (message.name.as_str(), message.text.as_str()))
    }

    /// Number of queued conversation messages, including the active one.
    #[must_use]
    pub fn queued_messages(world: &World) -> usize {
        world.messages.len()
    }

    /// Reports whether gameplay is paused by the adapter.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Reports whether gameplay evaluation is suspended.
    #[must_use]
    pub fn is_frozen(world: &World) -> bool {
        world.is_frozen()
    }

    /// Simulation time not yet consumed by fixed steps.
    #[must_use]
    pub fn accumulator(world: &World) -> Duration {
        world.accumulator
    }

    /// Number of fixed steps executed since the world was created.
    #[must_use]
    pub fn steps(world: &World) -> u64 {
        world.tick_index
    }

    /// Camera following the player.
    #[must_use]
    pub fn camera(world: &World) -> Camera {
        world.camera
    }

    /// Edge the player asked to leave through, if any.
    #[must_use]
    pub fn pending_transition(world: &World) -> Option<Direction> {
        world.transition
    }

    /// Sprites in render order, back to front.
    #[must_use]
    pub fn sprites(world: &World) -> Vec<Sprite> {
        world
            .render_order
            .iter()
            .filter_map(|id| {
                let (frame, position) = entity_frame(world, *id)?;
                Some(Sprite {
                    entity: *id,
                    frame: frame.clone(),
                    position,
                })
            })
            .collect()
    }

    fn entity_frame(world: &World, id: EntityId) -> Option<(&FrameKey, Vec2)> {
        if id == PLAYER_ID {
            return Some((world.player.frame()?, world.player.position()));
        }
        if let Some(monster) = world.chunk.monsters.get(&id) {
            return Some((monster.frame()?, monster.position()));
        }
        if let Some(item) = world.chunk.collectables.get(&id) {
            return Some((item.frame()?, item.position()));
        }
        if let Some(obstacle) = world
            .chunk
            .animated
            .iter()
            .find(|obstacle| obstacle.id() == id)
        {
            return Some((obstacle.frame()?, obstacle.position()));
        }
        let projectile = world
            .projectiles
            .iter()
            .find(|projectile| projectile.id() == id)?;
        Some((projectile.frame()?, projectile.position()))
    }

    /// Collision, defense and attack rectangles of every live entity.
    #[must_use]
    pub fn debug_bounds(world: &World) -> Vec<DebugBounds> {
        let mut bounds = Vec::new();
        if !world.player.is_defeated() {
            push_combatant(&mut bounds, &world.player);
        }
        for monster in world
            .chunk
            .monsters
            .values()
            .filter(|monster| monster.is_active())
        {
            push_combatant(&mut bounds, monster);
        }
        for projectile in &world.projectiles {
            bounds.push(DebugBounds {
                entity: projectile.id(),
                kind: BoundsKind::Collision,
                rect: projectile.collision_bounds(),
            });
        }
        bounds
    }

    fn push_combatant(bounds: &mut Vec<DebugBounds>, entity: &impl Combatant) {
        bounds.push(DebugBounds {
            entity: entity.id(),
            kind: BoundsKind::Collision,
            rect: entity.collision_bounds(),
        });
        bounds.push(DebugBounds {
            entity: entity.id(),
            kind: BoundsKind::Defense,
            rect: entity.defense_bounds(),
        });
        if let Some(rect) = entity.attack_bounds() {
            bounds.push(DebugBounds {
                entity: entity.id(),
                kind: BoundsKind::Attack,
                rect,
            });
        }
    }
}
