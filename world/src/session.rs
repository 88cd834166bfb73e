//! Chunk streaming across the overworld grid.

use std::{collections::BTreeMap, sync::Arc};

use glam::Vec2;
use overworld_core::{ChunkCoord, Command, Direction, Event, SaveValue};
use tracing::info;

use crate::{
    apply,
    config::WorldConfig,
    map::{ChunkMap, LoadError},
    persistence::{keys, SaveStore},
    Player, World,
};

/// Provides chunk maps by coordinate.
pub trait ChunkSource {
    /// Loads and parses the map of a chunk.
    fn load(&self, chunk: ChunkCoord) -> Result<ChunkMap, LoadError>;

    /// Reports whether a map exists for the chunk.
    fn contains(&self, chunk: ChunkCoord) -> bool;
}

/// Chunk maps held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    maps: BTreeMap<ChunkCoord, ChunkMap>,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a Tiled JSON document for the chunk.
    pub fn insert(&mut self, chunk: ChunkCoord, document: &str) -> Result<(), LoadError> {
        let map = ChunkMap::parse(document)?;
        let _ = self.maps.insert(chunk, map);
        Ok(())
    }
}

impl ChunkSource for MemorySource {
    fn load(&self, chunk: ChunkCoord) -> Result<ChunkMap, LoadError> {
        self.maps
            .get(&chunk)
            .cloned()
            .ok_or_else(|| LoadError::Unavailable {
                chunk,
                reason: "no map registered".to_owned(),
            })
    }

    fn contains(&self, chunk: ChunkCoord) -> bool {
        self.maps.contains_key(&chunk)
    }
}

/// Edges of `chunk` that lead to an existing neighbor.
pub fn open_edges(source: &impl ChunkSource, chunk: ChunkCoord) -> [bool; 4] {
    let mut open = [false; 4];
    for direction in Direction::ALL {
        open[direction.index()] = source.contains(chunk.neighbor(direction));
    }
    open
}

/// Loaded world plus the chunk source and save store behind it.
#[derive(Debug)]
pub struct Overworld<S, P> {
    config: Arc<WorldConfig>,
    source: S,
    store: P,
    world: World,
}

impl<S: ChunkSource, P: SaveStore> Overworld<S, P> {
    /// Opens the chunk recorded in the store, or `start` for a fresh game.
    pub fn new(
        config: Arc<WorldConfig>,
        source: S,
        mut store: P,
        start: ChunkCoord,
    ) -> Result<Self, LoadError> {
        let chunk = match (
            store.get_int(keys::PLAYER_CHUNK_X),
            store.get_int(keys::PLAYER_CHUNK_Y),
        ) {
            (Some(x), Some(y)) => match (i32::try_from(x), i32::try_from(y)) {
                (Ok(x), Ok(y)) => ChunkCoord::new(x, y),
                _ => start,
            },
            _ => start,
        };

        let map = source.load(chunk)?;
        let width = config.player.width as f32;
        let height = config.player.height as f32;
        let position = match map.start() {
            Some(anchor) => anchor - Vec2::new(width * 0.5, 0.0),
            None => map.bounds().center() - Vec2::new(width, height) * 0.5,
        };
        let player = Player::spawn(Arc::clone(&config), position)?;

        let mut world = World::load(
            Arc::clone(&config),
            chunk,
            &map,
            open_edges(&source, chunk),
            player,
        )?;
        world.restore(&store);
        world.restore_player(&store);
        store.set(&keys::visited(chunk), SaveValue::Bool(true));
        info!(%chunk, "overworld opened");

        Ok(Self {
            config,
            source,
            store,
            world,
        })
    }

    /// Applies a command and follows any chunk transition it requests.
    pub fn apply(&mut self, command: Command, out_events: &mut Vec<Event>) -> Result<(), LoadError> {
        let first = out_events.len();
        apply(&mut self.world, command, out_events);
        let request = out_events[first..].iter().find_map(|event| match event {
            Event::ChunkTransitionRequested { direction } => Some(*direction),
            _ => None,
        });
        if let Some(direction) = request {
            self.transition(direction)?;
        }
        Ok(())
    }

    fn transition(&mut self, direction: Direction) -> Result<(), LoadError> {
        let next = crate::query::chunk(&self.world).neighbor(direction);
        let map = self.source.load(next)?;
        let prepared = World::prepare(&self.config, next, &map, open_edges(&self.source, next))?;

        self.world.save(&mut self.store);
        self.world.enter_chunk(prepared, direction.opposite());
        self.world.restore(&self.store);
        self.store.set(&keys::visited(next), SaveValue::Bool(true));
        info!(chunk = %next, "chunk transition complete");
        Ok(())
    }

    /// Writes the current world into the store.
    pub fn save(&mut self) {
        self.world.save(&mut self.store);
    }

    /// The loaded world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The save store.
    #[must_use]
    pub const fn store(&self) -> &P {
        &self.store
    }

    /// The chunk source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Releases the save store.
    pub fn into_store(self) -> P {
        self.store
    }
}
