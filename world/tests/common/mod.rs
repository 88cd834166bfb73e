#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use glam::Vec2;
use overworld_core::{ChunkCoord, Command, Event, Key, Rect};
use overworld_world::{
    self as world,
    config::{MonsterTemplate, WorldConfig},
    map::ChunkMap,
    Player, World,
};
use serde_json::{json, Value};

pub const TILE: u32 = 16;
pub const FRAME: Duration = Duration::from_nanos(16_666_666);

/// Monster kind that never moves on its own.
pub const DUMMY: u32 = 3;
/// Stationary monster that dies to a single hit.
pub const FRAGILE: u32 = 4;
/// Monster that chases and attacks the player.
pub const HUNTER: u32 = 5;

pub fn config() -> Arc<WorldConfig> {
    let mut config = WorldConfig {
        seed: 7,
        ..WorldConfig::default()
    };
    config.monsters.push(MonsterTemplate {
        kind: DUMMY,
        speed: 0.0,
        ..MonsterTemplate::default()
    });
    config.monsters.push(MonsterTemplate {
        kind: FRAGILE,
        speed: 0.0,
        health: 1,
        ..MonsterTemplate::default()
    });
    config.monsters.push(MonsterTemplate {
        kind: HUNTER,
        aggressive: true,
        ..MonsterTemplate::default()
    });
    let _ = config
        .messages
        .insert("welcome".to_owned(), "Welcome, traveller.".to_owned());
    let _ = config
        .messages
        .insert("farewell".to_owned(), "Safe travels.".to_owned());
    Arc::new(config)
}

/// Builds Tiled JSON documents from world-space placements.
#[derive(Clone, Debug)]
pub struct MapBuilder {
    columns: u32,
    rows: u32,
    next_id: u32,
    properties: Vec<Value>,
    obstacles: Vec<Value>,
    monsters: Vec<Value>,
    collectables: Vec<Value>,
    events: Vec<Value>,
}

impl MapBuilder {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            next_id: 1,
            properties: Vec::new(),
            obstacles: Vec::new(),
            monsters: Vec::new(),
            collectables: Vec::new(),
            events: Vec::new(),
        }
    }

    fn pixel_height(&self) -> f32 {
        (self.rows * TILE) as f32
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn music(mut self, track: &str) -> Self {
        self.properties
            .push(json!({ "name": "music", "type": "string", "value": track }));
        self
    }

    /// Sets the fresh-game anchor, the bottom-center of the player sprite.
    pub fn start(mut self, anchor: Vec2) -> Self {
        let y = self.pixel_height() - anchor.y;
        self.properties
            .push(json!({ "name": "start_x", "type": "float", "value": anchor.x }));
        self.properties
            .push(json!({ "name": "start_y", "type": "float", "value": y }));
        self
    }

    pub fn obstacle(mut self, rect: Rect) -> Self {
        let id = self.id();
        let y = self.pixel_height() - rect.y - rect.height;
        self.obstacles.push(json!({
            "id": id, "x": rect.x, "y": y, "width": rect.width, "height": rect.height
        }));
        self
    }

    /// Places a monster whose sprite's bottom-left corner sits at `position`.
    pub fn monster(mut self, name: &str, kind: u32, position: Vec2, hidden: bool) -> Self {
        let object = self.placement(name, kind, position, 16.0, hidden);
        self.monsters.push(object);
        self
    }

    pub fn collectable(mut self, name: &str, position: Vec2, hidden: bool) -> Self {
        let object = self.placement(name, 1, position, 8.0, hidden);
        self.collectables.push(object);
        self
    }

    fn placement(&mut self, name: &str, kind: u32, position: Vec2, width: f32, hidden: bool) -> Value {
        let id = self.id();
        json!({
            "id": id,
            "name": name,
            "x": position.x + width * 0.5,
            "y": self.pixel_height() - position.y,
            "point": true,
            "properties": [
                { "name": "type", "type": "int", "value": kind },
                { "name": "hidden", "type": "bool", "value": hidden }
            ]
        })
    }

    pub fn event(
        mut self,
        event: u32,
        kind: &str,
        name: &str,
        bounds: Rect,
        requires: Option<&str>,
    ) -> Self {
        let id = self.id();
        let mut properties = vec![json!({ "name": "event", "type": "int", "value": event })];
        if let Some(requires) = requires {
            properties.push(json!({ "name": "requires", "type": "string", "value": requires }));
        }
        let y = self.pixel_height() - bounds.y - bounds.height;
        self.events.push(json!({
            "id": id,
            "name": name,
            "type": kind,
            "x": bounds.x,
            "y": y,
            "width": bounds.width,
            "height": bounds.height,
            "properties": properties
        }));
        self
    }

    pub fn document(&self) -> String {
        let data = vec![1; (self.columns * self.rows) as usize];
        json!({
            "width": self.columns,
            "height": self.rows,
            "tilewidth": TILE,
            "tileheight": TILE,
            "properties": self.properties,
            "layers": [
                { "type": "tilelayer", "name": "sprites", "data": data },
                { "type": "objectgroup", "name": "obstacles", "objects": self.obstacles },
                { "type": "objectgroup", "name": "monsters", "objects": self.monsters },
                { "type": "objectgroup", "name": "collectables", "objects": self.collectables },
                { "type": "objectgroup", "name": "events", "objects": self.events }
            ]
        })
        .to_string()
    }

    pub fn parse(&self) -> ChunkMap {
        ChunkMap::parse(&self.document()).expect("valid test map")
    }
}

pub fn spawn_world(map: &ChunkMap, player_at: Vec2) -> World {
    let config = config();
    let player = Player::spawn(Arc::clone(&config), player_at).expect("player sheet");
    World::load(config, ChunkCoord::new(0, 0), map, [false; 4], player).expect("world loads")
}

pub fn tick(world: &mut World, frames: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..frames {
        world::apply(world, Command::Tick { dt: FRAME }, &mut events);
    }
    events
}

pub fn press(world: &mut World, key: Key) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::KeyPressed { key }, &mut events);
    events
}

pub fn release(world: &mut World, key: Key) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::KeyReleased { key }, &mut events);
    events
}
