//! Tile-map documents describing one chunk.
//!
//! Maps are authored in the Tiled JSON format with a y-down pixel space.
//! Everything is converted to the y-up world space on load, so the rest of
//! the crate never sees Tiled coordinates.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use overworld_core::{ChunkCoord, Rect};
use overworld_system_animation::AnimationError;
use overworld_system_collision::{BoundedPolygon, GeometryError, ShapeSet};
use overworld_system_triggers::{EventAction, Requirement, TriggerError, TriggerEvent};
use serde::Deserialize;
use thiserror::Error;

const SPRITES_LAYER: &str = "sprites";
const OBSTACLES_LAYER: &str = "obstacles";
const GROUNDLESS_LAYER: &str = "groundless";
const MONSTERS_LAYER: &str = "monsters";
const COLLECTABLES_LAYER: &str = "collectables";
const EVENTS_LAYER: &str = "events";
const ANIMATED_LAYER: &str = "animated";

/// Fatal problems found while loading a chunk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not a readable tile map.
    #[error("malformed map document: {0}")]
    Json(#[from] serde_json::Error),
    /// The chunk could not be fetched from its source.
    #[error("chunk {chunk} is unavailable: {reason}")]
    Unavailable {
        /// Requested chunk.
        chunk: ChunkCoord,
        /// Description of the failure.
        reason: String,
    },
    /// An obstacle polygon cannot be used as collision geometry.
    #[error("object {object} has invalid geometry: {source}")]
    Geometry {
        /// Tiled object id.
        object: u32,
        /// Underlying geometry failure.
        source: GeometryError,
    },
    /// Two entities in one layer share a name.
    #[error("duplicate name `{name}` in layer `{layer}`")]
    DuplicateName {
        /// Layer containing the duplicates.
        layer: &'static str,
        /// Repeated name.
        name: String,
    },
    /// An entity that must be addressable has no name.
    #[error("object {object} in layer `{layer}` has no name")]
    UnnamedEntity {
        /// Layer containing the object.
        layer: &'static str,
        /// Tiled object id.
        object: u32,
    },
    /// A custom property is missing or has the wrong type.
    #[error("object {object} property `{property}` must be {expected}")]
    InvalidProperty {
        /// Tiled object id, `0` for map properties.
        object: u32,
        /// Property name.
        property: String,
        /// Expected value description.
        expected: &'static str,
    },
    /// An event action or requirement failed to parse.
    #[error("event {event}: {source}")]
    Trigger {
        /// Event identifier.
        event: u32,
        /// Underlying parse failure.
        source: TriggerError,
    },
    /// A monster references a type missing from the configuration.
    #[error("monster `{name}` uses unknown type {kind}")]
    UnknownMonsterType {
        /// Monster name.
        name: String,
        /// Unrecognised type.
        kind: u32,
    },
    /// A collectable references a type missing from the configuration.
    #[error("collectable `{name}` uses unknown type {kind}")]
    UnknownCollectableType {
        /// Collectable name.
        name: String,
        /// Unrecognised type.
        kind: u32,
    },
    /// A message action names a key absent from the message catalog.
    #[error("event {event} shows unknown message `{key}`")]
    UnknownMessage {
        /// Event identifier.
        event: u32,
        /// Missing catalog key.
        key: String,
    },
    /// A spawn action names no monster or collectable of the chunk.
    #[error("event {event} spawns unknown entity `{name}`")]
    UnknownSpawnTarget {
        /// Event identifier.
        event: u32,
        /// Missing entity name.
        name: String,
    },
    /// A sprite sheet lacks required clips.
    #[error(transparent)]
    Animation(#[from] AnimationError),
    /// The map's tile grid or pixel extent does not fit in 32 bits.
    #[error("map of {width}x{height} tiles sized {tile_width}x{tile_height} is too large")]
    InvalidDimensions {
        /// Columns of tiles.
        width: u32,
        /// Rows of tiles.
        height: u32,
        /// Tile width in pixels.
        tile_width: u32,
        /// Tile height in pixels.
        tile_height: u32,
    },
}

/// Named entity placed by the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Tiled object id.
    pub object: u32,
    /// Name unique within the layer.
    pub name: String,
    /// Template selector.
    pub kind: u32,
    /// Bottom-center anchor of the sprite in world space.
    pub anchor: Vec2,
    /// Dormant until a `spawn` action activates it.
    pub hidden: bool,
}

/// Animated obstacle placed by the map.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedPlacement {
    /// Tiled object id.
    pub object: u32,
    /// Sprite sheet name.
    pub sheet: String,
    /// Blocking rectangle in world space.
    pub bounds: Rect,
}

/// Background tile indices, stored in document order with the top row first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileLayer {
    columns: u32,
    rows: u32,
    tiles: Vec<u32>,
}

impl TileLayer {
    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Tile index at the cell, counting rows upward from the bottom.
    ///
    /// Zero marks an empty cell.
    #[must_use]
    pub fn tile(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let document_row = (self.rows - 1 - row) as usize;
        let index = document_row * self.columns as usize + column as usize;
        self.tiles.get(index).copied()
    }
}

/// Parsed and validated contents of one chunk document.
#[derive(Clone, Debug)]
pub struct ChunkMap {
    bounds: Rect,
    tile_width: u32,
    tile_height: u32,
    tiles: TileLayer,
    obstacles: ShapeSet,
    groundless: ShapeSet,
    monsters: Vec<Placement>,
    collectables: Vec<Placement>,
    events: Vec<TriggerEvent>,
    animated: Vec<AnimatedPlacement>,
    music: Option<String>,
    start: Option<Vec2>,
    max_object_id: u32,
}

impl ChunkMap {
    /// Parses a Tiled JSON document.
    pub fn parse(document: &str) -> Result<Self, LoadError> {
        let raw: TiledMap = serde_json::from_str(document)?;
        let (pixel_width, pixel_height) = raw.pixel_size()?;
        let flip = Flip { pixel_height };

        let mut map = Self {
            bounds: Rect::new(0.0, 0.0, pixel_width, pixel_height),
            tile_width: raw.tilewidth,
            tile_height: raw.tileheight,
            tiles: TileLayer::default(),
            obstacles: ShapeSet::default(),
            groundless: ShapeSet::default(),
            monsters: Vec::new(),
            collectables: Vec::new(),
            events: Vec::new(),
            animated: Vec::new(),
            music: string_property(&raw.properties, "music"),
            start: None,
            max_object_id: 0,
        };

        let start_x = float_property(&raw.properties, 0, "start_x")?;
        let start_y = float_property(&raw.properties, 0, "start_y")?;
        if let (Some(x), Some(y)) = (start_x, start_y) {
            map.start = Some(flip.point(x, y));
        }

        for layer in &raw.layers {
            match layer {
                TiledLayer::Tilelayer { name, data } if name == SPRITES_LAYER => {
                    map.tiles = TileLayer {
                        columns: raw.width,
                        rows: raw.height,
                        tiles: data.clone(),
                    };
                }
                TiledLayer::Objectgroup { name, objects } => {
                    for object in objects {
                        map.max_object_id = map.max_object_id.max(object.id);
                    }
                    match name.as_str() {
                        OBSTACLES_LAYER => map.obstacles = shapes(objects, &flip)?,
                        GROUNDLESS_LAYER => map.groundless = shapes(objects, &flip)?,
                        MONSTERS_LAYER => {
                            map.monsters = placements(MONSTERS_LAYER, objects, &flip)?;
                        }
                        COLLECTABLES_LAYER => {
                            map.collectables = placements(COLLECTABLES_LAYER, objects, &flip)?;
                        }
                        EVENTS_LAYER => map.events = events(objects, &flip)?,
                        ANIMATED_LAYER => map.animated = animated(objects, &flip),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        Ok(map)
    }

    /// Chunk rectangle in world space, anchored at the origin.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Tile width and height in world units.
    #[must_use]
    pub const fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    /// Background tiles.
    #[must_use]
    pub fn tiles(&self) -> &TileLayer {
        &self.tiles
    }

    /// Shapes that block walkers and projectiles.
    #[must_use]
    pub fn obstacles(&self) -> &ShapeSet {
        &self.obstacles
    }

    /// Shapes that block walkers only.
    #[must_use]
    pub fn groundless(&self) -> &ShapeSet {
        &self.groundless
    }

    /// Monster placements in layer order.
    #[must_use]
    pub fn monsters(&self) -> &[Placement] {
        &self.monsters
    }

    /// Collectable placements in layer order.
    #[must_use]
    pub fn collectables(&self) -> &[Placement] {
        &self.collectables
    }

    /// Trigger events ordered by identifier.
    #[must_use]
    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    /// Animated obstacle placements.
    #[must_use]
    pub fn animated(&self) -> &[AnimatedPlacement] {
        &self.animated
    }

    /// Background music requested by the map.
    #[must_use]
    pub fn music(&self) -> Option<&str> {
        self.music.as_deref()
    }

    /// Player start position for new games, bottom-center anchored.
    #[must_use]
    pub const fn start(&self) -> Option<Vec2> {
        self.start
    }

    /// Largest Tiled object id, used to allocate runtime identifiers.
    #[must_use]
    pub const fn max_object_id(&self) -> u32 {
        self.max_object_id
    }
}

#[derive(Clone, Copy, Debug)]
struct Flip {
    pixel_height: f32,
}

impl Flip {
    fn point(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x, self.pixel_height - y)
    }

    fn rect(&self, object: &TiledObject) -> Rect {
        Rect::new(
            object.x,
            self.pixel_height - object.y - object.height,
            object.width,
            object.height,
        )
    }
}

fn shapes(objects: &[TiledObject], flip: &Flip) -> Result<ShapeSet, LoadError> {
    let mut rects = Vec::new();
    let mut polygons = Vec::new();
    for object in objects {
        if let Some(points) = &object.polygon {
            let vertices = points
                .iter()
                .map(|point| flip.point(object.x + point.x, object.y + point.y))
                .collect();
            let polygon =
                BoundedPolygon::new(vertices).map_err(|source| LoadError::Geometry {
                    object: object.id,
                    source,
                })?;
            polygons.push(polygon);
        } else if object.width > 0.0 && object.height > 0.0 {
            rects.push(flip.rect(object));
        }
    }
    Ok(ShapeSet::new(rects, polygons))
}

fn placements(
    layer: &'static str,
    objects: &[TiledObject],
    flip: &Flip,
) -> Result<Vec<Placement>, LoadError> {
    let mut seen = BTreeSet::new();
    let mut placements = Vec::with_capacity(objects.len());
    for object in objects {
        if object.name.is_empty() {
            return Err(LoadError::UnnamedEntity {
                layer,
                object: object.id,
            });
        }
        if !seen.insert(object.name.as_str()) {
            return Err(LoadError::DuplicateName {
                layer,
                name: object.name.clone(),
            });
        }

        let kind = match int_property(&object.properties, object.id, "type")? {
            Some(kind) => kind,
            None => object.kind().parse::<i64>().map_err(|_| LoadError::InvalidProperty {
                object: object.id,
                property: "type".to_owned(),
                expected: "an integer",
            })?,
        };
        let kind = u32::try_from(kind).map_err(|_| LoadError::InvalidProperty {
            object: object.id,
            property: "type".to_owned(),
            expected: "a non-negative integer",
        })?;

        placements.push(Placement {
            object: object.id,
            name: object.name.clone(),
            kind,
            anchor: flip.point(object.x, object.y),
            hidden: bool_property(&object.properties, object.id, "hidden")?.unwrap_or(false),
        });
    }
    Ok(placements)
}

#[derive(Debug, Default)]
struct EventDraft {
    bounds: Option<Rect>,
    actions: Vec<EventAction>,
    requirements: Vec<Requirement>,
}

fn events(objects: &[TiledObject], flip: &Flip) -> Result<Vec<TriggerEvent>, LoadError> {
    let mut drafts: BTreeMap<u32, EventDraft> = BTreeMap::new();
    for object in objects {
        let event = match int_property(&object.properties, object.id, "event")? {
            Some(event) => u32::try_from(event).map_err(|_| LoadError::InvalidProperty {
                object: object.id,
                property: "event".to_owned(),
                expected: "a non-negative integer",
            })?,
            None => object.id,
        };
        let trigger_error = |source| LoadError::Trigger { event, source };

        let draft = drafts.entry(event).or_default();
        let action = EventAction::parse(object.kind(), &object.name).map_err(trigger_error)?;
        draft.actions.push(action);

        let rect = flip.rect(object);
        draft.bounds = Some(match draft.bounds {
            Some(bounds) => bounds.union(&rect),
            None => rect,
        });

        if let Some(requires) = string_property(&object.properties, "requires") {
            for requirement in Requirement::parse_list(&requires).map_err(trigger_error)? {
                if !draft.requirements.contains(&requirement) {
                    draft.requirements.push(requirement);
                }
            }
        }
    }

    Ok(drafts
        .into_iter()
        .map(|(id, draft)| {
            TriggerEvent::new(
                id,
                draft.bounds.unwrap_or_default(),
                draft.actions,
                draft.requirements,
            )
        })
        .collect())
}

fn animated(objects: &[TiledObject], flip: &Flip) -> Vec<AnimatedPlacement> {
    objects
        .iter()
        .map(|object| AnimatedPlacement {
            object: object.id,
            sheet: if object.name.is_empty() {
                object.kind().to_owned()
            } else {
                object.name.clone()
            },
            bounds: flip.rect(object),
        })
        .collect()
}

fn find_property<'a>(properties: &'a [TiledProperty], name: &str) -> Option<&'a TiledProperty> {
    properties.iter().find(|property| property.name == name)
}

fn string_property(properties: &[TiledProperty], name: &str) -> Option<String> {
    find_property(properties, name).map(|property| match &property.value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn int_property(
    properties: &[TiledProperty],
    object: u32,
    name: &str,
) -> Result<Option<i64>, LoadError> {
    let Some(property) = find_property(properties, name) else {
        return Ok(None);
    };
    let parsed = match &property.value {
        serde_json::Value::Number(number) => number.as_i64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| LoadError::InvalidProperty {
        object,
        property: name.to_owned(),
        expected: "an integer",
    })
}

fn float_property(
    properties: &[TiledProperty],
    object: u32,
    name: &str,
) -> Result<Option<f32>, LoadError> {
    let Some(property) = find_property(properties, name) else {
        return Ok(None);
    };
    property
        .value
        .as_f64()
        .map(|value| Some(value as f32))
        .ok_or_else(|| LoadError::InvalidProperty {
            object,
            property: name.to_owned(),
            expected: "a number",
        })
}

fn bool_property(
    properties: &[TiledProperty],
    object: u32,
    name: &str,
) -> Result<Option<bool>, LoadError> {
    let Some(property) = find_property(properties, name) else {
        return Ok(None);
    };
    property
        .value
        .as_bool()
        .map(Some)
        .ok_or_else(|| LoadError::InvalidProperty {
            object,
            property: name.to_owned(),
            expected: "a boolean",
        })
}

#[derive(Debug, Deserialize)]
struct TiledMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    properties: Vec<TiledProperty>,
    #[serde(default)]
    layers: Vec<TiledLayer>,
}

impl TiledMap {
    /// Pixel extent of the map, rejecting grids whose cell or pixel counts
    /// overflow `u32`.
    fn pixel_size(&self) -> Result<(f32, f32), LoadError> {
        let invalid = || LoadError::InvalidDimensions {
            width: self.width,
            height: self.height,
            tile_width: self.tilewidth,
            tile_height: self.tileheight,
        };
        let _cells = self.width.checked_mul(self.height).ok_or_else(invalid)?;
        let pixel_width = self.width.checked_mul(self.tilewidth).ok_or_else(invalid)?;
        let pixel_height = self
            .height
            .checked_mul(self.tileheight)
            .ok_or_else(invalid)?;
        Ok((pixel_width as f32, pixel_height as f32))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TiledLayer {
    Tilelayer {
        name: String,
        #[serde(default)]
        data: Vec<u32>,
    },
    Objectgroup {
        name: String,
        #[serde(default)]
        objects: Vec<TiledObject>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TiledObject {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    polygon: Option<Vec<TiledPoint>>,
    #[serde(default)]
    properties: Vec<TiledProperty>,
}

impl TiledObject {
    fn kind(&self) -> &str {
        if self.kind.is_empty() {
            &self.class
        } else {
            &self.kind
        }
    }
}

#[derive(Debug, Deserialize)]
struct TiledPoint {
    x: f32,
    y: f32,
}

#[derive(Debug, Deserialize)]
struct TiledProperty {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(layers: serde_json::Value) -> String {
        json!({
            "width": 4,
            "height": 3,
            "tilewidth": 16,
            "tileheight": 16,
            "properties": [{ "name": "music", "type": "string", "value": "meadow" }],
            "layers": layers,
        })
        .to_string()
    }

    #[test]
    fn rectangles_are_flipped_to_y_up() {
        let map = ChunkMap::parse(&document(json!([{
            "type": "objectgroup",
            "name": "obstacles",
            "objects": [{ "id": 1, "x": 16, "y": 0, "width": 16, "height": 8 }]
        }])))
        .expect("valid map");

        assert_eq!(map.bounds(), Rect::new(0.0, 0.0, 64.0, 48.0));
        assert_eq!(map.obstacles().rects(), &[Rect::new(16.0, 40.0, 16.0, 8.0)]);
        assert_eq!(map.music(), Some("meadow"));
    }

    #[test]
    fn polygons_are_offset_and_decomposed() {
        let map = ChunkMap::parse(&document(json!([{
            "type": "objectgroup",
            "name": "groundless",
            "objects": [{
                "id": 2, "x": 8, "y": 8,
                "polygon": [
                    { "x": 0, "y": 0 }, { "x": 32, "y": 0 }, { "x": 32, "y": 8 },
                    { "x": 8, "y": 8 }, { "x": 8, "y": 32 }, { "x": 0, "y": 32 }
                ]
            }]
        }])))
        .expect("valid map");

        let polygon = &map.groundless().polygons()[0];
        assert_eq!(polygon.bounds(), Rect::new(8.0, 8.0, 32.0, 32.0));
        assert!(polygon.parts().len() > 1);
    }

    #[test]
    fn tile_rows_count_up_from_the_bottom() {
        let map = ChunkMap::parse(&document(json!([{
            "type": "tilelayer",
            "name": "sprites",
            "data": [1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 4]
        }])))
        .expect("valid map");
        assert_eq!(map.tiles().tile(3, 0), Some(4));
        assert_eq!(map.tiles().tile(0, 2), Some(1));
        assert_eq!(map.tiles().tile(4, 0), None);
    }

    #[test]
    fn event_objects_group_into_one_trigger() {
        let map = ChunkMap::parse(&document(json!([{
            "type": "objectgroup",
            "name": "events",
            "objects": [
                { "id": 5, "name": "gate=open", "type": "set", "x": 0, "y": 0, "width": 8, "height": 8,
                  "properties": [{ "name": "event", "type": "int", "value": 1 }] },
                { "id": 6, "name": "gate_opened", "type": "message", "x": 8, "y": 0, "width": 8, "height": 8,
                  "properties": [
                      { "name": "event", "type": "int", "value": 1 },
                      { "name": "requires", "type": "string", "value": "lever=down" }
                  ] },
                { "id": 7, "name": "ghost", "class": "spawn", "x": 32, "y": 32, "width": 8, "height": 8 }
            ]
        }])))
        .expect("valid map");

        let events = map.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id(), 1);
        assert_eq!(events[0].actions().len(), 2);
        assert_eq!(events[0].bounds(), Rect::new(0.0, 40.0, 16.0, 8.0));
        assert_eq!(events[0].requirements().len(), 1);
        assert_eq!(events[1].id(), 7);
    }

    #[test]
    fn duplicate_monster_names_are_fatal() {
        let result = ChunkMap::parse(&document(json!([{
            "type": "objectgroup",
            "name": "monsters",
            "objects": [
                { "id": 1, "name": "slime", "x": 10, "y": 10, "point": true,
                  "properties": [{ "name": "type", "type": "int", "value": 1 }] },
                { "id": 2, "name": "slime", "x": 20, "y": 10, "point": true,
                  "properties": [{ "name": "type", "type": "int", "value": 1 }] }
            ]
        }])));
        assert!(matches!(
            result,
            Err(LoadError::DuplicateName {
                layer: "monsters",
                ..
            })
        ));
    }

    #[test]
    fn unknown_action_types_are_fatal() {
        let result = ChunkMap::parse(&document(json!([{
            "type": "objectgroup",
            "name": "events",
            "objects": [{ "id": 3, "name": "home", "type": "teleport", "width": 8, "height": 8 }]
        }])));
        assert!(matches!(
            result,
            Err(LoadError::Trigger {
                event: 3,
                source: TriggerError::UnknownAction { .. }
            })
        ));
    }
}
