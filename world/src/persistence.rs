//! Flat key/value persistence of chunk and player state.

use std::collections::BTreeMap;

use overworld_core::{ChunkCoord, SaveValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while encoding or decoding a save.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The save document is not valid JSON for [`MemoryStore`].
    #[error("malformed save data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat string-keyed store of primitive values.
pub trait SaveStore {
    /// Value stored under the key.
    fn get(&self, key: &str) -> Option<&SaveValue>;

    /// Stores a value, replacing any previous one.
    fn set(&mut self, key: &str, value: SaveValue);

    /// Keys beginning with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;

    /// Boolean stored under the key.
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(SaveValue::as_bool)
    }

    /// Integer stored under the key.
    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(SaveValue::as_int)
    }

    /// Number stored under the key.
    fn get_float(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(SaveValue::as_float)
    }

    /// Text stored under the key.
    fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SaveValue::as_text)
    }
}

/// In-memory store with deterministic ordering and JSON encoding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    values: BTreeMap<String, SaveValue>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a store previously produced by [`MemoryStore::to_json`].
    pub fn from_json(document: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Encodes the store; equal stores always produce identical text.
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SaveValue)> + '_ {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl SaveStore for MemoryStore {
    fn get(&self, key: &str) -> Option<&SaveValue> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: SaveValue) {
        let _ = self.values.insert(key.to_owned(), value);
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.values
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Key layout of the save map.
pub mod keys {
    use overworld_core::ChunkCoord;

    /// Prefix shared by world properties.
    pub const PROPERTY_PREFIX: &str = "property.";
    /// Chunk column the player stands in.
    pub const PLAYER_CHUNK_X: &str = "player.chunk_x";
    /// Chunk row the player stands in.
    pub const PLAYER_CHUNK_Y: &str = "player.chunk_y";
    /// Player position along `x`.
    pub const PLAYER_X: &str = "player.x";
    /// Player position along `y`.
    pub const PLAYER_Y: &str = "player.y";
    /// Player facing index.
    pub const PLAYER_DIRECTION: &str = "player.direction";
    /// Player health.
    pub const PLAYER_HEALTH: &str = "player.health";
    /// Player resource count.
    pub const PLAYER_RESOURCES: &str = "player.resources";

    /// Whether the chunk was ever entered.
    #[must_use]
    pub fn visited(chunk: ChunkCoord) -> String {
        format!("chunk.{chunk}.visited")
    }

    /// Field of a named monster.
    #[must_use]
    pub fn monster(chunk: ChunkCoord, name: &str, field: &str) -> String {
        format!("chunk.{chunk}.monster.{name}.{field}")
    }

    /// Whether a named collectable is still present.
    #[must_use]
    pub fn collectable_active(chunk: ChunkCoord, name: &str) -> String {
        format!("chunk.{chunk}.collectable.{name}.active")
    }

    /// Whether an event already fired.
    #[must_use]
    pub fn event_triggered(chunk: ChunkCoord, event: u32) -> String {
        format!("chunk.{chunk}.event.{event}.triggered")
    }

    /// Value of a world property.
    #[must_use]
    pub fn property(name: &str) -> String {
        format!("{PROPERTY_PREFIX}{name}")
    }
}

/// Reports whether the chunk was visited before.
#[must_use]
pub fn is_visited(store: &impl SaveStore, chunk: ChunkCoord) -> bool {
    store.get_bool(&keys::visited(chunk)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_encoding_is_stable_across_round_trips() {
        let mut store = MemoryStore::new();
        store.set("player.x", SaveValue::Float(12.5));
        store.set("chunk.0_0.visited", SaveValue::Bool(true));
        store.set("property.gate", SaveValue::Text("open".to_owned()));
        store.set("player.health", SaveValue::Int(4));

        let first = store.to_json().expect("encode");
        let restored = MemoryStore::from_json(&first).expect("decode");
        let second = restored.to_json().expect("encode again");
        assert_eq!(first, second);
        assert_eq!(restored, store);
    }

    #[test]
    fn prefix_scan_stays_within_prefix() {
        let mut store = MemoryStore::new();
        store.set("property.a", SaveValue::Text("1".to_owned()));
        store.set("property.b", SaveValue::Text("2".to_owned()));
        store.set("propertyx", SaveValue::Bool(true));
        store.set("player.x", SaveValue::Float(0.0));
        assert_eq!(
            store.keys_with_prefix(keys::PROPERTY_PREFIX),
            vec!["property.a".to_owned(), "property.b".to_owned()]
        );
    }

    #[test]
    fn key_layout_names_the_chunk() {
        let chunk = ChunkCoord::new(-1, 2);
        assert_eq!(keys::visited(chunk), "chunk.-1_2.visited");
        assert_eq!(
            keys::monster(chunk, "slime", "health"),
            "chunk.-1_2.monster.slime.health"
        );
        assert_eq!(keys::event_triggered(chunk, 4), "chunk.-1_2.event.4.triggered");
    }
}
