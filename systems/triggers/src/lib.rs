#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map-authored trigger regions with a fixed action vocabulary.
//!
//! A [`TriggerEvent`] fires at most once, the first time the player's
//! collision bounds overlap its region while every [`Requirement`] holds
//! against the current [`WorldProperties`]. Actions are parsed when the map
//! loads, so a trigger that fires can always apply all of its actions.

use std::collections::BTreeMap;

use overworld_core::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while parsing trigger definitions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// The action type is outside the supported vocabulary.
    #[error("unknown event action type `{kind}`")]
    UnknownAction {
        /// Rejected type string.
        kind: String,
    },
    /// A `set` action whose name is not `property=value`.
    #[error("malformed set action `{text}`, expected `property=value`")]
    MalformedSet {
        /// Rejected action name.
        text: String,
    },
    /// A requirement clause that is neither `prop=value` nor `prop<>value`.
    #[error("malformed requirement `{text}`")]
    MalformedRequirement {
        /// Rejected clause.
        text: String,
    },
    /// An action without a target name.
    #[error("event action `{kind}` has an empty name")]
    EmptyName {
        /// Action type missing its name.
        kind: String,
    },
}

/// String properties written by `set` actions and read by requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldProperties {
    values: BTreeMap<String, String>,
}

impl WorldProperties {
    /// Creates an empty property table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Writes a property, returning the previous value.
    pub fn set(&mut self, name: &str, value: &str) -> Option<String> {
        self.values.insert(name.to_owned(), value.to_owned())
    }

    /// Iterates properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of stored properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether no property has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Condition on a single world property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    property: String,
    value: String,
    equals: bool,
}

impl Requirement {
    /// Creates a requirement that the property equals (or differs from) `value`.
    #[must_use]
    pub fn new(property: &str, value: &str, equals: bool) -> Self {
        Self {
            property: property.to_owned(),
            value: value.to_owned(),
            equals,
        }
    }

    /// Parses one `prop=value` or `prop<>value` clause.
    pub fn parse(text: &str) -> Result<Self, TriggerError> {
        let malformed = || TriggerError::MalformedRequirement {
            text: text.to_owned(),
        };
        let (property, value, equals) = match text.split_once("<>") {
            Some((property, value)) => (property, value, false),
            None => {
                let (property, value) = text.split_once('=').ok_or_else(malformed)?;
                (property, value, true)
            }
        };
        let property = property.trim();
        if property.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(property, value.trim(), equals))
    }

    /// Parses a `;`-separated clause list, skipping empty clauses.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, TriggerError> {
        text.split(';')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Property the requirement inspects.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Reports whether the requirement holds.
    ///
    /// An unset property differs from every value.
    #[must_use]
    pub fn is_satisfied(&self, properties: &WorldProperties) -> bool {
        self.equals == (properties.get(&self.property) == Some(self.value.as_str()))
    }
}

/// Fixed vocabulary of actions a trigger can execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventAction {
    /// Queue the localized message stored under the key.
    Message {
        /// Message catalog key.
        name: String,
    },
    /// Activate the dormant monster or collectable with the name.
    Spawn {
        /// Entity name within the chunk.
        name: String,
    },
    /// Write a world property.
    Set {
        /// Property name.
        property: String,
        /// Value written.
        value: String,
    },
}

impl EventAction {
    /// Parses an action from a map object's `type` and `name`.
    pub fn parse(kind: &str, name: &str) -> Result<Self, TriggerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TriggerError::EmptyName {
                kind: kind.to_owned(),
            });
        }
        match kind.trim() {
            "message" => Ok(Self::Message {
                name: name.to_owned(),
            }),
            "spawn" => Ok(Self::Spawn {
                name: name.to_owned(),
            }),
            "set" => {
                let (property, value) =
                    name.split_once('=')
                        .ok_or_else(|| TriggerError::MalformedSet {
                            text: name.to_owned(),
                        })?;
                let property = property.trim();
                if property.is_empty() {
                    return Err(TriggerError::MalformedSet {
                        text: name.to_owned(),
                    });
                }
                Ok(Self::Set {
                    property: property.to_owned(),
                    value: value.trim().to_owned(),
                })
            }
            _ => Err(TriggerError::UnknownAction {
                kind: kind.to_owned(),
            }),
        }
    }
}

/// Trigger region loaded from a map.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerEvent {
    id: u32,
    bounds: Rect,
    actions: Vec<EventAction>,
    requirements: Vec<Requirement>,
    triggered: bool,
}

impl TriggerEvent {
    /// Creates an untriggered event.
    #[must_use]
    pub fn new(
        id: u32,
        bounds: Rect,
        actions: Vec<EventAction>,
        requirements: Vec<Requirement>,
    ) -> Self {
        Self {
            id,
            bounds,
            actions,
            requirements,
            triggered: false,
        }
    }

    /// Identifier unique within the chunk.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Region that must overlap the player.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[EventAction] {
        &self.actions
    }

    /// Requirements gating the event.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Reports whether the event already fired.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Marks the event as fired, used when restoring saved state.
    pub fn mark_triggered(&mut self) {
        self.triggered = true;
    }

    /// Reports whether the event would fire for the given player bounds.
    #[must_use]
    pub fn is_ready(&self, player_bounds: &Rect, properties: &WorldProperties) -> bool {
        !self.triggered
            && self.bounds.overlaps(player_bounds)
            && self
                .requirements
                .iter()
                .all(|requirement| requirement.is_satisfied(properties))
    }

    /// Fires the event when ready, returning the actions to execute.
    ///
    /// The triggered flag never resets once set.
    pub fn try_fire(
        &mut self,
        player_bounds: &Rect,
        properties: &WorldProperties,
    ) -> Option<&[EventAction]> {
        if !self.is_ready(player_bounds, properties) {
            return None;
        }
        self.triggered = true;
        Some(&self.actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_clauses_parse() {
        let parsed = Requirement::parse_list("door=open; key<>gold;").expect("valid list");
        assert_eq!(
            parsed,
            vec![
                Requirement::new("door", "open", true),
                Requirement::new("key", "gold", false),
            ]
        );
        assert!(Requirement::parse("=open").is_err());
        assert!(Requirement::parse("door").is_err());
    }

    #[test]
    fn unset_property_fails_equality_and_passes_inequality() {
        let properties = WorldProperties::new();
        assert!(!Requirement::new("door", "open", true).is_satisfied(&properties));
        assert!(Requirement::new("door", "open", false).is_satisfied(&properties));
    }

    #[test]
    fn set_requires_assignment() {
        assert_eq!(
            EventAction::parse("set", "door=open"),
            Ok(EventAction::Set {
                property: "door".to_owned(),
                value: "open".to_owned(),
            })
        );
        assert_eq!(
            EventAction::parse("set", "door"),
            Err(TriggerError::MalformedSet {
                text: "door".to_owned()
            })
        );
        assert_eq!(
            EventAction::parse("teleport", "home"),
            Err(TriggerError::UnknownAction {
                kind: "teleport".to_owned()
            })
        );
    }

    #[test]
    fn properties_serialize_as_plain_map() {
        let mut properties = WorldProperties::new();
        let _ = properties.set("door", "open");
        let json = serde_json::to_string(&properties).expect("serialize");
        assert_eq!(json, r#"{"door":"open"}"#);
    }
}
