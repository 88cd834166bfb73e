#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Overworld engine.
//!
//! This crate defines the vocabulary and message surface that connects
//! adapters, the authoritative world, and pure systems. Adapters submit
//! [`Command`] values describing input and elapsed time, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values (sound cues, messages, chunk transitions) for adapters to react to.
//!
//! World space is y-up: [`Direction::Up`] increases the `y` coordinate.

use std::{fmt, str::FromStr, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical title shown by adapters when the experience boots.
pub const TITLE: &str = "Overworld";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by one render frame.
    Tick {
        /// Wall-clock duration of the render frame.
        dt: Duration,
    },
    /// Reports that a key transitioned to the held state.
    KeyPressed {
        /// Key that was pressed.
        key: Key,
    },
    /// Reports that a key transitioned to the released state.
    KeyReleased {
        /// Key that was released.
        key: Key,
    },
    /// Pauses or resumes gameplay evaluation.
    SetPaused {
        /// Whether gameplay should be frozen.
        paused: bool,
    },
    /// Closes the conversation message currently shown to the player.
    DismissMessage,
    /// Confirms that the adapter presented the latest frame.
    ///
    /// The world latches the facing direction that was visible on screen so
    /// chunk transitions only happen once the sprite faces the edge.
    AcknowledgeRender,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Render-frame duration consumed by the tick.
        dt: Duration,
        /// Number of fixed steps executed during the tick.
        steps: u32,
    },
    /// Reports that a frame exceeded the delta ceiling and was dropped.
    FrameSkipped {
        /// Duration of the rejected frame.
        dt: Duration,
    },
    /// Requests playback of a sound cue.
    Sound {
        /// Cue that should be played.
        cue: SoundCue,
    },
    /// Requests that a background music track start playing.
    Music {
        /// Track name taken from the chunk's map properties.
        track: String,
    },
    /// Announces that a conversation message became visible.
    MessageShown {
        /// Key of the localized message.
        name: String,
        /// Localized text resolved from the message catalog.
        text: String,
    },
    /// Announces that the visible conversation message was dismissed.
    MessageDismissed,
    /// Confirms that a projectile entered the world.
    ProjectileLaunched {
        /// Identifier assigned to the projectile.
        projectile: EntityId,
        /// Direction of travel.
        direction: Direction,
    },
    /// Reports that a monster took damage.
    MonsterHit {
        /// Identifier of the monster that was hit.
        monster: EntityId,
        /// Health remaining after the hit.
        health: i32,
    },
    /// Reports that a monster finished expiring and left the world.
    MonsterSlain {
        /// Identifier of the removed monster.
        monster: EntityId,
        /// Map-assigned name of the removed monster.
        name: String,
    },
    /// Reports that the player took damage.
    PlayerHit {
        /// Health remaining after the hit.
        health: i32,
    },
    /// Reports that the player's death animation completed.
    PlayerDefeated,
    /// Reports that the player collected an item.
    CollectablePicked {
        /// Identifier of the collected entity.
        collectable: EntityId,
        /// Map-assigned name of the collected entity.
        name: String,
        /// Player resource count after the pickup.
        total: u32,
    },
    /// Reports that a scripted trigger fired.
    EventTriggered {
        /// Map-assigned event identifier.
        event: u32,
    },
    /// Reports that a dormant entity was activated by a trigger.
    EntitySpawned {
        /// Identifier of the activated entity.
        entity: EntityId,
        /// Map-assigned name of the activated entity.
        name: String,
    },
    /// Reports that a trigger wrote a world property.
    PropertySet {
        /// Name of the property.
        name: String,
        /// Value written to the property.
        value: String,
    },
    /// Requests that the session load the neighboring chunk.
    ChunkTransitionRequested {
        /// Edge the player crossed.
        direction: Direction,
    },
}

/// Sound cues emitted by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Player or monster swung a melee weapon.
    Swing,
    /// Player launched a projectile.
    Fireball,
    /// Projectile struck a target.
    Impact,
    /// A live entity took damage.
    Hurt,
    /// Player started dying.
    PlayerDeath,
    /// Monster started dying.
    MonsterDeath,
    /// Player picked up a collectable.
    Pickup,
    /// Player footstep while walking.
    Footstep,
}

/// Keys understood by the input boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    /// Move left.
    Left,
    /// Move right.
    Right,
    /// Move up.
    Up,
    /// Move down.
    Down,
    /// Melee attack.
    Attack,
    /// Special (ranged) attack.
    Special,
}

impl Key {
    /// Every key in declaration order.
    pub const ALL: [Key; 6] = [
        Key::Left,
        Key::Right,
        Key::Up,
        Key::Down,
        Key::Attack,
        Key::Special,
    ];

    /// Movement direction bound to the key, if it is a movement key.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            Self::Attack | Self::Special => None,
        }
    }

    /// Dense index used by fixed-size key tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "attack" => Ok(Self::Attack),
            "special" => Ok(Self::Special),
            _ => Err(ParseKeyError(value.to_owned())),
        }
    }
}

/// Error produced when a key name cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseKeyError(String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown key `{}`", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

/// Cardinal facing and movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing `x`.
    Left,
    /// Toward increasing `x`.
    Right,
    /// Toward increasing `y`.
    Up,
    /// Toward decreasing `y`.
    Down,
}

impl Direction {
    /// Every direction ordered by [`Direction::index`].
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Stable index used for persistence and lookup tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolves a direction from its stable index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Up),
            3 => Some(Self::Down),
            _ => None,
        }
    }

    /// Movement key bound to the direction.
    #[must_use]
    pub const fn key(self) -> Key {
        match self {
            Self::Left => Key::Left,
            Self::Right => Key::Right,
            Self::Up => Key::Up,
            Self::Down => Key::Down,
        }
    }

    /// Single character used when naming animation frames.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Left => 'l',
            Self::Right => 'r',
            Self::Up => 'u',
            Self::Down => 'd',
        }
    }

    /// Reports whether the direction lies on the horizontal axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Unit vector pointing along the direction in world space.
    #[must_use]
    pub const fn unit(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Up => Vec2::new(0.0, 1.0),
            Self::Down => Vec2::new(0.0, -1.0),
        }
    }

    /// Unit vector perpendicular to the direction, rotated counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Vec2 {
        self.unit().perp()
    }
}

/// Action state shared by players and monsters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Standing still or walking.
    IdleMove,
    /// Swinging a melee weapon.
    Melee,
    /// Performing a special attack.
    Special,
    /// Being pushed back after a hit.
    Knockback,
    /// Playing the death animation before removal.
    Expiring,
}

impl Action {
    /// Every action in declaration order.
    pub const ALL: [Action; 5] = [
        Action::IdleMove,
        Action::Melee,
        Action::Special,
        Action::Knockback,
        Action::Expiring,
    ];

    /// Animation-key prefix used to name frames for the action.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::IdleMove => "idle",
            Self::Melee => "melee",
            Self::Special => "special",
            Self::Knockback => "knockback",
            Self::Expiring => "expire",
        }
    }

    /// Reports whether the action's animation repeats indefinitely.
    #[must_use]
    pub const fn is_looping(self) -> bool {
        matches!(self, Self::IdleMove)
    }

    /// Reports whether the action is an attack.
    #[must_use]
    pub const fn is_attacking(self) -> bool {
        matches!(self, Self::Melee | Self::Special)
    }
}

/// Action state of a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileAction {
    /// Launch animation; the projectile already travels.
    Initialising,
    /// Sustained flight.
    Looping,
    /// Impact dissipation before removal.
    Expiring,
}

impl ProjectileAction {
    /// Every projectile action in declaration order.
    pub const ALL: [ProjectileAction; 3] = [
        ProjectileAction::Initialising,
        ProjectileAction::Looping,
        ProjectileAction::Expiring,
    ];

    /// Animation-key prefix used to name frames for the action.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Initialising => "init",
            Self::Looping => "loop",
            Self::Expiring => "expire",
        }
    }

    /// Reports whether the action's animation repeats indefinitely.
    #[must_use]
    pub const fn is_looping(self) -> bool {
        matches!(self, Self::Looping)
    }

    /// Reports whether the projectile is still travelling.
    #[must_use]
    pub const fn in_flight(self) -> bool {
        matches!(self, Self::Initialising | Self::Looping)
    }
}

/// Unique identifier assigned to an entity within a loaded chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a chunk within the overworld chunk grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    x: i32,
    y: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the chunk.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the chunk; rows grow upward like world space.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Coordinate of the neighboring chunk across the given edge.
    #[must_use]
    pub const fn neighbor(self, direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::new(self.x - 1, self.y),
            Direction::Right => Self::new(self.x + 1, self.y),
            Direction::Up => Self::new(self.x, self.y + 1),
            Direction::Down => Self::new(self.x, self.y - 1),
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

/// Axis-aligned rectangle in world units anchored at its lower-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Extent along `x`.
    pub width: f32,
    /// Extent along `y`.
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from its lower-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle of the given size centered on a point.
    #[must_use]
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(
            center.x - width * 0.5,
            center.y - height * 0.5,
            width,
            height,
        )
    }

    /// Smallest rectangle covering every point.
    ///
    /// Returns `None` for an empty point list.
    #[must_use]
    pub fn bounding(points: &[Vec2]) -> Option<Self> {
        let first = points.first()?;
        let (mut min, mut max) = (*first, *first);
        for point in &points[1..] {
            min = min.min(*point);
            max = max.max(*point);
        }
        Some(Self::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Lower-left corner.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Reports whether the interiors of two rectangles intersect.
    ///
    /// Rectangles that merely share an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    /// Reports whether `other` lies completely inside this rectangle.
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.top() <= self.top()
    }

    /// Rectangle moved by the provided offset.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Smallest rectangle covering both rectangles.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.top().max(other.top()) - y,
        )
    }

    /// Area covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Primitive value stored in the flat persistence map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SaveValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f32),
    /// Text value.
    Text(String),
}

impl SaveValue {
    /// Returns the value as a boolean when it stores one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an integer when it stores one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a float when it stores a number.
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f32),
            _ => None,
        }
    }

    /// Returns the value as text when it stores a string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}
