#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Keyboard boundary that turns press and release commands into queries.
//!
//! Entities never look at raw key events. They ask an [`InputSource`] which
//! keys are held, which movement key currently has priority, and whether an
//! attack key has been pressed again since it was last released.

use overworld_core::{Command, Direction, Key};

/// Keyboard queries used by the player each fixed step.
pub trait InputSource {
    /// Reports whether the key is currently held.
    fn is_down(&self, key: Key) -> bool;

    /// Held movement directions ordered from oldest to newest press.
    fn held_directions(&self) -> Vec<Direction>;

    /// Newest held movement direction, if any.
    fn movement_priority(&self) -> Option<Direction> {
        self.held_directions().last().copied()
    }

    /// Reports whether the key was pressed since it was last consumed.
    fn is_actionable(&self, key: Key) -> bool;

    /// Disarms an edge-triggered key until it is released and pressed again.
    ///
    /// Returns whether the key was armed.
    fn consume(&mut self, key: Key) -> bool;
}

/// Key tracker that remembers press order and edge-triggered attack keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    held: [bool; Key::ALL.len()],
    armed: [bool; Key::ALL.len()],
    order: Vec<Direction>,
}

impl InputState {
    /// Creates a tracker with every key released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies key commands and ignores the rest.
    ///
    /// Returns whether the command was a key transition.
    pub fn handle(&mut self, command: &Command) -> bool {
        match command {
            Command::KeyPressed { key } => {
                self.press(*key);
                true
            }
            Command::KeyReleased { key } => {
                self.release(*key);
                true
            }
            _ => false,
        }
    }

    /// Marks a key as held.
    ///
    /// Repeated presses without a release do not re-arm the key.
    pub fn press(&mut self, key: Key) {
        let slot = key.index();
        if self.held[slot] {
            return;
        }
        self.held[slot] = true;
        self.armed[slot] = true;
        if let Some(direction) = key.direction() {
            self.order.retain(|held| *held != direction);
            self.order.push(direction);
        }
    }

    /// Marks a key as released, promoting the newest still-held movement key.
    pub fn release(&mut self, key: Key) {
        let slot = key.index();
        self.held[slot] = false;
        self.armed[slot] = false;
        if let Some(direction) = key.direction() {
            self.order.retain(|held| *held != direction);
        }
    }

    /// Releases every key.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl InputSource for InputState {
    fn is_down(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    fn held_directions(&self) -> Vec<Direction> {
        self.order.clone()
    }

    fn movement_priority(&self) -> Option<Direction> {
        self.order.last().copied()
    }

    fn is_actionable(&self, key: Key) -> bool {
        self.held[key.index()] && self.armed[key.index()]
    }

    fn consume(&mut self, key: Key) -> bool {
        let slot = key.index();
        let was_armed = self.armed[slot];
        self.armed[slot] = false;
        was_armed
    }
}
