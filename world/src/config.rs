//! Tunable simulation parameters loaded from TOML.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use overworld_core::{Direction, Rect};
use overworld_system_animation::{AnimationManifest, SheetManifest};
use serde::Deserialize;
use thiserror::Error;

/// Failures raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML for [`WorldConfig`].
    #[error("failed to parse world config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but cannot drive the simulation.
    #[error("invalid world config: {reason}")]
    Invalid {
        /// Human readable description of the rejected value.
        reason: String,
    },
}

/// Every tunable of the simulation, passed explicitly to each chunk.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Fixed simulation steps per second.
    pub steps_per_second: u32,
    /// Longest render frame, in seconds, that is still simulated.
    pub max_frame_delta: f32,
    /// Seed for monster wandering.
    pub seed: u64,
    /// Visible area followed by the camera.
    pub viewport: ViewportConfig,
    /// Player tuning.
    pub player: PlayerConfig,
    /// Player projectile tuning.
    pub projectile: ProjectileConfig,
    /// Monster templates selected by the map's `type` property.
    pub monsters: Vec<MonsterTemplate>,
    /// Collectable templates selected by the map's `type` property.
    pub collectables: Vec<CollectableTemplate>,
    /// Frame layout of every sprite sheet.
    pub animations: AnimationManifest,
    /// Localized conversation text keyed by message name.
    pub messages: BTreeMap<String, String>,
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize but cannot be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps_per_second == 0 {
            return Err(ConfigError::Invalid {
                reason: "steps_per_second must be positive".to_owned(),
            });
        }
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "max_frame_delta must be a finite positive number (received {})",
                    self.max_frame_delta
                ),
            });
        }
        for (index, template) in self.monsters.iter().enumerate() {
            if self.monsters[..index]
                .iter()
                .any(|other| other.kind == template.kind)
            {
                return Err(ConfigError::Invalid {
                    reason: format!("monster type {} declared twice", template.kind),
                });
            }
        }
        for (index, template) in self.collectables.iter().enumerate() {
            if self.collectables[..index]
                .iter()
                .any(|other| other.kind == template.kind)
            {
                return Err(ConfigError::Invalid {
                    reason: format!("collectable type {} declared twice", template.kind),
                });
            }
        }
        Ok(())
    }

    /// Duration of one fixed simulation step.
    #[must_use]
    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs(1) / self.steps_per_second.max(1)
    }

    /// Frame-delta ceiling above which a frame is skipped.
    #[must_use]
    ///
    /// Values that [`WorldConfig::validate`] rejects yield a zero ceiling, so
    /// every frame is skipped instead of simulated.
    pub fn frame_ceiling(&self) -> Duration {
        Duration::try_from_secs_f32(self.max_frame_delta).unwrap_or(Duration::ZERO)
    }

    /// Template for a monster type.
    #[must_use]
    pub fn monster(&self, kind: u32) -> Option<&MonsterTemplate> {
        self.monsters.iter().find(|template| template.kind == kind)
    }

    /// Template for a collectable type.
    #[must_use]
    pub fn collectable(&self, kind: u32) -> Option<&CollectableTemplate> {
        self.collectables
            .iter()
            .find(|template| template.kind == kind)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        let mut sheets = BTreeMap::new();
        let _ = sheets.insert(
            "player".to_owned(),
            SheetManifest::new(
                0.1,
                &[
                    ("idle", 4),
                    ("melee", 3),
                    ("special", 3),
                    ("knockback", 2),
                    ("expire", 6),
                ],
            ),
        );
        let _ = sheets.insert(
            "fireball".to_owned(),
            SheetManifest::new(0.05, &[("init", 3), ("loop", 4), ("expire", 4)]),
        );
        let _ = sheets.insert(
            "slime".to_owned(),
            SheetManifest::new(
                0.12,
                &[("idle", 4), ("melee", 4), ("knockback", 2), ("expire", 5)],
            ),
        );
        let _ = sheets.insert(
            "butterfly".to_owned(),
            SheetManifest::new(0.08, &[("idle", 2)]),
        );
        let _ = sheets.insert("coin".to_owned(), SheetManifest::new(0.1, &[("idle", 6)]));
        let _ = sheets.insert(
            "torch".to_owned(),
            SheetManifest::new(0.15, &[("idle", 4)]),
        );

        Self {
            steps_per_second: 120,
            max_frame_delta: 0.25,
            seed: 0x6f76_6572_776f_726c,
            viewport: ViewportConfig::default(),
            player: PlayerConfig::default(),
            projectile: ProjectileConfig::default(),
            monsters: vec![
                MonsterTemplate::default(),
                MonsterTemplate {
                    kind: 2,
                    sheet: "butterfly".to_owned(),
                    health: 1,
                    speed: 20.0,
                    decorative: true,
                    ..MonsterTemplate::default()
                },
            ],
            collectables: vec![CollectableTemplate::default()],
            animations: AnimationManifest { sheets },
            messages: BTreeMap::new(),
        }
    }
}

/// Size of the camera's visible area in world units.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    /// Visible width.
    pub width: f32,
    /// Visible height.
    pub height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 180.0,
        }
    }
}

/// Rectangle expressed relative to an entity's lower-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoxConfig {
    /// Offset along `x`.
    pub x: f32,
    /// Offset along `y`.
    pub y: f32,
    /// Extent along `x`.
    pub width: f32,
    /// Extent along `y`.
    pub height: f32,
}

impl BoxConfig {
    /// Creates a relative box.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box placed at an entity position.
    #[must_use]
    pub fn at(&self, position: Vec2) -> Rect {
        Rect::new(
            position.x + self.x,
            position.y + self.y,
            self.width,
            self.height,
        )
    }
}

/// Per-direction launch points relative to the player's center.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchOffsets {
    /// Offset when facing left.
    pub left: [f32; 2],
    /// Offset when facing right.
    pub right: [f32; 2],
    /// Offset when facing up.
    pub up: [f32; 2],
    /// Offset when facing down.
    pub down: [f32; 2],
}

impl LaunchOffsets {
    /// Offset for the facing direction.
    #[must_use]
    pub fn get(&self, direction: Direction) -> Vec2 {
        let [x, y] = match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        };
        Vec2::new(x, y)
    }
}

impl Default for LaunchOffsets {
    fn default() -> Self {
        Self {
            left: [-6.0, -2.0],
            right: [6.0, -2.0],
            up: [0.0, 4.0],
            down: [0.0, -6.0],
        }
    }
}

/// Player tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Sprite sheet name.
    pub sheet: String,
    /// Starting and maximum health.
    pub health: i32,
    /// Walking speed in units per second.
    pub speed: f32,
    /// Push-back speed while recoiling.
    pub knockback_speed: f32,
    /// Sprite width.
    pub width: u32,
    /// Sprite height.
    pub height: u32,
    /// Terrain footprint.
    pub collision: BoxConfig,
    /// Region where the player can be hit.
    pub defense: BoxConfig,
    /// Distance the melee hitbox extends beyond the defense box.
    pub melee_reach: f32,
    /// Seconds into a swing before it can land.
    pub melee_delay: f32,
    /// Seconds between footstep cues while walking.
    pub footstep_interval: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sheet: "player".to_owned(),
            health: 6,
            speed: 60.0,
            knockback_speed: 90.0,
            width: 16,
            height: 16,
            collision: BoxConfig::new(3.0, 0.0, 10.0, 6.0),
            defense: BoxConfig::new(2.0, 0.0, 12.0, 14.0),
            melee_reach: 10.0,
            melee_delay: 0.1,
            footstep_interval: 0.3,
        }
    }
}

/// Player projectile tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectileConfig {
    /// Sprite sheet name.
    pub sheet: String,
    /// Travel speed in units per second.
    pub speed: f32,
    /// Distance travelled before dissipating.
    pub range: f32,
    /// Seconds spent expiring before removal.
    pub dissipation: f32,
    /// Sprite width.
    pub width: u32,
    /// Sprite height.
    pub height: u32,
    /// Hit region used for terrain and monster tests.
    pub collision: BoxConfig,
    /// Spawn points relative to the player's center.
    pub launch_offsets: LaunchOffsets,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            sheet: "fireball".to_owned(),
            speed: 200.0,
            range: 200.0,
            dissipation: 0.2,
            width: 8,
            height: 8,
            collision: BoxConfig::new(1.0, 1.0, 6.0, 6.0),
            launch_offsets: LaunchOffsets::default(),
        }
    }
}

/// Reach of a monster swing measured from its center.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackWindow {
    /// Maximum distance along the facing axis.
    pub along: f32,
    /// Maximum distance across the facing axis.
    pub across: f32,
}

/// Monster tuning for one map `type`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonsterTemplate {
    /// Map `type` property selecting the template.
    pub kind: u32,
    /// Sprite sheet name.
    pub sheet: String,
    /// Starting health.
    pub health: i32,
    /// Walking speed in units per second.
    pub speed: f32,
    /// Push-back speed while recoiling.
    pub knockback_speed: f32,
    /// Sprite width.
    pub width: u32,
    /// Sprite height.
    pub height: u32,
    /// Terrain footprint.
    pub collision: BoxConfig,
    /// Region where the monster can be hit.
    pub defense: BoxConfig,
    /// Distance the melee hitbox extends beyond the defense box.
    pub melee_reach: f32,
    /// Seconds into a swing before it can land.
    pub melee_delay: f32,
    /// Seconds between the end of one swing and the start of the next.
    pub melee_cooldown: f32,
    /// Distance from the player that starts a swing.
    pub attack_window: AttackWindow,
    /// Whether the monster hunts the player from the start.
    pub aggressive: bool,
    /// Purely cosmetic wanderer that ignores terrain and combat.
    pub decorative: bool,
}

impl Default for MonsterTemplate {
    fn default() -> Self {
        Self {
            kind: 1,
            sheet: "slime".to_owned(),
            health: 3,
            speed: 30.0,
            knockback_speed: 80.0,
            width: 16,
            height: 16,
            collision: BoxConfig::new(2.0, 0.0, 12.0, 6.0),
            defense: BoxConfig::new(1.0, 0.0, 14.0, 12.0),
            melee_reach: 8.0,
            melee_delay: 0.2,
            melee_cooldown: 0.8,
            attack_window: AttackWindow {
                along: 20.0,
                across: 8.0,
            },
            aggressive: false,
            decorative: false,
        }
    }
}

/// Collectable tuning for one map `type`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectableTemplate {
    /// Map `type` property selecting the template.
    pub kind: u32,
    /// Sprite sheet name.
    pub sheet: String,
    /// Sprite width.
    pub width: u32,
    /// Sprite height.
    pub height: u32,
    /// Resources granted on pickup.
    pub value: u32,
}

impl Default for CollectableTemplate {
    fn default() -> Self {
        Self {
            kind: 1,
            sheet: "coin".to_owned(),
            width: 8,
            height: 8,
            value: 1,
        }
    }
}
