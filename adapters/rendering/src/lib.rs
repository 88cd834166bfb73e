#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for overworld adapters.
//!
//! The simulation never draws. Adapters translate world queries into a
//! [`Scene`] once per frame and hand it to a [`RenderingBackend`].

use anyhow::Result as AnyResult;
use glam::Vec2;
use overworld_core::{Command, Key, Rect};
use overworld_system_animation::FrameKey;
use std::{collections::BTreeMap, error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

/// Outline color for terrain footprints.
pub const COLLISION_COLOR: Color = Color::from_rgb_u8(80, 200, 255);
/// Outline color for hittable regions.
pub const DEFENSE_COLOR: Color = Color::from_rgb_u8(80, 255, 120);
/// Outline color for active melee hitboxes.
pub const ATTACK_COLOR: Color = Color::from_rgb_u8(255, 70, 70);

/// Input gathered by adapters during one frame.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Keys that went down this frame, in press order.
    pub pressed: Vec<Key>,
    /// Keys that went up this frame before being pressed again.
    pub released: Vec<Key>,
    /// Keys pressed and then released within this frame.
    pub tapped: Vec<Key>,
    /// Requested pause state, when the player toggled it.
    pub pause: Option<bool>,
    /// Whether the player asked to close the active message.
    pub dismiss: bool,
}

impl FrameInput {
    /// Reports whether nothing happened this frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
            && self.released.is_empty()
            && self.tapped.is_empty()
            && self.pause.is_none()
            && !self.dismiss
    }

    /// Folds a later input of the same frame into this one.
    ///
    /// A release of a key this input already pressed becomes a tap, so the
    /// key is not left held.
    pub fn merge(&mut self, other: FrameInput) {
        for key in other.released {
            if self.pressed.contains(&key) {
                self.tapped.push(key);
            } else {
                self.released.push(key);
            }
        }
        self.pressed.extend(other.pressed);
        self.tapped.extend(other.tapped);
        if other.pause.is_some() {
            self.pause = other.pause;
        }
        self.dismiss |= other.dismiss;
    }

    /// Converts the input into world commands followed by the frame tick.
    ///
    /// Releases come before presses so a key released and re-pressed within
    /// one frame ends up held. Taps are released after every press.
    #[must_use]
    pub fn into_commands(self, dt: Duration) -> Vec<Command> {
        let mut commands =
            Vec::with_capacity(self.released.len() + self.pressed.len() + self.tapped.len() + 3);
        commands.extend(
            self.released
                .into_iter()
                .map(|key| Command::KeyReleased { key }),
        );
        commands.extend(self.pressed.into_iter().map(|key| Command::KeyPressed { key }));
        commands.extend(self.tapped.into_iter().map(|key| Command::KeyReleased { key }));
        if let Some(paused) = self.pause {
            commands.push(Command::SetPaused { paused });
        }
        if self.dismiss {
            commands.push(Command::DismissMessage);
        }
        commands.push(Command::Tick { dt });
        commands
    }
}

/// Background tiles of the loaded chunk, stored bottom row first.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGridPresentation {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Width of one tile in world units.
    pub tile_width: u32,
    /// Height of one tile in world units.
    pub tile_height: u32,
    tiles: Vec<u32>,
}

impl TileGridPresentation {
    /// Creates a tile grid, validating its dimensions.
    pub fn new(
        columns: u32,
        rows: u32,
        tile_width: u32,
        tile_height: u32,
        tiles: Vec<u32>,
    ) -> Result<Self, RenderingError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(RenderingError::InvalidTileSize {
                width: tile_width,
                height: tile_height,
            });
        }
        let expected = columns as usize * rows as usize;
        if tiles.len() != expected {
            return Err(RenderingError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            columns,
            rows,
            tile_width,
            tile_height,
            tiles,
        })
    }

    /// Total width of the grid in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.columns * self.tile_width) as f32
    }

    /// Total height of the grid in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        (self.rows * self.tile_height) as f32
    }

    /// Tile index at the cell; zero marks an empty cell.
    #[must_use]
    pub fn tile(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.tiles
            .get(row as usize * self.columns as usize + column as usize)
            .copied()
    }

    /// World-space rectangle covered by the cell.
    #[must_use]
    pub fn tile_rect(&self, column: u32, row: u32) -> Rect {
        Rect::new(
            (column * self.tile_width) as f32,
            (row * self.tile_height) as f32,
            self.tile_width as f32,
            self.tile_height as f32,
        )
    }

    /// Non-empty tiles intersecting `view`, as `(column, row, tile)`.
    #[must_use]
    pub fn visible_tiles(&self, view: &Rect) -> Vec<(u32, u32, u32)> {
        let first_column = (view.x / self.tile_width as f32).floor().max(0.0) as u32;
        let first_row = (view.y / self.tile_height as f32).floor().max(0.0) as u32;
        let last_column = ((view.right() / self.tile_width as f32).ceil().max(0.0) as u32)
            .min(self.columns);
        let last_row =
            ((view.top() / self.tile_height as f32).ceil().max(0.0) as u32).min(self.rows);

        let mut visible = Vec::new();
        for row in first_row..last_row {
            for column in first_column..last_column {
                match self.tile(column, row) {
                    Some(0) | None => {}
                    Some(tile) => visible.push((column, row, tile)),
                }
            }
        }
        visible
    }
}

/// Sprite frame drawn for one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct SpritePresentation {
    /// Entity identifier.
    pub entity: u32,
    /// Frame to display.
    pub frame: FrameKey,
    /// Lower-left corner in world space.
    pub position: Vec2,
}

/// Debug rectangle outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugRect {
    /// Rectangle in world space.
    pub rect: Rect,
    /// Outline color.
    pub color: Color,
}

/// Player status shown on top of the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct HudPresentation {
    /// Remaining health.
    pub health: i32,
    /// Health at full strength.
    pub max_health: i32,
    /// Collected resources.
    pub resources: u32,
}

/// Conversation box content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePresentation {
    /// Catalog key of the message.
    pub name: String,
    /// Localized text.
    pub text: String,
}

/// Scene description for one presented frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Background tiles.
    pub tiles: TileGridPresentation,
    /// Visible world region.
    pub view: Rect,
    /// Sprites in draw order, back to front.
    pub sprites: Vec<SpritePresentation>,
    /// Debug outlines, drawn after sprites when enabled.
    pub debug: Vec<DebugRect>,
    /// Whether debug outlines are drawn.
    pub show_debug: bool,
    /// Player status.
    pub hud: HudPresentation,
    /// Active conversation message.
    pub message: Option<MessagePresentation>,
    /// Whether the simulation is paused.
    pub paused: bool,
}

impl Scene {
    /// Creates an empty scene over the tile grid.
    #[must_use]
    pub fn new(tiles: TileGridPresentation, view: Rect) -> Self {
        Self {
            tiles,
            view,
            sprites: Vec::new(),
            debug: Vec::new(),
            show_debug: false,
            hud: HudPresentation::default(),
            message: None,
            paused: false,
        }
    }

    /// Converts a y-up world point into y-down screen coordinates of the view.
    #[must_use]
    pub fn to_screen(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x - self.view.x, self.view.top() - point.y)
    }

    /// Reports whether any part of `rect` lies inside the view.
    #[must_use]
    pub fn is_visible(&self, rect: &Rect) -> bool {
        self.view.overlaps(rect)
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting overworld scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// input captured by the adapter, advances the simulation and rewrites the
    /// scene before it is presented. An error stops the backend.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> AnyResult<()>;
}

/// Backend that presents nothing and replays a fixed number of frames.
#[derive(Clone, Debug)]
pub struct HeadlessBackend {
    frames: u32,
    frame_delta: Duration,
    script: BTreeMap<u32, FrameInput>,
}

impl HeadlessBackend {
    /// Creates a backend that runs `frames` frames at `fps` frames per second.
    pub fn new(frames: u32, fps: u32) -> Result<Self, RenderingError> {
        if fps == 0 {
            return Err(RenderingError::InvalidFrameRate { fps });
        }
        Ok(Self {
            frames,
            frame_delta: Duration::from_secs(1) / fps,
            script: BTreeMap::new(),
        })
    }

    /// Schedules input for the given frame index.
    pub fn schedule(&mut self, frame: u32, input: FrameInput) {
        self.script.entry(frame).or_default().merge(input);
    }

    /// Delta passed to every frame.
    #[must_use]
    pub const fn frame_delta(&self) -> Duration {
        self.frame_delta
    }

    /// Number of frames the backend runs.
    #[must_use]
    pub const fn frames(&self) -> u32 {
        self.frames
    }
}

impl RenderingBackend for HeadlessBackend {
    fn run<F>(mut self, presentation: Presentation, mut update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> AnyResult<()>,
    {
        let mut scene = presentation.scene;
        for frame in 0..self.frames {
            let input = self.script.remove(&frame).unwrap_or_default();
            update_scene(self.frame_delta, input, &mut scene)?;
        }
        Ok(())
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Tiles must have a positive size.
    InvalidTileSize {
        /// Provided tile width.
        width: u32,
        /// Provided tile height.
        height: u32,
    },
    /// The tile list does not cover the grid exactly.
    TileCountMismatch {
        /// Cells in the grid.
        expected: usize,
        /// Tiles provided.
        actual: usize,
    },
    /// Frames per second must be positive.
    InvalidFrameRate {
        /// Provided rate.
        fps: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTileSize { width, height } => {
                write!(f, "tile size must be positive (received {width}x{height})")
            }
            Self::TileCountMismatch { expected, actual } => {
                write!(f, "tile grid needs {expected} tiles (received {actual})")
            }
            Self::InvalidFrameRate { fps } => {
                write!(f, "frame rate must be positive (received {fps})")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use overworld_core::Direction;

    fn grid() -> TileGridPresentation {
        TileGridPresentation::new(4, 3, 16, 16, vec![1, 1, 0, 1, 2, 2, 2, 2, 3, 3, 3, 3])
            .expect("valid grid")
    }

    #[test]
    fn tile_grid_rejects_mismatched_tile_counts() {
        let error = TileGridPresentation::new(4, 3, 16, 16, vec![1; 5])
            .expect_err("short tile list must be rejected");
        assert_eq!(
            error,
            RenderingError::TileCountMismatch {
                expected: 12,
                actual: 5
            }
        );
    }

    #[test]
    fn tile_grid_rejects_zero_sized_tiles() {
        let error = TileGridPresentation::new(1, 1, 0, 16, vec![1])
            .expect_err("zero width must be rejected");
        assert!(matches!(
            error,
            RenderingError::InvalidTileSize { width: 0, .. }
        ));
    }

    #[test]
    fn visible_tiles_skip_empty_cells_and_clip_to_the_view() {
        let grid = grid();
        let visible = grid.visible_tiles(&Rect::new(0.0, 0.0, 40.0, 10.0));
        assert_eq!(visible, vec![(0, 0, 1), (1, 0, 1)]);
        assert_eq!(grid.tile_rect(3, 2), Rect::new(48.0, 32.0, 16.0, 16.0));
        assert_eq!(grid.width(), 64.0);
        assert_eq!(grid.height(), 48.0);
    }

    #[test]
    fn screen_coordinates_flip_the_vertical_axis() {
        let scene = Scene::new(grid(), Rect::new(10.0, 20.0, 40.0, 30.0));
        assert_eq!(scene.to_screen(Vec2::new(10.0, 50.0)), Vec2::ZERO);
        assert_eq!(scene.to_screen(Vec2::new(30.0, 20.0)), Vec2::new(20.0, 30.0));
        assert!(scene.is_visible(&Rect::new(45.0, 45.0, 10.0, 10.0)));
        assert!(!scene.is_visible(&Rect::new(50.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn frame_input_releases_before_presses_and_ticks_last() {
        let input = FrameInput {
            pressed: vec![Key::Up],
            released: vec![Key::Up],
            tapped: Vec::new(),
            pause: Some(true),
            dismiss: true,
        };
        let dt = Duration::from_millis(16);
        assert_eq!(
            input.into_commands(dt),
            vec![
                Command::KeyReleased { key: Key::Up },
                Command::KeyPressed { key: Key::Up },
                Command::SetPaused { paused: true },
                Command::DismissMessage,
                Command::Tick { dt },
            ]
        );
        assert_eq!(Key::Up.direction(), Some(Direction::Up));
    }

    #[test]
    fn merged_press_then_release_ends_released() {
        let mut input = FrameInput {
            pressed: vec![Key::Left],
            ..FrameInput::default()
        };
        input.merge(FrameInput {
            released: vec![Key::Left, Key::Down],
            ..FrameInput::default()
        });
        assert_eq!(input.tapped, vec![Key::Left]);
        assert_eq!(input.released, vec![Key::Down]);

        let dt = Duration::from_millis(16);
        assert_eq!(
            input.into_commands(dt),
            vec![
                Command::KeyReleased { key: Key::Down },
                Command::KeyPressed { key: Key::Left },
                Command::KeyReleased { key: Key::Left },
                Command::Tick { dt },
            ]
        );
    }

    #[test]
    fn headless_backend_replays_scheduled_input() {
        let mut backend = HeadlessBackend::new(5, 60).expect("positive rate");
        backend.schedule(
            2,
            FrameInput {
                pressed: vec![Key::Attack],
                ..FrameInput::default()
            },
        );
        let presentation = Presentation::new(
            "test",
            Color::from_rgb_u8(0, 0, 0),
            Scene::new(grid(), Rect::new(0.0, 0.0, 64.0, 48.0)),
        );

        let mut seen = Vec::new();
        backend
            .run(presentation, |dt, input, scene| {
                assert_eq!(dt, Duration::from_secs(1) / 60);
                scene.paused = !input.is_empty();
                seen.push(scene.paused);
                Ok(())
            })
            .expect("backend runs");
        assert_eq!(seen, vec![false, false, true, false, false]);
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        assert_eq!(
            HeadlessBackend::new(1, 0).expect_err("zero fps"),
            RenderingError::InvalidFrameRate { fps: 0 }
        );
    }
}
