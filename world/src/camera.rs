//! Viewport that follows the player inside the chunk.

use glam::Vec2;
use overworld_core::Rect;

/// Axis-aligned view rectangle clamped to the chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    center: Vec2,
    size: Vec2,
}

impl Camera {
    pub(crate) fn new(size: Vec2) -> Self {
        Self {
            center: size * 0.5,
            size,
        }
    }

    /// Center of the view.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Visible region in world space.
    #[must_use]
    pub fn view(&self) -> Rect {
        Rect::centered(self.center, self.size.x, self.size.y)
    }

    /// Centers on `target`, keeping the view inside `bounds` where it fits.
    pub(crate) fn follow(&mut self, target: Vec2, bounds: Rect) {
        self.center = Vec2::new(
            clamp_axis(target.x, self.size.x, bounds.x, bounds.width),
            clamp_axis(target.y, self.size.y, bounds.y, bounds.height),
        );
    }
}

fn clamp_axis(target: f32, extent: f32, start: f32, length: f32) -> f32 {
    if extent >= length {
        return start + length * 0.5;
    }
    let half = extent * 0.5;
    target.clamp(start + half, start + length - half)
}
