//! Try-move and sliding resolution for walkers.

use std::f32::consts::FRAC_1_SQRT_2;

use glam::Vec2;
use overworld_core::{Direction, Rect};
use overworld_system_collision::{ShapeRef, ShapeSet};

use crate::config::BoxConfig;

/// Scale applied to displacement when two or more movement keys are held.
pub(crate) const DIAGONAL_RATIO: f32 = FRAC_1_SQRT_2;

/// Largest deflection tried when sliding along an obstacle.
const SLIDE_ANGLE: f32 = std::f32::consts::FRAC_PI_6;

/// Static shapes plus animated obstacles, optionally fenced by the chunk.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Terrain<'a> {
    shapes: &'a ShapeSet,
    dynamic: &'a [Rect],
    fence: Option<Rect>,
}

impl<'a> Terrain<'a> {
    pub(crate) fn new(shapes: &'a ShapeSet, dynamic: &'a [Rect]) -> Self {
        Self {
            shapes,
            dynamic,
            fence: None,
        }
    }

    /// Treats leaving `bounds` as a collision.
    pub(crate) fn fenced(mut self, bounds: Rect) -> Self {
        self.fence = Some(bounds);
        self
    }

    pub(crate) fn first_collision(&self, rect: &Rect) -> Option<Blocker<'a>> {
        if let Some(fence) = &self.fence {
            if !fence.contains_rect(rect) {
                return Some(Blocker::Fence);
            }
        }
        if let Some(shape) = self.shapes.first_collision(rect) {
            return Some(Blocker::Shape(shape));
        }
        self.dynamic
            .iter()
            .find(|shape| shape.overlaps(rect))
            .map(|shape| Blocker::Shape(ShapeRef::Rect(shape)))
    }

    pub(crate) fn collides(&self, rect: &Rect) -> bool {
        self.first_collision(rect).is_some()
    }
}

/// Whatever stopped a move.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Blocker<'a> {
    Shape(ShapeRef<'a>),
    Fence,
}

impl Blocker<'_> {
    fn overlaps(&self, rect: &Rect, terrain: &Terrain<'_>) -> bool {
        match self {
            Self::Shape(shape) => shape.overlaps(rect),
            Self::Fence => terrain
                .fence
                .map_or(false, |fence| !fence.contains_rect(rect)),
        }
    }
}

/// Moves by `offset` unless the footprint would collide.
///
/// Returns whether the move was kept.
pub(crate) fn try_move(
    position: &mut Vec2,
    footprint: &BoxConfig,
    offset: Vec2,
    terrain: &Terrain<'_>,
) -> bool {
    let candidate = *position + offset;
    if terrain.collides(&footprint.at(candidate)) {
        return false;
    }
    *position = candidate;
    true
}

/// Walks along the held directions, sliding along obstacles where possible.
///
/// Returns whether the position changed.
pub(crate) fn walk(
    position: &mut Vec2,
    footprint: &BoxConfig,
    directions: &[Direction],
    distance: f32,
    terrain: &Terrain<'_>,
) -> bool {
    if directions.is_empty() || distance <= 0.0 {
        return false;
    }

    let displacement = combined(directions, distance);
    let candidate = *position + displacement;
    let Some(blocker) = terrain.first_collision(&footprint.at(candidate)) else {
        *position = candidate;
        return displacement != Vec2::ZERO;
    };

    match directions {
        [direction] => slide(position, footprint, *direction, distance, blocker, terrain),
        [first, second] => {
            let survivors: Vec<Direction> = [*first, *second]
                .into_iter()
                .filter(|direction| {
                    let alone = *position + direction.unit() * distance;
                    !terrain.collides(&footprint.at(alone))
                })
                .collect();
            if survivors.is_empty() {
                return false;
            }
            let retry = combined(&survivors, distance);
            try_move(position, footprint, retry, terrain) && retry != Vec2::ZERO
        }
        _ => false,
    }
}

fn combined(directions: &[Direction], distance: f32) -> Vec2 {
    let sum = directions
        .iter()
        .fold(Vec2::ZERO, |sum, direction| sum + direction.unit());
    let scale = if directions.len() >= 2 {
        DIAGONAL_RATIO
    } else {
        1.0
    };
    sum * distance * scale
}

fn slide(
    position: &mut Vec2,
    footprint: &BoxConfig,
    direction: Direction,
    distance: f32,
    blocker: Blocker<'_>,
    terrain: &Terrain<'_>,
) -> bool {
    let (sin, cos) = SLIDE_ANGLE.sin_cos();
    for sign in [1.0, -1.0] {
        let deflected =
            (direction.unit() * cos + direction.perpendicular() * sign * sin) * distance;
        let candidate = *position + deflected;
        let bounds = footprint.at(candidate);
        if blocker.overlaps(&bounds, terrain) || terrain.collides(&bounds) {
            continue;
        }
        *position = candidate;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use overworld_system_collision::BoundedPolygon;

    fn footprint() -> BoxConfig {
        BoxConfig::new(0.0, 0.0, 4.0, 4.0)
    }

    #[test]
    fn open_ground_applies_full_displacement() {
        let shapes = ShapeSet::default();
        let terrain = Terrain::new(&shapes, &[]);
        let mut position = Vec2::ZERO;
        assert!(walk(
            &mut position,
            &footprint(),
            &[Direction::Right, Direction::Up],
            10.0,
            &terrain
        ));
        assert!((position.x - 10.0 * DIAGONAL_RATIO).abs() < 1e-5);
        assert!((position.y - 10.0 * DIAGONAL_RATIO).abs() < 1e-5);
    }

    #[test]
    fn single_key_slides_off_a_slanted_wall() {
        // 45 degree wall rising to the right, just ahead of the walker.
        let wall = BoundedPolygon::new(vec![
            Vec2::new(-15.0, -20.0),
            Vec2::new(40.0, -20.0),
            Vec2::new(40.0, 35.0),
        ])
        .expect("triangle");
        let shapes = ShapeSet::new(Vec::new(), vec![wall]);
        let terrain = Terrain::new(&shapes, &[]);

        let mut position = Vec2::new(0.0, 0.0);
        assert!(walk(&mut position, &footprint(), &[Direction::Right], 2.0, &terrain));
        assert!(position.x > 0.0);
        assert!(position.y > 0.0, "slid toward the open side: {position:?}");
    }

    #[test]
    fn single_key_into_flat_wall_reverts() {
        let shapes = ShapeSet::new(vec![Rect::new(5.0, -50.0, 10.0, 100.0)], Vec::new());
        let terrain = Terrain::new(&shapes, &[]);
        let mut position = Vec2::new(0.0, 0.0);
        assert!(!walk(&mut position, &footprint(), &[Direction::Right], 2.0, &terrain));
        assert_eq!(position, Vec2::ZERO);
    }

    #[test]
    fn two_keys_keep_the_free_axis() {
        let shapes = ShapeSet::new(vec![Rect::new(5.0, -50.0, 10.0, 100.0)], Vec::new());
        let terrain = Terrain::new(&shapes, &[]);
        let mut position = Vec2::new(0.0, 0.0);
        assert!(walk(
            &mut position,
            &footprint(),
            &[Direction::Right, Direction::Up],
            2.0,
            &terrain
        ));
        assert_eq!(position, Vec2::new(0.0, 2.0));
    }

    #[test]
    fn three_keys_never_slide() {
        let shapes = ShapeSet::new(vec![Rect::new(5.0, -50.0, 10.0, 100.0)], Vec::new());
        let terrain = Terrain::new(&shapes, &[]);
        let mut position = Vec2::new(0.0, 0.0);
        assert!(!walk(
            &mut position,
            &footprint(),
            &[Direction::Right, Direction::Up, Direction::Down],
            2.0,
            &terrain
        ));
        assert_eq!(position, Vec2::ZERO);
    }

    #[test]
    fn fence_blocks_leaving_bounds() {
        let shapes = ShapeSet::default();
        let terrain = Terrain::new(&shapes, &[]).fenced(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut position = Vec2::new(5.0, 5.0);
        assert!(!try_move(&mut position, &footprint(), Vec2::new(2.0, 0.0), &terrain));
        assert!(try_move(&mut position, &footprint(), Vec2::new(1.0, 0.0), &terrain));
    }
}
