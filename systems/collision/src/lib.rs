#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rectangle and polygon overlap tests backing terrain collision.
//!
//! Shapes are built once when a chunk loads and never mutated afterwards.
//! Concave polygons are decomposed into convex parts at construction, and
//! every polygon carries its bounding rectangle so the cheap rejection test
//! always runs before the exact separating-axis test.

mod decompose;

use glam::Vec2;
use overworld_core::Rect;
use thiserror::Error;

/// Reasons a polygon cannot be used as collision geometry.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GeometryError {
    /// A polygon needs at least three vertices.
    #[error("polygon needs at least 3 vertices (received {count})")]
    TooFewVertices {
        /// Number of vertices supplied.
        count: usize,
    },
    /// All vertices are collinear or coincident.
    #[error("polygon encloses no area")]
    Degenerate,
}

/// Reports whether two rectangles overlap.
#[must_use]
pub fn rect_overlap(a: &Rect, b: &Rect) -> bool {
    a.overlaps(b)
}

/// Reports whether a bounded polygon overlaps a rectangle.
#[must_use]
pub fn poly_overlap(polygon: &BoundedPolygon, rect: &Rect) -> bool {
    polygon.overlaps_rect(rect)
}

/// Convex polygon with counter-clockwise winding.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<Vec2>,
}

impl ConvexPolygon {
    /// Vertices in counter-clockwise order.
    #[must_use]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Area enclosed by the polygon.
    #[must_use]
    pub fn area(&self) -> f32 {
        decompose::signed_area_doubled(&self.vertices).abs() * 0.5
    }

    /// Reports whether every corner turns the same way.
    #[must_use]
    pub fn is_convex(&self) -> bool {
        decompose::is_convex_ccw(&self.vertices)
    }

    /// Separating-axis test against a rectangle.
    #[must_use]
    pub fn overlaps_rect(&self, rect: &Rect) -> bool {
        let corners = [
            Vec2::new(rect.x, rect.y),
            Vec2::new(rect.right(), rect.y),
            Vec2::new(rect.right(), rect.top()),
            Vec2::new(rect.x, rect.top()),
        ];

        let (min_x, max_x) = project(&self.vertices, Vec2::X);
        if max_x <= rect.x || rect.right() <= min_x {
            return false;
        }
        let (min_y, max_y) = project(&self.vertices, Vec2::Y);
        if max_y <= rect.y || rect.top() <= min_y {
            return false;
        }

        let count = self.vertices.len();
        for index in 0..count {
            let edge = self.vertices[(index + 1) % count] - self.vertices[index];
            if edge.length_squared() <= f32::EPSILON {
                continue;
            }
            let axis = edge.perp();
            let (poly_min, poly_max) = project(&self.vertices, axis);
            let (rect_min, rect_max) = project(&corners, axis);
            if poly_max <= rect_min || rect_max <= poly_min {
                return false;
            }
        }

        true
    }
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points
        .iter()
        .map(|point| point.dot(axis))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        })
}

/// Polygon paired with its bounding rectangle and convex decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundedPolygon {
    vertices: Vec<Vec2>,
    bounds: Rect,
    parts: Vec<ConvexPolygon>,
}

impl BoundedPolygon {
    /// Builds a bounded polygon from a simple polygon in either winding.
    ///
    /// Clockwise input is reversed so stored vertices are counter-clockwise.
    pub fn new(mut vertices: Vec<Vec2>) -> Result<Self, GeometryError> {
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                count: vertices.len(),
            });
        }

        let doubled = decompose::signed_area_doubled(&vertices);
        if doubled.abs() <= f32::EPSILON {
            return Err(GeometryError::Degenerate);
        }
        if doubled < 0.0 {
            vertices.reverse();
        }

        let bounds = Rect::bounding(&vertices).ok_or(GeometryError::Degenerate)?;
        let parts = decompose::decompose_ccw(&vertices)
            .into_iter()
            .map(|vertices| ConvexPolygon { vertices })
            .collect();

        Ok(Self {
            vertices,
            bounds,
            parts,
        })
    }

    /// Original vertices in counter-clockwise order.
    #[must_use]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Axis-aligned bounding rectangle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Convex parts whose union is the polygon.
    #[must_use]
    pub fn parts(&self) -> &[ConvexPolygon] {
        &self.parts
    }

    /// Area enclosed by the original polygon.
    #[must_use]
    pub fn area(&self) -> f32 {
        decompose::signed_area_doubled(&self.vertices).abs() * 0.5
    }

    /// Tests the bounding rectangle first, then each convex part.
    #[must_use]
    pub fn overlaps_rect(&self, rect: &Rect) -> bool {
        if !self.bounds.overlaps(rect) {
            return false;
        }
        self.parts.iter().any(|part| part.overlaps_rect(rect))
    }
}

/// Borrowed reference to one shape inside a [`ShapeSet`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeRef<'a> {
    /// Axis-aligned rectangle.
    Rect(&'a Rect),
    /// Bounded polygon.
    Polygon(&'a BoundedPolygon),
}

impl ShapeRef<'_> {
    /// Reports whether the referenced shape overlaps the rectangle.
    #[must_use]
    pub fn overlaps(&self, rect: &Rect) -> bool {
        match self {
            Self::Rect(shape) => shape.overlaps(rect),
            Self::Polygon(shape) => shape.overlaps_rect(rect),
        }
    }

    /// Bounding rectangle of the referenced shape.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(shape) => **shape,
            Self::Polygon(shape) => shape.bounds(),
        }
    }
}

/// Immutable collection of rectangles and bounded polygons.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeSet {
    rects: Vec<Rect>,
    polygons: Vec<BoundedPolygon>,
}

impl ShapeSet {
    /// Creates a shape set from prepared shapes.
    #[must_use]
    pub fn new(rects: Vec<Rect>, polygons: Vec<BoundedPolygon>) -> Self {
        Self { rects, polygons }
    }

    /// Creates a shape set containing the shapes of both inputs.
    #[must_use]
    pub fn combined(first: &ShapeSet, second: &ShapeSet) -> Self {
        let mut rects = first.rects.clone();
        rects.extend_from_slice(&second.rects);
        let mut polygons = first.polygons.clone();
        polygons.extend(second.polygons.iter().cloned());
        Self { rects, polygons }
    }

    /// Rectangles in insertion order.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Polygons in insertion order.
    #[must_use]
    pub fn polygons(&self) -> &[BoundedPolygon] {
        &self.polygons
    }

    /// Reports whether the set holds no shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.polygons.is_empty()
    }

    /// First shape overlapping the rectangle, testing rectangles before polygons.
    #[must_use]
    pub fn first_collision(&self, rect: &Rect) -> Option<ShapeRef<'_>> {
        if let Some(hit) = self.rects.iter().find(|shape| shape.overlaps(rect)) {
            return Some(ShapeRef::Rect(hit));
        }
        self.polygons
            .iter()
            .find(|shape| shape.overlaps_rect(rect))
            .map(ShapeRef::Polygon)
    }

    /// Reports whether any shape overlaps the rectangle.
    #[must_use]
    pub fn collides(&self, rect: &Rect) -> bool {
        self.first_collision(rect).is_some()
    }
}
