//! Convex decomposition of simple polygons.
//!
//! Concave polygons are triangulated by ear clipping and the triangles are
//! then greedily re-merged across shared diagonals (Hertel–Mehlhorn) while the
//! merged piece stays convex. The result never has more than twice the minimum
//! number of convex parts.

use glam::Vec2;

const EPSILON: f32 = 1e-5;

/// Twice the signed area of the polygon; positive for counter-clockwise winding.
pub(crate) fn signed_area_doubled(points: &[Vec2]) -> f32 {
    let mut sum = 0.0;
    for (index, current) in points.iter().enumerate() {
        let next = points[(index + 1) % points.len()];
        sum += current.perp_dot(next);
    }
    sum
}

fn corner_cross(previous: Vec2, current: Vec2, next: Vec2) -> f32 {
    (current - previous).perp_dot(next - current)
}

/// Reports whether a counter-clockwise polygon is convex, tolerating collinear runs.
pub(crate) fn is_convex_ccw(points: &[Vec2]) -> bool {
    let count = points.len();
    if count < 3 {
        return false;
    }
    (0..count).all(|index| {
        let previous = points[(index + count - 1) % count];
        let next = points[(index + 1) % count];
        corner_cross(previous, points[index], next) >= -EPSILON
    })
}

/// Splits a counter-clockwise simple polygon into convex counter-clockwise parts.
///
/// Convex input is returned unchanged as a single part.
pub(crate) fn decompose_ccw(points: &[Vec2]) -> Vec<Vec<Vec2>> {
    if is_convex_ccw(points) {
        return vec![points.to_vec()];
    }

    let triangles = ear_clip(points);
    let mut parts = merge_convex(points, triangles);
    parts.retain(|part| part.len() >= 3);
    parts
        .into_iter()
        .map(|part| part.into_iter().map(|index| points[index]).collect())
        .collect()
}

fn ear_clip(points: &[Vec2]) -> Vec<Vec<usize>> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len().saturating_sub(2));

    while remaining.len() > 3 {
        let count = remaining.len();
        let mut ear = None;
        let mut sharpest: Option<(usize, f32)> = None;

        for position in 0..count {
            let previous = remaining[(position + count - 1) % count];
            let current = remaining[position];
            let next = remaining[(position + 1) % count];
            let cross = corner_cross(points[previous], points[current], points[next]);

            if sharpest.map_or(true, |(_, best)| cross > best) {
                sharpest = Some((position, cross));
            }

            if cross <= EPSILON {
                continue;
            }

            let blocked = remaining.iter().any(|&candidate| {
                candidate != previous
                    && candidate != current
                    && candidate != next
                    && point_in_triangle(
                        points[candidate],
                        points[previous],
                        points[current],
                        points[next],
                    )
            });

            if !blocked {
                ear = Some(position);
                break;
            }
        }

        // Numerically degenerate input can leave no clean ear; clip the most
        // convex corner so the loop always terminates.
        let Some(position) = ear.or(sharpest.map(|(position, _)| position)) else {
            break;
        };

        let previous = remaining[(position + count - 1) % count];
        let next = remaining[(position + 1) % count];
        triangles.push(vec![previous, remaining[position], next]);
        let _ = remaining.remove(position);
    }

    if remaining.len() == 3 {
        triangles.push(remaining);
    }

    triangles
}

fn point_in_triangle(point: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let ab = (b - a).perp_dot(point - a);
    let bc = (c - b).perp_dot(point - b);
    let ca = (a - c).perp_dot(point - c);
    ab >= -EPSILON && bc >= -EPSILON && ca >= -EPSILON
}

fn merge_convex(points: &[Vec2], mut parts: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    loop {
        let mut merged_any = false;

        'search: for first in 0..parts.len() {
            for second in (first + 1)..parts.len() {
                let Some(merged) = try_merge(&parts[first], &parts[second]) else {
                    continue;
                };

                let vertices: Vec<Vec2> = merged.iter().map(|&index| points[index]).collect();
                if !is_convex_ccw(&vertices) {
                    continue;
                }

                parts[first] = merged;
                let _ = parts.swap_remove(second);
                merged_any = true;
                break 'search;
            }
        }

        if !merged_any {
            return parts;
        }
    }
}

/// Joins two counter-clockwise parts that share an edge in opposite winding.
fn try_merge(first: &[usize], second: &[usize]) -> Option<Vec<usize>> {
    for i in 0..first.len() {
        let a = first[i];
        let b = first[(i + 1) % first.len()];
        for j in 0..second.len() {
            if second[j] != b || second[(j + 1) % second.len()] != a {
                continue;
            }

            let mut merged: Vec<usize> = (0..first.len())
                .map(|k| first[(i + 1 + k) % first.len()])
                .collect();
            merged.extend((0..second.len() - 2).map(|k| second[(j + 2 + k) % second.len()]));
            return Some(merged);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ear_clipping_produces_n_minus_two_triangles() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(0.0, 4.0),
        ];
        assert_eq!(ear_clip(&points).len(), points.len() - 2);
    }

    #[test]
    fn try_merge_joins_square_halves() {
        let first = vec![0, 1, 2];
        let second = vec![0, 2, 3];
        assert_eq!(try_merge(&first, &second), Some(vec![0, 1, 2, 3]));
        assert_eq!(try_merge(&[0, 1, 2], &[3, 4, 5]), None);
    }

    #[test]
    fn collinear_runs_still_count_as_convex() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert!(is_convex_ccw(&points));
    }
}
