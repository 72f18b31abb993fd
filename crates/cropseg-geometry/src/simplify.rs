//! Contour simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces the vertex count of a contour by removing vertices that lie
//! within `epsilon` of the chord between their retained neighbours. The
//! contour is treated as an open chain from its first to its last vertex;
//! the implicit closing edge is left untouched, so both endpoints always
//! survive.
//!
//! The output is fully determined by the input: the farthest vertex is
//! picked by strict comparison, so ties resolve to the earliest index.

use crate::types::{Point, Polygon};

/// Simplify a contour with tolerance `epsilon` (pixels).
///
/// Contours with fewer than 3 vertices are returned unchanged, and so is
/// every contour when `epsilon` is not strictly positive: level zero of a
/// simplification ladder must reproduce the original outline exactly,
/// collinear vertices included.
#[must_use = "returns the simplified contour"]
pub fn simplify(polygon: &Polygon, epsilon: f64) -> Polygon {
    Polygon::new(simplify_points(polygon.points(), epsilon))
}

/// Slice form of [`simplify`].
#[must_use = "returns the simplified points"]
pub fn simplify_points(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 || epsilon.is_nan() || epsilon <= 0.0 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, epsilon, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step: keep the farthest vertex between `start` and `end` if it
/// is more than `epsilon` away from the chord, then recurse on both halves.
///
/// Marking vertices in `kept` instead of concatenating sub-results drops
/// the shared joint vertex for free.
fn rdp_recurse(points: &[Point], start: usize, end: usize, epsilon: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, epsilon, kept);
        rdp_recurse(points, max_idx, end, epsilon, kept);
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// Uses |cross(b-a, p-a)| / |b-a|. A zero-length chord falls back to the
/// distance from `p` to `a`.
pub(crate) fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
