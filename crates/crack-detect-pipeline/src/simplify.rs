//! Polygon simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Traced contours carry one vertex per boundary pixel. Simplification
//! reduces them to the few vertices needed to stay within a fixed pixel
//! tolerance of the original boundary.
//!
//! Contours are closed, so the ring is split at its first vertex and at
//! the vertex farthest from it, and each half is simplified as an open
//! chain. Distances are measured to the candidate *segment* rather than
//! its supporting line, which keeps every dropped vertex within
//! `tolerance` of the simplified outline.

use crate::types::{Point, Polygon};

/// Simplify a closed polygon.
///
/// Vertices within `tolerance` pixels of the simplified outline are
/// removed. The first vertex is always kept. A tolerance of 0.0 only
/// removes vertices lying exactly on an edge.
///
/// Polygons with fewer than 3 vertices are returned unchanged.
#[must_use = "returns the simplified polygon"]
pub fn simplify_closed(polygon: &Polygon, tolerance: f64) -> Polygon {
    let points = polygon.points();
    let n = points.len();
    if n < 3 {
        return polygon.clone();
    }

    let first = points[0];
    let (far, far_dist) = points
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, &p)| (i, p.distance_squared(first)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if far_dist == 0.0 {
        // Every vertex coincides with the first.
        return Polygon::new(vec![first]);
    }

    // Close the ring so the second half can end on the first vertex.
    let mut ring = Vec::with_capacity(n + 1);
    ring.extend_from_slice(points);
    ring.push(first);

    let mut kept = vec![false; n + 1];
    kept[0] = true;
    kept[far] = true;
    rdp_recurse(&ring, 0, far, tolerance, &mut kept);
    rdp_recurse(&ring, far, n, tolerance, &mut kept);

    let simplified: Vec<Point> = ring[..n]
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polygon::new(simplified)
}

/// Simplify multiple polygons, applying RDP to each independently.
#[must_use = "returns the simplified polygons"]
pub fn simplify_polygons(polygons: &[Polygon], tolerance: f64) -> Vec<Polygon> {
    polygons
        .iter()
        .map(|p| simplify_closed(p, tolerance))
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-chains are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = segment_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Distance from `p` to the closed segment `a`-`b`.
///
/// Integer vertices let the projection test and the perpendicular
/// (cross product) be computed exactly, so a point lying on the segment
/// is at distance exactly 0.0. When `a` and `b` coincide, returns the
/// distance from `p` to `a`.
#[allow(clippy::cast_precision_loss)] // squared pixel distances are far below 2^53
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (i64::from(b.x) - i64::from(a.x), i64::from(b.y) - i64::from(a.y));
    let (px, py) = (i64::from(p.x) - i64::from(a.x), i64::from(p.y) - i64::from(a.y));
    let length_sq = dx * dx + dy * dy;
    let dot = px * dx + py * dy;

    if length_sq == 0 || dot <= 0 {
        return p.distance(a);
    }
    if dot >= length_sq {
        return p.distance(b);
    }

    let cross = (px * dy - py * dx).abs();
    cross as f64 / (length_sq as f64).sqrt()
}

/// Largest distance from any vertex of `original` to the outline of
/// `simplified`.
#[must_use]
pub fn max_deviation(original: &Polygon, simplified: &Polygon) -> f64 {
    if simplified.is_empty() {
        return 0.0;
    }
    original
        .points()
        .iter()
        .map(|&p| {
            simplified
                .edges()
                .map(|(a, b)| segment_distance(p, a, b))
                .fold(f64::INFINITY, f64::min)
        })
        .fold(0.0, f64::max)
}
