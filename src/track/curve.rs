//! Grid loop to world polyline
//!
//! Pipeline: grid outline (rounded corners or tile tessellation) → close →
//! closed Chaikin corner-cutting → closed arc-length resampling.

use std::f32::consts::FRAC_PI_2;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::tile::PlacedTile;
use crate::consts::CLOSE_EPSILON_SQ;

/// Corner fillet radius as a fraction of the cell size
pub const CORNER_RADIUS_FACTOR: f32 = 0.35;
/// Arc subdivisions per rounded corner
pub const CORNER_ARC_STEPS: usize = 6;
/// Points emitted per tile (straight line or quarter arc)
pub const TILE_POINTS: usize = 7;

/// Closed world-space track centreline, uniformly spaced by arc length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPolyline {
    points: Vec<Vec2>,
}

impl TrackPolyline {
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Vec2> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last point coincide
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => a.distance_squared(*b) <= CLOSE_EPSILON_SQ,
            _ => false,
        }
    }

    /// Total length along the points
    pub fn perimeter(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

#[inline]
fn to_world(p: IVec2, cell_size: f32) -> Vec2 {
    p.as_vec2() * cell_size
}

/// World outline of a closed node ring with rounded corners at every heading change
pub fn snapped_outline(ring: &[IVec2], cell_size: f32) -> Vec<Vec2> {
    if ring.len() < 3 {
        return ring.iter().map(|&p| to_world(p, cell_size)).collect();
    }
    let n = ring.len() - 1;
    let radius = CORNER_RADIUS_FACTOR * cell_size;
    let mut out = Vec::with_capacity(n * (CORNER_ARC_STEPS + 1));

    for i in 0..n {
        let prev = to_world(ring[(i + n - 1) % n], cell_size);
        let v = to_world(ring[i], cell_size);
        let next = to_world(ring[i + 1], cell_size);
        let (len_in, len_out) = (v.distance(prev), next.distance(v));
        let d_in = (v - prev).normalize_or_zero();
        let d_out = (next - v).normalize_or_zero();

        let cross = d_in.perp_dot(d_out);
        if cross.abs() < 1e-6 {
            out.push(v);
            continue;
        }

        let theta = d_in.dot(d_out).clamp(-1.0, 1.0).acos();
        let half_tan = (theta * 0.5).tan();
        // Keep neighbouring fillets from overlapping on short segments
        let tangent = (radius * half_tan).min(0.5 * len_in.min(len_out));
        let r = tangent / half_tan;

        let sign = cross.signum();
        let p0 = v - d_in * tangent;
        let center = p0 + d_in.perp() * sign * r;
        let start = p0 - center;
        for k in 0..=CORNER_ARC_STEPS {
            let angle = sign * theta * k as f32 / CORNER_ARC_STEPS as f32;
            out.push(center + Vec2::from_angle(angle).rotate(start));
        }
    }
    out
}

/// Local points for one tile: edge midpoint to edge midpoint
pub fn tile_points(tile: &PlacedTile, cell_size: f32) -> [Vec2; TILE_POINTS] {
    let half = cell_size * 0.5;
    let center = to_world(tile.cell, cell_size);
    let entry = tile.entry_vec().as_vec2();
    let exit = tile.exit_vec().as_vec2();
    let entry_mid = center - entry * half;
    let exit_mid = center + exit * half;
    let last = (TILE_POINTS - 1) as f32;

    let turn = tile.piece.turn();
    if turn == 0 {
        std::array::from_fn(|k| entry_mid.lerp(exit_mid, k as f32 / last))
    } else {
        // Quarter arc around the cell corner shared by both edges
        let pivot = center + (exit - entry) * half;
        let start = entry_mid - pivot;
        let sweep = turn as f32 * FRAC_PI_2;
        std::array::from_fn(|k| pivot + Vec2::from_angle(sweep * k as f32 / last).rotate(start))
    }
}

/// World outline of a tile loop
pub fn tile_outline(tiles: &[PlacedTile], cell_size: f32) -> Vec<Vec2> {
    tiles
        .iter()
        .flat_map(|t| tile_points(t, cell_size))
        .collect()
}

/// Drop consecutive duplicates and make first == last
pub fn close_loop(points: Vec<Vec2>) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len() + 1);
    for p in points {
        if out
            .last()
            .is_none_or(|q| q.distance_squared(p) > CLOSE_EPSILON_SQ)
        {
            out.push(p);
        }
    }
    if let Some(&first) = out.first() {
        let last = out.len() - 1;
        if last > 0 && out[last].distance_squared(first) <= CLOSE_EPSILON_SQ {
            out[last] = first;
        } else {
            out.push(first);
        }
    }
    out
}

/// Unique points of a closed loop (trailing duplicate of the first removed)
fn ring_of(points: &[Vec2]) -> &[Vec2] {
    match (points.first(), points.last()) {
        (Some(a), Some(b)) if points.len() > 1 && a.distance_squared(*b) <= CLOSE_EPSILON_SQ => {
            &points[..points.len() - 1]
        }
        _ => points,
    }
}

/// One pass of closed Chaikin corner-cutting; input and output are closed
pub fn chaikin_closed(points: &[Vec2]) -> Vec<Vec2> {
    let ring = ring_of(points);
    let n = ring.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(2 * n + 1);
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        out.push(a.lerp(b, 0.25));
        out.push(a.lerp(b, 0.75));
    }
    out.push(out[0]);
    out
}

/// Resample a closed loop into `count` points evenly spaced by arc length.
///
/// Point `i` sits at fraction `i / (count - 1)` of the perimeter, so the
/// last point lands back on the first.
///
/// # Panics
/// If `count < 2`.
pub fn resample_closed(points: &[Vec2], count: usize) -> Vec<Vec2> {
    assert!(count >= 2, "resample_closed: need at least 2 samples, got {count}");
    let ring = ring_of(points);
    let n = ring.len();
    if n == 0 {
        return Vec::new();
    }

    let mut cumulative = Vec::with_capacity(n + 1);
    cumulative.push(0.0f32);
    for i in 0..n {
        let step = ring[i].distance(ring[(i + 1) % n]);
        cumulative.push(cumulative[i] + step);
    }
    let total = cumulative[n];
    if total <= 0.0 {
        return vec![ring[0]; count];
    }

    let mut out = Vec::with_capacity(count);
    let mut seg = 0;
    for i in 0..count - 1 {
        let s = total * i as f32 / (count - 1) as f32;
        while seg + 1 < n && cumulative[seg + 1] < s {
            seg += 1;
        }
        let len = cumulative[seg + 1] - cumulative[seg];
        let t = if len > 0.0 {
            ((s - cumulative[seg]) / len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(ring[seg].lerp(ring[(seg + 1) % n], t));
    }
    out.push(ring[0]);
    out
}

/// Close, smooth and resample a raw outline
pub fn finish_loop(raw: Vec<Vec2>, smoothing_passes: u32, sample_count: usize) -> TrackPolyline {
    let mut points = close_loop(raw);
    for _ in 0..smoothing_passes {
        points = chaikin_closed(&points);
    }
    TrackPolyline {
        points: resample_closed(&points, sample_count),
    }
}
