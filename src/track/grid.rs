//! Grid geometry shared by both loop builders
//!
//! Direction tables, canonical edges, per-attempt occupancy and segment
//! intersection on integer grids.

use std::collections::HashSet;

use glam::IVec2;

/// Octile step vectors, counter-clockwise from east.
/// Turning by `k` steps rotates the heading by `k * 45°`.
pub const OCTILE: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, 0),
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
];

/// Cardinal step vectors, counter-clockwise from east.
/// Turning by `k` steps rotates the heading by `k * 90°`.
pub const CARDINAL: [IVec2; 4] = [
    IVec2::new(1, 0),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
    IVec2::new(0, -1),
];

/// Index into `OCTILE` for a unit step, if it is one
pub fn octile_index(step: IVec2) -> Option<usize> {
    OCTILE.iter().position(|&d| d == step)
}

/// Signed turn between two octile headings, in 45° units within `-3..=4`
pub fn octile_turn(from: usize, to: usize) -> i32 {
    let t = ((to + 8 - from) % 8) as i32;
    if t > 4 { t - 8 } else { t }
}

/// Rectangular grid bounds centred on the origin (inclusive radius)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub radius_x: i32,
    pub radius_y: i32,
}

impl GridBounds {
    pub fn new(radius_x: i32, radius_y: i32) -> Self {
        Self { radius_x, radius_y }
    }

    #[inline]
    pub fn contains(&self, p: IVec2) -> bool {
        p.x.abs() <= self.radius_x && p.y.abs() <= self.radius_y
    }
}

/// Undirected grid edge; `(a, b)` and `(b, a)` compare equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge(IVec2, IVec2);

impl Edge {
    pub fn new(a: IVec2, b: IVec2) -> Self {
        if (a.x, a.y) <= (b.x, b.y) {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// Occupied nodes/cells and used edges of one attempt's loop
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    visited: HashSet<IVec2>,
    edges: HashSet<Edge>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit(&mut self, p: IVec2) {
        self.visited.insert(p);
    }

    #[inline]
    pub fn is_visited(&self, p: IVec2) -> bool {
        self.visited.contains(&p)
    }

    pub fn use_edge(&mut self, a: IVec2, b: IVec2) {
        self.edges.insert(Edge::new(a, b));
    }

    #[inline]
    pub fn has_edge(&self, a: IVec2, b: IVec2) -> bool {
        self.edges.contains(&Edge::new(a, b))
    }
}

#[inline]
fn cross(o: IVec2, a: IVec2, b: IVec2) -> i64 {
    let (ax, ay) = ((a.x - o.x) as i64, (a.y - o.y) as i64);
    let (bx, by) = ((b.x - o.x) as i64, (b.y - o.y) as i64);
    ax * by - ay * bx
}

#[inline]
fn on_segment(p: IVec2, q: IVec2, r: IVec2) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

/// Whether segments `p1-p2` and `q1-q2` share any point (touching counts)
pub fn segments_intersect(p1: IVec2, p2: IVec2, q1: IVec2, q2: IVec2) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }

    (d1 == 0 && on_segment(q1, q2, p1))
        || (d2 == 0 && on_segment(q1, q2, p2))
        || (d3 == 0 && on_segment(p1, p2, q1))
        || (d4 == 0 && on_segment(p1, p2, q2))
}

/// Whether a new segment conflicts with an existing one
///
/// Segments sharing an endpoint are exempt unless they run along each other
/// out of that shared endpoint.
pub fn segments_conflict(a1: IVec2, a2: IVec2, b1: IVec2, b2: IVec2) -> bool {
    let shared = if a1 == b1 || a1 == b2 {
        Some(a1)
    } else if a2 == b1 || a2 == b2 {
        Some(a2)
    } else {
        None
    };

    match shared {
        Some(s) => {
            let a_far = if s == a1 { a2 } else { a1 };
            let b_far = if s == b1 { b2 } else { b1 };
            let (da, db) = (a_far - s, b_far - s);
            // Same ray out of the shared endpoint means the two overlap
            cross(IVec2::ZERO, da, db) == 0 && da.dot(db) > 0
        }
        None => segments_intersect(a1, a2, b1, b2),
    }
}

/// Whether a closed ring (first == last) has no crossing non-adjacent segments
pub fn path_is_simple(ring: &[IVec2]) -> bool {
    if ring.len() < 4 {
        return false;
    }
    let n = ring.len() - 1;
    for i in 0..n {
        for j in (i + 2)..n {
            // First and last segments meet at the closing node
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments_intersect(ring[i], ring[i + 1], ring[j], ring[j + 1]) {
                return false;
            }
        }
    }
    true
}

/// Long side over short side of the points' bounding box (short side floored at 1)
pub fn bounding_aspect(points: &[IVec2]) -> f32 {
    let Some(&first) = points.first() else {
        return 1.0;
    };
    let (min, max) = points
        .iter()
        .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let extent = max - min;
    let long = extent.x.max(extent.y).max(1) as f32;
    let short = extent.x.min(extent.y).max(1) as f32;
    long / short
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: i32, y: i32) -> IVec2 {
        IVec2::new(x, y)
    }

    #[test]
    fn test_octile_turns() {
        assert_eq!(octile_turn(0, 0), 0);
        assert_eq!(octile_turn(0, 1), 1);
        assert_eq!(octile_turn(0, 7), -1);
        assert_eq!(octile_turn(7, 1), 2);
        assert_eq!(octile_turn(2, 6), 4);
        assert_eq!(octile_index(v(-1, -1)), Some(5));
        assert_eq!(octile_index(v(2, 0)), None);
    }

    #[test]
    fn test_edge_is_undirected() {
        assert_eq!(Edge::new(v(0, 0), v(1, 1)), Edge::new(v(1, 1), v(0, 0)));
        let mut occ = Occupancy::new();
        occ.use_edge(v(2, 3), v(1, 3));
        assert!(occ.has_edge(v(1, 3), v(2, 3)));
        assert!(!occ.has_edge(v(1, 3), v(1, 4)));
    }

    #[test]
    fn test_crossing_diagonals_intersect() {
        assert!(segments_intersect(v(0, 0), v(1, 1), v(0, 1), v(1, 0)));
        assert!(segments_conflict(v(0, 0), v(1, 1), v(0, 1), v(1, 0)));
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(v(0, 0), v(1, 0), v(0, 1), v(1, 1)));
        assert!(!segments_intersect(v(0, 0), v(1, 1), v(1, 0), v(2, 1)));
    }

    #[test]
    fn test_touching_counts_but_shared_endpoint_exempt() {
        // T-junction: endpoint of one lies inside the other
        assert!(segments_intersect(v(0, 0), v(2, 0), v(1, 0), v(1, 1)));
        // Consecutive path segments only share their joint
        assert!(segments_intersect(v(0, 0), v(1, 0), v(1, 0), v(1, 1)));
        assert!(!segments_conflict(v(0, 0), v(1, 0), v(1, 0), v(1, 1)));
    }

    #[test]
    fn test_shared_endpoint_overlap_conflicts() {
        // Closing edge (2,0)->(0,0) running back along (0,0)->(1,0)
        assert!(segments_conflict(v(2, 0), v(0, 0), v(0, 0), v(1, 0)));
        assert!(!segments_conflict(v(2, 0), v(0, 0), v(0, 0), v(-1, 0)));
    }

    #[test]
    fn test_path_is_simple() {
        let square = [v(0, 0), v(1, 0), v(1, 1), v(0, 1), v(0, 0)];
        assert!(path_is_simple(&square));
        let bowtie = [v(0, 0), v(1, 1), v(1, 0), v(0, 1), v(0, 0)];
        assert!(!path_is_simple(&bowtie));
    }

    #[test]
    fn test_bounding_aspect() {
        assert_eq!(bounding_aspect(&[v(0, 0), v(10, 4)]), 2.5);
        assert_eq!(bounding_aspect(&[v(-3, -3), v(3, 3)]), 1.0);
        assert_eq!(bounding_aspect(&[v(0, 0), v(5, 0)]), 5.0);
    }
}
