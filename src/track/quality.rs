//! Loop quality heuristics and scored candidates
//!
//! Scores only rank loops built by the *same* strategy; the two formulas are
//! not comparable with each other.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::curve::{self, TrackPolyline};
use super::grid::{bounding_aspect, octile_index, octile_turn};
use super::tile::{Piece, PlacedTile};

// === Random-walk gates ===
pub const SNAPPED_MIN_DIAGONALS: usize = 6;
pub const SNAPPED_LONG_STRAIGHT: usize = 8;
pub const SNAPPED_MIN_LONG_STRAIGHTS: usize = 2;
/// Max steps between the two sharp turns of a hairpin
pub const SNAPPED_HAIRPIN_WINDOW: usize = 5;
/// Max steps between the two opposite turns of a chicane
pub const SNAPPED_CHICANE_WINDOW: usize = 7;
pub const SNAPPED_MAX_ASPECT: f32 = 2.8;

// === Tile gates ===
pub const TILE_MIN_CORNERS: usize = 4;
pub const TILE_LONG_STRAIGHT: usize = 6;
pub const TILE_MIN_LONG_STRAIGHTS: usize = 2;
pub const TILE_MAX_ASPECT: f32 = 2.4;
/// Corner share of all tiles the tile score peaks at
pub const TILE_TARGET_CORNER_FRACTION: f32 = 0.35;

/// Derived counts for a closed loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopStats {
    /// Grid segments (random walk) or placed tiles (tile strategy)
    pub segments: usize,
    /// Diagonal steps (random walk only)
    pub diagonals: usize,
    /// Corner tiles (tile strategy only)
    pub corners: usize,
    /// Straight tiles (tile strategy only)
    pub straights: usize,
    /// Straight runs at or above the strategy's long-run length
    pub long_straights: usize,
    pub hairpin: bool,
    pub chicane: bool,
    /// Bounding box long side / short side
    pub aspect: f32,
}

/// Grid-level shape of a closed loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoopShape {
    /// Closed node ring, first == last
    Snapped(Vec<IVec2>),
    /// Placed tiles in driving order; the last tile exits into the first
    Tiles(Vec<PlacedTile>),
}

/// A closed, scored loop from one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Attempt index that produced this loop
    pub attempt: u32,
    /// World units per grid step
    pub cell_size: f32,
    pub shape: LoopShape,
    pub stats: LoopStats,
    pub score: f32,
}

impl Candidate {
    /// Closed grid ring (nodes or cell centres), first == last
    pub fn grid_ring(&self) -> Vec<IVec2> {
        match &self.shape {
            LoopShape::Snapped(ring) => ring.clone(),
            LoopShape::Tiles(tiles) => {
                let mut ring: Vec<IVec2> = tiles.iter().map(|t| t.cell).collect();
                if let Some(&first) = ring.first() {
                    ring.push(first);
                }
                ring
            }
        }
    }

    /// Smoothed, resampled world polyline for this loop
    pub fn to_polyline(&self, smoothing_passes: u32, sample_count: usize) -> TrackPolyline {
        let raw = match &self.shape {
            LoopShape::Snapped(ring) => curve::snapped_outline(ring, self.cell_size),
            LoopShape::Tiles(tiles) => curve::tile_outline(tiles, self.cell_size),
        };
        curve::finish_loop(raw, smoothing_passes, sample_count)
    }
}

/// Lengths of maximal runs of equal values, treating the slice as a cycle
pub fn equal_runs<T: PartialEq>(values: &[T]) -> Vec<usize> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let Some(start) = (0..n).find(|&i| values[i] != values[(i + n - 1) % n]) else {
        return vec![n];
    };

    let mut runs = Vec::new();
    let mut len = 1;
    for k in 1..n {
        let (prev, cur) = ((start + k - 1) % n, (start + k) % n);
        if values[cur] == values[prev] {
            len += 1;
        } else {
            runs.push(len);
            len = 1;
        }
    }
    runs.push(len);
    runs
}

/// Lengths of maximal runs of `true`, treating the slice as a cycle
pub fn true_runs(flags: &[bool]) -> Vec<usize> {
    equal_runs(flags)
        .into_iter()
        .zip(run_values(flags))
        .filter_map(|(len, value)| value.then_some(len))
        .collect()
}

/// Value of each run in the same order `equal_runs` reports them
fn run_values<T: PartialEq + Copy>(values: &[T]) -> Vec<T> {
    let n = values.len();
    let start = (0..n)
        .find(|&i| values[i] != values[(i + n - 1) % n])
        .unwrap_or(0);
    let mut out = Vec::new();
    for k in 0..n {
        let cur = (start + k) % n;
        if k == 0 || values[cur] != values[(cur + n - 1) % n] {
            out.push(values[cur]);
        }
    }
    out
}

/// Whether two nonzero turns within `window` steps (cyclic) satisfy `pair`
pub fn has_turn_pair(turns: &[i32], window: usize, pair: impl Fn(i32, i32) -> bool) -> bool {
    let n = turns.len();
    (0..n).filter(|&i| turns[i] != 0).any(|i| {
        (1..=window.min(n.saturating_sub(1))).any(|k| {
            let t = turns[(i + k) % n];
            t != 0 && pair(turns[i], t)
        })
    })
}

fn same_sign_sharp(a: i32, b: i32) -> bool {
    a.abs() == 2 && b.abs() == 2 && a.signum() == b.signum()
}

fn opposite_sign(a: i32, b: i32) -> bool {
    a.signum() == -b.signum()
}

fn same_sign(a: i32, b: i32) -> bool {
    a.signum() == b.signum()
}

/// Stats for a closed octile ring; `None` if a segment is not a unit step
pub fn snapped_stats(ring: &[IVec2]) -> Option<LoopStats> {
    if ring.len() < 4 || ring.first() != ring.last() {
        return None;
    }
    let headings = ring
        .windows(2)
        .map(|w| octile_index(w[1] - w[0]))
        .collect::<Option<Vec<_>>>()?;
    let n = headings.len();

    // turns[i] is the turn taken entering segment i
    let turns: Vec<i32> = (0..n)
        .map(|i| octile_turn(headings[(i + n - 1) % n], headings[i]))
        .collect();

    Some(LoopStats {
        segments: n,
        diagonals: headings.iter().filter(|&&h| h % 2 == 1).count(),
        long_straights: equal_runs(&headings)
            .into_iter()
            .filter(|&len| len >= SNAPPED_LONG_STRAIGHT)
            .count(),
        hairpin: has_turn_pair(&turns, SNAPPED_HAIRPIN_WINDOW, same_sign_sharp),
        chicane: has_turn_pair(&turns, SNAPPED_CHICANE_WINDOW, opposite_sign),
        aspect: bounding_aspect(ring),
        ..Default::default()
    })
}

/// Random-walk score, or `None` when a quality gate fails
pub fn score_snapped(stats: &LoopStats) -> Option<f32> {
    let passes = stats.diagonals >= SNAPPED_MIN_DIAGONALS
        && stats.long_straights >= SNAPPED_MIN_LONG_STRAIGHTS
        && stats.hairpin
        && stats.chicane
        && stats.aspect <= SNAPPED_MAX_ASPECT;
    if !passes {
        return None;
    }
    let bonus = |present: bool| if present { 20.0 } else { 0.0 };
    Some(
        stats.segments as f32 * 0.45
            + stats.diagonals as f32 * 2.0
            + stats.long_straights as f32 * 8.0
            + bonus(stats.hairpin)
            + bonus(stats.chicane)
            - stats.aspect * 4.0,
    )
}

/// Stats for a closed tile loop
pub fn tile_stats(tiles: &[PlacedTile]) -> LoopStats {
    let turns: Vec<i32> = tiles.iter().map(|t| t.piece.turn()).collect();
    let straight_flags: Vec<bool> = tiles.iter().map(|t| t.piece == Piece::Straight).collect();
    let cells: Vec<IVec2> = tiles.iter().map(|t| t.cell).collect();
    let straights = straight_flags.iter().filter(|&&s| s).count();

    LoopStats {
        segments: tiles.len(),
        corners: tiles.len() - straights,
        straights,
        long_straights: true_runs(&straight_flags)
            .into_iter()
            .filter(|&len| len >= TILE_LONG_STRAIGHT)
            .count(),
        hairpin: has_turn_pair(&turns, 1, same_sign),
        chicane: has_turn_pair(&turns, 1, opposite_sign),
        aspect: bounding_aspect(&cells),
        ..Default::default()
    }
}

/// Tile score, or `None` when a quality gate fails
pub fn score_tiles(stats: &LoopStats) -> Option<f32> {
    let passes = stats.corners >= TILE_MIN_CORNERS
        && stats.long_straights >= TILE_MIN_LONG_STRAIGHTS
        && stats.aspect <= TILE_MAX_ASPECT
        && (stats.chicane || stats.hairpin);
    if !passes || stats.segments == 0 {
        return None;
    }
    let corner_fraction = stats.corners as f32 / stats.segments as f32;
    Some(
        stats.segments as f32
            + stats.corners as f32 * 1.2
            + 20.0 * (1.0 - (corner_fraction - TILE_TARGET_CORNER_FRACTION).abs())
            + stats.straights as f32 * 0.3,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::tile::tiles_from_pieces;

    #[test]
    fn test_equal_runs_wrap_around() {
        assert_eq!(equal_runs(&[1, 1, 2, 2, 2, 1]), vec![3, 3]);
        assert_eq!(equal_runs(&[0, 1, 2]), vec![1, 1, 1]);
        assert_eq!(equal_runs(&[4, 4, 4]), vec![3]);
        assert!(equal_runs::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_true_runs_wrap_around() {
        let flags = [true, true, false, true, false, true];
        let mut runs = true_runs(&flags);
        runs.sort();
        assert_eq!(runs, vec![1, 3]);
        assert_eq!(true_runs(&[false, false]), Vec::<usize>::new());
        assert_eq!(true_runs(&[true, true]), vec![2]);
    }

    #[test]
    fn test_hairpin_needs_same_sign_sharp_turns() {
        let turns = [0, 2, 0, 0, 2, 0, 0, 0, 0, 0];
        assert!(has_turn_pair(&turns, SNAPPED_HAIRPIN_WINDOW, same_sign_sharp));
        let spread = [0, 2, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0];
        assert!(!has_turn_pair(&spread, SNAPPED_HAIRPIN_WINDOW, same_sign_sharp));
        let mixed = [0, 2, 0, -2, 0, 0, 0, 0, 0, 0];
        assert!(!has_turn_pair(&mixed, SNAPPED_HAIRPIN_WINDOW, same_sign_sharp));
        let shallow = [0, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        assert!(!has_turn_pair(&shallow, SNAPPED_HAIRPIN_WINDOW, same_sign_sharp));
    }

    #[test]
    fn test_chicane_wraps_around_loop_end() {
        let turns = [-1, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        assert!(has_turn_pair(&turns, SNAPPED_CHICANE_WINDOW, opposite_sign));
        assert!(!has_turn_pair(&[1, 0, 1, 0], SNAPPED_CHICANE_WINDOW, opposite_sign));
    }

    #[test]
    fn test_rectangle_walk_fails_gates() {
        // 10x6 rectangle walked from the origin: no diagonals, corners 6+ apart
        let mut ring = Vec::new();
        for x in 0..10 {
            ring.push(IVec2::new(x, 0));
        }
        for y in 0..6 {
            ring.push(IVec2::new(10, y));
        }
        for x in (1..=10).rev() {
            ring.push(IVec2::new(x, 6));
        }
        for y in (0..=6).rev() {
            ring.push(IVec2::new(0, y));
        }
        let stats = snapped_stats(&ring).unwrap();
        assert_eq!(stats.segments, 32);
        assert_eq!(stats.diagonals, 0);
        assert_eq!(stats.long_straights, 2);
        assert!(!stats.hairpin);
        assert!(!stats.chicane);
        assert!((stats.aspect - 10.0 / 6.0).abs() < 1e-6);
        assert!(score_snapped(&stats).is_none());
    }

    #[test]
    fn test_snapped_stats_rejects_long_steps() {
        let ring = [IVec2::ZERO, IVec2::new(2, 0), IVec2::new(2, 1), IVec2::ZERO];
        assert!(snapped_stats(&ring).is_none());
    }

    #[test]
    fn test_snapped_score_formula() {
        let stats = LoopStats {
            segments: 60,
            diagonals: 10,
            long_straights: 3,
            hairpin: true,
            chicane: true,
            aspect: 1.5,
            ..Default::default()
        };
        let expected = 60.0 * 0.45 + 20.0 + 24.0 + 40.0 - 6.0;
        assert!((score_snapped(&stats).unwrap() - expected).abs() < 1e-4);

        let too_long = LoopStats { aspect: 2.9, ..stats.clone() };
        assert!(score_snapped(&too_long).is_none());
        let no_chicane = LoopStats { chicane: false, ..stats };
        assert!(score_snapped(&no_chicane).is_none());
    }

    #[test]
    fn test_plain_tile_rectangle_fails_gates() {
        use crate::track::tile::Piece::*;
        let mut pieces = vec![Straight; 4];
        pieces.push(CornerLeft);
        pieces.extend([Straight; 5]);
        pieces.push(CornerLeft);
        pieces.extend([Straight; 7]);
        pieces.push(CornerLeft);
        pieces.extend([Straight; 5]);
        pieces.push(CornerLeft);
        pieces.extend([Straight; 3]);
        let tiles = tiles_from_pieces(0, &pieces).expect("rectangle closes");
        let stats = tile_stats(&tiles);
        assert_eq!(stats.corners, 4);
        assert_eq!(stats.long_straights, 2);
        assert!(!stats.chicane && !stats.hairpin);
        assert!(score_tiles(&stats).is_none());
    }

    #[test]
    fn test_tile_loop_with_chicane_scores() {
        use crate::track::tile::Piece::*;
        let mut pieces = vec![Straight; 4];
        pieces.push(CornerLeft);
        pieces.extend([Straight; 5]);
        pieces.push(CornerLeft);
        pieces.extend([Straight; 2]);
        pieces.extend([CornerRight, CornerLeft]);
        pieces.extend([Straight; 3]);
        pieces.push(CornerLeft);
        pieces.extend([Straight; 6]);
        pieces.push(CornerLeft);
        pieces.extend([Straight; 2]);
        let tiles = tiles_from_pieces(0, &pieces).expect("jogged loop closes");

        let stats = tile_stats(&tiles);
        assert_eq!(stats.segments, 28);
        assert_eq!(stats.corners, 6);
        assert_eq!(stats.straights, 22);
        assert_eq!(stats.long_straights, 2);
        assert!(stats.chicane);
        assert!(!stats.hairpin);
        assert!((stats.aspect - 1.0).abs() < 1e-6);

        let frac = 6.0 / 28.0;
        let expected = 28.0 + 6.0 * 1.2 + 20.0 * (1.0 - (frac - 0.35f32).abs()) + 22.0 * 0.3;
        assert!((score_tiles(&stats).unwrap() - expected).abs() < 1e-3);
    }
}
