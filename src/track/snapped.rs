//! Random-walk loop builder
//!
//! Grows a path of unit octile steps from the origin by weighted random
//! turning. Every step is checked against the nodes, edges and segments
//! already laid, so the path stays a simple polygon; once it is long enough
//! and passes near the origin it is closed with one or two final steps.

use std::collections::{HashSet, VecDeque};

use glam::IVec2;

use super::grid::{
    Edge, GridBounds, OCTILE, Occupancy, octile_index, octile_turn, segments_conflict,
};
use super::quality::{Candidate, LoopShape, score_snapped, snapped_stats};
use super::rng::TrackRng;

pub const ATTEMPT_COUNT: u32 = 40;
pub const MIN_SEGMENTS: usize = 40;
pub const MAX_SEGMENTS: usize = 120;
/// Direction draws per step before the attempt is abandoned
pub const STEP_RETRIES: u32 = 12;
pub const FORK_SALT: i32 = 0x5a17;

pub const MIN_CELL_SIZE: f32 = 3.5;
pub const MAX_CELL_SIZE: f32 = 9.0;
/// Grid cells per half extent before clamping the cell size
const CELLS_PER_HALF_EXTENT: f32 = 8.0;
/// Double 90° turns are only drawn after this many steps
const DOUBLE_TURN_MIN_STEP: usize = 14;
/// Steps that must pass after a sharp turn before a double turn
const SHARP_TURN_COOLDOWN: usize = 2;

/// One probability band of the turn sampler
#[derive(Debug, Clone, Copy)]
struct TurnBand {
    /// Signed turn in 45° units
    turn: i32,
    weight: f32,
    /// Band may expand into a double 90° turn
    double: bool,
}

const fn band(turn: i32, weight: f32, double: bool) -> TurnBand {
    TurnBand {
        turn,
        weight,
        double,
    }
}

/// 55% straight, 20% ±45°, 20% ±90°, 5% double-or-single ±90°
const TURN_BANDS: [TurnBand; 7] = [
    band(0, 0.55, false),
    band(1, 0.10, false),
    band(-1, 0.10, false),
    band(2, 0.10, false),
    band(-2, 0.10, false),
    band(2, 0.025, true),
    band(-2, 0.025, true),
];

/// Turns tried around the current heading when searching for the origin
const REACH_TURNS: [i32; 5] = [0, 1, -1, 2, -2];

/// Grid extent, cell size and start heading for one build
#[derive(Debug, Clone, Copy)]
pub struct WalkLayout {
    pub bounds: GridBounds,
    pub cell_size: f32,
    /// Heading of the first step (index into `OCTILE`)
    pub start_heading: usize,
}

impl WalkLayout {
    pub fn new(half_width: f32, half_height: f32, variant: i32) -> Self {
        let cell_size = (half_width.min(half_height) / CELLS_PER_HALF_EXTENT)
            .clamp(MIN_CELL_SIZE, MAX_CELL_SIZE);
        // One cell of margin on each side
        let radius = |half: f32| ((half - cell_size) / cell_size).floor().max(0.0) as i32;
        Self {
            bounds: GridBounds::new(radius(half_width), radius(half_height)),
            cell_size,
            start_heading: (variant.rem_euclid(4) * 2) as usize,
        }
    }
}

/// One sampled turn, plus the turn forced on the following step (double 90°)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TurnDraw {
    turn: i32,
    follow_up: Option<i32>,
}

#[inline]
fn heading_after(heading: usize, turn: i32) -> usize {
    (heading as i32 + turn).rem_euclid(8) as usize
}

/// One attempt's growing path and its occupancy
struct RandomWalk {
    path: Vec<IVec2>,
    occupancy: Occupancy,
    start_heading: usize,
    heading: usize,
    /// Turn taken entering the most recent segment
    last_turn: i32,
    /// Step index of the most recent 90° turn
    last_sharp: Option<usize>,
    pending_turn: Option<i32>,
}

impl RandomWalk {
    fn new(start_heading: usize) -> Self {
        let mut occupancy = Occupancy::new();
        occupancy.visit(IVec2::ZERO);
        Self {
            path: vec![IVec2::ZERO],
            occupancy,
            start_heading,
            heading: start_heading,
            last_turn: 0,
            last_sharp: None,
            pending_turn: None,
        }
    }

    fn segments(&self) -> usize {
        self.path.len() - 1
    }

    fn current(&self) -> IVec2 {
        self.path[self.path.len() - 1]
    }

    fn is_closed(&self) -> bool {
        self.segments() > 0 && self.current() == IVec2::ZERO
    }

    /// Draw a turn from the probability bands, skipping turns in `failed`.
    /// `None` once every turn has failed.
    fn draw_turn(&self, rng: &mut TrackRng, step: usize, failed: &[i32]) -> Option<TurnDraw> {
        let weights = TURN_BANDS.map(|b| if failed.contains(&b.turn) { 0.0 } else { b.weight });
        if weights.iter().all(|&w| w <= 0.0) {
            return None;
        }
        let picked = TURN_BANDS[rng.choose_weighted(&weights)];
        let calm = self
            .last_sharp
            .is_none_or(|s| step - s > SHARP_TURN_COOLDOWN);
        let follow_up =
            (picked.double && calm && step > DOUBLE_TURN_MIN_STEP).then_some(picked.turn);
        Some(TurnDraw {
            turn: picked.turn,
            follow_up,
        })
    }

    /// Whether segment `a-b` clashes with any segment already laid
    fn crosses(&self, a: IVec2, b: IVec2) -> bool {
        self.path
            .windows(2)
            .any(|w| segments_conflict(a, b, w[0], w[1]))
    }

    /// Whether the origin can still be reached from `from`, arriving with
    /// `heading`, by turns of at most 90° through free nodes, once the step
    /// `laid` is in place. Diagonals may not slip between the two ends of a
    /// laid edge.
    fn origin_reachable(
        &self,
        layout: &WalkLayout,
        from: IVec2,
        heading: usize,
        laid: Edge,
    ) -> bool {
        let used = |a: IVec2, b: IVec2| Edge::new(a, b) == laid || self.occupancy.has_edge(a, b);
        let mut seen = HashSet::from([(from, heading)]);
        let mut queue = VecDeque::from([(from, heading)]);
        while let Some((p, h)) = queue.pop_front() {
            for turn in REACH_TURNS {
                let next_heading = heading_after(h, turn);
                let d = OCTILE[next_heading];
                if d.x != 0 && d.y != 0 && used(p + IVec2::new(d.x, 0), p + IVec2::new(0, d.y)) {
                    continue;
                }
                let n = p + d;
                if n == IVec2::ZERO {
                    return true;
                }
                if layout.bounds.contains(n)
                    && n != from
                    && !self.occupancy.is_visited(n)
                    && seen.insert((n, next_heading))
                {
                    queue.push_back((n, next_heading));
                }
            }
        }
        false
    }

    /// Target node for a step along `heading`, if the step is allowed
    fn try_step(&self, layout: &WalkLayout, heading: usize) -> Option<IVec2> {
        let cur = self.current();
        let next = cur + OCTILE[heading];
        if !layout.bounds.contains(next) {
            return None;
        }
        let closing = next == IVec2::ZERO && self.segments() + 1 >= MIN_SEGMENTS;
        if self.occupancy.is_visited(next) && !closing {
            return None;
        }
        if self.occupancy.has_edge(cur, next) || self.crosses(cur, next) {
            return None;
        }
        if closing {
            return self.closing_turns_ok(&[heading]).then_some(next);
        }
        self.origin_reachable(layout, next, heading, Edge::new(cur, next))
            .then_some(next)
    }

    fn advance(&mut self, next: IVec2, heading: usize, step: usize) {
        let turn = octile_turn(self.heading, heading);
        if turn.abs() == 2 {
            self.last_sharp = Some(step);
        }
        self.occupancy.use_edge(self.current(), next);
        self.occupancy.visit(next);
        self.path.push(next);
        self.heading = heading;
        self.last_turn = turn;
    }

    /// Turn-window check at closure: no run of three same-sign 90° turns
    /// through the closing joints
    fn closing_turns_ok(&self, legs: &[usize]) -> bool {
        let mut turns = vec![self.last_turn];
        let mut heading = self.heading;
        for &leg in legs.iter().chain(std::iter::once(&self.start_heading)) {
            turns.push(octile_turn(heading, leg));
            heading = leg;
        }
        !turns
            .windows(3)
            .any(|w| w.iter().all(|&t| t.abs() == 2) && w[0] == w[1] && w[1] == w[2])
    }

    /// Close the loop directly from within Manhattan distance 2 of the origin
    fn try_close(&mut self, layout: &WalkLayout) -> bool {
        let cur = self.current();
        let gap = IVec2::ZERO - cur;
        let manhattan = gap.x.abs() + gap.y.abs();
        if !(1..=2).contains(&manhattan) {
            return false;
        }

        // One diagonal/axis step, or two axis steps through the midpoint
        let route = if octile_index(gap).is_some() {
            vec![IVec2::ZERO]
        } else {
            vec![cur + gap / 2, IVec2::ZERO]
        };
        if self.segments() + route.len() > MAX_SEGMENTS {
            return false;
        }

        let mut legs = Vec::with_capacity(route.len());
        let mut from = cur;
        for &to in &route {
            let Some(heading) = octile_index(to - from) else {
                return false;
            };
            let free = to == IVec2::ZERO
                || (layout.bounds.contains(to) && !self.occupancy.is_visited(to));
            if !free || self.occupancy.has_edge(from, to) || self.crosses(from, to) {
                return false;
            }
            legs.push(heading);
            from = to;
        }
        if !self.closing_turns_ok(&legs) {
            return false;
        }

        let step = self.segments();
        for (k, (&to, &heading)) in route.iter().zip(&legs).enumerate() {
            self.advance(to, heading, step + k);
        }
        true
    }

    /// Take one step: the pending follow-up turn first, then up to
    /// `STEP_RETRIES` draws that never repeat a turn already refused
    fn step(&mut self, layout: &WalkLayout, rng: &mut TrackRng, step: usize) -> bool {
        let mut failed: Vec<i32> = Vec::with_capacity(TURN_BANDS.len());
        if let Some(turn) = self.pending_turn.take() {
            let heading = heading_after(self.heading, turn);
            match self.try_step(layout, heading) {
                Some(next) => {
                    self.advance(next, heading, step);
                    return true;
                }
                None => failed.push(turn),
            }
        }

        for _ in 0..STEP_RETRIES {
            let Some(draw) = self.draw_turn(rng, step, &failed) else {
                return false;
            };
            let heading = heading_after(self.heading, draw.turn);
            if let Some(next) = self.try_step(layout, heading) {
                self.advance(next, heading, step);
                self.pending_turn = draw.follow_up;
                return true;
            }
            failed.push(draw.turn);
        }
        false
    }
}

/// Run one random-walk attempt with its own RNG stream
pub fn attempt(layout: &WalkLayout, rng: &mut TrackRng, attempt: u32) -> Option<Candidate> {
    if layout.bounds.radius_x < 2 || layout.bounds.radius_y < 2 {
        log::debug!("walk attempt {attempt}: area too small for a loop");
        return None;
    }

    let mut walk = RandomWalk::new(layout.start_heading);
    while walk.segments() < MAX_SEGMENTS {
        let step = walk.segments();
        if step >= MIN_SEGMENTS && walk.try_close(layout) {
            return finish(walk.path, layout, attempt);
        }
        if !walk.step(layout, rng, step) {
            log::debug!("walk attempt {attempt}: stuck at step {step}");
            return None;
        }
        if walk.is_closed() {
            return finish(walk.path, layout, attempt);
        }
    }

    log::debug!("walk attempt {attempt}: no closure within {MAX_SEGMENTS} segments");
    None
}

fn finish(path: Vec<IVec2>, layout: &WalkLayout, attempt: u32) -> Option<Candidate> {
    let segments = path.len() - 1;
    if !(MIN_SEGMENTS..=MAX_SEGMENTS).contains(&segments) {
        log::debug!("walk attempt {attempt}: closed with {segments} segments, out of range");
        return None;
    }
    let stats = snapped_stats(&path)?;
    let Some(score) = score_snapped(&stats) else {
        log::debug!("walk attempt {attempt}: rejected by quality gates ({stats:?})");
        return None;
    };
    log::debug!("walk attempt {attempt}: accepted {segments} segments, score {score:.2}");
    Some(Candidate {
        attempt,
        cell_size: layout.cell_size,
        shape: LoopShape::Snapped(path),
        stats,
        score,
    })
}
