//! Tile-placement loop builder
//!
//! Grows a loop of straight and corner tiles on a 4-directional cell grid,
//! starting with a straight tile on the origin cell. Once the walk is long
//! enough, a bounded breadth-first search looks for a run of tiles that
//! re-enters the origin heading the way the loop started.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::grid::{CARDINAL, GridBounds, Occupancy};
use super::quality::{Candidate, LoopShape, score_tiles, tile_stats};
use super::rng::TrackRng;

/// World units per tile
pub const CELL_SIZE: f32 = 6.0;
pub const MAX_BUILD_ATTEMPTS: u32 = 20;
pub const MIN_CELLS: usize = 40;
pub const MAX_CELLS: usize = 120;
/// Max tiles a closing search may append
pub const CLOSE_SEARCH_DEPTH: usize = 12;
pub const FORK_SALT: i32 = 0x711e;

/// Turn budget floor; the piece mix is rebalanced once the walk is this many
/// budgets long and has spent its budget
const MIN_TURN_BUDGET: usize = 8;
/// Straight / left / right pick weights
const BASE_WEIGHTS: [f32; 3] = [0.6, 0.2, 0.2];
const STRAIGHT_HEAVY_WEIGHTS: [f32; 3] = [0.8, 0.1, 0.1];

/// Tile piece types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    Straight,
    /// Turns 90° counter-clockwise
    CornerLeft,
    /// Turns 90° clockwise
    CornerRight,
}

impl Piece {
    pub const ALL: [Piece; 3] = [Piece::Straight, Piece::CornerLeft, Piece::CornerRight];

    /// Signed quarter turns: +1 left, -1 right
    pub fn turn(self) -> i32 {
        match self {
            Piece::Straight => 0,
            Piece::CornerLeft => 1,
            Piece::CornerRight => -1,
        }
    }

    /// Exit heading (index into `CARDINAL`) for a given entry heading
    pub fn exit(self, entry: usize) -> usize {
        (entry as i32 + self.turn()).rem_euclid(4) as usize
    }
}

/// A tile on the grid; the exit heading is derived from entry and piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub cell: IVec2,
    /// Heading the track enters this cell with (index into `CARDINAL`)
    pub entry: usize,
    pub piece: Piece,
}

impl PlacedTile {
    pub fn exit(&self) -> usize {
        self.piece.exit(self.entry)
    }

    pub fn entry_vec(&self) -> IVec2 {
        CARDINAL[self.entry]
    }

    pub fn exit_vec(&self) -> IVec2 {
        CARDINAL[self.exit()]
    }

    /// Cell the track leaves into
    pub fn next_cell(&self) -> IVec2 {
        self.cell + self.exit_vec()
    }
}

/// Grid extent and start heading for one build
#[derive(Debug, Clone, Copy)]
pub struct TileLayout {
    pub bounds: GridBounds,
    /// Heading of the straight origin tile (index into `CARDINAL`)
    pub start_heading: usize,
    pub cell_size: f32,
}

impl TileLayout {
    pub fn new(half_width: f32, half_height: f32, variant: i32) -> Self {
        // Cell centres stay inside the half extent
        let radius = |half: f32| (half / CELL_SIZE).floor().max(0.0) as i32;
        Self {
            bounds: GridBounds::new(radius(half_width), radius(half_height)),
            start_heading: variant.rem_euclid(4) as usize,
            cell_size: CELL_SIZE,
        }
    }

    /// Cell the last tile must occupy to hand the loop back to the origin
    pub fn closing_cell(&self) -> IVec2 {
        -CARDINAL[self.start_heading]
    }
}

/// Whether placing `cell` (entered from `head`) leaves a 2×2 block with at
/// least three occupied cells, counting `cell` and ignoring `head`
fn pinches(cell: IVec2, head: IVec2, occupied: impl Fn(IVec2) -> bool) -> bool {
    const BLOCK: [IVec2; 4] = [
        IVec2::new(0, 0),
        IVec2::new(1, 0),
        IVec2::new(0, 1),
        IVec2::new(1, 1),
    ];
    BLOCK.iter().any(|&corner| {
        let base = cell - corner;
        BLOCK
            .iter()
            .map(|&d| base + d)
            .filter(|&c| c == cell || (c != head && occupied(c)))
            .count()
            >= 3
    })
}

fn piece_weights(step: usize, corners: usize) -> [f32; 3] {
    let turn_budget = MIN_TURN_BUDGET.max(step / 2);
    if step >= 3 * MIN_TURN_BUDGET && corners >= turn_budget {
        STRAIGHT_HEAVY_WEIGHTS
    } else {
        BASE_WEIGHTS
    }
}

/// BFS state: cell and the heading it is entered with
type SearchState = (IVec2, usize);

/// One attempt's growing tile path and its occupancy
struct TileWalk {
    tiles: Vec<PlacedTile>,
    occupancy: Occupancy,
    corners: usize,
}

impl TileWalk {
    fn new(start_heading: usize) -> Self {
        let mut occupancy = Occupancy::new();
        occupancy.visit(IVec2::ZERO);
        Self {
            tiles: vec![PlacedTile {
                cell: IVec2::ZERO,
                entry: start_heading,
                piece: Piece::Straight,
            }],
            occupancy,
            corners: 0,
        }
    }

    fn len(&self) -> usize {
        self.tiles.len()
    }

    fn head(&self) -> &PlacedTile {
        // Never empty: the origin tile is placed on construction
        &self.tiles[self.tiles.len() - 1]
    }

    fn is_closed(&self, layout: &TileLayout) -> bool {
        let head = self.head();
        head.next_cell() == IVec2::ZERO && head.exit() == layout.start_heading
    }

    /// Whether a tile may sit on `cell`, entered from `prev`
    fn lays_out(&self, layout: &TileLayout, cell: IVec2, prev: IVec2) -> bool {
        layout.bounds.contains(cell)
            && !self.occupancy.is_visited(cell)
            && !self.occupancy.has_edge(prev, cell)
            && !pinches(cell, prev, |c| self.occupancy.is_visited(c))
    }

    fn fits(&self, layout: &TileLayout, piece: Piece) -> bool {
        let head = self.head();
        let cell = head.next_cell();
        let entry = head.exit();
        if !self.lays_out(layout, cell, head.cell) {
            return false;
        }

        let exit = piece.exit(entry);
        let target = cell + CARDINAL[exit];
        if target == IVec2::ZERO {
            return exit == layout.start_heading && self.len() + 1 >= MIN_CELLS;
        }
        // The closing cell is reserved for the tile that hands back to the origin
        if cell == layout.closing_cell()
            || !layout.bounds.contains(target)
            || self.occupancy.is_visited(target)
        {
            return false;
        }
        // The next tile must not pinch against this one, and the origin must
        // stay reachable from it
        let occupied = |c: IVec2| c == cell || self.occupancy.is_visited(c);
        !pinches(target, cell, occupied) && self.can_return(layout, (target, exit), cell)
    }

    /// Whether some run of tiles from `start` re-enters the origin with the
    /// start heading, treating `laid` as occupied
    fn can_return(&self, layout: &TileLayout, start: SearchState, laid: IVec2) -> bool {
        let occupied = |c: IVec2| c == laid || self.occupancy.is_visited(c);
        let mut seen: HashSet<SearchState> = HashSet::from([start]);
        let mut queue: VecDeque<SearchState> = VecDeque::from([start]);
        while let Some((cell, entry)) = queue.pop_front() {
            let prev = cell - CARDINAL[entry];
            if !layout.bounds.contains(cell) || occupied(cell) || pinches(cell, prev, occupied) {
                continue;
            }
            for piece in Piece::ALL {
                let exit = piece.exit(entry);
                let next = cell + CARDINAL[exit];
                if next == IVec2::ZERO {
                    if exit == layout.start_heading {
                        return true;
                    }
                    continue;
                }
                if seen.insert((next, exit)) {
                    queue.push_back((next, exit));
                }
            }
        }
        false
    }

    fn place(&mut self, piece: Piece) {
        let head = *self.head();
        let tile = PlacedTile {
            cell: head.next_cell(),
            entry: head.exit(),
            piece,
        };
        self.push(tile);
    }

    fn push(&mut self, tile: PlacedTile) {
        let prev = tile.cell - tile.entry_vec();
        self.occupancy.use_edge(prev, tile.cell);
        self.occupancy.visit(tile.cell);
        if tile.piece != Piece::Straight {
            self.corners += 1;
        }
        self.tiles.push(tile);
    }

    /// Whether `path` can be laid after the head without overlap or pinches
    fn accepts(&self, path: &[PlacedTile]) -> bool {
        let mut extra: HashSet<IVec2> = HashSet::with_capacity(path.len());
        let mut head = self.head().cell;
        for tile in path {
            let occupied = |c: IVec2| self.occupancy.is_visited(c) || extra.contains(&c);
            if occupied(tile.cell) || pinches(tile.cell, head, occupied) {
                return false;
            }
            extra.insert(tile.cell);
            head = tile.cell;
        }
        true
    }
}

/// Breadth-first search for tiles that lead from the walk's head back into
/// the origin with the start heading
fn search_closure(layout: &TileLayout, walk: &TileWalk) -> Option<Vec<PlacedTile>> {
    if walk.is_closed(layout) {
        return Some(Vec::new());
    }
    let budget = CLOSE_SEARCH_DEPTH.min(MAX_CELLS.saturating_sub(walk.len()));
    let head = walk.head();
    let start: SearchState = (head.next_cell(), head.exit());

    let mut came_from: HashMap<SearchState, (SearchState, Piece)> = HashMap::new();
    let mut seen: HashSet<SearchState> = HashSet::from([start]);
    let mut queue: VecDeque<(SearchState, usize)> = VecDeque::from([(start, 0)]);

    while let Some(((cell, entry), depth)) = queue.pop_front() {
        if depth >= budget {
            continue;
        }
        if !walk.lays_out(layout, cell, cell - CARDINAL[entry]) {
            continue;
        }

        for piece in Piece::ALL {
            let exit = piece.exit(entry);
            let next = cell + CARDINAL[exit];
            if next == IVec2::ZERO {
                if exit == layout.start_heading {
                    let path = rebuild_path(&came_from, start, (cell, entry), piece)?;
                    if walk.accepts(&path) {
                        return Some(path);
                    }
                }
                continue;
            }
            let state = (next, exit);
            if seen.insert(state) {
                came_from.insert(state, ((cell, entry), piece));
                queue.push_back((state, depth + 1));
            }
        }
    }
    None
}

/// Walk backpointers from `last` to `start`, returning tiles in driving order
fn rebuild_path(
    came_from: &HashMap<SearchState, (SearchState, Piece)>,
    start: SearchState,
    last: SearchState,
    last_piece: Piece,
) -> Option<Vec<PlacedTile>> {
    let mut path = vec![PlacedTile {
        cell: last.0,
        entry: last.1,
        piece: last_piece,
    }];
    let mut state = last;
    while state != start {
        let &(parent, piece) = came_from.get(&state)?;
        path.push(PlacedTile {
            cell: parent.0,
            entry: parent.1,
            piece,
        });
        state = parent;
    }
    path.reverse();
    Some(path)
}

/// Run one tile-placement attempt with its own RNG stream
pub fn attempt(layout: &TileLayout, rng: &mut TrackRng, attempt: u32) -> Option<Candidate> {
    if layout.bounds.radius_x < 1 || layout.bounds.radius_y < 1 {
        log::debug!("tile attempt {attempt}: area too small for a loop");
        return None;
    }

    let mut walk = TileWalk::new(layout.start_heading);

    loop {
        let step = walk.len();
        if walk.is_closed(layout) {
            return finish(walk.tiles, layout, attempt);
        }
        if step >= MIN_CELLS {
            if let Some(closing) = search_closure(layout, &walk) {
                closing.into_iter().for_each(|t| walk.push(t));
                return finish(walk.tiles, layout, attempt);
            }
        }
        if step >= MAX_CELLS {
            log::debug!("tile attempt {attempt}: no closure within {MAX_CELLS} tiles");
            return None;
        }
        let first = rng.choose_weighted(&piece_weights(step, walk.corners));
        let piece = (0..Piece::ALL.len())
            .map(|k| Piece::ALL[(first + k) % Piece::ALL.len()])
            .find(|&p| walk.fits(layout, p));

        let Some(piece) = piece else {
            log::debug!("tile attempt {attempt}: dead end at {step} tiles");
            return None;
        };
        walk.place(piece);
    }
}

fn finish(tiles: Vec<PlacedTile>, layout: &TileLayout, attempt: u32) -> Option<Candidate> {
    if !(MIN_CELLS..=MAX_CELLS).contains(&tiles.len()) {
        log::debug!("tile attempt {attempt}: closed with {} tiles, out of range", tiles.len());
        return None;
    }
    let stats = tile_stats(&tiles);
    let Some(score) = score_tiles(&stats) else {
        log::debug!("tile attempt {attempt}: rejected by quality gates ({stats:?})");
        return None;
    };
    log::debug!("tile attempt {attempt}: accepted {} tiles, score {score:.2}", tiles.len());
    Some(Candidate {
        attempt,
        cell_size: layout.cell_size,
        shape: LoopShape::Tiles(tiles),
        stats,
        score,
    })
}

/// Lay out `pieces` from a tile on the origin entered with `start_heading`.
/// Returns the tiles if they form a closed loop over distinct cells.
pub fn tiles_from_pieces(start_heading: usize, pieces: &[Piece]) -> Option<Vec<PlacedTile>> {
    let mut tiles: Vec<PlacedTile> = Vec::with_capacity(pieces.len());
    let mut cells = HashSet::new();
    let (mut cell, mut entry) = (IVec2::ZERO, start_heading % 4);
    for &piece in pieces {
        if !cells.insert(cell) {
            return None;
        }
        let tile = PlacedTile { cell, entry, piece };
        (cell, entry) = (tile.next_cell(), tile.exit());
        tiles.push(tile);
    }
    (cell == IVec2::ZERO && entry == start_heading % 4).then_some(tiles)
}
