//! Deterministic track generation module
//!
//! All loop search lives here. This module must be pure and deterministic:
//! - Seeded, forked RNG streams only (no global generator)
//! - Per-attempt owned occupancy (no shared caches)
//! - Stable iteration order (attempt index, fixed direction tables)
//! - No rendering, I/O or platform dependencies

pub mod curve;
pub mod grid;
pub mod quality;
pub mod rng;
pub mod search;
pub mod snapped;
pub mod tile;

pub use curve::{TrackPolyline, chaikin_closed, close_loop, resample_closed};
pub use grid::{Edge, GridBounds, Occupancy, segments_intersect};
pub use quality::{Candidate, LoopShape, LoopStats};
pub use rng::{TrackRng, fork_seed};
pub use search::{Extents, TrackGenerator, best_candidate, generate_track};
pub use tile::{Piece, PlacedTile};
