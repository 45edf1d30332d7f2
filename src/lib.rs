//! Loopwright - deterministic procedural race track generation
//!
//! Core modules:
//! - `track`: Deterministic loop search (RNG, grid geometry, builders, smoothing)
//! - `settings`: Strategy selection and post-processing parameters
//! - `validate`: Boundary for external track validators/scorers

pub mod settings;
pub mod track;
pub mod validate;

pub use settings::{GenSettings, Strategy};
pub use track::{Candidate, TrackGenerator, TrackPolyline, generate_track};
pub use validate::{QualityBand, TrackValidator, ValidationReport};

/// Generation constants shared across strategies
pub mod consts {
    /// Samples in every returned world polyline
    pub const SAMPLE_COUNT: usize = 512;
    /// Chaikin corner-cutting passes applied before resampling
    pub const SMOOTHING_PASSES: u32 = 2;
    /// Squared distance under which two world points are the same point
    pub const CLOSE_EPSILON_SQ: f32 = 1e-4;
    /// Marble/car count handed to validators by default
    pub const DEFAULT_MARBLE_COUNT: u32 = 8;
}
