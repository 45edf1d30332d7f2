//! Track validation boundary
//!
//! Physics-based validation lives outside this crate. A validator receives a
//! finished polyline and the marble count and returns a pass/fail report.

use serde::{Deserialize, Serialize};

use crate::track::TrackPolyline;

/// Coarse quality grade of a validated track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityBand {
    Green,
    #[default]
    Yellow,
    Red,
}

impl QualityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityBand::Green => "green",
            QualityBand::Yellow => "yellow",
            QualityBand::Red => "red",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "green" => Some(QualityBand::Green),
            "yellow" => Some(QualityBand::Yellow),
            "red" => Some(QualityBand::Red),
            _ => None,
        }
    }
}

/// Outcome of validating one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub score: f32,
    pub band: QualityBand,
    /// Human-readable failure reasons, empty on a clean pass
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl ValidationReport {
    pub fn pass(score: f32, band: QualityBand) -> Self {
        Self {
            passed: true,
            score,
            band,
            reasons: Vec::new(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            score: 0.0,
            band: QualityBand::Red,
            reasons: vec![reason.into()],
        }
    }
}

/// External judge of finished tracks
pub trait TrackValidator {
    fn validate(&self, track: &TrackPolyline, marble_count: u32) -> ValidationReport;
}

impl<F> TrackValidator for F
where
    F: Fn(&TrackPolyline, u32) -> ValidationReport,
{
    fn validate(&self, track: &TrackPolyline, marble_count: u32) -> ValidationReport {
        self(track, marble_count)
    }
}
