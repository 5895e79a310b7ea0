//! Core data types
//!
//! Landmark geometry flowing into the detectors, the per-frame diagnostics flowing out
//! of them, and the immutable summaries produced once at session end.

use crate::error::ScreenError;
use serde::{Deserialize, Serialize};

/// A 2D landmark in normalized image coordinates (0-1 on both axes)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component along the requested axis
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// Image axis used by oscillation analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];
}

/// Ordered landmark points returned by a provider for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point2>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Look up a landmark by provider index
    pub fn point(&self, index: usize) -> Result<Point2, ScreenError> {
        self.points
            .get(index)
            .copied()
            .ok_or(ScreenError::MissingLandmark {
                index,
                available: self.points.len(),
            })
    }

    /// Look up several landmarks at once, failing on the first missing index
    pub fn points<const N: usize>(&self, indices: [usize; N]) -> Result<[Point2; N], ScreenError> {
        let mut out = [Point2::default(); N];
        for (slot, index) in out.iter_mut().zip(indices) {
            *slot = self.point(index)?;
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<Point2>> for LandmarkSet {
    fn from(points: Vec<Point2>) -> Self {
        Self::new(points)
    }
}

/// Qualitative level attached to every feature summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLevel {
    Low,
    Normal,
    Moderate,
    High,
    InsufficientData,
}

impl FeatureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureLevel::Low => "low",
            FeatureLevel::Normal => "normal",
            FeatureLevel::Moderate => "moderate",
            FeatureLevel::High => "high",
            FeatureLevel::InsufficientData => "insufficient_data",
        }
    }
}

// ============================================================================
// Per-frame diagnostics
// ============================================================================

/// Transient per-frame flags reported by a single detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorFrame {
    /// The landmarks this detector needs were present
    pub detected: bool,
    /// The frame fell inside this detector's warm-up interval
    pub warmup: bool,
    /// Detector-specific activity: blink counted, gaze on target, window qualified,
    /// gesture counted, or emotion sampled
    pub active: bool,
}

impl DetectorFrame {
    pub fn missing(warmup: bool) -> Self {
        Self {
            detected: false,
            warmup,
            active: false,
        }
    }

    pub fn detected(warmup: bool, active: bool) -> Self {
        Self {
            detected: true,
            warmup,
            active,
        }
    }
}

/// A detector that failed on one frame while the others continued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorFault {
    pub detector: String,
    pub message: String,
}

/// Diagnostics record returned for every processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// 1-based index of this frame within the session
    pub frame_number: u64,
    /// Frame timestamp as supplied by the caller
    pub timestamp: f64,
    /// Seconds since the first frame of the session
    pub elapsed: f64,
    pub blink: DetectorFrame,
    pub eye_contact: DetectorFrame,
    pub head_movement: DetectorFrame,
    pub head_repetition: DetectorFrame,
    pub hand_repetition: DetectorFrame,
    pub gesture: DetectorFrame,
    pub expression: DetectorFrame,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<DetectorFault>,
}

// ============================================================================
// Session-end summaries
// ============================================================================

/// Blink rate summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkSummary {
    pub blinks_per_minute: f64,
    pub total_blinks: u32,
    pub level: FeatureLevel,
    pub interpretation: String,
    pub face_detection_ratio: f64,
}

/// Eye contact summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeContactSummary {
    /// Retained dwell time over session duration (0-1)
    pub ratio: f64,
    pub level: FeatureLevel,
    pub interpretation: String,
    /// Number of retained dwell segments
    pub segments: u32,
    pub total_contact_seconds: f64,
    pub face_detection_ratio: f64,
}

/// Head movement magnitude summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadMovementSummary {
    /// Mean frame-to-frame displacement of the head reference point
    pub avg_per_frame: f64,
    pub total_movement: f64,
    pub level: FeatureLevel,
    pub interpretation: String,
}

/// Binary repetitive-movement summary (head or hand)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepetitionSummary {
    pub present: bool,
    pub interpretation: String,
}

/// Social gesture frequency summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSummary {
    pub frequency_per_minute: f64,
    pub total_gestures: u32,
    pub level: FeatureLevel,
    pub interpretation: String,
}

/// Facial expression variability summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSummary {
    /// Normalized Shannon entropy of observed emotion labels (0-1)
    pub variability: f64,
    pub level: FeatureLevel,
    pub interpretation: String,
    /// Classified samples over frames processed
    pub detection_rate: f64,
    pub classifier_available: bool,
}

/// Data-quality signals reported alongside the features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub face_detection_ratio: f64,
    pub hand_detection_ratio: f64,
    pub pose_detection_ratio: f64,
    pub frames_skipped: u64,
    pub detector_faults: u64,
}

/// Overall risk label derived from the concern list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

/// Deterministic clinical interpretation of the seven features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInterpretation {
    pub concerns: Vec<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub summary: String,
}

/// The seven per-detector summaries of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub eye_contact: EyeContactSummary,
    pub blink: BlinkSummary,
    pub head_movement: HeadMovementSummary,
    pub head_repetition: RepetitionSummary,
    pub hand_repetition: RepetitionSummary,
    pub gestures: GestureSummary,
    pub expression: ExpressionSummary,
}

/// Complete result of a screening session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_duration_seconds: f64,
    pub total_frames: u64,
    pub features: FeatureSet,
    pub data_quality: DataQuality,
    pub interpretation: ClinicalInterpretation,
}
