//! Eye contact detection
//!
//! A frame counts as "looking" when the eyes are open, the head faces the camera and both
//! irises sit near the middle of their eye. Sustained looking forms dwell segments; only
//! segments of at least `min_contact_duration_sec` contribute to the ratio.

use crate::clock::FrameContext;
use crate::config::EyeContactConfig;
use crate::detectors::blink::mean_eye_ratio;
use crate::error::ScreenError;
use crate::geometry::{centroid, midpoint, projection_ratio};
use crate::landmarks::face;
use crate::types::{DetectorFrame, EyeContactSummary, FeatureLevel, LandmarkSet, Point2};
use tracing::debug;

/// Tracks dwell segments of sustained eye contact
#[derive(Debug, Clone)]
pub struct EyeContactDetector {
    config: EyeContactConfig,
    /// Start of the currently open segment
    open_since: Option<f64>,
    last_timestamp: Option<f64>,
    segments: u32,
    contact_seconds: f64,
    frames_seen: u64,
    face_frames: u64,
}

impl Default for EyeContactDetector {
    fn default() -> Self {
        Self::new(EyeContactConfig::default())
    }
}

impl EyeContactDetector {
    pub fn new(config: EyeContactConfig) -> Self {
        Self {
            config,
            open_since: None,
            last_timestamp: None,
            segments: 0,
            contact_seconds: 0.0,
            frames_seen: 0,
            face_frames: 0,
        }
    }

    pub fn update(
        &mut self,
        ctx: &FrameContext,
        face: Option<&LandmarkSet>,
    ) -> Result<DetectorFrame, ScreenError> {
        self.frames_seen += 1;
        self.last_timestamp = Some(ctx.timestamp);
        let warmup = ctx.in_warmup(self.config.warmup_sec);

        let Some(face) = face else {
            self.close_segment(ctx.timestamp);
            return Ok(DetectorFrame::missing(warmup));
        };
        self.face_frames += 1;

        let looking = self.is_looking(face)?;
        if warmup {
            return Ok(DetectorFrame::detected(true, looking));
        }

        if looking {
            if self.open_since.is_none() {
                self.open_since = Some(ctx.timestamp);
            }
        } else {
            self.close_segment(ctx.timestamp);
        }

        Ok(DetectorFrame::detected(false, looking))
    }

    /// Eyes open, head centered and gaze centered on both eyes
    fn is_looking(&self, face: &LandmarkSet) -> Result<bool, ScreenError> {
        let eyes_open = mean_eye_ratio(face)? >= self.config.eye_open_ratio;

        let (r_outer, r_inner) = face::RIGHT_EYE_CORNERS;
        let (l_inner, l_outer) = face::LEFT_EYE_CORNERS;
        let [r_outer, r_inner, l_inner, l_outer] = face.points([r_outer, r_inner, l_inner, l_outer])?;
        let nose = face.point(face::NOSE_TIP)?;

        let right_center = midpoint(r_outer, r_inner);
        let left_center = midpoint(l_inner, l_outer);
        let separation = (left_center.x - right_center.x).abs();
        let head_centered = if separation > 0.0 {
            let between = midpoint(right_center, left_center);
            ((nose.x - between.x) / separation).abs() <= self.config.head_center_tolerance
        } else {
            false
        };

        let right_iris = iris_center(face, face::RIGHT_IRIS)?;
        let left_iris = iris_center(face, face::LEFT_IRIS)?;
        let tolerance = self.config.gaze_center_tolerance;
        let gaze_centered = (projection_ratio(right_iris, r_outer, r_inner) - 0.5).abs() <= tolerance
            && (projection_ratio(left_iris, l_inner, l_outer) - 0.5).abs() <= tolerance;

        Ok(eyes_open && head_centered && gaze_centered)
    }

    fn close_segment(&mut self, end: f64) {
        if let Some(start) = self.open_since.take() {
            let duration = end - start;
            if duration >= self.config.min_contact_duration_sec {
                self.segments += 1;
                self.contact_seconds += duration;
                debug!(start, end, duration, "eye contact segment retained");
            }
        }
    }

    /// Retained segments and contact time, treating an open segment as closed at the last frame
    fn totals(&self) -> (u32, f64) {
        let mut segments = self.segments;
        let mut seconds = self.contact_seconds;
        if let (Some(start), Some(last)) = (self.open_since, self.last_timestamp) {
            let duration = last - start;
            if duration >= self.config.min_contact_duration_sec {
                segments += 1;
                seconds += duration;
            }
        }
        (segments, seconds)
    }

    pub fn face_detection_ratio(&self) -> f64 {
        if self.frames_seen == 0 {
            return 0.0;
        }
        self.face_frames as f64 / self.frames_seen as f64
    }

    pub fn summary(&self, session_duration_sec: f64) -> EyeContactSummary {
        let face_detection_ratio = self.face_detection_ratio();
        let (segments, total_contact_seconds) = self.totals();

        if session_duration_sec <= self.config.warmup_sec || self.face_frames == 0 {
            return EyeContactSummary {
                ratio: 0.0,
                level: FeatureLevel::InsufficientData,
                interpretation: "Insufficient face data to assess eye contact".to_string(),
                segments,
                total_contact_seconds,
                face_detection_ratio,
            };
        }

        let ratio = (total_contact_seconds / session_duration_sec).clamp(0.0, 1.0);
        let (level, interpretation) = if ratio < self.config.low_ratio {
            (
                FeatureLevel::Low,
                "Limited sustained eye contact with the camera",
            )
        } else if ratio < self.config.high_ratio {
            (FeatureLevel::Moderate, "Intermittent sustained eye contact")
        } else {
            (FeatureLevel::High, "Frequent sustained eye contact")
        };

        EyeContactSummary {
            ratio,
            level,
            interpretation: interpretation.to_string(),
            segments,
            total_contact_seconds,
            face_detection_ratio,
        }
    }

    pub fn reset(&mut self) {
        self.open_since = None;
        self.last_timestamp = None;
        self.segments = 0;
        self.contact_seconds = 0.0;
        self.frames_seen = 0;
        self.face_frames = 0;
    }
}

fn iris_center(face: &LandmarkSet, ring: [usize; 4]) -> Result<Point2, ScreenError> {
    let points = face.points(ring)?;
    // Four points are never empty
    Ok(centroid(&points).unwrap_or(points[0]))
}
