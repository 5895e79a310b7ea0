//! Blink rate detection
//!
//! Hysteresis state machine over the mean eye aspect ratio of both eyes. A closure is
//! counted as a blink only when it re-opens within the configured duration bounds.

use crate::clock::FrameContext;
use crate::config::BlinkConfig;
use crate::error::ScreenError;
use crate::geometry::{eye_aspect_ratio, per_minute};
use crate::landmarks::face;
use crate::types::{BlinkSummary, DetectorFrame, FeatureLevel, LandmarkSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
enum EyeState {
    Open,
    Closing { since: f64 },
}

/// Counts blinks over a session
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    config: BlinkConfig,
    state: EyeState,
    blink_count: u32,
    frames_seen: u64,
    face_frames: u64,
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(BlinkConfig::default())
    }
}

impl BlinkDetector {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            state: EyeState::Open,
            blink_count: 0,
            frames_seen: 0,
            face_frames: 0,
        }
    }

    /// Feed one frame's face mesh (or `None` when no face was detected)
    pub fn update(
        &mut self,
        ctx: &FrameContext,
        face: Option<&LandmarkSet>,
    ) -> Result<DetectorFrame, ScreenError> {
        self.frames_seen += 1;
        let warmup = ctx.in_warmup(self.config.warmup_sec);

        let Some(face) = face else {
            // Closure cannot be timed without a face
            self.state = EyeState::Open;
            return Ok(DetectorFrame::missing(warmup));
        };
        self.face_frames += 1;

        let ratio = mean_eye_ratio(face)?;

        if warmup {
            self.state = EyeState::Open;
            return Ok(DetectorFrame::detected(true, false));
        }

        let mut counted = false;
        match self.state {
            EyeState::Open if ratio < self.config.closed_ratio => {
                self.state = EyeState::Closing {
                    since: ctx.timestamp,
                };
            }
            EyeState::Closing { since } if ratio > self.config.open_ratio => {
                let duration = ctx.timestamp - since;
                self.state = EyeState::Open;
                if duration >= self.config.min_blink_duration_sec
                    && duration <= self.config.max_blink_duration_sec
                {
                    self.blink_count += 1;
                    counted = true;
                    debug!(at = ctx.timestamp, duration, "blink counted");
                } else {
                    debug!(at = ctx.timestamp, duration, "closure outside blink bounds");
                }
            }
            _ => {}
        }

        Ok(DetectorFrame::detected(false, counted))
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn face_detection_ratio(&self) -> f64 {
        if self.frames_seen == 0 {
            return 0.0;
        }
        self.face_frames as f64 / self.frames_seen as f64
    }

    pub fn summary(&self, session_duration_sec: f64) -> BlinkSummary {
        let face_detection_ratio = self.face_detection_ratio();
        let effective = session_duration_sec - self.config.warmup_sec;

        if effective <= 0.0 || face_detection_ratio < self.config.min_face_ratio {
            return BlinkSummary {
                blinks_per_minute: 0.0,
                total_blinks: self.blink_count,
                level: FeatureLevel::InsufficientData,
                interpretation: "Insufficient face data to estimate blink rate".to_string(),
                face_detection_ratio,
            };
        }

        let blinks_per_minute = per_minute(
            self.blink_count,
            effective,
            self.config.max_blinks_per_minute,
        );
        let (level, interpretation) = if blinks_per_minute < self.config.low_rate {
            (
                FeatureLevel::Low,
                "Reduced blink rate - possible intense visual focus or staring",
            )
        } else if blinks_per_minute > self.config.high_rate {
            (
                FeatureLevel::High,
                "Elevated blink rate - possible stress or sensory discomfort",
            )
        } else {
            (FeatureLevel::Normal, "Blink rate within typical range")
        };

        BlinkSummary {
            blinks_per_minute,
            total_blinks: self.blink_count,
            level,
            interpretation: interpretation.to_string(),
            face_detection_ratio,
        }
    }

    pub fn reset(&mut self) {
        self.state = EyeState::Open;
        self.blink_count = 0;
        self.frames_seen = 0;
        self.face_frames = 0;
    }
}

/// Mean eye aspect ratio of both eyes
pub(crate) fn mean_eye_ratio(face: &LandmarkSet) -> Result<f64, ScreenError> {
    let right = eye_aspect_ratio(&face.points(face::RIGHT_EYE_CONTOUR)?);
    let left = eye_aspect_ratio(&face.points(face::LEFT_EYE_CONTOUR)?);
    Ok((right + left) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FaceBuilder;

    const START: f64 = 100.0;

    /// Open eyes at 100 fps, one closure of `closed_for` seconds starting 5s in
    fn run_closure(closed_for: f64) -> BlinkDetector {
        let mut detector = BlinkDetector::default();
        let open = FaceBuilder::default().openness(0.30).build();
        let closed = FaceBuilder::default().openness(0.10).build();

        let close_at = 5.0;
        let open_at = close_at + closed_for;
        for i in 0..=1000 {
            let elapsed = i as f64 * 0.01;
            let ctx = FrameContext::new(START + elapsed, elapsed);
            let is_closed = elapsed >= close_at - 1e-9 && elapsed < open_at - 1e-9;
            let face = if is_closed { &closed } else { &open };
            detector.update(&ctx, Some(face)).unwrap();
        }
        detector
    }

    #[test]
    fn test_blink_duration_gating() {
        assert_eq!(run_closure(0.05).blink_count(), 0);
        assert_eq!(run_closure(0.10).blink_count(), 1);
        assert_eq!(run_closure(0.50).blink_count(), 0);
    }

    #[test]
    fn test_hysteresis_ignores_mid_band() {
        let mut detector = BlinkDetector::default();
        let open = FaceBuilder::default().openness(0.30).build();
        let closed = FaceBuilder::default().openness(0.10).build();
        // Between closed_ratio and open_ratio: does not re-open the eye
        let half = FaceBuilder::default().openness(0.20).build();

        let frames = [(&open, 3.00), (&closed, 3.05), (&half, 3.10), (&half, 3.15), (&open, 3.20)];
        for (face, t) in frames {
            detector
                .update(&FrameContext::new(t, t), Some(face))
                .unwrap();
        }
        // Closed 3.05 -> reopened 3.20 = 150ms
        assert_eq!(detector.blink_count(), 1);
    }

    #[test]
    fn test_warmup_closures_not_counted() {
        let mut detector = BlinkDetector::default();
        let open = FaceBuilder::default().openness(0.30).build();
        let closed = FaceBuilder::default().openness(0.10).build();

        detector.update(&FrameContext::new(0.5, 0.5), Some(&closed)).unwrap();
        let frame = detector.update(&FrameContext::new(0.6, 0.6), Some(&open)).unwrap();
        assert!(frame.warmup);
        assert_eq!(detector.blink_count(), 0);
    }

    #[test]
    fn test_face_loss_abandons_closure() {
        let mut detector = BlinkDetector::default();
        let open = FaceBuilder::default().openness(0.30).build();
        let closed = FaceBuilder::default().openness(0.10).build();

        detector.update(&FrameContext::new(5.0, 5.0), Some(&closed)).unwrap();
        detector.update(&FrameContext::new(5.05, 5.05), None).unwrap();
        detector.update(&FrameContext::new(5.1, 5.1), Some(&open)).unwrap();
        assert_eq!(detector.blink_count(), 0);
    }

    #[test]
    fn test_summary_rate_and_levels() {
        let detector = run_closure(0.10);
        // One blink over (10 - 2) effective seconds
        let summary = detector.summary(10.0);
        assert!((summary.blinks_per_minute - 7.5).abs() < 1e-9);
        assert_eq!(summary.level, FeatureLevel::Low);
        assert_eq!(summary.face_detection_ratio, 1.0);
    }

    #[test]
    fn test_summary_insufficient_data() {
        let detector = BlinkDetector::default();
        assert_eq!(detector.summary(60.0).level, FeatureLevel::InsufficientData);

        let detector = run_closure(0.10);
        // Session no longer than warm-up
        assert_eq!(detector.summary(1.5).level, FeatureLevel::InsufficientData);

        let mut sparse = BlinkDetector::default();
        let open = FaceBuilder::default().build();
        for i in 0..10 {
            let t = 3.0 + i as f64 * 0.1;
            let face = if i < 3 { Some(&open) } else { None };
            sparse.update(&FrameContext::new(t, t), face).unwrap();
        }
        assert_eq!(sparse.summary(10.0).level, FeatureLevel::InsufficientData);
    }

    #[test]
    fn test_short_landmark_set_is_an_error() {
        let mut detector = BlinkDetector::default();
        let truncated = LandmarkSet::new(vec![]);
        let result = detector.update(&FrameContext::new(3.0, 3.0), Some(&truncated));
        assert!(matches!(result, Err(ScreenError::MissingLandmark { .. })));
    }

    #[test]
    fn test_reset() {
        let mut detector = run_closure(0.10);
        detector.reset();
        assert_eq!(detector.blink_count(), 0);
        assert_eq!(detector.face_detection_ratio(), 0.0);
    }
}
