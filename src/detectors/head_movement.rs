//! Head movement magnitude
//!
//! Mean frame-to-frame displacement of the nose tip in normalized image coordinates. No
//! frame rate is assumed; the measure is purely per frame.

use crate::clock::FrameContext;
use crate::config::HeadMovementConfig;
use crate::error::ScreenError;
use crate::geometry::distance;
use crate::landmarks::face;
use crate::types::{DetectorFrame, FeatureLevel, HeadMovementSummary, LandmarkSet, Point2};

/// Accumulates post-warm-up head displacement
#[derive(Debug, Clone)]
pub struct HeadMovementMeter {
    config: HeadMovementConfig,
    previous: Option<Point2>,
    total_movement: f64,
    samples: u32,
}

impl Default for HeadMovementMeter {
    fn default() -> Self {
        Self::new(HeadMovementConfig::default())
    }
}

impl HeadMovementMeter {
    pub fn new(config: HeadMovementConfig) -> Self {
        Self {
            config,
            previous: None,
            total_movement: 0.0,
            samples: 0,
        }
    }

    pub fn update(
        &mut self,
        ctx: &FrameContext,
        face: Option<&LandmarkSet>,
    ) -> Result<DetectorFrame, ScreenError> {
        let warmup = ctx.in_warmup(self.config.warmup_sec);

        let Some(face) = face else {
            // Displacement across a detection gap is not a per-frame movement
            self.previous = None;
            return Ok(DetectorFrame::missing(warmup));
        };
        let nose = face.point(face::NOSE_TIP)?;

        if warmup {
            self.previous = None;
            return Ok(DetectorFrame::detected(true, false));
        }

        let moved = match self.previous.replace(nose) {
            Some(previous) => {
                self.total_movement += distance(previous, nose);
                self.samples += 1;
                true
            }
            None => false,
        };

        Ok(DetectorFrame::detected(false, moved))
    }

    pub fn summary(&self) -> HeadMovementSummary {
        if self.samples < self.config.min_samples {
            return HeadMovementSummary {
                avg_per_frame: 0.0,
                total_movement: self.total_movement,
                level: FeatureLevel::InsufficientData,
                interpretation: "Too few head positions after warm-up to assess movement"
                    .to_string(),
            };
        }

        let avg_per_frame = self.total_movement / f64::from(self.samples);
        let (level, interpretation) = if avg_per_frame < self.config.low_movement {
            (FeatureLevel::Low, "Minimal head movement - very still posture")
        } else if avg_per_frame > self.config.high_movement {
            (
                FeatureLevel::High,
                "Elevated head movement - frequent repositioning or restlessness",
            )
        } else {
            (FeatureLevel::Normal, "Head movement within typical range")
        };

        HeadMovementSummary {
            avg_per_frame,
            total_movement: self.total_movement,
            level,
            interpretation: interpretation.to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.total_movement = 0.0;
        self.samples = 0;
    }
}
