//! Social gesture counting
//!
//! Palm movement passes three gates before it counts: a per-frame movement threshold,
//! a persistence time for the candidate interval, and a cooldown since the previous
//! gesture. Implausibly large jumps are dropped as tracking glitches.

use crate::clock::FrameContext;
use crate::config::GestureConfig;
use crate::error::ScreenError;
use crate::geometry::{distance, per_minute};
use crate::landmarks::hand;
use crate::types::{DetectorFrame, FeatureLevel, GestureSummary, LandmarkSet, Point2};
use tracing::debug;

/// Consecutive out-of-range jumps after which the palm reference moves to the new position
const GLITCH_RELOCK_FRAMES: u32 = 3;

#[derive(Debug, Clone)]
pub struct GestureDetector {
    config: GestureConfig,
    previous: Option<Point2>,
    consecutive_glitches: u32,
    candidate_since: Option<f64>,
    last_gesture_at: Option<f64>,
    gesture_count: u32,
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            previous: None,
            consecutive_glitches: 0,
            candidate_since: None,
            last_gesture_at: None,
            gesture_count: 0,
        }
    }

    pub fn update(
        &mut self,
        ctx: &FrameContext,
        hand: Option<&LandmarkSet>,
    ) -> Result<DetectorFrame, ScreenError> {
        let warmup = ctx.in_warmup(self.config.warmup_sec);

        let Some(hand) = hand else {
            self.previous = None;
            self.consecutive_glitches = 0;
            self.candidate_since = None;
            return Ok(DetectorFrame::missing(warmup));
        };
        let palm = hand.point(hand::PALM_CENTER)?;

        let Some(previous) = self.previous else {
            self.previous = Some(palm);
            return Ok(DetectorFrame::detected(warmup, false));
        };

        let movement = distance(previous, palm);
        if movement > self.config.glitch_limit {
            self.consecutive_glitches += 1;
            // Persistent jumps mean the tracked hand changed
            if self.consecutive_glitches >= GLITCH_RELOCK_FRAMES {
                debug!(at = ctx.timestamp, movement, "palm reference relocated");
                self.previous = Some(palm);
                self.consecutive_glitches = 0;
            } else {
                debug!(at = ctx.timestamp, movement, "palm jump ignored");
            }
            return Ok(DetectorFrame::detected(warmup, false));
        }
        self.previous = Some(palm);
        self.consecutive_glitches = 0;

        if movement <= self.config.move_threshold {
            self.candidate_since = None;
            return Ok(DetectorFrame::detected(warmup, false));
        }

        let since = *self.candidate_since.get_or_insert(ctx.timestamp);
        let persisted = ctx.timestamp - since >= self.config.persistence_sec;
        let cooled_down = self
            .last_gesture_at
            .map_or(true, |last| ctx.timestamp - last > self.config.cooldown_sec);

        let counted = persisted && cooled_down && !warmup;
        if counted {
            self.gesture_count += 1;
            self.last_gesture_at = Some(ctx.timestamp);
            self.candidate_since = None;
            debug!(at = ctx.timestamp, total = self.gesture_count, "gesture counted");
        }

        Ok(DetectorFrame::detected(warmup, counted))
    }

    pub fn gesture_count(&self) -> u32 {
        self.gesture_count
    }

    pub fn summary(&self, session_duration_sec: f64) -> GestureSummary {
        let effective = session_duration_sec - self.config.warmup_sec;
        if effective <= 0.0 {
            return GestureSummary {
                frequency_per_minute: 0.0,
                total_gestures: self.gesture_count,
                level: FeatureLevel::InsufficientData,
                interpretation: "Session too short to assess gesturing".to_string(),
            };
        }

        let frequency_per_minute =
            per_minute(self.gesture_count, effective, self.config.max_per_minute);
        let (level, interpretation) = if frequency_per_minute < self.config.low_per_minute {
            (FeatureLevel::Low, "Few or no social gestures observed")
        } else if frequency_per_minute > self.config.high_per_minute {
            (FeatureLevel::High, "Frequent gesturing observed")
        } else {
            (FeatureLevel::Normal, "Social gesturing within typical range")
        };

        GestureSummary {
            frequency_per_minute,
            total_gestures: self.gesture_count,
            level,
            interpretation: interpretation.to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.consecutive_glitches = 0;
        self.candidate_since = None;
        self.last_gesture_at = None;
        self.gesture_count = 0;
    }
}
