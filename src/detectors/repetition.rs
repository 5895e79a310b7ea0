//! Repetitive movement (stimming) detection
//!
//! A trailing time window of positions is judged every `hop_sec`. A window qualifies when,
//! on either axis, the peak-to-peak amplitude lies inside the configured band, the trace
//! reverses direction often enough and the net drift stays small relative to the
//! amplitude. Qualifying windows feed a [`ConfirmationRule`]; once confirmed the flag stays
//! set for the rest of the session.
//!
//! Only the binary flag leaves this module. Window statistics are logged at `debug` level
//! and never reach a summary.

use std::collections::VecDeque;

use crate::clock::FrameContext;
use crate::config::{ConfirmationRule, RepetitionConfig};
use crate::error::ScreenError;
use crate::geometry::{count_reversals, drift_ratio, peak_to_peak};
use crate::landmarks::{face, pose};
use crate::types::{Axis, DetectorFrame, LandmarkSet, Point2, RepetitionSummary};
use tracing::{debug, info};

/// Windowed oscillation tracker for a single point
#[derive(Debug, Clone)]
pub struct OscillationTracker {
    config: RepetitionConfig,
    window: VecDeque<(f64, Point2)>,
    next_verdict_at: Option<f64>,
    consecutive: u32,
    accumulated_sec: f64,
    confirmed: bool,
}

impl OscillationTracker {
    pub fn new(config: RepetitionConfig) -> Self {
        let capacity = config.max_samples;
        Self {
            config,
            window: VecDeque::with_capacity(capacity),
            next_verdict_at: None,
            consecutive: 0,
            accumulated_sec: 0.0,
            confirmed: false,
        }
    }

    /// Add one position (or `None` on detection loss); returns whether a window qualified
    /// on this frame
    pub fn push(&mut self, ctx: &FrameContext, position: Option<Point2>) -> bool {
        let Some(position) = position else {
            self.window.clear();
            return false;
        };
        if ctx.in_warmup(self.config.warmup_sec) {
            self.window.clear();
            return false;
        }

        let now = ctx.timestamp;
        self.window.push_back((now, position));
        let horizon = now - self.config.window_sec;
        while self.window.front().is_some_and(|&(t, _)| t < horizon) {
            self.window.pop_front();
        }
        while self.window.len() > self.config.max_samples {
            self.window.pop_front();
        }

        let coverage = self.window.front().map_or(0.0, |&(t, _)| now - t);
        if coverage < self.config.min_window_coverage * self.config.window_sec
            || self.window.len() < self.config.min_samples
        {
            return false;
        }
        if self.next_verdict_at.is_some_and(|next| now < next) {
            return false;
        }
        self.next_verdict_at = Some(now + self.config.hop_sec);

        let qualifies = self.window_qualifies();
        self.apply_verdict(now, qualifies);
        qualifies
    }

    fn window_qualifies(&self) -> bool {
        Axis::BOTH.iter().any(|&axis| {
            let values: Vec<f64> = self.window.iter().map(|(_, p)| p.axis(axis)).collect();
            let amplitude = peak_to_peak(&values);
            let reversals = count_reversals(&values, self.config.min_step);
            let drift = drift_ratio(&values);
            debug!(?axis, amplitude, reversals, drift, "oscillation window");

            amplitude >= self.config.min_amplitude
                && amplitude <= self.config.max_amplitude
                && reversals >= self.config.min_oscillations
                && drift <= self.config.max_drift_ratio
        })
    }

    fn apply_verdict(&mut self, now: f64, qualifies: bool) {
        let reached = match self.config.confirmation {
            ConfirmationRule::ConsecutiveWindows { required } => {
                self.consecutive = if qualifies {
                    self.consecutive + 1
                } else {
                    self.consecutive.saturating_sub(1)
                };
                self.consecutive >= required
            }
            ConfirmationRule::AccumulatedTime { min_seconds } => {
                if qualifies {
                    self.accumulated_sec += self.config.hop_sec;
                }
                self.accumulated_sec >= min_seconds
            }
        };

        if reached && !self.confirmed {
            self.confirmed = true;
            info!(at = now, "repetitive movement confirmed");
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.next_verdict_at = None;
        self.consecutive = 0;
        self.accumulated_sec = 0.0;
        self.confirmed = false;
    }
}

/// Repetitive head movement (rocking, nodding) from the nose tip
#[derive(Debug, Clone)]
pub struct HeadRepetitionDetector {
    tracker: OscillationTracker,
    warmup_sec: f64,
}

impl Default for HeadRepetitionDetector {
    fn default() -> Self {
        Self::new(RepetitionConfig::head())
    }
}

impl HeadRepetitionDetector {
    pub fn new(config: RepetitionConfig) -> Self {
        Self {
            warmup_sec: config.warmup_sec,
            tracker: OscillationTracker::new(config),
        }
    }

    pub fn update(
        &mut self,
        ctx: &FrameContext,
        face: Option<&LandmarkSet>,
    ) -> Result<DetectorFrame, ScreenError> {
        let warmup = ctx.in_warmup(self.warmup_sec);
        let nose = face.map(|f| f.point(face::NOSE_TIP)).transpose()?;
        let qualified = self.tracker.push(ctx, nose);

        Ok(match nose {
            Some(_) => DetectorFrame::detected(warmup, qualified),
            None => DetectorFrame::missing(warmup),
        })
    }

    pub fn is_confirmed(&self) -> bool {
        self.tracker.is_confirmed()
    }

    pub fn summary(&self) -> RepetitionSummary {
        let (present, interpretation) = if self.is_confirmed() {
            (
                true,
                "Repetitive head movements (rocking or nodding) sustained across multiple windows",
            )
        } else {
            (false, "No sustained repetitive head movement detected")
        };
        RepetitionSummary {
            present,
            interpretation: interpretation.to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

/// Repetitive hand movement (flapping) from both pose wrists
///
/// Each wrist has its own tracker; stimming is present if either confirms.
#[derive(Debug, Clone)]
pub struct HandRepetitionDetector {
    left: OscillationTracker,
    right: OscillationTracker,
    warmup_sec: f64,
}

impl Default for HandRepetitionDetector {
    fn default() -> Self {
        Self::new(RepetitionConfig::hand())
    }
}

impl HandRepetitionDetector {
    pub fn new(config: RepetitionConfig) -> Self {
        Self {
            warmup_sec: config.warmup_sec,
            left: OscillationTracker::new(config.clone()),
            right: OscillationTracker::new(config),
        }
    }

    pub fn update(
        &mut self,
        ctx: &FrameContext,
        pose: Option<&LandmarkSet>,
    ) -> Result<DetectorFrame, ScreenError> {
        let warmup = ctx.in_warmup(self.warmup_sec);
        let wrists = pose
            .map(|p| p.points([pose::LEFT_WRIST, pose::RIGHT_WRIST]))
            .transpose()?;

        let Some([left, right]) = wrists else {
            self.left.push(ctx, None);
            self.right.push(ctx, None);
            return Ok(DetectorFrame::missing(warmup));
        };

        let left_qualified = self.left.push(ctx, Some(left));
        let right_qualified = self.right.push(ctx, Some(right));
        Ok(DetectorFrame::detected(warmup, left_qualified || right_qualified))
    }

    pub fn is_confirmed(&self) -> bool {
        self.left.is_confirmed() || self.right.is_confirmed()
    }

    pub fn summary(&self) -> RepetitionSummary {
        let (present, interpretation) = if self.is_confirmed() {
            (
                true,
                "Repetitive hand movements (possible hand flapping) sustained across multiple windows",
            )
        } else {
            (false, "No sustained repetitive hand movement detected")
        };
        RepetitionSummary {
            present,
            interpretation: interpretation.to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
