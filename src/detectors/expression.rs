//! Facial expression variability
//!
//! Emotion labels are sampled every `sample_every` processed frames while a face is
//! visible. Variability is the Shannon entropy of the label histogram normalized by the
//! maximum entropy for the labels seen; low diversity suggests restricted affect.

use std::collections::BTreeMap;

use crate::clock::FrameContext;
use crate::config::ExpressionConfig;
use crate::emotion::ClassifyError;
use crate::geometry::normalized_entropy;
use crate::types::{DetectorFrame, ExpressionSummary, FeatureLevel};
use tracing::{debug, warn};

/// Label reported by classifiers that could not decide
const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ExpressionVariabilityMeter {
    config: ExpressionConfig,
    counts: BTreeMap<String, u32>,
    samples: u32,
    frames_seen: u64,
    classifier_enabled: bool,
}

impl Default for ExpressionVariabilityMeter {
    fn default() -> Self {
        Self::new(ExpressionConfig::default())
    }
}

impl ExpressionVariabilityMeter {
    pub fn new(config: ExpressionConfig) -> Self {
        Self {
            config,
            counts: BTreeMap::new(),
            samples: 0,
            frames_seen: 0,
            classifier_enabled: true,
        }
    }

    /// Whether the next call to [`update`](Self::update) will invoke the classifier
    pub fn wants_sample(&self, ctx: &FrameContext, face_detected: bool) -> bool {
        self.classifier_enabled
            && face_detected
            && !ctx.in_warmup(self.config.warmup_sec)
            && self.frames_seen % self.config.sample_every == 0
    }

    /// Account for one frame; `classify` runs only on sampled frames
    pub fn update<F>(&mut self, ctx: &FrameContext, face_detected: bool, classify: F) -> DetectorFrame
    where
        F: FnOnce() -> Result<String, ClassifyError>,
    {
        let sample = self.wants_sample(ctx, face_detected);
        self.step(ctx, face_detected, sample, classify)
    }

    /// Account for one recorded frame
    ///
    /// A recording already reflects the classifier's cadence, so every label on a frame
    /// with a face past warm-up is taken as a sample.
    pub fn update_recorded(
        &mut self,
        ctx: &FrameContext,
        face_detected: bool,
        label: Option<String>,
    ) -> DetectorFrame {
        let sample = face_detected && label.is_some() && !ctx.in_warmup(self.config.warmup_sec);
        self.step(ctx, face_detected, sample, move || label.ok_or(ClassifyError::Unlabeled))
    }

    fn step<F>(
        &mut self,
        ctx: &FrameContext,
        face_detected: bool,
        sample: bool,
        classify: F,
    ) -> DetectorFrame
    where
        F: FnOnce() -> Result<String, ClassifyError>,
    {
        let warmup = ctx.in_warmup(self.config.warmup_sec);
        self.frames_seen += 1;

        if !face_detected {
            return DetectorFrame::missing(warmup);
        }
        if !sample {
            return DetectorFrame::detected(warmup, false);
        }

        let sampled = match classify() {
            Ok(label) => self.record(&label),
            Err(err) if err.is_fatal() => {
                warn!(error = %err, "emotion classifier disabled for this session");
                self.classifier_enabled = false;
                false
            }
            Err(err) => {
                debug!(error = %err, at = ctx.timestamp, "emotion sample skipped");
                false
            }
        };

        DetectorFrame::detected(warmup, sampled)
    }

    fn record(&mut self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        if label.is_empty() || label == UNKNOWN_LABEL {
            return false;
        }
        *self.counts.entry(label).or_insert(0) += 1;
        self.samples += 1;
        true
    }

    pub fn classifier_enabled(&self) -> bool {
        self.classifier_enabled
    }

    pub fn summary(&self) -> ExpressionSummary {
        let detection_rate = if self.frames_seen == 0 {
            0.0
        } else {
            f64::from(self.samples) / self.frames_seen as f64
        };

        if self.samples < self.config.min_samples {
            return ExpressionSummary {
                variability: 0.0,
                level: FeatureLevel::InsufficientData,
                interpretation: "Too few classified expressions to assess variability".to_string(),
                detection_rate,
                classifier_available: self.classifier_enabled,
            };
        }

        let variability = normalized_entropy(self.counts.values().copied());
        let (level, interpretation) = if variability < self.config.low_variability {
            (
                FeatureLevel::Low,
                "Restricted range of facial expressions",
            )
        } else if variability < self.config.moderate_variability {
            (FeatureLevel::Moderate, "Moderate range of facial expressions")
        } else {
            (FeatureLevel::High, "Varied facial expressions")
        };

        ExpressionSummary {
            variability,
            level,
            interpretation: interpretation.to_string(),
            detection_rate,
            classifier_available: self.classifier_enabled,
        }
    }

    pub fn reset(&mut self) {
        self.counts.clear();
        self.samples = 0;
        self.frames_seen = 0;
        self.classifier_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(i: u64) -> FrameContext {
        let t = 3.0 + i as f64 * 0.1;
        FrameContext::new(t, t)
    }

    #[test]
    fn test_samples_every_tenth_frame() {
        let mut meter = ExpressionVariabilityMeter::default();
        let mut calls = 0;
        for i in 0..100 {
            meter.update(&ctx(i), true, || {
                calls += 1;
                Ok("neutral".to_string())
            });
        }
        assert_eq!(calls, 10);
    }

    #[test]
    fn test_single_label_is_low_variability() {
        let mut meter = ExpressionVariabilityMeter::default();
        for i in 0..300 {
            meter.update(&ctx(i), true, || Ok("Neutral ".to_string()));
        }
        let summary = meter.summary();
        assert_eq!(summary.variability, 0.0);
        assert_eq!(summary.level, FeatureLevel::Low);
        assert!((summary.detection_rate - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_even_labels_are_high_variability() {
        let labels = ["happy", "sad", "neutral", "surprise"];
        let mut meter = ExpressionVariabilityMeter::default();
        for i in 0..400 {
            let label = labels[(i / 10 % 4) as usize];
            meter.update(&ctx(i), true, || Ok(label.to_string()));
        }
        let summary = meter.summary();
        assert!((summary.variability - 1.0).abs() < 1e-9);
        assert_eq!(summary.level, FeatureLevel::High);
    }

    #[test]
    fn test_timeouts_degrade_to_insufficient_data() {
        let mut meter = ExpressionVariabilityMeter::default();
        for i in 0..500 {
            meter.update(&ctx(i), true, || Err(ClassifyError::Timeout));
        }
        let summary = meter.summary();
        assert_eq!(summary.level, FeatureLevel::InsufficientData);
        assert!(summary.classifier_available);
    }

    #[test]
    fn test_connection_refused_disables_classifier() {
        let mut meter = ExpressionVariabilityMeter::default();
        let mut calls = 0;
        for i in 0..100 {
            meter.update(&ctx(i), true, || {
                calls += 1;
                Err(ClassifyError::ConnectionRefused("down".to_string()))
            });
        }
        assert_eq!(calls, 1);
        assert!(!meter.classifier_enabled());
        assert!(!meter.summary().classifier_available);
    }

    #[test]
    fn test_unknown_and_empty_labels_skipped() {
        let mut meter = ExpressionVariabilityMeter::default();
        let mut active = 0;
        for i in 0..20 {
            let label = if i < 10 { "Unknown" } else { "  " };
            if meter.update(&ctx(i), true, || Ok(label.to_string())).active {
                active += 1;
            }
        }
        assert_eq!(active, 0);
        assert_eq!(meter.samples, 0);
    }

    #[test]
    fn test_no_sampling_without_face_or_during_warmup() {
        let mut meter = ExpressionVariabilityMeter::default();
        let warm = FrameContext::new(0.5, 0.5);
        meter.update(&warm, true, || panic!("classified during warm-up"));
        for i in 1..50 {
            meter.update(&ctx(i), false, || panic!("classified without a face"));
        }
    }

    #[test]
    fn test_recorded_labels_used_on_any_phase() {
        let labels = ["happy", "sad", "neutral", "surprise"];
        let mut meter = ExpressionVariabilityMeter::default();
        for i in 0..400u64 {
            let label = (i % 10 == 1).then(|| labels[(i / 10 % 4) as usize].to_string());
            meter.update_recorded(&ctx(i), true, label);
        }
        let summary = meter.summary();
        assert_eq!(meter.samples, 40);
        assert_eq!(summary.level, FeatureLevel::High);
        assert!((summary.detection_rate - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_recorded_labels_ignored_during_warmup() {
        let mut meter = ExpressionVariabilityMeter::default();
        let warm = FrameContext::new(0.5, 0.5);
        assert!(!meter.update_recorded(&warm, true, Some("happy".to_string())).active);
        assert!(!meter.update_recorded(&ctx(1), false, Some("happy".to_string())).active);
        assert_eq!(meter.samples, 0);
    }
}
