//! Screening configuration
//!
//! Every threshold here is an empirically tuned clinical constant. They are kept as named
//! defaults so they can be re-validated and overridden without touching detector logic.

use std::time::Duration;

use crate::error::ScreenError;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Warm-up applied by most detectors (camera autofocus / auto-exposure settling)
pub const DEFAULT_WARMUP_SEC: f64 = 2.0;

/// Head movement magnitude uses a longer warm-up
pub const HEAD_MOVEMENT_WARMUP_SEC: f64 = 10.0;

/// Blink detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub warmup_sec: f64,
    /// Eye aspect ratio below which the eye counts as closing
    pub closed_ratio: f64,
    /// Eye aspect ratio above which the eye counts as open again
    pub open_ratio: f64,
    pub min_blink_duration_sec: f64,
    pub max_blink_duration_sec: f64,
    pub max_blinks_per_minute: f64,
    pub low_rate: f64,
    pub high_rate: f64,
    /// Minimum share of frames with a detected face before a rate is reported
    pub min_face_ratio: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            warmup_sec: DEFAULT_WARMUP_SEC,
            closed_ratio: 0.18,
            open_ratio: 0.22,
            min_blink_duration_sec: 0.08,
            max_blink_duration_sec: 0.40,
            max_blinks_per_minute: 60.0,
            low_rate: 8.0,
            high_rate: 30.0,
            min_face_ratio: 0.5,
        }
    }
}

/// Eye contact classification and dwell thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeContactConfig {
    pub warmup_sec: f64,
    pub eye_open_ratio: f64,
    /// Max nose offset from the inter-eye midpoint, in eye separations
    pub head_center_tolerance: f64,
    /// Max iris offset from the eye-corner midpoint, as a fraction of eye width
    pub gaze_center_tolerance: f64,
    pub min_contact_duration_sec: f64,
    pub low_ratio: f64,
    pub high_ratio: f64,
}

impl Default for EyeContactConfig {
    fn default() -> Self {
        Self {
            warmup_sec: DEFAULT_WARMUP_SEC,
            eye_open_ratio: 0.20,
            head_center_tolerance: 0.25,
            gaze_center_tolerance: 0.18,
            min_contact_duration_sec: 0.5,
            low_ratio: 0.30,
            high_ratio: 0.60,
        }
    }
}

/// Head movement magnitude thresholds (normalized coordinates per frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadMovementConfig {
    pub warmup_sec: f64,
    pub min_samples: u32,
    pub low_movement: f64,
    pub high_movement: f64,
}

impl Default for HeadMovementConfig {
    fn default() -> Self {
        Self {
            warmup_sec: HEAD_MOVEMENT_WARMUP_SEC,
            min_samples: 10,
            low_movement: 0.002,
            high_movement: 0.008,
        }
    }
}

/// How qualifying oscillation windows are turned into a sticky "present" flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConfirmationRule {
    /// Counter rises on a qualifying window and falls (floored at zero) otherwise
    ConsecutiveWindows { required: u32 },
    /// Seconds of qualifying windows accumulated across the session
    AccumulatedTime { min_seconds: f64 },
}

/// Windowed oscillation thresholds shared by head and hand repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepetitionConfig {
    pub warmup_sec: f64,
    pub window_sec: f64,
    /// Time between successive window verdicts
    pub hop_sec: f64,
    /// Share of the window that must be covered by samples before a verdict
    pub min_window_coverage: f64,
    pub min_samples: usize,
    /// Sample cap per window (window_sec times the highest frame rate expected)
    pub max_samples: usize,
    pub min_amplitude: f64,
    pub max_amplitude: f64,
    pub min_step: f64,
    pub min_oscillations: u32,
    pub max_drift_ratio: f64,
    pub confirmation: ConfirmationRule,
}

impl RepetitionConfig {
    /// Head reference point defaults (small, rhythmic movements)
    pub fn head() -> Self {
        Self {
            warmup_sec: DEFAULT_WARMUP_SEC,
            window_sec: 2.0,
            hop_sec: 1.0,
            min_window_coverage: 0.9,
            min_samples: 8,
            max_samples: 240,
            min_amplitude: 0.005,
            max_amplitude: 0.12,
            min_step: 0.002,
            min_oscillations: 4,
            max_drift_ratio: 0.75,
            confirmation: ConfirmationRule::ConsecutiveWindows { required: 3 },
        }
    }

    /// Wrist defaults (larger travel, flapping)
    pub fn hand() -> Self {
        Self {
            min_amplitude: 0.008,
            max_amplitude: 0.8,
            min_step: 0.003,
            confirmation: ConfirmationRule::AccumulatedTime { min_seconds: 3.0 },
            ..Self::head()
        }
    }
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self::head()
    }
}

/// Social gesture state machine thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub warmup_sec: f64,
    /// Per-frame palm movement that starts or continues a candidate
    pub move_threshold: f64,
    /// Per-frame palm movement treated as a tracking glitch
    pub glitch_limit: f64,
    pub persistence_sec: f64,
    pub cooldown_sec: f64,
    pub max_per_minute: f64,
    pub low_per_minute: f64,
    pub high_per_minute: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            warmup_sec: DEFAULT_WARMUP_SEC,
            move_threshold: 0.012,
            glitch_limit: 0.25,
            persistence_sec: 0.3,
            cooldown_sec: 1.5,
            max_per_minute: 30.0,
            low_per_minute: 1.0,
            high_per_minute: 10.0,
        }
    }
}

/// Expression variability sampling and diversity thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    pub warmup_sec: f64,
    /// Classify every n-th processed frame
    pub sample_every: u64,
    pub min_samples: u32,
    pub low_variability: f64,
    pub moderate_variability: f64,
    /// Upper bound for a single classifier call
    pub classifier_timeout_ms: u64,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            warmup_sec: DEFAULT_WARMUP_SEC,
            sample_every: 10,
            min_samples: 20,
            low_variability: 0.50,
            moderate_variability: 0.75,
            classifier_timeout_ms: 5_000,
        }
    }
}

impl ExpressionConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }
}

/// Risk label cutoffs applied to `|concerns| / total_possible_concerns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretationConfig {
    pub moderate_risk: f64,
    pub high_risk: f64,
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            moderate_risk: 0.3,
            high_risk: 0.5,
        }
    }
}

/// Full engine configuration, one section per detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub blink: BlinkConfig,
    pub eye_contact: EyeContactConfig,
    pub head_movement: HeadMovementConfig,
    pub head_repetition: RepetitionConfig,
    /// Missing fields of a partial section come from [`RepetitionConfig::hand`]
    #[serde(deserialize_with = "hand_repetition_overrides")]
    pub hand_repetition: RepetitionConfig,
    pub gesture: GestureConfig,
    pub expression: ExpressionConfig,
    pub interpretation: InterpretationConfig,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            blink: BlinkConfig::default(),
            eye_contact: EyeContactConfig::default(),
            head_movement: HeadMovementConfig::default(),
            head_repetition: RepetitionConfig::head(),
            hand_repetition: RepetitionConfig::hand(),
            gesture: GestureConfig::default(),
            expression: ExpressionConfig::default(),
            interpretation: InterpretationConfig::default(),
        }
    }
}

impl ScreeningConfig {
    /// Load a (possibly partial) configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, ScreenError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ScreenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations whose thresholds contradict each other
    pub fn validate(&self) -> Result<(), ScreenError> {
        let b = &self.blink;
        ensure(b.closed_ratio < b.open_ratio, "blink.closed_ratio must be below blink.open_ratio")?;
        ensure(
            b.min_blink_duration_sec < b.max_blink_duration_sec,
            "blink duration bounds are inverted",
        )?;
        ensure(b.low_rate < b.high_rate, "blink rate cutoffs are inverted")?;

        let e = &self.eye_contact;
        ensure(e.low_ratio < e.high_ratio, "eye_contact ratio cutoffs are inverted")?;
        ensure(e.min_contact_duration_sec >= 0.0, "eye_contact.min_contact_duration_sec is negative")?;

        let h = &self.head_movement;
        ensure(h.low_movement < h.high_movement, "head_movement cutoffs are inverted")?;

        for (name, r) in [("head_repetition", &self.head_repetition), ("hand_repetition", &self.hand_repetition)] {
            ensure(r.window_sec > 0.0 && r.hop_sec > 0.0, &format!("{name} window and hop must be positive"))?;
            ensure(r.min_amplitude < r.max_amplitude, &format!("{name} amplitude bounds are inverted"))?;
            ensure(r.max_samples >= r.min_samples, &format!("{name}.max_samples is below min_samples"))?;
        }

        let g = &self.gesture;
        ensure(g.move_threshold < g.glitch_limit, "gesture.move_threshold must be below glitch_limit")?;
        ensure(g.low_per_minute < g.high_per_minute, "gesture cutoffs are inverted")?;

        let x = &self.expression;
        ensure(x.sample_every > 0, "expression.sample_every must be positive")?;
        ensure(
            x.low_variability < x.moderate_variability,
            "expression variability cutoffs are inverted",
        )?;

        let i = &self.interpretation;
        ensure(i.moderate_risk < i.high_risk, "interpretation risk cutoffs are inverted")?;
        Ok(())
    }
}

/// Merge a (possibly partial) hand section over the hand defaults
fn hand_repetition_overrides<'de, D>(deserializer: D) -> Result<RepetitionConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = serde_json::Value::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(RepetitionConfig::hand()).map_err(de::Error::custom)?;

    match (merged.as_object_mut(), overrides) {
        (Some(base), serde_json::Value::Object(fields)) => base.extend(fields),
        (_, other) => {
            return Err(de::Error::custom(format!(
                "hand_repetition must be an object, got {other}"
            )))
        }
    }

    serde_json::from_value(merged).map_err(de::Error::custom)
}

fn ensure(condition: bool, message: &str) -> Result<(), ScreenError> {
    if condition {
        Ok(())
    } else {
        Err(ScreenError::InvalidConfig(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScreeningConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config = ScreeningConfig::from_json(r#"{ "gesture": { "cooldown_sec": 3.0 } }"#).unwrap();
        assert_eq!(config.gesture.cooldown_sec, 3.0);
        assert_eq!(config.gesture.persistence_sec, 0.3);
        assert_eq!(config.blink, BlinkConfig::default());
    }

    #[test]
    fn test_confirmation_rule_json() {
        let json = r#"{ "hand_repetition": { "confirmation": { "mode": "consecutive_windows", "required": 5 } } }"#;
        let config = ScreeningConfig::from_json(json).unwrap();
        assert_eq!(
            config.hand_repetition.confirmation,
            ConfirmationRule::ConsecutiveWindows { required: 5 }
        );
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let result = ScreeningConfig::from_json(r#"{ "blink": { "closed_ratio": 0.3 } }"#);
        assert!(matches!(result, Err(ScreenError::InvalidConfig(_))));
    }

    #[test]
    fn test_hand_and_head_defaults_differ() {
        let config = ScreeningConfig::default();
        assert!(config.hand_repetition.max_amplitude > config.head_repetition.max_amplitude);
        assert!(matches!(
            config.hand_repetition.confirmation,
            ConfirmationRule::AccumulatedTime { .. }
        ));
    }

    #[test]
    fn test_partial_hand_override_keeps_hand_defaults() {
        let config =
            ScreeningConfig::from_json(r#"{ "hand_repetition": { "min_step": 0.004 } }"#).unwrap();
        assert_eq!(
            config.hand_repetition,
            RepetitionConfig {
                min_step: 0.004,
                ..RepetitionConfig::hand()
            }
        );
        assert_eq!(config.head_repetition, RepetitionConfig::head());
    }

    #[test]
    fn test_hand_section_must_be_object() {
        let result = ScreeningConfig::from_json(r#"{ "hand_repetition": 3 }"#);
        assert!(matches!(result, Err(ScreenError::JsonError(_))));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = ScreeningConfig::default();
        let parsed = ScreeningConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
