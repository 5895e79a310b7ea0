//! Feature document encoding
//!
//! Maps a [`SessionSummary`] onto the stable, flat output document consumed by storage
//! and reporting layers. Field names here are part of the external contract.

use crate::error::ScreenError;
use crate::types::{ClinicalInterpretation, DataQuality, FeatureLevel, SessionSummary};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current feature document version
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// Severity reported for hand stimming when the binary flag is set
const STIMMING_SEVERITY_PRESENT: &str = "MODERATE";
const STIMMING_SEVERITY_NONE: &str = "NORMAL";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadMovementsBlock {
    /// Head moved noticeably after warm-up
    pub present: bool,
    pub repetitive: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandStimmingBlock {
    pub present: bool,
    pub severity: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialGesturesBlock {
    pub present: bool,
    pub frequency_per_minute: f64,
    pub description: String,
}

/// Flat, stable output document for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDocument {
    pub document_version: String,
    pub producer: Producer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub computed_at_utc: String,

    pub eye_contact_ratio: f64,
    pub eye_contact_level: FeatureLevel,
    pub eye_contact_interpretation: String,

    pub blink_rate_per_minute: f64,
    pub blink_level: FeatureLevel,
    pub blink_interpretation: String,

    pub head_movement_rate: f64,
    pub head_movement_level: FeatureLevel,
    pub head_movement_interpretation: String,

    pub head_movements: HeadMovementsBlock,
    pub hand_stimming: HandStimmingBlock,
    pub social_gestures: SocialGesturesBlock,

    pub facial_expression_variability: f64,
    pub expression_level: FeatureLevel,
    pub expression_interpretation: String,

    pub session_duration: f64,
    pub total_frames: u64,
    pub data_quality: DataQuality,
    pub interpretation: ClinicalInterpretation,
}

/// Encoder for producing feature documents
pub struct FeatureEncoder {
    instance_id: String,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, summary: &SessionSummary, session_id: Option<&str>) -> FeatureDocument {
        let features = &summary.features;
        let head_moving = !matches!(
            features.head_movement.level,
            FeatureLevel::Low | FeatureLevel::InsufficientData
        );

        FeatureDocument {
            document_version: DOCUMENT_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            session_id: session_id.map(str::to_string),
            computed_at_utc: Utc::now().to_rfc3339(),

            eye_contact_ratio: features.eye_contact.ratio,
            eye_contact_level: features.eye_contact.level,
            eye_contact_interpretation: features.eye_contact.interpretation.clone(),

            blink_rate_per_minute: features.blink.blinks_per_minute,
            blink_level: features.blink.level,
            blink_interpretation: features.blink.interpretation.clone(),

            head_movement_rate: features.head_movement.avg_per_frame,
            head_movement_level: features.head_movement.level,
            head_movement_interpretation: features.head_movement.interpretation.clone(),

            head_movements: HeadMovementsBlock {
                present: head_moving,
                repetitive: features.head_repetition.present,
                description: features.head_repetition.interpretation.clone(),
            },
            hand_stimming: HandStimmingBlock {
                present: features.hand_repetition.present,
                severity: if features.hand_repetition.present {
                    STIMMING_SEVERITY_PRESENT
                } else {
                    STIMMING_SEVERITY_NONE
                }
                .to_string(),
                description: features.hand_repetition.interpretation.clone(),
            },
            social_gestures: SocialGesturesBlock {
                present: features.gestures.total_gestures > 0,
                frequency_per_minute: features.gestures.frequency_per_minute,
                description: features.gestures.interpretation.clone(),
            },

            facial_expression_variability: features.expression.variability,
            expression_level: features.expression.level,
            expression_interpretation: features.expression.interpretation.clone(),

            session_duration: summary.session_duration_seconds,
            total_frames: summary.total_frames,
            data_quality: summary.data_quality.clone(),
            interpretation: summary.interpretation.clone(),
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        summary: &SessionSummary,
        session_id: Option<&str>,
        pretty: bool,
    ) -> Result<String, ScreenError> {
        let document = self.encode(summary, session_id);
        let json = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScreeningConfig;
    use crate::orchestrator::SessionOrchestrator;

    fn empty_summary() -> SessionSummary {
        SessionOrchestrator::new(ScreeningConfig::default()).end_session(30.0)
    }

    #[test]
    fn test_encode_document() {
        let summary = empty_summary();
        let encoder = FeatureEncoder::with_instance_id("test-instance".to_string());
        let doc = encoder.encode(&summary, Some("session-1"));

        assert_eq!(doc.document_version, DOCUMENT_VERSION);
        assert_eq!(doc.producer.name, PRODUCER_NAME);
        assert_eq!(doc.producer.version, VERSION);
        assert_eq!(doc.producer.instance_id, "test-instance");
        assert_eq!(doc.session_id.as_deref(), Some("session-1"));

        assert_eq!(doc.eye_contact_level, FeatureLevel::InsufficientData);
        assert!(!doc.hand_stimming.present);
        assert_eq!(doc.hand_stimming.severity, "NORMAL");
        assert!(!doc.social_gestures.present);
        assert_eq!(doc.session_duration, 30.0);
        assert_eq!(doc.interpretation, summary.interpretation);
        assert!(chrono::DateTime::parse_from_rfc3339(&doc.computed_at_utc).is_ok());
    }

    #[test]
    fn test_encode_to_json_field_names() {
        let summary = empty_summary();
        let json = FeatureEncoder::new()
            .encode_to_json(&summary, None, false)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        for field in [
            "eye_contact_ratio",
            "eye_contact_level",
            "eye_contact_interpretation",
            "blink_rate_per_minute",
            "blink_level",
            "blink_interpretation",
            "head_movement_rate",
            "head_movement_level",
            "head_movement_interpretation",
            "head_movements",
            "hand_stimming",
            "social_gestures",
            "facial_expression_variability",
            "expression_level",
            "expression_interpretation",
            "session_duration",
            "total_frames",
            "data_quality",
            "interpretation",
        ] {
            assert!(parsed.get(field).is_some(), "missing {field}");
        }
        assert!(parsed.get("session_id").is_none());
        assert_eq!(parsed["blink_level"], "insufficient_data");
        assert!(parsed["interpretation"]["risk_level"].is_string());
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(FeatureEncoder::new().instance_id, FeatureEncoder::new().instance_id);
    }
}
