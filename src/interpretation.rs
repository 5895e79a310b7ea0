//! Clinical interpretation
//!
//! Deterministic rule evaluation over the seven feature summaries. The same features
//! always produce the same concern list, risk score and risk label.

use crate::config::InterpretationConfig;
use crate::types::{ClinicalInterpretation, FeatureLevel, FeatureSet, RiskLevel};

/// Number of concern rules
pub const TOTAL_POSSIBLE_CONCERNS: usize = 7;

pub const CONCERN_EYE_CONTACT: &str = "Reduced eye contact";
pub const CONCERN_HEAD_REPETITION: &str = "Repetitive head movements detected";
pub const CONCERN_HAND_REPETITION: &str = "Repetitive hand movements (stimming) detected";
pub const CONCERN_GESTURES: &str = "Limited social gesturing";
pub const CONCERN_EXPRESSION: &str = "Restricted facial expressions";
pub const CONCERN_BLINK: &str = "Atypical blink rate";
pub const CONCERN_HEAD_MOVEMENT: &str = "Elevated head movement";

/// Derive concerns and a risk label from a feature set
pub fn interpret(features: &FeatureSet, config: &InterpretationConfig) -> ClinicalInterpretation {
    let rules = [
        (features.eye_contact.level == FeatureLevel::Low, CONCERN_EYE_CONTACT),
        (features.head_repetition.present, CONCERN_HEAD_REPETITION),
        (features.hand_repetition.present, CONCERN_HAND_REPETITION),
        (features.gestures.level == FeatureLevel::Low, CONCERN_GESTURES),
        (features.expression.level == FeatureLevel::Low, CONCERN_EXPRESSION),
        (
            matches!(features.blink.level, FeatureLevel::Low | FeatureLevel::High),
            CONCERN_BLINK,
        ),
        (features.head_movement.level == FeatureLevel::High, CONCERN_HEAD_MOVEMENT),
    ];

    let concerns: Vec<String> = rules
        .iter()
        .filter(|(raised, _)| *raised)
        .map(|(_, concern)| concern.to_string())
        .collect();

    let risk_score = round3(concerns.len() as f64 / TOTAL_POSSIBLE_CONCERNS as f64);
    let risk_level = if risk_score >= config.high_risk {
        RiskLevel::High
    } else if risk_score >= config.moderate_risk {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    };

    let summary = if concerns.is_empty() {
        "No behavioral concerns identified in this session".to_string()
    } else {
        format!(
            "{} of {} behavioral markers raised: {}",
            concerns.len(),
            TOTAL_POSSIBLE_CONCERNS,
            concerns.join("; ")
        )
    };

    ClinicalInterpretation {
        concerns,
        risk_score,
        risk_level,
        summary,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BlinkSummary, ExpressionSummary, EyeContactSummary, GestureSummary, HeadMovementSummary,
        RepetitionSummary,
    };
    use pretty_assertions::assert_eq;

    fn features(level: FeatureLevel, stimming: bool) -> FeatureSet {
        let text = String::new;
        FeatureSet {
            eye_contact: EyeContactSummary {
                ratio: 0.1,
                level,
                interpretation: text(),
                segments: 1,
                total_contact_seconds: 1.0,
                face_detection_ratio: 1.0,
            },
            blink: BlinkSummary {
                blinks_per_minute: 4.0,
                total_blinks: 2,
                level,
                interpretation: text(),
                face_detection_ratio: 1.0,
            },
            head_movement: HeadMovementSummary {
                avg_per_frame: 0.01,
                total_movement: 1.0,
                level,
                interpretation: text(),
            },
            head_repetition: RepetitionSummary {
                present: stimming,
                interpretation: text(),
            },
            hand_repetition: RepetitionSummary {
                present: stimming,
                interpretation: text(),
            },
            gestures: GestureSummary {
                frequency_per_minute: 0.0,
                total_gestures: 0,
                level,
                interpretation: text(),
            },
            expression: ExpressionSummary {
                variability: 0.2,
                level,
                interpretation: text(),
                detection_rate: 0.1,
                classifier_available: true,
            },
        }
    }

    #[test]
    fn test_low_levels_raise_concerns() {
        let result = interpret(&features(FeatureLevel::Low, true), &InterpretationConfig::default());
        assert_eq!(
            result.concerns,
            vec![
                CONCERN_EYE_CONTACT,
                CONCERN_HEAD_REPETITION,
                CONCERN_HAND_REPETITION,
                CONCERN_GESTURES,
                CONCERN_EXPRESSION,
                CONCERN_BLINK,
            ]
        );
        assert_eq!(result.risk_score, 0.857);
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_insufficient_data_never_raises() {
        let result = interpret(
            &features(FeatureLevel::InsufficientData, false),
            &InterpretationConfig::default(),
        );
        assert!(result.concerns.is_empty());
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_cutoffs() {
        // Head movement high + blink high = 2/7
        let result = interpret(&features(FeatureLevel::High, false), &InterpretationConfig::default());
        assert_eq!(result.concerns, vec![CONCERN_BLINK, CONCERN_HEAD_MOVEMENT]);
        assert_eq!(result.risk_score, 0.286);
        assert_eq!(result.risk_level, RiskLevel::Low);

        // Stimming on both adds two more: 4/7
        let result = interpret(&features(FeatureLevel::High, true), &InterpretationConfig::default());
        assert_eq!(result.risk_score, 0.571);
        assert_eq!(result.risk_level, RiskLevel::High);

        let mut set = features(FeatureLevel::Normal, true);
        set.blink.level = FeatureLevel::Low;
        let result = interpret(&set, &InterpretationConfig::default());
        assert_eq!(result.risk_score, 0.429);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn test_interpretation_is_deterministic() {
        let set = features(FeatureLevel::Low, false);
        let config = InterpretationConfig::default();
        assert_eq!(interpret(&set, &config), interpret(&set, &config));
    }
}
