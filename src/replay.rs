//! screen.recorded_frame.v1 replay
//!
//! Pre-extracted landmark frames (one JSON object per frame) that can be fed through a
//! session without images or live collaborators. Used for offline batch screening and for
//! reproducing sessions in tests.

use crate::clock::SessionClock;
use crate::config::ScreeningConfig;
use crate::error::ScreenError;
use crate::orchestrator::SessionOrchestrator;
use crate::types::{LandmarkSet, SessionSummary};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Current schema version
pub const SCHEMA_VERSION: &str = "screen.recorded_frame.v1";

/// One recorded frame of landmark observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Optional schema tag; when present it must equal [`SCHEMA_VERSION`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Frame timestamp in seconds (required for processing)
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<LandmarkSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<LandmarkSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<LandmarkSet>,
    /// Emotion label recorded for this frame, used when the frame is sampled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

impl RecordedFrame {
    pub fn at(timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// Reject frames tagged with a schema other than [`SCHEMA_VERSION`]; untagged frames pass
    pub fn check_schema(&self) -> Result<(), ScreenError> {
        match self.schema.as_deref() {
            Some(schema) if schema != SCHEMA_VERSION => {
                Err(ScreenError::UnsupportedSchema(schema.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// A problem found in a recording
#[derive(Debug, Clone, PartialEq)]
pub struct FrameIssue {
    /// Zero-based frame index
    pub index: usize,
    pub message: String,
}

/// Parsing, validation and replay of recorded frames
pub struct FrameReplay;

impl FrameReplay {
    /// Parse a JSON array of frames
    pub fn parse_array(json: &str) -> Result<Vec<RecordedFrame>, ScreenError> {
        let frames: Vec<RecordedFrame> = serde_json::from_str(json)?;
        Ok(frames)
    }

    /// Parse NDJSON (one frame per line, blank lines ignored)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RecordedFrame>, ScreenError> {
        let mut frames = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordedFrame>(trimmed) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    return Err(ScreenError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(frames)
    }

    /// Parse either a JSON array or NDJSON, decided by the first non-blank character
    pub fn parse(input: &str) -> Result<Vec<RecordedFrame>, ScreenError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Check schema tags and timestamp presence and ordering
    pub fn validate_frames(frames: &[RecordedFrame]) -> Vec<FrameIssue> {
        let mut clock = SessionClock::new();
        let mut issues = Vec::new();

        for (index, frame) in frames.iter().enumerate() {
            if let Err(err) = frame.check_schema() {
                issues.push(FrameIssue {
                    index,
                    message: err.to_string(),
                });
            }
            let result = frame
                .timestamp
                .ok_or(ScreenError::MissingTimestamp)
                .and_then(|t| clock.observe(t));
            if let Err(err) = result {
                issues.push(FrameIssue {
                    index,
                    message: err.to_string(),
                });
            }
        }

        issues
    }

    /// Replay frames through a fresh session and summarize it
    ///
    /// `duration` defaults to the span between the first and last frame. Fails on the
    /// first frame without a usable timestamp.
    pub fn summarize(
        frames: Vec<RecordedFrame>,
        config: ScreeningConfig,
        duration: Option<f64>,
    ) -> Result<SessionSummary, ScreenError> {
        let mut session = SessionOrchestrator::new(config);
        for (index, frame) in frames.into_iter().enumerate() {
            if let Err(err) = session.process_observation(frame) {
                warn!(frame = index, error = %err, "replay aborted");
                return Err(err);
            }
        }
        let duration = duration.unwrap_or_else(|| session.observed_duration());
        Ok(session.end_session(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureLevel, Point2};

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"schema":"screen.recorded_frame.v1","timestamp":0.0}

{"timestamp":0.1,"hand":[[0.5,0.5]],"emotion":"happy"}
"#;
        let frames = FrameReplay::parse_ndjson(ndjson).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].emotion.as_deref(), Some("happy"));
        assert_eq!(
            frames[1].hand.as_ref().unwrap().point(0).unwrap(),
            Point2::new(0.5, 0.5)
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let ndjson = "{\"timestamp\":0.0}\n{not json}\n";
        match FrameReplay::parse_ndjson(ndjson) {
            Err(ScreenError::ParseError(message)) => assert!(message.contains("line 2")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_detects_array() {
        let frames = FrameReplay::parse(" [{\"timestamp\":1.0},{\"timestamp\":2.0}]").unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_validate_frames() {
        let frames = vec![
            RecordedFrame::at(1.0),
            RecordedFrame::default(),
            RecordedFrame::at(0.5),
            RecordedFrame {
                schema: Some("other.v2".to_string()),
                ..RecordedFrame::at(2.0)
            },
        ];
        let issues = FrameReplay::validate_frames(&frames);
        let indices: Vec<usize> = issues.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_summarize_uses_observed_duration() {
        let frames: Vec<RecordedFrame> = (0..=100).map(|i| RecordedFrame::at(i as f64 * 0.1)).collect();
        let summary = FrameReplay::summarize(frames, ScreeningConfig::default(), None).unwrap();
        assert!((summary.session_duration_seconds - 10.0).abs() < 1e-9);
        assert_eq!(summary.total_frames, 101);
        assert_eq!(summary.features.blink.level, FeatureLevel::InsufficientData);
    }

    #[test]
    fn test_check_schema() {
        assert!(RecordedFrame::at(0.0).check_schema().is_ok());
        let tagged = RecordedFrame {
            schema: Some(SCHEMA_VERSION.to_string()),
            ..RecordedFrame::at(0.0)
        };
        assert!(tagged.check_schema().is_ok());
        let foreign = RecordedFrame {
            schema: Some("other.v2".to_string()),
            ..RecordedFrame::at(0.0)
        };
        assert!(matches!(
            foreign.check_schema(),
            Err(ScreenError::UnsupportedSchema(s)) if s == "other.v2"
        ));
    }

    #[test]
    fn test_summarize_rejects_missing_timestamp() {
        let frames = vec![RecordedFrame::at(0.0), RecordedFrame::default()];
        assert!(matches!(
            FrameReplay::summarize(frames, ScreeningConfig::default(), Some(5.0)),
            Err(ScreenError::MissingTimestamp)
        ));
    }
}
