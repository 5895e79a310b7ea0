//! Session orchestration
//!
//! One [`SessionOrchestrator`] owns one instance of every detector for a single session.
//! Each frame is decoded once, landmarks are extracted once into a [`PoseSample`], and the
//! sample is dispatched to all seven detectors in a fixed order. A detector that fails on
//! a frame is recorded as a [`DetectorFault`]; the remaining detectors still run.
//!
//! # Example
//! ```ignore
//! let mut session = SessionOrchestrator::with_collaborators(config, collaborators);
//! for (bytes, t) in frames {
//!     session.process_frame(&bytes, t)?;
//! }
//! let summary = session.end_session(duration);
//! ```

use std::time::Duration;

use crate::clock::{FrameContext, SessionClock};
use crate::config::ScreeningConfig;
use crate::detectors::{
    BlinkDetector, ExpressionVariabilityMeter, EyeContactDetector, GestureDetector,
    HandRepetitionDetector, HeadMovementMeter, HeadRepetitionDetector,
};
use crate::emotion::{ClassifyError, DeadlineClassifier, EmotionClassifier};
use crate::error::ScreenError;
use crate::interpretation::interpret;
use crate::landmarks::{LandmarkProvider, NullProvider, PoseSample};
use crate::replay::RecordedFrame;
use crate::types::{
    DataQuality, DetectorFault, DetectorFrame, FeatureSet, FrameDiagnostics, SessionSummary,
};
use tracing::{info, warn};

/// External landmark and emotion collaborators for the image path
pub struct Collaborators {
    pub face_mesh: Box<dyn LandmarkProvider>,
    pub hands: Box<dyn LandmarkProvider>,
    pub pose: Box<dyn LandmarkProvider>,
    pub emotion: Option<Box<dyn EmotionClassifier>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            face_mesh: Box::new(NullProvider),
            hands: Box::new(NullProvider),
            pose: Box::new(NullProvider),
            emotion: None,
        }
    }
}

impl Collaborators {
    /// Attach an emotion classifier, bounding every call by `timeout`
    pub fn with_bounded_emotion<C>(mut self, classifier: C, timeout: Duration) -> Self
    where
        C: EmotionClassifier + 'static,
    {
        self.emotion = Some(Box::new(DeadlineClassifier::new(classifier, timeout)));
        self
    }

    /// Attach an emotion classifier bounded by the configured `classifier_timeout_ms`
    pub fn with_emotion<C>(self, classifier: C, config: &ScreeningConfig) -> Self
    where
        C: EmotionClassifier + 'static,
    {
        self.with_bounded_emotion(classifier, config.expression.classifier_timeout())
    }
}

/// The seven detectors plus per-modality frame counters
struct DetectorBank {
    blink: BlinkDetector,
    eye_contact: EyeContactDetector,
    head_movement: HeadMovementMeter,
    head_repetition: HeadRepetitionDetector,
    hand_repetition: HandRepetitionDetector,
    gesture: GestureDetector,
    expression: ExpressionVariabilityMeter,
    frames: u64,
    face_frames: u64,
    hand_frames: u64,
    pose_frames: u64,
    faults: u64,
}

impl DetectorBank {
    fn new(config: &ScreeningConfig) -> Self {
        Self {
            blink: BlinkDetector::new(config.blink.clone()),
            eye_contact: EyeContactDetector::new(config.eye_contact.clone()),
            head_movement: HeadMovementMeter::new(config.head_movement.clone()),
            head_repetition: HeadRepetitionDetector::new(config.head_repetition.clone()),
            hand_repetition: HandRepetitionDetector::new(config.hand_repetition.clone()),
            gesture: GestureDetector::new(config.gesture.clone()),
            expression: ExpressionVariabilityMeter::new(config.expression.clone()),
            frames: 0,
            face_frames: 0,
            hand_frames: 0,
            pose_frames: 0,
            faults: 0,
        }
    }

    /// Run every detector on one frame; `expression` feeds the expression meter
    fn dispatch<E>(
        &mut self,
        ctx: FrameContext,
        sample: &PoseSample,
        expression: E,
    ) -> FrameDiagnostics
    where
        E: FnOnce(&mut ExpressionVariabilityMeter, &FrameContext, bool) -> DetectorFrame,
    {
        self.frames += 1;
        self.face_frames += u64::from(sample.face.is_some());
        self.hand_frames += u64::from(sample.hand.is_some());
        self.pose_frames += u64::from(sample.pose.is_some());

        let face = sample.face.as_ref();
        let mut faults = Vec::new();

        let blink = isolate("blink", self.blink.update(&ctx, face), &mut faults);
        let eye_contact = isolate("eye_contact", self.eye_contact.update(&ctx, face), &mut faults);
        let head_movement = isolate(
            "head_movement",
            self.head_movement.update(&ctx, face),
            &mut faults,
        );
        let head_repetition = isolate(
            "head_repetition",
            self.head_repetition.update(&ctx, face),
            &mut faults,
        );
        let hand_repetition = isolate(
            "hand_repetition",
            self.hand_repetition.update(&ctx, sample.pose.as_ref()),
            &mut faults,
        );
        let gesture = isolate(
            "gesture",
            self.gesture.update(&ctx, sample.hand.as_ref()),
            &mut faults,
        );
        let expression = expression(&mut self.expression, &ctx, face.is_some());

        self.faults += faults.len() as u64;

        FrameDiagnostics {
            frame_number: self.frames,
            timestamp: ctx.timestamp,
            elapsed: ctx.elapsed,
            blink,
            eye_contact,
            head_movement,
            head_repetition,
            hand_repetition,
            gesture,
            expression,
            faults,
        }
    }

    fn features(&self, duration_seconds: f64) -> FeatureSet {
        FeatureSet {
            eye_contact: self.eye_contact.summary(duration_seconds),
            blink: self.blink.summary(duration_seconds),
            head_movement: self.head_movement.summary(),
            head_repetition: self.head_repetition.summary(),
            hand_repetition: self.hand_repetition.summary(),
            gestures: self.gesture.summary(duration_seconds),
            expression: self.expression.summary(),
        }
    }

    fn ratio(&self, count: u64) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            count as f64 / self.frames as f64
        }
    }
}

fn isolate(
    detector: &'static str,
    result: Result<DetectorFrame, ScreenError>,
    faults: &mut Vec<DetectorFault>,
) -> DetectorFrame {
    match result {
        Ok(frame) => frame,
        Err(err) => {
            warn!(detector, error = %err, "detector failed on frame");
            faults.push(DetectorFault {
                detector: detector.to_string(),
                message: err.to_string(),
            });
            DetectorFrame::default()
        }
    }
}

/// Per-session owner of all detectors
pub struct SessionOrchestrator {
    config: ScreeningConfig,
    collaborators: Collaborators,
    clock: SessionClock,
    bank: DetectorBank,
    frames_skipped: u64,
}

impl SessionOrchestrator {
    /// Orchestrator without landmark or emotion collaborators (replay use)
    pub fn new(config: ScreeningConfig) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: ScreeningConfig, collaborators: Collaborators) -> Self {
        let bank = DetectorBank::new(&config);
        Self {
            config,
            collaborators,
            clock: SessionClock::new(),
            bank,
            frames_skipped: 0,
        }
    }

    /// Decode one encoded image and feed it to every detector
    ///
    /// A frame that fails to decode is skipped and counted; session state is untouched.
    pub fn process_frame(
        &mut self,
        encoded: &[u8],
        timestamp: f64,
    ) -> Result<FrameDiagnostics, ScreenError> {
        self.clock.check(timestamp)?;

        let image = match image::load_from_memory(encoded) {
            Ok(image) => image,
            Err(err) => {
                self.frames_skipped += 1;
                warn!(timestamp, error = %err, "skipping undecodable frame");
                return Err(ScreenError::FrameDecode(err.to_string()));
            }
        };

        let ctx = self.clock.observe(timestamp)?;
        let sample = PoseSample::new(
            self.collaborators.face_mesh.detect(&image),
            self.collaborators.hands.detect(&image),
            self.collaborators.pose.detect(&image),
        );

        let emotion = &self.collaborators.emotion;
        Ok(self.bank.dispatch(ctx, &sample, |meter, ctx, face_detected| {
            meter.update(ctx, face_detected, || match emotion {
                Some(classifier) => classifier.classify(&image),
                None => Err(ClassifyError::ConnectionRefused(
                    "no emotion classifier configured".to_string(),
                )),
            })
        }))
    }

    /// Feed one frame of pre-extracted landmarks (and optional recorded emotion label)
    ///
    /// Frames tagged with a foreign schema are rejected before touching session state.
    pub fn process_observation(
        &mut self,
        frame: RecordedFrame,
    ) -> Result<FrameDiagnostics, ScreenError> {
        frame.check_schema()?;
        let timestamp = frame.timestamp.ok_or(ScreenError::MissingTimestamp)?;
        let ctx = self.clock.observe(timestamp)?;
        let sample = PoseSample::new(frame.face, frame.hand, frame.pose);
        let label = frame.emotion;

        Ok(self.bank.dispatch(ctx, &sample, move |meter, ctx, face_detected| {
            meter.update_recorded(ctx, face_detected, label)
        }))
    }

    /// Summarize the session; does not modify state and may be called repeatedly
    pub fn end_session(&self, duration_seconds: f64) -> SessionSummary {
        let duration = duration_seconds.max(0.0);
        let features = self.bank.features(duration);
        let interpretation = interpret(&features, &self.config.interpretation);

        let data_quality = DataQuality {
            face_detection_ratio: self.bank.ratio(self.bank.face_frames),
            hand_detection_ratio: self.bank.ratio(self.bank.hand_frames),
            pose_detection_ratio: self.bank.ratio(self.bank.pose_frames),
            frames_skipped: self.frames_skipped,
            detector_faults: self.bank.faults,
        };

        info!(
            duration,
            frames = self.bank.frames,
            concerns = interpretation.concerns.len(),
            risk = interpretation.risk_level.as_str(),
            "session summarized"
        );

        SessionSummary {
            session_duration_seconds: duration,
            total_frames: self.bank.frames,
            features,
            data_quality,
            interpretation,
        }
    }

    /// Span between the first and last processed frame
    pub fn observed_duration(&self) -> f64 {
        self.clock.observed_duration()
    }

    pub fn session_start_time(&self) -> Option<f64> {
        self.clock.session_start_time()
    }

    pub fn frame_count(&self) -> u64 {
        self.bank.frames
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Clear all detector state for reuse; collaborators are kept
    pub fn reset(&mut self) {
        self.clock.reset();
        self.bank = DetectorBank::new(&self.config);
        self.frames_skipped = 0;
    }
}
