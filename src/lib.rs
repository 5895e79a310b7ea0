//! Behavior Screen - behavioral feature extraction for interaction-video screening
//!
//! Turns a timestamped stream of face, hand and pose landmark observations into seven
//! time-normalized behavioral features: eye contact ratio, blink rate, head movement,
//! repetitive head movement, repetitive hand movement, social gesture frequency and facial
//! expression variability. A deterministic interpretation layer derives a concern list and
//! a risk label at session end.
//!
//! ## Modules
//!
//! - **Orchestrator**: per-session fan-out of frames to all detectors
//! - **Detectors**: the seven per-feature state machines
//! - **Replay**: recorded landmark frames for offline screening
//! - **Registry**: id → session map for live, concurrently driven sessions

pub mod clock;
pub mod config;
pub mod detectors;
pub mod emotion;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod interpretation;
pub mod landmarks;
pub mod orchestrator;
pub mod registry;
pub mod replay;
pub mod types;

/// Synthetic landmark builders shared by unit and integration tests
#[doc(hidden)]
pub mod test_support;

pub use config::ScreeningConfig;
pub use emotion::{ClassifyError, DeadlineClassifier, EmotionClassifier};
pub use encoder::{FeatureDocument, FeatureEncoder};
pub use error::ScreenError;
pub use landmarks::{LandmarkProvider, PoseSample};
pub use orchestrator::{Collaborators, SessionOrchestrator};
pub use registry::SessionRegistry;
pub use replay::{FrameReplay, RecordedFrame, SCHEMA_VERSION};
pub use types::{FeatureLevel, FrameDiagnostics, LandmarkSet, Point2, RiskLevel, SessionSummary};

/// Crate version embedded in all feature documents
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for feature documents
pub const PRODUCER_NAME: &str = "behavior-screen";
