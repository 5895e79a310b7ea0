//! Per-feature behavioral detectors
//!
//! Every detector is a small time-aware state machine fed once per frame with the shared
//! [`FrameContext`](crate::clock::FrameContext) and the landmark sets it needs. Detectors
//! keep bounded state, ignore their own output during warm-up, and produce one immutable
//! summary at session end.

pub mod blink;
pub mod expression;
pub mod eye_contact;
pub mod gesture;
pub mod head_movement;
pub mod repetition;

pub use blink::BlinkDetector;
pub use expression::ExpressionVariabilityMeter;
pub use eye_contact::EyeContactDetector;
pub use gesture::GestureDetector;
pub use head_movement::HeadMovementMeter;
pub use repetition::{HandRepetitionDetector, HeadRepetitionDetector, OscillationTracker};
