//! Landmark providers and index tables
//!
//! Landmark extraction itself (face mesh, hand and pose models) happens outside this
//! crate. Providers hand back ordered 2D point sets in the MediaPipe topologies below,
//! and the orchestrator bundles one frame's sets into a [`PoseSample`].

use crate::types::LandmarkSet;
use image::DynamicImage;

/// Face mesh indices (478 points with refined irises)
pub mod face {
    /// Six-point eyelid contour of the subject's right eye: corner, upper, upper, corner, lower, lower
    pub const RIGHT_EYE_CONTOUR: [usize; 6] = [33, 160, 158, 133, 153, 144];
    /// Six-point eyelid contour of the subject's left eye
    pub const LEFT_EYE_CONTOUR: [usize; 6] = [362, 385, 387, 263, 373, 380];

    /// Outer and inner corners of the right eye
    pub const RIGHT_EYE_CORNERS: (usize, usize) = (33, 133);
    /// Inner and outer corners of the left eye
    pub const LEFT_EYE_CORNERS: (usize, usize) = (362, 263);

    pub const RIGHT_IRIS: [usize; 4] = [469, 470, 471, 472];
    pub const LEFT_IRIS: [usize; 4] = [474, 475, 476, 477];

    pub const NOSE_TIP: usize = 1;

    /// Points in a refined face mesh
    pub const POINT_COUNT: usize = 478;
}

/// Hand model indices (21 points)
pub mod hand {
    /// Middle-finger MCP joint, a stable palm center
    pub const PALM_CENTER: usize = 9;

    pub const POINT_COUNT: usize = 21;
}

/// Pose model indices (33 points)
pub mod pose {
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;

    pub const POINT_COUNT: usize = 33;
}

/// External landmark detector: returns a point set for the image, or `None` when nothing
/// was detected
pub trait LandmarkProvider: Send {
    fn detect(&self, image: &DynamicImage) -> Option<LandmarkSet>;
}

/// Provider that never detects anything (used when a modality is not wired up)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

impl LandmarkProvider for NullProvider {
    fn detect(&self, _image: &DynamicImage) -> Option<LandmarkSet> {
        None
    }
}

impl<F> LandmarkProvider for F
where
    F: Fn(&DynamicImage) -> Option<LandmarkSet> + Send,
{
    fn detect(&self, image: &DynamicImage) -> Option<LandmarkSet> {
        self(image)
    }
}

/// All landmark sets extracted for one frame, shared by every detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSample {
    pub face: Option<LandmarkSet>,
    pub hand: Option<LandmarkSet>,
    pub pose: Option<LandmarkSet>,
}

impl PoseSample {
    pub fn new(face: Option<LandmarkSet>, hand: Option<LandmarkSet>, pose: Option<LandmarkSet>) -> Self {
        Self { face, hand, pose }
    }
}
