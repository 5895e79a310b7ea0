//! Synthetic landmark builders for tests

use crate::landmarks::{face, hand, pose};
use crate::types::{LandmarkSet, Point2};

/// Builds a refined face mesh with controllable eye openness, gaze and head offset
#[derive(Debug, Clone, Copy)]
pub struct FaceBuilder {
    /// Eye aspect ratio of both eyes
    pub openness: f64,
    /// Iris offset from the eye center, as a fraction of eye width
    pub gaze: f64,
    /// Nose offset from the inter-eye midpoint, in eye separations
    pub nose_offset: f64,
    /// Translation applied to every point
    pub shift: Point2,
}

impl Default for FaceBuilder {
    fn default() -> Self {
        Self {
            openness: 0.30,
            gaze: 0.0,
            nose_offset: 0.0,
            shift: Point2::new(0.0, 0.0),
        }
    }
}

impl FaceBuilder {
    pub fn openness(mut self, ear: f64) -> Self {
        self.openness = ear;
        self
    }

    pub fn gaze(mut self, offset: f64) -> Self {
        self.gaze = offset;
        self
    }

    pub fn nose_offset(mut self, offset: f64) -> Self {
        self.nose_offset = offset;
        self
    }

    pub fn shift(mut self, dx: f64, dy: f64) -> Self {
        self.shift = Point2::new(dx, dy);
        self
    }

    pub fn build(&self) -> LandmarkSet {
        let mut points = vec![Point2::new(0.5, 0.5); face::POINT_COUNT];
        let h = self.openness * 0.03;
        let mut set = |index: usize, x: f64, y: f64| {
            points[index] = Point2::new(x + self.shift.x, y + self.shift.y);
        };

        for (contour, x0) in [(face::RIGHT_EYE_CONTOUR, 0.40), (face::LEFT_EYE_CONTOUR, 0.54)] {
            set(contour[0], x0, 0.40);
            set(contour[1], x0 + 0.02, 0.40 - h);
            set(contour[2], x0 + 0.04, 0.40 - h);
            set(contour[3], x0 + 0.06, 0.40);
            set(contour[4], x0 + 0.04, 0.40 + h);
            set(contour[5], x0 + 0.02, 0.40 + h);
        }

        for (iris, center_x) in [(face::RIGHT_IRIS, 0.43), (face::LEFT_IRIS, 0.57)] {
            let cx = center_x + self.gaze * 0.06;
            set(iris[0], cx + 0.005, 0.40);
            set(iris[1], cx, 0.40 - 0.005);
            set(iris[2], cx - 0.005, 0.40);
            set(iris[3], cx, 0.40 + 0.005);
        }

        set(face::NOSE_TIP, 0.50 + self.nose_offset * 0.14, 0.50);

        LandmarkSet::new(points)
    }
}

/// A hand whose every landmark sits on the palm center
pub fn hand_at(x: f64, y: f64) -> LandmarkSet {
    LandmarkSet::new(vec![Point2::new(x, y); hand::POINT_COUNT])
}

/// A pose skeleton with the given wrist positions
pub fn pose_with_wrists(left: Point2, right: Point2) -> LandmarkSet {
    let mut points = vec![Point2::new(0.5, 0.5); pose::POINT_COUNT];
    points[pose::LEFT_WRIST] = left;
    points[pose::RIGHT_WRIST] = right;
    LandmarkSet::new(points)
}
