//! Synthetic inputs shared by the integration tests

#![allow(dead_code)]

use std::io::Cursor;

use behavior_screen::test_support::FaceBuilder;
use behavior_screen::LandmarkSet;
use image::{DynamicImage, ImageFormat, RgbImage};

pub use behavior_screen::test_support::{hand_at, pose_with_wrists};

/// Frames per second used by the synthetic recordings
pub const FPS: f64 = 30.0;

pub fn timestamp(frame: usize) -> f64 {
    frame as f64 / FPS
}

/// A frontal face looking at the camera
pub fn open_face() -> LandmarkSet {
    FaceBuilder::default().build()
}

pub fn closed_face() -> LandmarkSet {
    FaceBuilder::default().openness(0.10).build()
}

/// A small PNG-encoded frame
pub fn png_frame() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png encoding");
    bytes
}

/// Whether frame `index` falls in a 200 ms closure starting every 3 s after the first 3 s
pub fn blinking(index: usize) -> bool {
    index >= 90 && index % 90 < 6
}
