//! Rotated rectangles (regions of interest)

use serde::{Deserialize, Serialize};

/// A rectangle given by its center and size, rotated by `rotation` radians.
///
/// Used both for pixel rects and normalized rects; the packet type tells
/// them apart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub id: i64,
}

impl Rect {
    pub fn new(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}
