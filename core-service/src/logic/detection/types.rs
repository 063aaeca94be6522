//! Detection Types
//!
//! Core types for detector output and persisted detections.
//! No logic beyond simple box geometry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// OBJECT CLASSES
// ============================================================================

/// Normalized detector class names
pub mod classes {
    pub const PERSON: &str = "person";
    pub const VEHICLE: &str = "vehicle";
    pub const MACHINERY: &str = "machinery";
    pub const HARDHAT: &str = "hardhat";
    pub const NO_HARDHAT: &str = "no_hardhat";
    pub const SAFETY_VEST: &str = "safety_vest";
    pub const NO_SAFETY_VEST: &str = "no_safety_vest";
    pub const MASK: &str = "mask";
    pub const NO_MASK: &str = "no_mask";

    /// Classes counted as machines in proximity / dynamics features
    pub const MACHINE_CLASSES: &[&str] = &[VEHICLE, MACHINERY];
}

// ============================================================================
// BOUNDING BOX
// ============================================================================

/// Axis-aligned box: top-left corner + size, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build from detector corners `[x1, y1, x2, y2]`
    pub fn from_xyxy(xyxy: [f64; 4]) -> Self {
        let [x1, y1, x2, y2] = xyxy;
        Self {
            x: x1,
            y: y1,
            w: x2 - x1,
            h: y2 - y1,
        }
    }

    pub fn to_xyxy(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.w, self.y + self.h]
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Ground contact point (bottom-center)
    pub fn foot_point(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h)
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Inclusive containment test
    pub fn contains(&self, px: f64, py: f64) -> bool {
        self.x <= px && px <= self.x + self.w && self.y <= py && py <= self.y + self.h
    }

    /// Touching edges count as an intersection
    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.x + self.w < other.x
            || self.x > other.x + other.w
            || self.y + self.h < other.y
            || self.y > other.y + other.h)
    }
}

// ============================================================================
// DETECTOR OUTPUT
// ============================================================================

/// One box as produced by the object detector (before filtering)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Class name as emitted by the model (not normalized)
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f64; 4],
}

// ============================================================================
// PERSISTED DETECTION
// ============================================================================

/// Accepted, tracked detection as stored in the `detections` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub camera_id: i64,
    pub timestamp: DateTime<Utc>,
    pub object_class: String,
    pub confidence: f32,
    pub bbox: BBox,
    pub track_id: u32,
}

impl Detection {
    /// Frame identity: all boxes of one frame share the same timestamp
    pub fn frame_key(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    pub fn is_person(&self) -> bool {
        self.object_class == classes::PERSON
    }

    pub fn is_machine(&self) -> bool {
        classes::MACHINE_CLASSES.contains(&self.object_class.as_str())
    }
}
