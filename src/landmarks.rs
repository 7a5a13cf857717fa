// src/landmarks.rs - Detector output types
use crate::metadata::Handedness;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// One detected keypoint. x/y are normalized image coordinates in [0,1],
/// z is depth relative to the wrist (negative is closer to the camera).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn distance_to(&self, other: &Landmark) -> f64 {
        (other.position() - self.position()).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One detected hand in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandTrackingResult {
    pub handedness: Handedness,
    /// Detector confidence in [0,1].
    pub score: f64,
    pub landmarks: Vec<Landmark>,
    /// Metric coordinates, when the detector provides them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_landmarks: Option<Vec<Landmark>>,
}

impl HandTrackingResult {
    pub fn new(handedness: Handedness, score: f64, landmarks: Vec<Landmark>) -> Self {
        Self {
            handedness,
            score,
            landmarks,
            world_landmarks: None,
        }
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn wrist(&self) -> Option<&Landmark> {
        self.landmark(WRIST)
    }

    pub fn middle_root(&self) -> Option<&Landmark> {
        self.landmark(MIDDLE_MCP)
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_json() {
        let json = r#"{
            "handedness": "Right",
            "score": 0.93,
            "landmarks": [{"x": 0.5, "y": 0.8, "z": 0.0, "visibility": 0.9},
                          {"x": 0.52, "y": 0.7, "z": -0.01}]
        }"#;
        let hand: HandTrackingResult = serde_json::from_str(json).unwrap();
        assert_eq!(hand.handedness, Handedness::Right);
        assert_eq!(hand.landmarks.len(), 2);
        assert_eq!(hand.landmarks[0].visibility, Some(0.9));
        assert_eq!(hand.landmarks[1].visibility, None);
        assert!(!hand.is_complete());
        assert!(hand.middle_root().is_none());
    }

    #[test]
    fn distance_uses_all_three_axes() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(3.0, 0.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
