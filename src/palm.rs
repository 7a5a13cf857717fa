// src/palm.rs - Palm size of the robot model and tracked-hand calibration
use crate::landmarks::{HandTrackingResult, Landmark};
use crate::metadata::FingerName;
use crate::skeleton::Skeleton;
use nalgebra::Vector3;
use serde::Serialize;

/// Palm measurements of a robot model, in model units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PalmDimensions {
    /// Index base to pinky base.
    pub width: f64,
    /// Wrist to middle base.
    pub length: f64,
    pub wrist: Vector3<f64>,
    pub finger_bases: Vec<(FingerName, Vector3<f64>)>,
}

impl PalmDimensions {
    pub fn finger_base(&self, finger: FingerName) -> Option<Vector3<f64>> {
        self.finger_bases
            .iter()
            .find(|(name, _)| *name == finger)
            .map(|(_, position)| *position)
    }
}

/// Measures the palm from finger base world positions, falling back to
/// coarser estimates when fingers are missing.
pub fn palm_dimensions(skeleton: &Skeleton) -> PalmDimensions {
    let wrist = Vector3::zeros();
    let finger_bases: Vec<(FingerName, Vector3<f64>)> = FingerName::ALL
        .into_iter()
        .filter_map(|finger| {
            let joint = skeleton.finger_base(finger)?;
            skeleton.world_position(joint).map(|p| (finger, p))
        })
        .collect();
    let base = |finger: FingerName| {
        finger_bases
            .iter()
            .find(|(name, _)| *name == finger)
            .map(|(_, p)| *p)
    };

    let mut width = match (base(FingerName::Index), base(FingerName::Pinky)) {
        (Some(index), Some(pinky)) => (index - pinky).norm(),
        _ => {
            let mut widest = 0.0_f64;
            for (i, (_, a)) in finger_bases.iter().enumerate() {
                for (_, b) in &finger_bases[i + 1..] {
                    widest = widest.max((a - b).norm());
                }
            }
            widest
        }
    };

    let mut length = match base(FingerName::Middle) {
        Some(middle) => (middle - wrist).norm(),
        None if !finger_bases.is_empty() => {
            finger_bases.iter().map(|(_, p)| (p - wrist).norm()).sum::<f64>()
                / finger_bases.len() as f64
        }
        None => 0.0,
    };

    if width == 0.0 || length == 0.0 {
        let size = joint_spread(skeleton);
        if width == 0.0 {
            width = size.x.max(size.z) * 0.4;
        }
        if length == 0.0 {
            length = size.y.max(size.x.max(size.z)) * 0.5;
        }
        tracing::debug!(
            "Estimated palm of \"{}\" from joint spread: width {:.4}, length {:.4}",
            skeleton.hand_id(),
            width,
            length
        );
    }

    PalmDimensions {
        width,
        length,
        wrist,
        finger_bases,
    }
}

/// Bounding box extent of every joint's world position.
fn joint_spread(skeleton: &Skeleton) -> Vector3<f64> {
    let positions: Vec<Vector3<f64>> = skeleton
        .joints()
        .iter()
        .filter_map(|joint| skeleton.world_position(&joint.name))
        .collect();
    let Some(first) = positions.first() else {
        return Vector3::zeros();
    };
    let (min, max) = positions
        .iter()
        .fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
    max - min
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PalmCalibration {
    /// Wrist to middle root in normalized image units.
    pub tracked_palm_length: f64,
    /// Base link to the middle finger's base joint, in model units.
    pub robot_palm_length: f64,
    pub scale: f64,
}

/// Ratio between the robot palm and the tracked palm, or `None` when either
/// side cannot be measured.
pub fn calibrate(hand: &HandTrackingResult, skeleton: &Skeleton) -> Option<PalmCalibration> {
    let wrist = hand.wrist()?;
    let middle_root = hand.middle_root()?;
    let tracked_palm_length = wrist.distance_to(middle_root);
    if !(tracked_palm_length.is_finite() && tracked_palm_length > 0.0) {
        return None;
    }

    let middle_base = skeleton.finger_base(FingerName::Middle)?;
    let robot_palm_length = skeleton.world_position(middle_base)?.norm();

    Some(PalmCalibration {
        tracked_palm_length,
        robot_palm_length,
        scale: robot_palm_length / tracked_palm_length,
    })
}

pub fn scale_or(calibration: Option<&PalmCalibration>, default_scale: f64) -> f64 {
    calibration.map_or(default_scale, |c| c.scale)
}

/// Landmark offsets from the wrist, scaled into scene units. Image Y and depth
/// both point the opposite way from the scene axes. Empty when any landmark or
/// the scale is not finite.
pub fn calibrated_offsets(hand: &HandTrackingResult, scale: f64) -> Vec<Vector3<f64>> {
    if !scale.is_finite() || !hand.landmarks.iter().all(Landmark::is_finite) {
        return Vec::new();
    }
    let Some(wrist) = hand.wrist().map(|w| w.position()) else {
        return Vec::new();
    };
    let factor = 2.0 * scale;
    hand.landmarks
        .iter()
        .map(|landmark| {
            let offset = (landmark.position() - wrist) * factor;
            Vector3::new(offset.x, -offset.y, -offset.z)
        })
        .collect()
}
