// src/wrist.rs - Wrist orientation from landmark geometry
use crate::config::{RetargetConfig, TrackingHand};
use crate::landmarks::{HandTrackingResult, Landmark};
use crate::metadata::Handedness;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;
use std::time::Duration;

const DIRECTION_EPSILON: f64 = 1e-9;
const SLERP_EPSILON: f64 = 1e-9;

/// Why a tick left the root pose untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoHands,
    NoHandSelected,
    MissingLandmark,
    DegenerateGeometry,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoHands => "no_hands",
            SkipReason::NoHandSelected => "no_hand_selected",
            SkipReason::MissingLandmark => "missing_landmark",
            SkipReason::DegenerateGeometry => "degenerate_geometry",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RootPose {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetargetOutcome {
    Updated(RootPose),
    Skipped(SkipReason),
}

impl RetargetOutcome {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            RetargetOutcome::Updated(_) => None,
            RetargetOutcome::Skipped(reason) => Some(*reason),
        }
    }
}

fn matches_hand(which: TrackingHand, handedness: Handedness) -> bool {
    matches!(
        (which, handedness),
        (TrackingHand::Left, Handedness::Left) | (TrackingHand::Right, Handedness::Right)
    )
}

/// `Auto` takes the first detection; otherwise the first one with matching handedness.
pub fn select_hand(results: &[HandTrackingResult], which: TrackingHand) -> Option<&HandTrackingResult> {
    match which {
        TrackingHand::Auto => results.first(),
        _ => results.iter().find(|r| matches_hand(which, r.handedness)),
    }
}

/// Shortest-arc rotation taking +Y onto the wrist-to-middle-root direction,
/// followed by `base`. `None` when the two landmarks coincide.
pub fn wrist_rotation(
    wrist: &Landmark,
    middle_root: &Landmark,
    base: &UnitQuaternion<f64>,
) -> Option<UnitQuaternion<f64>> {
    let direction = middle_root.position() - wrist.position();
    let length = direction.norm();
    if !length.is_finite() || length < DIRECTION_EPSILON {
        return None;
    }
    let direction = direction / length;

    // Only fails for exactly opposite vectors; any half-turn about an axis
    // perpendicular to Y is valid there.
    let computed = UnitQuaternion::rotation_between(&Vector3::y(), &direction)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI));

    Some(computed * base)
}

/// [`wrist_rotation`] on landmarks 0 and 9 of a detection.
pub fn rotation_from_hand(
    hand: &HandTrackingResult,
    base: &UnitQuaternion<f64>,
) -> Result<UnitQuaternion<f64>, SkipReason> {
    let (Some(wrist), Some(middle_root)) = (hand.wrist(), hand.middle_root()) else {
        return Err(SkipReason::MissingLandmark);
    };
    wrist_rotation(wrist, middle_root, base).ok_or(SkipReason::DegenerateGeometry)
}

fn slerp(current: &UnitQuaternion<f64>, target: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    current
        .try_slerp(target, t.clamp(0.0, 1.0), SLERP_EPSILON)
        .unwrap_or(*target)
}

/// Moves `current` toward `target` by `1 - smoothing` of the remaining arc.
///
/// This is a per-call step, so the effective convergence speed depends on how
/// often it runs. See [`apply_smoothed_elapsed`].
pub fn apply_smoothed(
    current: &UnitQuaternion<f64>,
    target: &UnitQuaternion<f64>,
    smoothing: f64,
) -> UnitQuaternion<f64> {
    if smoothing > 0.0 {
        slerp(current, target, 1.0 - smoothing)
    } else {
        *target
    }
}

/// Frame-rate independent form of [`apply_smoothed`]. At exactly one reference
/// frame of elapsed time both give the same result.
pub fn apply_smoothed_elapsed(
    current: &UnitQuaternion<f64>,
    target: &UnitQuaternion<f64>,
    smoothing: f64,
    elapsed: Duration,
    reference_rate_hz: f64,
) -> UnitQuaternion<f64> {
    if smoothing > 0.0 {
        let frames = elapsed.as_secs_f64() * reference_rate_hz;
        slerp(current, target, 1.0 - smoothing.powf(frames))
    } else {
        *target
    }
}

/// Tracks the robot root pose across ticks.
#[derive(Debug, Clone)]
pub struct WristRetargeter {
    pose: RootPose,
    base_rotation: UnitQuaternion<f64>,
    smoothing: f64,
    tracking_hand: TrackingHand,
    reference_rate_hz: f64,
}

impl WristRetargeter {
    pub fn new(config: &RetargetConfig) -> Self {
        Self {
            pose: RootPose {
                position: config.root_position(),
                rotation: UnitQuaternion::identity(),
            },
            base_rotation: config.base_rotation(),
            smoothing: config.smoothing,
            tracking_hand: config.tracking_hand,
            reference_rate_hz: config.reference_rate_hz,
        }
    }

    pub fn pose(&self) -> RootPose {
        self.pose
    }

    pub fn tracking_hand(&self) -> TrackingHand {
        self.tracking_hand
    }

    pub fn set_tracking_hand(&mut self, which: TrackingHand) {
        self.tracking_hand = which;
    }

    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    /// Selects a hand from one tick of detections and steers the root toward it.
    pub fn update(&mut self, results: &[HandTrackingResult], elapsed: Option<Duration>) -> RetargetOutcome {
        if results.is_empty() {
            return RetargetOutcome::Skipped(SkipReason::NoHands);
        }
        match select_hand(results, self.tracking_hand) {
            Some(hand) => self.update_from_hand(hand, elapsed),
            None => RetargetOutcome::Skipped(SkipReason::NoHandSelected),
        }
    }

    /// Steers the root toward one detection. On failure the previous
    /// orientation is kept.
    pub fn update_from_hand(&mut self, hand: &HandTrackingResult, elapsed: Option<Duration>) -> RetargetOutcome {
        let target = match rotation_from_hand(hand, &self.base_rotation) {
            Ok(target) => target,
            Err(reason) => return RetargetOutcome::Skipped(reason),
        };

        self.pose.rotation = match elapsed {
            Some(dt) => apply_smoothed_elapsed(
                &self.pose.rotation,
                &target,
                self.smoothing,
                dt,
                self.reference_rate_hz,
            ),
            None => apply_smoothed(&self.pose.rotation, &target, self.smoothing),
        };
        RetargetOutcome::Updated(self.pose)
    }

    pub fn reset(&mut self) {
        self.pose.rotation = UnitQuaternion::identity();
    }
}
