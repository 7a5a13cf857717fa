// src/joint_anim.rs - Procedural range-of-motion sweeps for single joints
use crate::error::{Result, RetargetError};
use crate::hand_state::RobotHandState;
use crate::metadata::JointMetadata;
use std::f64::consts::FRAC_PI_4;
use std::time::Duration;

pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

const LOWER_PHASE_END: f64 = 0.25;
const UPPER_PHASE_END: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    ToLower,
    ToUpper,
    ToZero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSample {
    pub angle: f64,
    pub phase: AnimationPhase,
    pub completed: bool,
}

pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Sweep range for a joint; unlimited joints swing a quarter turn each way.
pub fn animation_limits(joint: &JointMetadata) -> (f64, f64) {
    match joint.limits {
        Some(limits) => (limits.lower, limits.upper),
        None => (-FRAC_PI_4, FRAC_PI_4),
    }
}

/// Angle at `elapsed` into a sweep of `duration`: start to lower in the first
/// quarter, lower to upper over the middle half, upper back to zero at the end.
pub fn calculate_joint_angle(
    elapsed: Duration,
    duration: Duration,
    start: f64,
    lower: f64,
    upper: f64,
) -> AnimationSample {
    let progress = if duration.is_zero() {
        1.0
    } else {
        (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
    };

    let (phase, t, from, to) = if progress < LOWER_PHASE_END {
        (AnimationPhase::ToLower, progress / LOWER_PHASE_END, start, lower)
    } else if progress < UPPER_PHASE_END {
        (
            AnimationPhase::ToUpper,
            (progress - LOWER_PHASE_END) / (UPPER_PHASE_END - LOWER_PHASE_END),
            lower,
            upper,
        )
    } else {
        (
            AnimationPhase::ToZero,
            (progress - UPPER_PHASE_END) / (1.0 - UPPER_PHASE_END),
            upper,
            0.0,
        )
    };

    AnimationSample {
        angle: from + (to - from) * ease_in_out_cubic(t),
        phase,
        completed: progress >= 1.0,
    }
}

#[derive(Debug, Clone)]
struct JointAnimation {
    joint: String,
    start: f64,
    lower: f64,
    upper: f64,
    duration: Duration,
    elapsed: Duration,
}

/// Runs range-of-motion sweeps against a hand state.
#[derive(Debug, Default)]
pub struct JointAnimator {
    animations: Vec<JointAnimation>,
}

impl JointAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a sweep from the joint's current value.
    pub fn start(&mut self, state: &RobotHandState, joint: &str, duration: Duration) -> Result<()> {
        let joint_state = state
            .joint(joint)
            .ok_or_else(|| RetargetError::unknown_joint(joint, state.metadata().id.as_str()))?;
        let (lower, upper) = animation_limits(&joint_state.metadata);

        self.stop(joint);
        self.animations.push(JointAnimation {
            joint: joint.to_string(),
            start: joint_state.current_value,
            lower,
            upper,
            duration,
            elapsed: Duration::ZERO,
        });
        tracing::debug!("Animating joint \"{}\" over {:?}", joint, duration);
        Ok(())
    }

    pub fn stop(&mut self, joint: &str) {
        self.animations.retain(|a| a.joint != joint);
    }

    pub fn is_animating(&self, joint: &str) -> bool {
        self.animations.iter().any(|a| a.joint == joint)
    }

    pub fn active_count(&self) -> usize {
        self.animations.len()
    }

    /// Advances every sweep and writes the angles into `state`. Finished sweeps
    /// and sweeps whose joint disappeared are dropped. Returns joints written.
    pub fn update(&mut self, state: &mut RobotHandState, dt: Duration) -> usize {
        let mut written = 0;
        self.animations.retain_mut(|animation| {
            animation.elapsed += dt;
            let sample = calculate_joint_angle(
                animation.elapsed,
                animation.duration,
                animation.start,
                animation.lower,
                animation.upper,
            );
            match state.set_joint(&animation.joint, sample.angle) {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::debug!("Stopping animation: {}", e);
                    return false;
                }
            }
            !sample.completed
        });
        written
    }
}
