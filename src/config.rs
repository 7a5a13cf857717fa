// src/config.rs
use crate::error::{Result, RetargetError};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which detected hand drives the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingHand {
    Left,
    #[default]
    Right,
    /// First detected hand wins.
    #[serde(rename = "auto", alias = "Auto")]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    /// EMA weight of the newest sample, in (0,1]. Lower is smoother.
    pub alpha: f64,
    /// A hand absent for this many consecutive frames loses its history.
    pub max_missed_frames: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 0.5,
            max_missed_frames: 30,
        }
    }
}

/// Passed through to the landmark detector untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
    pub model_complexity: u8,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            model_complexity: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    pub tracking_hand: TrackingHand,
    /// Rotation smoothing in [0,1]: 0 snaps, values near 1 converge slowly.
    pub smoothing: f64,
    pub filter: FilterConfig,
    pub max_hands: usize,
    pub detector: DetectorOptions,
    /// Used whenever palm calibration is unavailable.
    pub default_scale: f64,
    /// Intrinsic XYZ Euler angles (radians) applied after the wrist rotation.
    pub base_rotation: [f64; 3],
    pub root_position: [f64; 3],
    /// Frame rate the per-tick smoothing constants are tuned for.
    pub reference_rate_hz: f64,
    pub output_directory: PathBuf,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            tracking_hand: TrackingHand::Right,
            smoothing: 0.3,
            filter: FilterConfig::default(),
            max_hands: 2,
            detector: DetectorOptions::default(),
            default_scale: 5.0,
            base_rotation: [0.0; 3],
            root_position: [0.0; 3],
            reference_rate_hz: 60.0,
            output_directory: default_output_directory(),
        }
    }
}

pub fn default_output_directory() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("HandRetarget")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

/// Rotation for intrinsic X, then Y, then Z Euler angles.
pub fn euler_xyz(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z)
}

impl RetargetConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RetargetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(RetargetError::invalid_config(format!(
                "smoothing must be in [0,1], got {}",
                self.smoothing
            )));
        }
        validate_alpha(self.filter.alpha)?;
        if self.max_hands < 1 {
            return Err(RetargetError::invalid_config("max_hands must be at least 1"));
        }
        if !(self.default_scale.is_finite() && self.default_scale > 0.0) {
            return Err(RetargetError::invalid_config(format!(
                "default_scale must be positive, got {}",
                self.default_scale
            )));
        }
        if !(self.reference_rate_hz.is_finite() && self.reference_rate_hz > 0.0) {
            return Err(RetargetError::invalid_config(format!(
                "reference_rate_hz must be positive, got {}",
                self.reference_rate_hz
            )));
        }
        let finite = |v: &[f64; 3]| v.iter().all(|c| c.is_finite());
        if !finite(&self.base_rotation) || !finite(&self.root_position) {
            return Err(RetargetError::invalid_config(
                "base_rotation and root_position must be finite",
            ));
        }
        Ok(())
    }

    pub fn base_rotation(&self) -> UnitQuaternion<f64> {
        let [x, y, z] = self.base_rotation;
        euler_xyz(x, y, z)
    }

    pub fn root_position(&self) -> Vector3<f64> {
        Vector3::from(self.root_position)
    }
}

pub fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(RetargetError::invalid_config(format!(
            "filter alpha must be in (0,1], got {}",
            alpha
        )))
    }
}
