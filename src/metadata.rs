// src/metadata.rs - Immutable kinematic description of a robot hand
use crate::error::{Result, RetargetError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const AXIS_EPSILON: f64 = 1e-9;

/// Joint kinds from the kinematic description format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JointType {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
    Floating,
    Planar,
}

impl JointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Revolute => "revolute",
            JointType::Continuous => "continuous",
            JointType::Prismatic => "prismatic",
            JointType::Fixed => "fixed",
            JointType::Floating => "floating",
            JointType::Planar => "planar",
        }
    }

    /// Revolute and continuous joints carry an angle in radians.
    pub fn is_rotational(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Continuous)
    }

    /// Joints whose single value moves along or about `axis`.
    pub fn is_actuated(&self) -> bool {
        self.is_rotational() || *self == JointType::Prismatic
    }
}

impl From<&str> for JointType {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "revolute" => JointType::Revolute,
            "continuous" => JointType::Continuous,
            "prismatic" => JointType::Prismatic,
            "fixed" => JointType::Fixed,
            "floating" => JointType::Floating,
            "planar" => JointType::Planar,
            other => {
                tracing::warn!("Unknown joint type \"{}\", defaulting to fixed", other);
                JointType::Fixed
            }
        }
    }
}

impl From<String> for JointType {
    fn from(value: String) -> Self {
        JointType::from(value.as_str())
    }
}

impl From<JointType> for String {
    fn from(value: JointType) -> Self {
        value.as_str().to_string()
    }
}

/// Left or right. Accepts both the lowercase labels used by model files and the
/// capitalized labels reported by landmark detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    #[serde(alias = "Left")]
    Left,
    #[serde(alias = "Right")]
    Right,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => write!(f, "Left"),
            Handedness::Right => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerName {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerName {
    pub const ALL: [FingerName; 5] = [
        FingerName::Thumb,
        FingerName::Index,
        FingerName::Middle,
        FingerName::Ring,
        FingerName::Pinky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FingerName::Thumb => "thumb",
            FingerName::Index => "index",
            FingerName::Middle => "middle",
            FingerName::Ring => "ring",
            FingerName::Pinky => "pinky",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub effort: f64,
    #[serde(default)]
    pub velocity: f64,
}

impl JointLimits {
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMetadata {
    /// Unique within a hand, e.g. "thumb_cmc_roll".
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    /// Origin relative to the parent link.
    pub position: Vector3<f64>,
    /// Rotation (or translation) axis in the parent frame.
    pub axis: Vector3<f64>,
    /// `None` for unconstrained joints.
    #[serde(default)]
    pub limits: Option<JointLimits>,
    pub parent_link: String,
    pub child_link: String,
}

impl JointMetadata {
    /// Clamps into the declared limits; unconstrained joints pass through.
    pub fn clamp(&self, value: f64) -> f64 {
        match &self.limits {
            Some(limits) => limits.clamp(value),
            None => value,
        }
    }

    fn validate(&self) -> Result<()> {
        let finite = |v: &Vector3<f64>| v.iter().all(|c| c.is_finite());

        if !finite(&self.position) {
            return Err(RetargetError::invalid_metadata(format!(
                "joint \"{}\" has a non-finite position",
                self.name
            )));
        }
        if !finite(&self.axis) {
            return Err(RetargetError::invalid_metadata(format!(
                "joint \"{}\" has a non-finite axis",
                self.name
            )));
        }
        if self.joint_type.is_actuated() && self.axis.norm() < AXIS_EPSILON {
            return Err(RetargetError::invalid_metadata(format!(
                "joint \"{}\" has a zero-length axis",
                self.name
            )));
        }
        if let Some(limits) = &self.limits {
            if !limits.lower.is_finite() || !limits.upper.is_finite() {
                return Err(RetargetError::invalid_metadata(format!(
                    "joint \"{}\" has non-finite limits",
                    self.name
                )));
            }
            if limits.lower > limits.upper {
                return Err(RetargetError::invalid_metadata(format!(
                    "joint \"{}\" has lower limit {} above upper limit {}",
                    self.name, limits.lower, limits.upper
                )));
            }
        }
        Ok(())
    }
}

/// Joints of one finger, ordered base to tip. Arity differs between fingers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerMetadata {
    pub name: FingerName,
    pub joints: Vec<Arc<JointMetadata>>,
}

impl FingerMetadata {
    pub fn base_joint(&self) -> Option<&Arc<JointMetadata>> {
        self.joints.first()
    }
}

/// Not every hand populates every finger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<FingerMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<FingerMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle: Option<FingerMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ring: Option<FingerMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinky: Option<FingerMetadata>,
}

impl Fingers {
    pub fn get(&self, name: FingerName) -> Option<&FingerMetadata> {
        match name {
            FingerName::Thumb => self.thumb.as_ref(),
            FingerName::Index => self.index.as_ref(),
            FingerName::Middle => self.middle.as_ref(),
            FingerName::Ring => self.ring.as_ref(),
            FingerName::Pinky => self.pinky.as_ref(),
        }
    }

    /// Populated fingers in anatomical order.
    pub fn iter(&self) -> impl Iterator<Item = &FingerMetadata> {
        FingerName::ALL.into_iter().filter_map(move |name| self.get(name))
    }
}

/// Complete, read-only description of one hand design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotHandMetadata {
    /// e.g. "linker-l10-right"
    pub id: String,
    /// Display name, e.g. "Linker L10 Right Hand"
    pub name: String,
    pub brand: String,
    pub model: String,
    pub handedness: Handedness,
    /// Kinematic description file this data was extracted from.
    #[serde(default, alias = "urdf_path")]
    pub source_path: Option<String>,
    /// Root of the chain; origin of world-position accumulation.
    pub base_link: String,
    pub fingers: Fingers,
}

impl RobotHandMetadata {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let metadata: RobotHandMetadata = serde_json::from_str(json)?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// All joints, finger by finger, base to tip.
    pub fn joints(&self) -> impl Iterator<Item = &Arc<JointMetadata>> {
        self.fingers.iter().flat_map(|finger| finger.joints.iter())
    }

    pub fn joint(&self, name: &str) -> Option<&Arc<JointMetadata>> {
        self.joints().find(|joint| joint.name == name)
    }

    pub fn joint_count(&self) -> usize {
        self.fingers.iter().map(|finger| finger.joints.len()).sum()
    }

    pub fn finger_of(&self, joint_name: &str) -> Option<FingerName> {
        self.fingers
            .iter()
            .find(|finger| finger.joints.iter().any(|j| j.name == joint_name))
            .map(|finger| finger.name)
    }

    /// Joint count of the longest finger.
    pub fn max_finger_depth(&self) -> usize {
        self.fingers
            .iter()
            .map(|finger| finger.joints.len())
            .max()
            .unwrap_or(0)
    }

    /// Per-joint sanity checks. Graph structure is checked when building a skeleton.
    pub fn validate(&self) -> Result<()> {
        if self.base_link.is_empty() {
            return Err(RetargetError::invalid_metadata(format!(
                "hand \"{}\" has an empty base link",
                self.id
            )));
        }
        if self.joint_count() == 0 {
            return Err(RetargetError::invalid_metadata(format!(
                "hand \"{}\" defines no joints",
                self.id
            )));
        }
        for name in FingerName::ALL {
            if let Some(finger) = self.fingers.get(name) {
                if finger.name != name {
                    return Err(RetargetError::invalid_metadata(format!(
                        "finger slot \"{}\" holds finger \"{}\"",
                        name.as_str(),
                        finger.name.as_str()
                    )));
                }
            }
        }
        for joint in self.joints() {
            joint.validate()?;
        }
        Ok(())
    }
}
