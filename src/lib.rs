// src/lib.rs
//! Kinematic skeleton model for robot hands and retargeting of tracked human
//! hand landmarks onto it.

pub mod ccd;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod hand_state;
pub mod joint_anim;
pub mod landmarks;
pub mod metadata;
pub mod models;
pub mod palm;
pub mod pipeline;
pub mod simulation;
pub mod skeleton;
pub mod wrist;

pub use config::{RetargetConfig, TrackingHand};
pub use error::{GraphError, Result, RetargetError};
pub use hand_state::{JointState, RobotHandState};
pub use landmarks::{HandTrackingResult, Landmark};
pub use metadata::{FingerName, Handedness, JointMetadata, JointType, RobotHandMetadata};
pub use pipeline::{RetargetPipeline, TickOutput};
pub use skeleton::{RenderHandle, Skeleton};
pub use wrist::{RetargetOutcome, SkipReason};
