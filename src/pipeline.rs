// src/pipeline.rs - Per-tick retargeting loop
use crate::config::{RetargetConfig, TrackingHand};
use crate::error::{Result, RetargetError};
use crate::filter::LandmarkFilter;
use crate::hand_state::RobotHandState;
use crate::landmarks::HandTrackingResult;
use crate::metadata::{Handedness, RobotHandMetadata};
use crate::models;
use crate::palm::{calibrate, calibrated_offsets, scale_or, PalmCalibration, PalmDimensions};
use crate::skeleton::Skeleton;
use crate::wrist::{select_hand, RetargetOutcome, RootPose, SkipReason, WristRetargeter};
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Duration;

/// A hand design together with its skeleton and joint values.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub metadata: Arc<RobotHandMetadata>,
    pub skeleton: Skeleton,
    pub state: RobotHandState,
}

impl LoadedModel {
    /// Pushes the current joint values into the skeleton's LOCAL transforms.
    pub fn sync_skeleton(&mut self) -> usize {
        self.skeleton.apply_state(&self.state)
    }
}

#[derive(Debug, Clone)]
pub struct TickOutput {
    pub frame: u64,
    pub hands_detected: usize,
    /// Handedness of the detection that drove this tick.
    pub tracked: Option<Handedness>,
    pub outcome: RetargetOutcome,
    pub root: RootPose,
    /// Last successful calibration, possibly from an earlier tick.
    pub calibration: Option<PalmCalibration>,
    pub scale: f64,
    pub palm: Option<PalmDimensions>,
    pub offsets: Vec<Vector3<f64>>,
}

impl TickOutput {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.outcome.skip_reason()
    }
}

pub struct RetargetPipeline {
    config: RetargetConfig,
    filter: LandmarkFilter,
    wrist: WristRetargeter,
    model: Option<LoadedModel>,
    calibration: Option<PalmCalibration>,
    frame: u64,
}

impl RetargetPipeline {
    pub fn new(config: RetargetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: LandmarkFilter::new(config.filter.clone(), config.reference_rate_hz),
            wrist: WristRetargeter::new(&config),
            model: None,
            calibration: None,
            frame: 0,
            config,
        })
    }

    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    /// Replaces the current model. A model that fails validation or whose link
    /// graph is malformed leaves the pipeline without a model.
    pub fn load_model(&mut self, metadata: Arc<RobotHandMetadata>) -> Result<()> {
        self.unload_model();

        let skeleton = metadata
            .validate()
            .and_then(|()| Skeleton::from_metadata(&metadata).map_err(RetargetError::from));
        let skeleton = match skeleton {
            Ok(skeleton) => skeleton,
            Err(e) => {
                tracing::warn!("Failed to load hand model \"{}\": {}", metadata.id, e);
                return Err(e);
            }
        };

        tracing::info!(
            "Loaded hand model \"{}\" ({} {}, {} joints, palm {:.4} x {:.4})",
            metadata.id,
            metadata.brand,
            metadata.model,
            metadata.joint_count(),
            skeleton.palm().width,
            skeleton.palm().length
        );

        let state = RobotHandState::new(Arc::clone(&metadata));
        self.model = Some(LoadedModel {
            metadata,
            skeleton,
            state,
        });
        Ok(())
    }

    pub fn load_builtin(&mut self, id: &str) -> Result<()> {
        let metadata = models::builtin(id).ok_or_else(|| {
            RetargetError::invalid_metadata(format!("no built-in hand model \"{}\"", id))
        })?;
        self.load_model(metadata)
    }

    /// Drops the model. Render handles are weak, so nothing dangles.
    pub fn unload_model(&mut self) {
        if let Some(model) = self.model.take() {
            tracing::info!("Unloaded hand model \"{}\"", model.metadata.id);
        }
        self.calibration = None;
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut LoadedModel> {
        self.model.as_mut()
    }

    pub fn hand_state(&self) -> Option<&RobotHandState> {
        self.model.as_ref().map(|m| &m.state)
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.model.as_ref().map(|m| &m.skeleton)
    }

    pub fn root_pose(&self) -> RootPose {
        self.wrist.pose()
    }

    pub fn calibration(&self) -> Option<&PalmCalibration> {
        self.calibration.as_ref()
    }

    /// Changes the landmark filter alpha. `config()` reflects the new value.
    pub fn set_filter_alpha(&mut self, alpha: f64) -> Result<()> {
        self.filter.set_alpha(alpha)?;
        self.config.filter.alpha = alpha;
        Ok(())
    }

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.filter.set_enabled(enabled);
        self.config.filter.enabled = enabled;
    }

    pub fn set_smoothing(&mut self, smoothing: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(RetargetError::invalid_config(format!(
                "smoothing must be in [0,1], got {}",
                smoothing
            )));
        }
        self.wrist.set_smoothing(smoothing);
        self.config.smoothing = smoothing;
        Ok(())
    }

    pub fn set_tracking_hand(&mut self, which: TrackingHand) {
        self.wrist.set_tracking_hand(which);
        self.config.tracking_hand = which;
    }

    pub fn set_joint(&mut self, name: &str, value: f64) -> Result<()> {
        let model = self.model.as_mut().ok_or(RetargetError::NoModelLoaded)?;
        model.state.set_joint(name, value)?;
        model.sync_skeleton();
        Ok(())
    }

    /// Applies an external joint payload. Unknown joints are ignored.
    pub fn set_joints<'a, I>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let model = self.model.as_mut().ok_or(RetargetError::NoModelLoaded)?;
        let applied = model.state.set_joints(values);
        model.sync_skeleton();
        Ok(applied)
    }

    pub fn reset_joints(&mut self) {
        if let Some(model) = self.model.as_mut() {
            model.state.reset();
            model.sync_skeleton();
        }
    }

    /// Pushes LOCAL transforms to the attached render handles.
    pub fn sync_handles(&self) -> usize {
        self.model
            .as_ref()
            .map_or(0, |model| model.skeleton.sync_handles())
    }

    /// One update pass: smooth, select, calibrate, and steer the root.
    ///
    /// With `elapsed` the smoothing constants are rescaled for the frame time.
    /// An empty detection list holds the previous pose.
    pub fn tick(&mut self, results: &[HandTrackingResult], elapsed: Option<Duration>) -> TickOutput {
        self.frame += 1;
        let hands = &results[..results.len().min(self.config.max_hands)];
        let smoothed = self.filter.filter_frame(hands, elapsed);
        let selected = select_hand(&smoothed, self.wrist.tracking_hand());

        if let (Some(hand), Some(model)) = (selected, self.model.as_ref()) {
            match calibrate(hand, &model.skeleton) {
                Some(calibration) => self.calibration = Some(calibration),
                None => tracing::trace!("Frame {}: palm calibration unavailable", self.frame),
            }
        }
        let scale = scale_or(self.calibration.as_ref(), self.config.default_scale);

        let outcome = self.wrist.update(&smoothed, elapsed);
        if let Some(reason) = outcome.skip_reason() {
            tracing::debug!("Frame {}: retargeting skipped ({})", self.frame, reason);
        }

        let root = self.wrist.pose();
        if let Some(model) = self.model.as_mut() {
            model.skeleton.update_root_transform(root.position, root.rotation);
        }

        TickOutput {
            frame: self.frame,
            hands_detected: hands.len(),
            tracked: selected.map(|hand| hand.handedness),
            outcome,
            root,
            calibration: self.calibration,
            scale,
            palm: self.model.as_ref().map(|m| m.skeleton.palm().clone()),
            offsets: selected
                .map(|hand| calibrated_offsets(hand, scale))
                .unwrap_or_default(),
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
