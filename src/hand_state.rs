// src/hand_state.rs - Per-instance joint values over shared metadata
use crate::error::{Result, RetargetError};
use crate::metadata::{JointMetadata, RobotHandMetadata};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct JointState {
    pub metadata: Arc<JointMetadata>,
    /// Radians for rotational joints, meters for prismatic ones.
    pub current_value: f64,
}

/// Mutable joint values for one visualized hand.
///
/// Metadata is shared; only the values belong to this instance.
#[derive(Debug, Clone)]
pub struct RobotHandState {
    metadata: Arc<RobotHandMetadata>,
    joints: HashMap<String, JointState>,
    order: Vec<String>,
}

impl RobotHandState {
    /// Flattens every finger's joints into the state, all at 0.
    pub fn new(metadata: Arc<RobotHandMetadata>) -> Self {
        let mut joints = HashMap::with_capacity(metadata.joint_count());
        let mut order = Vec::with_capacity(metadata.joint_count());

        for joint in metadata.joints() {
            if joints.contains_key(&joint.name) {
                tracing::warn!(
                    "Duplicate joint \"{}\" in hand \"{}\", keeping the first",
                    joint.name,
                    metadata.id
                );
                continue;
            }
            order.push(joint.name.clone());
            joints.insert(
                joint.name.clone(),
                JointState {
                    metadata: Arc::clone(joint),
                    current_value: 0.0,
                },
            );
        }

        Self {
            metadata,
            joints,
            order,
        }
    }

    pub fn metadata(&self) -> &Arc<RobotHandMetadata> {
        &self.metadata
    }

    pub fn joint(&self, name: &str) -> Option<&JointState> {
        self.joints.get(name)
    }

    /// Sets one joint, clamped into its limits.
    pub fn set_joint(&mut self, name: &str, value: f64) -> Result<()> {
        let hand = &self.metadata.id;
        let joint = self
            .joints
            .get_mut(name)
            .ok_or_else(|| RetargetError::unknown_joint(name, hand.as_str()))?;

        if !value.is_finite() {
            return Err(RetargetError::NonFiniteValue {
                joint: name.to_string(),
                value,
            });
        }

        joint.current_value = joint.metadata.clamp(value);
        Ok(())
    }

    /// Applies a batch of updates. Unknown joints are skipped so that partial or
    /// newer payloads still apply. Returns how many joints were updated.
    pub fn set_joints<'a, I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut applied = 0;
        for (name, value) in values {
            match self.set_joint(name, value) {
                Ok(()) => applied += 1,
                Err(e) => tracing::trace!("Ignoring batch entry: {}", e),
            }
        }
        applied
    }

    pub fn joint_value(&self, name: &str) -> Result<f64> {
        self.joints
            .get(name)
            .map(|joint| joint.current_value)
            .ok_or_else(|| RetargetError::unknown_joint(name, self.metadata.id.as_str()))
    }

    /// Snapshot of every joint value, sorted by name.
    pub fn values(&self) -> BTreeMap<String, f64> {
        self.joints
            .iter()
            .map(|(name, joint)| (name.clone(), joint.current_value))
            .collect()
    }

    pub fn reset(&mut self) {
        for joint in self.joints.values_mut() {
            joint.current_value = 0.0;
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Joint names in metadata order (finger by finger, base to tip).
    pub fn joint_names(&self) -> &[String] {
        &self.order
    }

    /// Joint states in metadata order.
    pub fn iter(&self) -> impl Iterator<Item = &JointState> {
        self.order.iter().filter_map(move |name| self.joints.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LINKER_L10_RIGHT;

    fn state() -> RobotHandState {
        RobotHandState::new(Arc::clone(&LINKER_L10_RIGHT))
    }

    #[test]
    fn starts_at_zero() {
        let state = state();
        assert_eq!(state.joint_count(), 20);
        assert!(state.values().values().all(|v| *v == 0.0));
        assert_eq!(state.joint_names()[0], "thumb_cmc_roll");
    }

    #[test]
    fn set_joint_clamps_to_limits() {
        let mut state = state();
        state.set_joint("thumb_cmc_roll", 5.0).unwrap();
        assert_eq!(state.joint_value("thumb_cmc_roll").unwrap(), 1.1339);

        state.set_joint("thumb_cmc_roll", -3.0).unwrap();
        assert_eq!(state.joint_value("thumb_cmc_roll").unwrap(), 0.0);
    }

    #[test]
    fn clamping_holds_for_every_limited_joint() {
        let mut state = state();
        let names: Vec<String> = state.joint_names().to_vec();
        for value in [-10.0, -0.1, 0.0, 0.3, 1.0, 2.5, 100.0] {
            for name in &names {
                state.set_joint(name, value).unwrap();
                let joint = state.joint(name).unwrap();
                let limits = joint.metadata.limits.unwrap();
                assert!(limits.contains(joint.current_value), "{} = {}", name, value);
            }
        }
    }

    #[test]
    fn set_joint_rejects_unknown_and_non_finite() {
        let mut state = state();
        let err = state.set_joint("nonexistent_joint", 1.0).unwrap_err();
        assert!(matches!(err, RetargetError::UnknownJoint { .. }));

        let err = state.set_joint("index_pip", f64::NAN).unwrap_err();
        assert!(matches!(err, RetargetError::NonFiniteValue { .. }));
        assert_eq!(state.joint_value("index_pip").unwrap(), 0.0);
    }

    #[test]
    fn batch_ignores_unknown_joints() {
        let mut state = state();
        let applied = state.set_joints([("nonexistent_joint", 1.0), ("thumb_cmc_roll", 0.5)]);
        assert_eq!(applied, 1);
        assert_eq!(state.joint_value("thumb_cmc_roll").unwrap(), 0.5);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut state = state();
        state.set_joints([("index_pip", 1.0), ("pinky_dip", 0.4), ("thumb_ip", 0.7)]);
        state.reset();
        assert!(state.values().values().all(|v| *v == 0.0));
        state.reset();
        assert!(state.values().values().all(|v| *v == 0.0));
    }

    #[test]
    fn instances_share_metadata_not_values() {
        let mut a = state();
        let b = state();
        a.set_joint("middle_pip", 1.0).unwrap();
        assert_eq!(b.joint_value("middle_pip").unwrap(), 0.0);
        assert!(Arc::ptr_eq(a.metadata(), b.metadata()));
    }
}
