// src/skeleton.rs - Flattened joint graph with local transforms as source of truth
use crate::error::GraphError;
use crate::hand_state::RobotHandState;
use crate::metadata::{FingerName, JointType, RobotHandMetadata};
use crate::palm::{palm_dimensions, PalmDimensions};
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use std::collections::{HashMap, HashSet};
use std::sync::Weak;

/// Receives computed local transforms. Implemented by the rendering side; the
/// skeleton only ever holds weak references to it.
pub trait RenderHandle {
    fn set_local_transform(&self, position: &Vector3<f64>, rotation: &UnitQuaternion<f64>);
}

#[derive(Debug, Clone)]
pub struct SkeletonJoint {
    pub name: String,
    /// LOCAL position relative to the parent joint.
    pub position: Vector3<f64>,
    /// LOCAL rotation relative to the parent joint.
    pub rotation: UnitQuaternion<f64>,
    /// `None` for joints attached to the base link.
    pub parent_name: Option<String>,
    pub joint_type: JointType,
    pub axis: Vector3<f64>,
    /// Rest position from the metadata.
    pub origin: Vector3<f64>,
    pub handle: Option<Weak<dyn RenderHandle>>,
}

/// A LOCAL transform update for one joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTransform {
    pub name: String,
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    hand_id: String,
    base_link: String,
    joints: Vec<SkeletonJoint>,
    index: HashMap<String, usize>,
    /// Joint indices from the base down to each joint, inclusive.
    chains: Vec<Vec<usize>>,
    finger_bases: Vec<(FingerName, String)>,
    palm: PalmDimensions,
    pub root_position: Vector3<f64>,
    pub root_rotation: UnitQuaternion<f64>,
}

struct LinkGraph<'a> {
    base_link: &'a str,
    parent_links: Vec<&'a str>,
    by_child_link: HashMap<&'a str, usize>,
    names: Vec<&'a str>,
    depth_limit: usize,
}

impl<'a> LinkGraph<'a> {
    /// Walks from `start` toward the base link. Returns indices base first.
    fn chain(&self, start: usize) -> Result<Vec<usize>, GraphError> {
        let mut chain = vec![start];
        let mut visited = HashSet::from([start]);
        let mut current = start;

        loop {
            let parent_link = self.parent_links[current];
            if parent_link == self.base_link {
                break;
            }
            // Unresolvable parents attach to the base link.
            let Some(&parent) = self.by_child_link.get(parent_link) else {
                break;
            };
            if !visited.insert(parent) {
                return Err(GraphError::Cycle {
                    joint: self.names[start].to_string(),
                });
            }
            chain.push(parent);
            if chain.len() > self.depth_limit {
                return Err(GraphError::DepthExceeded {
                    joint: self.names[start].to_string(),
                    limit: self.depth_limit,
                });
            }
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }
}

impl Skeleton {
    /// Builds the joint graph for a hand. Fails on duplicate names, ambiguous child
    /// links, cycles, or chains deeper than twice the longest finger.
    pub fn from_metadata(metadata: &RobotHandMetadata) -> Result<Self, GraphError> {
        let source: Vec<_> = metadata.joints().collect();

        let mut index = HashMap::with_capacity(source.len());
        let mut by_child_link: HashMap<&str, usize> = HashMap::with_capacity(source.len());
        for (i, joint) in source.iter().enumerate() {
            if index.insert(joint.name.clone(), i).is_some() {
                return Err(GraphError::DuplicateJoint(joint.name.clone()));
            }
            if let Some(&other) = by_child_link.get(joint.child_link.as_str()) {
                return Err(GraphError::DuplicateChildLink {
                    link: joint.child_link.clone(),
                    first: source[other].name.clone(),
                    second: joint.name.clone(),
                });
            }
            by_child_link.insert(joint.child_link.as_str(), i);
        }

        let graph = LinkGraph {
            base_link: metadata.base_link.as_str(),
            parent_links: source.iter().map(|j| j.parent_link.as_str()).collect(),
            by_child_link,
            names: source.iter().map(|j| j.name.as_str()).collect(),
            depth_limit: 2 * metadata.max_finger_depth().max(1),
        };

        let chains = (0..source.len())
            .map(|i| graph.chain(i))
            .collect::<Result<Vec<_>, _>>()?;

        let joints = source
            .iter()
            .zip(chains.iter())
            .map(|(joint, chain)| {
                let parent_name = chain
                    .len()
                    .checked_sub(2)
                    .map(|p| source[chain[p]].name.clone());
                SkeletonJoint {
                    name: joint.name.clone(),
                    position: joint.position,
                    rotation: UnitQuaternion::identity(),
                    parent_name,
                    joint_type: joint.joint_type,
                    axis: joint.axis,
                    origin: joint.position,
                    handle: None,
                }
            })
            .collect();

        let finger_bases = metadata
            .fingers
            .iter()
            .filter_map(|finger| finger.base_joint().map(|j| (finger.name, j.name.clone())))
            .collect();

        let mut skeleton = Self {
            hand_id: metadata.id.clone(),
            base_link: metadata.base_link.clone(),
            joints,
            index,
            chains,
            finger_bases,
            palm: PalmDimensions::default(),
            root_position: Vector3::zeros(),
            root_rotation: UnitQuaternion::identity(),
        };
        skeleton.palm = palm_dimensions(&skeleton);

        tracing::debug!(
            "Built skeleton for \"{}\": {} joints, base link \"{}\"",
            skeleton.hand_id,
            skeleton.joints.len(),
            skeleton.base_link
        );
        Ok(skeleton)
    }

    pub fn hand_id(&self) -> &str {
        &self.hand_id
    }

    pub fn base_link(&self) -> &str {
        &self.base_link
    }

    pub fn joints(&self) -> &[SkeletonJoint] {
        &self.joints
    }

    pub fn joint(&self, name: &str) -> Option<&SkeletonJoint> {
        self.index.get(name).map(|&i| &self.joints[i])
    }

    pub fn palm(&self) -> &PalmDimensions {
        &self.palm
    }

    /// Name of the first joint of a finger, if the hand has that finger.
    pub fn finger_base(&self, finger: FingerName) -> Option<&str> {
        self.finger_bases
            .iter()
            .find(|(name, _)| *name == finger)
            .map(|(_, joint)| joint.as_str())
    }

    /// Joints from the base link down to `name`, inclusive.
    pub fn parent_chain(&self, name: &str) -> Option<Vec<&SkeletonJoint>> {
        let &i = self.index.get(name)?;
        Some(self.chains[i].iter().map(|&j| &self.joints[j]).collect())
    }

    /// Sum of LOCAL positions along the parent chain.
    ///
    /// Rotations are not composed, so the result ignores joint angles. Use
    /// [`posed_world_transform`](Self::posed_world_transform) for the posed frame.
    pub fn world_position(&self, name: &str) -> Option<Vector3<f64>> {
        let &i = self.index.get(name)?;
        Some(
            self.chains[i]
                .iter()
                .fold(Vector3::zeros(), |acc, &j| acc + self.joints[j].position),
        )
    }

    /// The joint axis in the hand frame, assuming identity rotations along the
    /// chain. Only exact while the parent joints sit at zero.
    pub fn world_axis(&self, name: &str) -> Option<Vector3<f64>> {
        let joint = self.joint(name)?;
        Some(
            Unit::try_new(joint.axis, f64::EPSILON)
                .map(|axis| axis.into_inner())
                .unwrap_or_else(Vector3::zeros),
        )
    }

    /// Full rigid transform of a joint frame, composing LOCAL translation and
    /// rotation of every joint on the chain.
    pub fn posed_world_transform(&self, name: &str) -> Option<Isometry3<f64>> {
        let &i = self.index.get(name)?;
        Some(self.chains[i].iter().fold(Isometry3::identity(), |acc, &j| {
            let joint = &self.joints[j];
            acc * Isometry3::from_parts(Translation3::from(joint.position), joint.rotation)
        }))
    }

    /// Direct children of a joint; `None` lists the joints on the base link.
    pub fn children(&self, parent: Option<&str>) -> Vec<&SkeletonJoint> {
        self.joints
            .iter()
            .filter(|joint| joint.parent_name.as_deref() == parent)
            .collect()
    }

    /// All joints below `name`, depth first.
    pub fn descendants(&self, name: &str) -> Vec<&SkeletonJoint> {
        let mut found = Vec::new();
        let mut stack = vec![name];
        while let Some(current) = stack.pop() {
            for child in self.children(Some(current)) {
                found.push(child);
                stack.push(child.name.as_str());
            }
        }
        found
    }

    /// Parent name to child names.
    pub fn hierarchy(&self) -> HashMap<Option<String>, Vec<String>> {
        let mut hierarchy: HashMap<Option<String>, Vec<String>> = HashMap::new();
        for joint in &self.joints {
            hierarchy
                .entry(joint.parent_name.clone())
                .or_default()
                .push(joint.name.clone());
        }
        hierarchy
    }

    pub fn update_joint_transform(
        &mut self,
        name: &str,
        position: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                self.joints[i].position = position;
                self.joints[i].rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Applies a batch of LOCAL transforms; unknown joints are skipped.
    pub fn update_joints<I>(&mut self, updates: I) -> usize
    where
        I: IntoIterator<Item = JointTransform>,
    {
        updates
            .into_iter()
            .filter(|u| self.update_joint_transform(&u.name, u.position, u.rotation))
            .count()
    }

    pub fn update_root_transform(&mut self, position: Vector3<f64>, rotation: UnitQuaternion<f64>) {
        self.root_position = position;
        self.root_rotation = rotation;
    }

    /// Derives LOCAL transforms from joint values: rotational joints turn about
    /// their axis, prismatic joints slide along it. Returns joints updated.
    pub fn apply_state(&mut self, state: &RobotHandState) -> usize {
        let mut updated = 0;
        for joint_state in state.iter() {
            let Some(&i) = self.index.get(&joint_state.metadata.name) else {
                continue;
            };
            let joint = &mut self.joints[i];
            let Some(axis) = Unit::try_new(joint.axis, f64::EPSILON) else {
                continue;
            };
            let value = joint_state.current_value;

            match joint.joint_type {
                JointType::Revolute | JointType::Continuous => {
                    joint.position = joint.origin;
                    joint.rotation = UnitQuaternion::from_axis_angle(&axis, value);
                }
                JointType::Prismatic => {
                    joint.position = joint.origin + axis.into_inner() * value;
                    joint.rotation = UnitQuaternion::identity();
                }
                JointType::Fixed | JointType::Floating | JointType::Planar => continue,
            }
            updated += 1;
        }
        updated
    }

    pub fn joint_transforms(&self) -> impl Iterator<Item = JointTransform> + '_ {
        self.joints.iter().map(|joint| JointTransform {
            name: joint.name.clone(),
            position: joint.position,
            rotation: joint.rotation,
        })
    }

    pub fn attach_handle(&mut self, name: &str, handle: Weak<dyn RenderHandle>) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                self.joints[i].handle = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Pushes LOCAL transforms to every render handle that is still alive.
    pub fn sync_handles(&self) -> usize {
        let mut pushed = 0;
        for joint in &self.joints {
            if let Some(handle) = joint.handle.as_ref().and_then(Weak::upgrade) {
                handle.set_local_transform(&joint.position, &joint.rotation);
                pushed += 1;
            }
        }
        pushed
    }
}
