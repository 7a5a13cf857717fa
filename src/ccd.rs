// src/ccd.rs - Cyclic coordinate descent over a simple bone chain
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

const MIN_STEP: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub struct CcdLink {
    /// Offset from the previous link, in its frame.
    pub offset: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    /// Disabled links keep their rotation.
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcdOptions {
    pub iterations: usize,
    pub min_angle: f64,
    pub max_angle: f64,
    /// Stop once the effector is this close to the target.
    pub tolerance: f64,
}

impl Default for CcdOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            min_angle: 0.0,
            max_angle: 1.0,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcdReport {
    pub iterations: usize,
    pub distance: f64,
}

/// A serial chain whose last link is the end effector.
#[derive(Debug, Clone, PartialEq)]
pub struct CcdChain {
    pub root: Vector3<f64>,
    pub links: Vec<CcdLink>,
}

impl CcdChain {
    pub fn new(root: Vector3<f64>) -> Self {
        Self {
            root,
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, offset: Vector3<f64>, enabled: bool) -> Self {
        self.links.push(CcdLink {
            offset,
            rotation: UnitQuaternion::identity(),
            enabled,
        });
        self
    }

    fn world_transforms(&self) -> Vec<Isometry3<f64>> {
        let mut parent = Isometry3::from_parts(Translation3::from(self.root), UnitQuaternion::identity());
        self.links
            .iter()
            .map(|link| {
                parent *= Isometry3::from_parts(Translation3::from(link.offset), link.rotation);
                parent
            })
            .collect()
    }

    pub fn link_positions(&self) -> Vec<Vector3<f64>> {
        self.world_transforms()
            .iter()
            .map(|t| t.translation.vector)
            .collect()
    }

    pub fn effector_position(&self) -> Vector3<f64> {
        self.link_positions().last().copied().unwrap_or(self.root)
    }

    /// Rotates links toward `target`, from the effector's parent back to the root,
    /// until the effector is within tolerance, nothing moves, or iterations run out.
    pub fn solve(&mut self, target: &Vector3<f64>, options: &CcdOptions) -> CcdReport {
        let mut iterations = 0;

        while iterations < options.iterations {
            if (self.effector_position() - target).norm() <= options.tolerance {
                break;
            }
            iterations += 1;

            let mut moved = false;
            for i in (0..self.links.len().saturating_sub(1)).rev() {
                if !self.links[i].enabled {
                    continue;
                }
                let transforms = self.world_transforms();
                let Some(effector) = transforms.last().map(|t| t.translation.vector) else {
                    break;
                };
                let joint = &transforms[i];
                let pivot = joint.translation.vector;

                let inverse = joint.rotation.inverse();
                let to_effector = inverse * (effector - pivot);
                let to_target = inverse * (target - pivot);
                let (Some(e), Some(t)) = (
                    Unit::try_new(to_effector, f64::EPSILON),
                    Unit::try_new(to_target, f64::EPSILON),
                ) else {
                    continue;
                };
                let (e, t) = (e.into_inner(), t.into_inner());

                let angle = e.dot(&t).clamp(-1.0, 1.0).acos();
                if angle <= MIN_STEP {
                    continue;
                }
                let Some(axis) = Unit::try_new(e.cross(&t), f64::EPSILON) else {
                    continue;
                };
                let angle = angle.max(options.min_angle).min(options.max_angle);

                let link = &mut self.links[i];
                link.rotation *= UnitQuaternion::from_axis_angle(&axis, angle);
                moved = true;
            }

            if !moved {
                break;
            }
        }

        CcdReport {
            iterations,
            distance: (self.effector_position() - target).norm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> CcdChain {
        CcdChain::new(Vector3::new(0.0, -12.0, 0.0))
            .with_link(Vector3::zeros(), true)
            .with_link(Vector3::new(0.0, 8.0, 0.0), true)
            .with_link(Vector3::new(0.0, 8.0, 0.0), true)
            .with_link(Vector3::new(0.0, 8.0, 0.0), true)
    }

    #[test]
    fn rest_pose_is_straight() {
        let chain = arm();
        assert!((chain.effector_position() - Vector3::new(0.0, 12.0, 0.0)).norm() < 1e-12);
        assert_eq!(chain.link_positions().len(), 4);
    }

    #[test]
    fn converges_on_reachable_target() {
        let mut chain = arm();
        let target = Vector3::new(8.0, 0.0, 4.0);
        let report = chain.solve(
            &target,
            &CcdOptions {
                iterations: 200,
                ..CcdOptions::default()
            },
        );
        assert!(report.distance < 1e-3, "{:?}", report);
        assert!((chain.effector_position() - target).norm() < 1e-3);
    }

    #[test]
    fn stops_early_when_already_aligned() {
        let mut chain = arm();
        // Straight up and out of reach: every link already points at it.
        let report = chain.solve(&Vector3::new(0.0, 100.0, 0.0), &CcdOptions::default());
        assert_eq!(report.iterations, 1);
        assert!((report.distance - 88.0).abs() < 1e-9);
    }

    #[test]
    fn disabled_links_keep_their_rotation() {
        let mut chain = arm();
        chain.links[1].enabled = false;
        chain.solve(&Vector3::new(6.0, 2.0, 0.0), &CcdOptions::default());
        assert_eq!(chain.links[1].rotation, UnitQuaternion::identity());
        assert!(chain.links[2].rotation.angle() > 0.0);
    }

    #[test]
    fn step_angle_is_clamped() {
        let mut chain = arm();
        let options = CcdOptions {
            iterations: 1,
            max_angle: 0.1,
            ..CcdOptions::default()
        };
        chain.solve(&Vector3::new(10.0, -5.0, 0.0), &options);
        for link in &chain.links {
            assert!(link.rotation.angle() <= 0.1 + 1e-12);
        }
    }
}
