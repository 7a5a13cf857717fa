use hand_retarget::config::TrackingHand;
use hand_retarget::metadata::{FingerMetadata, Fingers, JointLimits};
use hand_retarget::models::{linker_l10_right, LINKER_L10_RIGHT};
use hand_retarget::simulation::simulated_hand;
use hand_retarget::{
    FingerName, GraphError, Handedness, HandTrackingResult, JointMetadata, JointType, Landmark,
    RetargetConfig, RetargetError, RetargetPipeline, RobotHandMetadata, RobotHandState, Skeleton,
    SkipReason,
};
use nalgebra::{UnitQuaternion, Vector3};
use std::sync::Arc;
use std::time::Duration;

fn thumb_only_hand() -> RobotHandMetadata {
    let full = linker_l10_right();
    RobotHandMetadata {
        id: "thumb-only".to_string(),
        fingers: Fingers {
            thumb: full.fingers.thumb.clone(),
            ..Fingers::default()
        },
        ..full
    }
}

fn detection(handedness: Handedness, wrist: (f64, f64), middle: (f64, f64)) -> HandTrackingResult {
    let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); 21];
    landmarks[0] = Landmark::new(wrist.0, wrist.1, 0.0);
    landmarks[9] = Landmark::new(middle.0, middle.1, 0.0);
    HandTrackingResult::new(handedness, 0.95, landmarks)
}

#[test]
fn thumb_payload_updates_named_joints_only() {
    let metadata = Arc::new(thumb_only_hand());
    let mut state = RobotHandState::new(Arc::clone(&metadata));
    assert_eq!(state.joint_count(), 5);

    let applied = state.set_joints([("thumb_cmc_roll", 0.8), ("thumb_cmc_pitch", 0.3)]);
    assert_eq!(applied, 2);
    assert_eq!(state.joint_value("thumb_cmc_roll").unwrap(), 0.8);
    assert_eq!(state.joint_value("thumb_cmc_pitch").unwrap(), 0.3);
    for untouched in ["thumb_cmc_yaw", "thumb_mcp", "thumb_ip"] {
        assert_eq!(state.joint_value(untouched).unwrap(), 0.0);
    }
}

#[test]
fn cyclic_links_fail_the_load() {
    let joint = |name: &str, parent: &str, child: &str| {
        Arc::new(JointMetadata {
            name: name.to_string(),
            joint_type: JointType::Revolute,
            position: Vector3::new(0.0, 0.0, 0.02),
            axis: Vector3::y(),
            limits: Some(JointLimits {
                lower: 0.0,
                upper: 1.0,
                effort: 1.0,
                velocity: 1.0,
            }),
            parent_link: parent.to_string(),
            child_link: child.to_string(),
        })
    };
    let cyclic = RobotHandMetadata {
        id: "cyclic".to_string(),
        fingers: Fingers {
            index: Some(FingerMetadata {
                name: FingerName::Index,
                joints: vec![
                    joint("index_a", "link_c", "link_a"),
                    joint("index_b", "link_a", "link_b"),
                    joint("index_c", "link_b", "link_c"),
                ],
            }),
            ..Fingers::default()
        },
        ..linker_l10_right()
    };

    assert!(matches!(
        Skeleton::from_metadata(&cyclic),
        Err(GraphError::Cycle { .. })
    ));

    let mut pipeline = RetargetPipeline::new(RetargetConfig::default()).unwrap();
    let err = pipeline.load_model(Arc::new(cyclic)).unwrap_err();
    assert!(matches!(err, RetargetError::Graph(GraphError::Cycle { .. })));
    assert!(pipeline.model().is_none());
}

#[test]
fn metadata_loads_from_json() {
    let json = serde_json::to_string(&*LINKER_L10_RIGHT).unwrap();
    let metadata = RobotHandMetadata::from_json_str(&json).unwrap();
    let skeleton = Skeleton::from_metadata(&metadata).unwrap();
    assert_eq!(skeleton.joints().len(), 20);
    assert_eq!(skeleton.base_link(), "hand_base_link");
}

#[test]
fn root_follows_palm_direction() {
    let mut pipeline = RetargetPipeline::new(RetargetConfig {
        smoothing: 0.0,
        ..RetargetConfig::default()
    })
    .unwrap();
    pipeline.load_builtin("linker-l10-right").unwrap();

    // Middle root to the right of the wrist: +Y swings onto +X.
    let out = pipeline.tick(&[detection(Handedness::Right, (0.4, 0.5), (0.6, 0.5))], None);
    assert!(out.skip_reason().is_none());
    assert!((out.root.rotation * Vector3::y() - Vector3::x()).norm() < 1e-9);

    let skeleton = pipeline.skeleton().unwrap();
    assert!(skeleton.root_rotation.angle_to(&out.root.rotation) < 1e-12);
}

#[test]
fn degenerate_frames_keep_the_previous_orientation() {
    let mut pipeline = RetargetPipeline::new(RetargetConfig {
        smoothing: 0.0,
        filter: hand_retarget::config::FilterConfig {
            enabled: false,
            ..Default::default()
        },
        ..RetargetConfig::default()
    })
    .unwrap();
    pipeline.load_builtin("linker-l10-right").unwrap();

    let good = pipeline.tick(&[detection(Handedness::Right, (0.4, 0.5), (0.4, 0.3))], None);
    let bad = pipeline.tick(&[detection(Handedness::Right, (0.4, 0.5), (0.4, 0.5))], None);
    assert_eq!(bad.skip_reason(), Some(SkipReason::DegenerateGeometry));
    assert_eq!(bad.root, good.root);
    // Calibration from the good frame is kept.
    assert_eq!(bad.calibration, good.calibration);
}

#[test]
fn smoothing_is_frame_rate_independent_with_elapsed_time() {
    let config = RetargetConfig {
        tracking_hand: TrackingHand::Auto,
        smoothing: 0.5,
        ..RetargetConfig::default()
    };
    let mut fast = RetargetPipeline::new(config.clone()).unwrap();
    let mut slow = RetargetPipeline::new(config).unwrap();

    let frames = |count: usize| -> Vec<Vec<HandTrackingResult>> {
        (0..count)
            .map(|_| vec![detection(Handedness::Left, (0.4, 0.5), (0.6, 0.5))])
            .collect()
    };

    for hands in frames(6) {
        fast.tick(&hands, Some(Duration::from_secs_f64(1.0 / 60.0)));
    }
    for hands in frames(3) {
        slow.tick(&hands, Some(Duration::from_secs_f64(1.0 / 30.0)));
    }

    let a = fast.root_pose().rotation;
    let b = slow.root_pose().rotation;
    assert!(a.angle_to(&b) < 1e-6);
    assert!(a.angle_to(&UnitQuaternion::identity()) > 0.1);
}

#[test]
fn simulated_session_tracks_every_visible_frame() {
    let mut pipeline = RetargetPipeline::new(RetargetConfig::default()).unwrap();
    pipeline.load_builtin("linker-l10-right").unwrap();

    for step in 0..120 {
        let hand = simulated_hand(step as f64 / 60.0, Handedness::Right);
        let out = pipeline.tick(&[hand], Some(Duration::from_secs_f64(1.0 / 60.0)));
        assert!(out.skip_reason().is_none(), "frame {}: {:?}", step, out.outcome);
        assert!(out.scale.is_finite() && out.scale > 0.0);
    }
}
