// src/models.rs - Built-in hand designs
use crate::metadata::{
    FingerMetadata, FingerName, Fingers, Handedness, JointLimits, JointMetadata, JointType,
    RobotHandMetadata,
};
use nalgebra::Vector3;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Shared instance of [`linker_l10_right`]; every hand state built from it
/// refers to the same metadata.
pub static LINKER_L10_RIGHT: Lazy<Arc<RobotHandMetadata>> =
    Lazy::new(|| Arc::new(linker_l10_right()));

const EFFORT: f64 = 100.0;

fn revolute(
    name: &str,
    position: [f64; 3],
    axis: [f64; 3],
    (lower, upper): (f64, f64),
    velocity: f64,
    links: (&str, &str),
) -> Arc<JointMetadata> {
    Arc::new(JointMetadata {
        name: name.to_string(),
        joint_type: JointType::Revolute,
        position: Vector3::from(position),
        axis: Vector3::from(axis),
        limits: Some(JointLimits {
            lower,
            upper,
            effort: EFFORT,
            velocity,
        }),
        parent_link: links.0.to_string(),
        child_link: links.1.to_string(),
    })
}

fn finger(name: FingerName, joints: Vec<Arc<JointMetadata>>) -> Option<FingerMetadata> {
    Some(FingerMetadata { name, joints })
}

/// Linker L10 right hand, 20 actuated joints.
///
/// Thumb has 5 DOF (cmc roll/yaw/pitch, mcp, ip), middle 3, the others 4.
pub fn linker_l10_right() -> RobotHandMetadata {
    const BASE: &str = "hand_base_link";

    let thumb = vec![
        revolute(
            "thumb_cmc_roll",
            [-0.013419, 0.012551, 0.060602],
            [0.99996, 0.0, -0.0087265],
            (0.0, 1.1339),
            1.0,
            (BASE, "thumb_metacarpals_base1"),
        ),
        revolute(
            "thumb_cmc_yaw",
            [0.035797, -0.00065879, 0.00045944],
            [0.008517, -0.21782, -0.97595],
            (0.0, 1.9189),
            0.0,
            ("thumb_metacarpals_base1", "thumb_metacarpals_base2"),
        ),
        revolute(
            "thumb_cmc_pitch",
            [0.0046051, 0.014383, -0.0051478],
            [0.0, 1.0, 0.0],
            (0.0, 0.5146),
            1.0,
            ("thumb_metacarpals_base2", "thumb_metacarpals"),
        ),
        revolute(
            "thumb_mcp",
            [0.0061722, 0.0, 0.047968],
            [0.0, 1.0, 0.0],
            (0.0, 0.7152),
            1.0,
            ("thumb_metacarpals", "thumb_proximal"),
        ),
        revolute(
            "thumb_ip",
            [-0.00017064, 0.0, 0.038665],
            [0.0, 1.0, 0.0],
            (0.0, 0.7763),
            1.0,
            ("thumb_proximal", "thumb_distal"),
        ),
    ];

    let index = vec![
        revolute(
            "index_mcp_roll",
            [-0.0021643, 0.026654, 0.13253],
            [-0.99996, 0.0, 0.0087265],
            (0.0, 0.2181),
            1.0,
            (BASE, "index_metacarpals"),
        ),
        revolute(
            "index_mcp_pitch",
            [0.0020763, 0.0, 0.015294],
            [0.0, 1.0, 0.0],
            (0.0, 1.3607),
            1.0,
            ("index_metacarpals", "index_proximal"),
        ),
        revolute(
            "index_pip",
            [-0.0013807, 0.0, 0.035624],
            [0.0, 1.0, 0.0],
            (0.0, 1.8317),
            1.0,
            ("index_proximal", "index_middle"),
        ),
        revolute(
            "index_dip",
            [-0.0054686, 0.0, 0.025665],
            [0.0, 1.0, 0.0],
            (0.0, 1.8317),
            1.0,
            ("index_middle", "index_distal"),
        ),
    ];

    let middle = vec![
        revolute(
            "middle_mcp_pitch",
            [-0.0021316, 0.0076542, 0.15281],
            [0.0, 1.0, 0.0],
            (0.0, 1.3607),
            1.0,
            (BASE, "middle_proximal"),
        ),
        revolute(
            "middle_pip",
            [-0.001397, 0.0, 0.035623],
            [0.0, 1.0, 0.0],
            (0.0, 1.8317),
            1.0,
            ("middle_proximal", "middle_middle"),
        ),
        revolute(
            "middle_dip",
            [-0.0055098, 0.0, 0.025656],
            [0.0, 1.0, 0.0],
            (0.0, 0.628),
            1.0,
            ("middle_middle", "middle_distal"),
        ),
    ];

    let ring = vec![
        revolute(
            "ring_mcp_roll",
            [-0.0021643, -0.011346, 0.13253],
            [0.99996, 0.0, 0.0087265],
            (0.0, 0.2181),
            1.0,
            (BASE, "ring_metacarpals"),
        ),
        revolute(
            "ring_mcp_pitch",
            [0.0020763, 0.0, 0.015294],
            [0.0, 1.0, 0.0],
            (0.0, 1.3607),
            1.0,
            ("ring_metacarpals", "ring_proximal"),
        ),
        revolute(
            "ring_pip",
            [-0.0013807, 0.0, 0.035624],
            [0.0, 1.0, 0.0],
            (0.0, 1.8317),
            1.0,
            ("ring_proximal", "ring_middle"),
        ),
        revolute(
            "ring_dip",
            [-0.0054686, 0.0, 0.025665],
            [0.0, 1.0, 0.0],
            (0.0, 0.628),
            1.0,
            ("ring_middle", "ring_distal"),
        ),
    ];

    let pinky = vec![
        revolute(
            "pinky_mcp_roll",
            [-0.00012074, -0.030346, 0.12755],
            [0.99996, 0.0, 0.0087265],
            (0.0, 0.3489),
            1.0,
            (BASE, "pinky_metacarpals"),
        ),
        revolute(
            "pinky_mcp_pitch",
            [0.0020763, 0.0, 0.015294],
            [0.0, 1.0, 0.0],
            (0.0, 1.3607),
            1.0,
            ("pinky_metacarpals", "pinky_proximal"),
        ),
        revolute(
            "pinky_pip",
            [-0.0013807, 0.0, 0.035624],
            [0.0, 1.0, 0.0],
            (0.0, 1.8317),
            1.0,
            ("pinky_proximal", "pinky_middle"),
        ),
        revolute(
            "pinky_dip",
            [-0.0054686, 0.0, 0.025665],
            [0.0, 1.0, 0.0],
            (0.0, 0.628),
            1.0,
            ("pinky_middle", "pinky_distal"),
        ),
    ];

    RobotHandMetadata {
        id: "linker-l10-right".to_string(),
        name: "Linker L10 Right Hand".to_string(),
        brand: "Linker".to_string(),
        model: "L10".to_string(),
        handedness: Handedness::Right,
        source_path: Some(
            "/assets/robots/hands/linker_l10/right/linkerhand_l10_right.urdf".to_string(),
        ),
        base_link: BASE.to_string(),
        fingers: Fingers {
            thumb: finger(FingerName::Thumb, thumb),
            index: finger(FingerName::Index, index),
            middle: finger(FingerName::Middle, middle),
            ring: finger(FingerName::Ring, ring),
            pinky: finger(FingerName::Pinky, pinky),
        },
    }
}

/// Looks up a built-in hand design by id.
pub fn builtin(id: &str) -> Option<Arc<RobotHandMetadata>> {
    match id {
        "linker-l10-right" => Some(Arc::clone(&LINKER_L10_RIGHT)),
        _ => None,
    }
}
