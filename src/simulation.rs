// src/simulation.rs - Synthetic detector output for running without a camera
use crate::landmarks::{HandTrackingResult, Landmark, LANDMARK_COUNT};
use crate::metadata::Handedness;
use nalgebra::{Rotation2, Vector2};

/// Finger base offsets from the wrist in image units, for an upright right hand.
const FINGER_BASES: [(f64, f64); 5] = [
    (-0.06, -0.05),
    (-0.04, -0.16),
    (0.0, -0.17),
    (0.035, -0.16),
    (0.07, -0.14),
];
const SEGMENT: f64 = 0.035;

/// A hand swaying about its wrist and slowly curling its fingers.
pub fn simulated_hand(t: f64, handedness: Handedness) -> HandTrackingResult {
    let wrist = Vector2::new(0.5 + 0.05 * (t * 0.5).cos(), 0.75 + 0.02 * t.sin());
    let sway = Rotation2::new(0.4 * (t * 0.7).sin());
    let curl = 0.5 + 0.5 * (t * 0.3).sin();
    let mirror = match handedness {
        Handedness::Right => 1.0,
        Handedness::Left => -1.0,
    };

    let mut landmarks = Vec::with_capacity(LANDMARK_COUNT);
    landmarks.push(Landmark::new(wrist.x, wrist.y, 0.0));

    for (finger, (bx, by)) in FINGER_BASES.iter().enumerate() {
        let base = Vector2::new(bx * mirror, *by);
        // Thumb landmarks start at the CMC, so its first point sits halfway out.
        let start = if finger == 0 { base * 0.5 } else { base };
        let direction = base.normalize();
        for joint in 0..4 {
            let bend = Rotation2::new(mirror * curl * 0.3 * joint as f64);
            let offset = start + bend * direction * SEGMENT * joint as f64;
            let p = wrist + sway * offset;
            landmarks.push(Landmark {
                x: p.x,
                y: p.y,
                z: -0.01 * joint as f64 * curl,
                visibility: Some(0.9),
            });
        }
    }

    HandTrackingResult::new(handedness, 0.9, landmarks)
}

/// Produces one tick of detections, dropping the hand for a short stretch
/// every few seconds.
pub fn simulated_frame(t: f64, handedness: Handedness) -> Vec<HandTrackingResult> {
    if t % 5.0 > 4.5 {
        Vec::new()
    } else {
        vec![simulated_hand(t, handedness)]
    }
}
