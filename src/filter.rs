// src/filter.rs - Per-hand exponential smoothing of detector landmarks
use crate::config::{validate_alpha, FilterConfig};
use crate::error::Result;
use crate::landmarks::{HandTrackingResult, Landmark};
use crate::metadata::Handedness;
use std::collections::HashMap;
use std::time::Duration;

struct HandHistory {
    landmarks: Vec<Landmark>,
    missed_frames: u32,
    seen_this_frame: bool,
}

/// Exponential moving average over landmark sets, keyed by handedness.
///
/// The first sighting of a hand is returned unchanged. A hand that stays out of
/// frame for `max_missed_frames` ticks is forgotten, so it restarts cold instead
/// of blending with a stale pose when it comes back.
pub struct LandmarkFilter {
    config: FilterConfig,
    reference_rate_hz: f64,
    history: HashMap<Handedness, HandHistory>,
}

impl LandmarkFilter {
    pub fn new(config: FilterConfig, reference_rate_hz: f64) -> Self {
        Self {
            config,
            reference_rate_hz,
            history: HashMap::new(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.config.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        validate_alpha(alpha)?;
        self.config.alpha = alpha;
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Smooths one hand with an explicit alpha, clamped into (0,1].
    pub fn filter(&mut self, key: Handedness, raw: &[Landmark], alpha: f64) -> Vec<Landmark> {
        let alpha = if alpha.is_nan() {
            1.0
        } else {
            alpha.clamp(f64::MIN_POSITIVE, 1.0)
        };
        self.blend(key, raw, alpha)
    }

    /// Smooths one hand with the configured alpha, rescaled for the time since the
    /// previous sample. At the reference rate this equals [`filter`](Self::filter).
    pub fn filter_elapsed(
        &mut self,
        key: Handedness,
        raw: &[Landmark],
        elapsed: Duration,
    ) -> Vec<Landmark> {
        let frames = elapsed.as_secs_f64() * self.reference_rate_hz;
        let alpha = 1.0 - (1.0 - self.config.alpha).powf(frames);
        self.blend(key, raw, alpha.clamp(0.0, 1.0))
    }

    /// Smooths every hand of one tick and advances the eviction clock.
    ///
    /// With `elapsed` the alpha is rescaled for the frame time; without it the
    /// configured alpha is applied per call.
    pub fn filter_frame(
        &mut self,
        results: &[HandTrackingResult],
        elapsed: Option<Duration>,
    ) -> Vec<HandTrackingResult> {
        let alpha = self.config.alpha;
        let filtered = results
            .iter()
            .map(|result| {
                let landmarks = match elapsed {
                    Some(dt) => self.filter_elapsed(result.handedness, &result.landmarks, dt),
                    None => self.filter(result.handedness, &result.landmarks, alpha),
                };
                HandTrackingResult {
                    landmarks,
                    ..result.clone()
                }
            })
            .collect();

        self.end_frame();
        filtered
    }

    /// Ages hands that were not filtered since the last call and evicts the ones
    /// that have been missing for too long.
    pub fn end_frame(&mut self) {
        let max_missed = self.config.max_missed_frames;
        self.history.retain(|key, hand| {
            if hand.seen_this_frame {
                hand.seen_this_frame = false;
                hand.missed_frames = 0;
                return true;
            }
            hand.missed_frames += 1;
            if hand.missed_frames >= max_missed {
                tracing::debug!(
                    "Dropping {} hand history after {} missed frames",
                    key,
                    hand.missed_frames
                );
                return false;
            }
            true
        });
    }

    pub fn has_history(&self, key: Handedness) -> bool {
        self.history.contains_key(&key)
    }

    /// Forgets every hand.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn blend(&mut self, key: Handedness, raw: &[Landmark], alpha: f64) -> Vec<Landmark> {
        let enabled = self.config.enabled;
        let hand = self.history.entry(key).or_insert_with(|| HandHistory {
            landmarks: Vec::new(),
            missed_frames: 0,
            seen_this_frame: false,
        });
        hand.seen_this_frame = true;

        // A corrupt sample never enters the history. The caller sees it as is
        // and the next clean sample blends with the last good one.
        if !raw.iter().all(Landmark::is_finite) {
            return raw.to_vec();
        }

        // Cold start, disabled filter, or a landmark set of a different shape.
        if !enabled || hand.landmarks.is_empty() || hand.landmarks.len() != raw.len() {
            hand.landmarks = raw.to_vec();
            return raw.to_vec();
        }

        let filtered: Vec<Landmark> = raw
            .iter()
            .zip(hand.landmarks.iter())
            .map(|(current, previous)| Landmark {
                x: alpha * current.x + (1.0 - alpha) * previous.x,
                y: alpha * current.y + (1.0 - alpha) * previous.y,
                z: alpha * current.z + (1.0 - alpha) * previous.z,
                visibility: current.visibility,
            })
            .collect();

        hand.landmarks = filtered.clone();
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(offset: f64) -> Vec<Landmark> {
        (0..21)
            .map(|i| Landmark {
                x: 0.1 + offset + i as f64 * 0.01,
                y: 0.5 - offset,
                z: -0.02 * offset,
                visibility: Some(0.9),
            })
            .collect()
    }

    fn filter_with(max_missed_frames: u32) -> LandmarkFilter {
        LandmarkFilter::new(
            FilterConfig {
                enabled: true,
                alpha: 0.5,
                max_missed_frames,
            },
            60.0,
        )
    }

    #[test]
    fn cold_start_returns_input_unchanged() {
        let mut filter = filter_with(30);
        let raw = hand(0.2);
        let out = filter.filter(Handedness::Right, &raw, 0.5);
        assert_eq!(out, raw);
    }

    #[test]
    fn non_finite_sample_leaves_history_untouched() {
        let mut filter = filter_with(30);
        filter.filter(Handedness::Right, &hand(0.0), 0.5);

        let mut corrupt = hand(0.2);
        corrupt[0].x = f64::NAN;
        let out = filter.filter(Handedness::Right, &corrupt, 0.5);
        assert!(out[0].x.is_nan());

        let out = filter.filter(Handedness::Right, &hand(0.2), 0.5);
        assert!(out.iter().all(Landmark::is_finite));
        assert!((out[0].x - 0.2).abs() < 1e-12);
    }

    #[test]
    fn non_finite_cold_start_is_not_stored() {
        let mut filter = filter_with(30);
        let mut corrupt = hand(0.0);
        corrupt[4].z = f64::INFINITY;
        filter.filter(Handedness::Left, &corrupt, 0.5);

        let clean = hand(0.3);
        assert_eq!(filter.filter(Handedness::Left, &clean, 0.5), clean);
    }

    #[test]
    fn blends_with_previous_sample() {
        let mut filter = filter_with(30);
        filter.filter(Handedness::Right, &hand(0.0), 0.5);
        let out = filter.filter(Handedness::Right, &hand(0.2), 0.5);
        assert!((out[0].x - 0.2).abs() < 1e-12);
        assert!((out[0].y - 0.4).abs() < 1e-12);
        assert_eq!(out[0].visibility, Some(0.9));
    }

    #[test]
    fn converges_monotonically() {
        let mut filter = filter_with(30);
        let target = hand(0.3);
        filter.filter(Handedness::Right, &hand(0.0), 0.5);

        let mut last_gap = f64::INFINITY;
        for _ in 0..20 {
            let out = filter.filter(Handedness::Right, &target, 0.5);
            let gap = (out[5].x - target[5].x).abs() + (out[5].y - target[5].y).abs();
            assert!(gap <= last_gap);
            last_gap = gap;
        }
        assert!(last_gap < 1e-5);
    }

    #[test]
    fn hands_are_filtered_independently() {
        let mut filter = filter_with(30);
        filter.filter(Handedness::Right, &hand(0.0), 0.5);
        let left = hand(0.4);
        assert_eq!(filter.filter(Handedness::Left, &left, 0.5), left);
    }

    #[test]
    fn missing_hand_is_evicted() {
        let mut filter = filter_with(3);
        filter.filter(Handedness::Right, &hand(0.0), 0.5);
        filter.end_frame();
        filter.end_frame();
        filter.end_frame();
        assert!(filter.has_history(Handedness::Right));
        filter.end_frame();
        assert!(!filter.has_history(Handedness::Right));

        let fresh = hand(0.4);
        assert_eq!(filter.filter(Handedness::Right, &fresh, 0.5), fresh);
    }

    #[test]
    fn elapsed_variant_matches_per_tick_at_reference_rate() {
        let mut per_tick = filter_with(30);
        let mut timed = filter_with(30);
        per_tick.filter(Handedness::Left, &hand(0.0), 0.5);
        timed.filter(Handedness::Left, &hand(0.0), 0.5);

        let a = per_tick.filter(Handedness::Left, &hand(0.2), 0.5);
        let one_frame = Duration::from_secs_f64(1.0 / 60.0);
        let b = timed.filter_elapsed(Handedness::Left, &hand(0.2), one_frame);
        assert!((a[3].x - b[3].x).abs() < 1e-6);

        // Two reference frames of time move further than one.
        let c = timed.filter_elapsed(Handedness::Left, &hand(0.4), one_frame * 2);
        let expected = 0.75 * hand(0.4)[3].x + 0.25 * b[3].x;
        assert!((c[3].x - expected).abs() < 1e-6);
    }

    #[test]
    fn disabled_filter_passes_through() {
        let mut filter = filter_with(30);
        filter.set_enabled(false);
        filter.filter(Handedness::Right, &hand(0.0), 0.5);
        let raw = hand(0.3);
        assert_eq!(filter.filter(Handedness::Right, &raw, 0.5), raw);
    }

    #[test]
    fn set_alpha_validates_range() {
        let mut filter = filter_with(30);
        assert!(filter.set_alpha(0.0).is_err());
        assert!(filter.set_alpha(1.5).is_err());
        assert!(filter.set_alpha(0.8).is_ok());
        assert_eq!(filter.alpha(), 0.8);
    }

    #[test]
    fn filter_frame_keeps_metadata_and_ages_absent_hands() {
        let mut filter = filter_with(2);
        let first = vec![HandTrackingResult::new(Handedness::Left, 0.8, hand(0.0))];
        let out = filter.filter_frame(&first, None);
        assert_eq!(out[0].score, 0.8);
        assert_eq!(out[0].handedness, Handedness::Left);

        filter.filter_frame(&[], None);
        assert!(filter.has_history(Handedness::Left));
        filter.filter_frame(&[], None);
        assert!(!filter.has_history(Handedness::Left));
    }
}
