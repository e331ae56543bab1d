use crate::foundation::core::Fps;
use crate::scene::model::Scene;

/// Number of frames a scene is shown by itself, before any transition.
///
/// `max(1, round(duration * fps))` — zero-length or inverted scenes still
/// emit one frame.
pub fn frames_for_scene(scene: &Scene, fps: Fps) -> u64 {
    fps.secs_to_frames_min1(scene.duration_secs())
}

/// Number of cross-dissolve frames between two adjacent scenes.
///
/// May be 0, in which case the boundary is a hard cut.
pub fn transition_frames(transition_secs: f64, fps: Fps) -> u64 {
    fps.secs_to_frames_round(transition_secs)
}

/// Dissolve progress for frame `k` of `n` transition frames.
///
/// Covers `[0, 1)` in `n` equal steps; monotonically non-decreasing in `k`.
pub fn transition_progress(k: u64, n: u64) -> f32 {
    debug_assert!(n > 0 && k < n);
    (k as f64 / n as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(start: f64, end: f64) -> Scene {
        Scene {
            text: String::new(),
            start_time: start,
            end_time: end,
            image_url: None,
        }
    }

    #[test]
    fn reference_scenario_frame_counts() {
        // 2 scenes of 2s and 3s at 25 fps with a 0.5s transition.
        let fps = Fps { num: 25, den: 1 };
        assert_eq!(frames_for_scene(&scene(0.0, 2.0), fps), 50);
        assert_eq!(frames_for_scene(&scene(2.0, 5.0), fps), 75);
        assert_eq!(transition_frames(0.5, fps), 13);
    }

    #[test]
    fn degenerate_scenes_get_one_frame() {
        let fps = Fps { num: 25, den: 1 };
        assert_eq!(frames_for_scene(&scene(1.0, 1.0), fps), 1);
        assert_eq!(frames_for_scene(&scene(2.0, 1.0), fps), 1);
    }

    #[test]
    fn zero_transition_means_hard_cut() {
        let fps = Fps { num: 25, den: 1 };
        assert_eq!(transition_frames(0.0, fps), 0);
    }

    #[test]
    fn progress_is_monotone_and_covers_unit_interval_exclusive() {
        let n = 13u64;
        let mut prev = -1.0f32;
        for k in 0..n {
            let p = transition_progress(k, n);
            assert!(p >= 0.0 && p < 1.0, "p={p} out of [0,1)");
            assert!(p > prev, "progress must increase");
            prev = p;
        }
        assert_eq!(transition_progress(0, n), 0.0);
    }

    #[test]
    fn progress_steps_are_equal() {
        let n = 10u64;
        let step = transition_progress(1, n) - transition_progress(0, n);
        for k in 1..n {
            let d = transition_progress(k, n) - transition_progress(k - 1, n);
            assert!((d - step).abs() < 1e-6);
        }
    }
}
