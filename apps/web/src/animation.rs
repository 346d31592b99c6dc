/// Total length of a counter change animation.
pub const COUNTER_DURATION_MS: u64 = 1000;
/// Time between two displayed values.
pub const COUNTER_STEP_MS: u64 = 50;
/// How long the highlight stays after the final value.
pub const COUNTER_HIGHLIGHT_MS: u64 = 500;

pub const fn counter_steps() -> u64 {
    COUNTER_DURATION_MS / COUNTER_STEP_MS
}

/// Fraction of the animation done after `step` frames, clamped to 0..=1.
#[allow(clippy::cast_precision_loss)]
pub fn tween_progress(step: u64) -> f64 {
    (step as f64 / counter_steps() as f64).clamp(0.0, 1.0)
}

/// Value to display at `step`. The last frame always lands exactly on `target`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn counter_frame(start: i64, target: i64, step: u64) -> i64 {
    if step >= counter_steps() {
        return target;
    }
    let span = (target - start) as f64;
    start + (span * tween_progress(step)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::{counter_frame, counter_steps, tween_progress};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual}, diff {diff}"
        );
    }

    #[test]
    fn one_second_at_fifty_milliseconds_is_twenty_frames() {
        assert_eq!(counter_steps(), 20);
        assert_close(tween_progress(10), 0.5);
    }

    #[test]
    fn first_frame_starts_at_the_old_value() {
        assert_eq!(counter_frame(1200, 1300, 0), 1200);
    }

    #[test]
    fn frames_advance_towards_the_target() {
        let frames: Vec<i64> = (0..=counter_steps())
            .map(|step| counter_frame(0, 40, step))
            .collect();

        assert_eq!(frames[10], 20);
        assert!(frames.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(frames.last(), Some(&40));
    }

    #[test]
    fn decrements_count_down() {
        assert_eq!(counter_frame(5, 4, counter_steps()), 4);
        assert!(counter_frame(5, 4, 5) >= 4);
    }

    #[test]
    fn overshooting_steps_stay_on_target() {
        assert_eq!(counter_frame(3, 9, 500), 9);
        assert_close(tween_progress(500), 1.0);
    }
}
