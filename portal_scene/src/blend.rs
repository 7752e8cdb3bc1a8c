//! Exponential easing used for every portal transition.
//!
//! The contract is `value ← target + (value − target) · exp(−dt/τ)`: the
//! remaining gap shrinks by a fixed fraction per unit time, so the value
//! approaches its target monotonically and never overshoots, whatever the
//! frame spacing.

/// Damping time constant, in seconds, shared by every stage transition.
pub const BLEND_TIME_CONSTANT: f32 = 0.2;

/// Fraction of the remaining gap covered after `dt` seconds of easing with
/// time constant `tau`. Negative or NaN `dt` contributes no motion; the
/// result is always in [0, 1].
pub fn settle_fraction(tau: f32, dt: f32) -> f32 {
    1.0 - (-dt.max(0.0) / tau).exp()
}

/// Move `value` toward `target` by `dt` seconds of easing.
pub fn approach(value: f32, target: f32, tau: f32, dt: f32) -> f32 {
    value + (target - value) * settle_fraction(tau, dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(value: f32, target: f32) -> f32 {
        approach(value, target, BLEND_TIME_CONSTANT, 0.1)
    }

    #[test]
    fn settle_fraction_ignores_negative_and_nan_dt() {
        assert_eq!(settle_fraction(BLEND_TIME_CONSTANT, -1.0), 0.0);
        assert_eq!(settle_fraction(BLEND_TIME_CONSTANT, f32::NAN), 0.0);
        assert_eq!(settle_fraction(BLEND_TIME_CONSTANT, 0.0), 0.0);
    }

    #[test]
    fn settle_fraction_saturates_for_huge_dt() {
        let fraction = settle_fraction(BLEND_TIME_CONSTANT, 1.0e6);
        assert_eq!(fraction, 1.0);
        assert_eq!(approach(0.25, 1.0, BLEND_TIME_CONSTANT, f32::INFINITY), 1.0);
    }

    #[test]
    fn approach_matches_exponential_decay_table() {
        // Remaining error after n steps of dt=0.1 at tau=0.2 is exp(-0.5n).
        let expected = [
            0.39346934, 0.63212056, 0.77686984, 0.86466472, 0.91791500,
            0.95021293, 0.96980262, 0.98168436, 0.98889100, 0.99326205,
        ];
        let mut value = 0.0f32;
        for (index, want) in expected.iter().enumerate() {
            value = step(value, 1.0);
            assert!(
                (value - want).abs() < 1.0e-4,
                "step {}: got {value}, want {want}",
                index + 1
            );
        }
    }

    #[test]
    fn approach_converges_monotonically() {
        let mut value = 0.0f32;
        let mut previous_error = 1.0f32;
        let mut steps = 0;
        while previous_error >= 0.01 {
            value = step(value, 1.0);
            let error = (1.0 - value).abs();
            assert!(
                error < previous_error,
                "error must shrink every step ({error} vs {previous_error})"
            );
            previous_error = error;
            steps += 1;
            assert!(steps <= 16, "convergence stalled after {steps} steps");
        }
        assert!(steps <= 10, "expected settle within ten steps, took {steps}");
    }

    #[test]
    fn approach_never_overshoots_from_either_side() {
        let mut rising = 0.0f32;
        let mut falling = 1.0f32;
        for _ in 0..64 {
            rising = approach(rising, 1.0, BLEND_TIME_CONSTANT, 2.5);
            falling = approach(falling, 0.0, BLEND_TIME_CONSTANT, 2.5);
            assert!((0.0..=1.0).contains(&rising));
            assert!((0.0..=1.0).contains(&falling));
        }
        assert!(rising > 0.999);
        assert!(falling < 0.001);
    }
}
