//! Logistic win-probability model over centipawn evaluations.

use std::f64::consts::E;

/// Slope of the logistic curve, fitted on rated online games.
pub const WIN_PROBABILITY_SLOPE: f64 = 0.003_682_08;

/// Evaluations are clamped to this magnitude before conversion.
pub const EVAL_CLAMP: i32 = 1000;

/// Winning chances in [-1.0, 1.0] for the side the evaluation is expressed for.
pub fn winning_chances(cp: i32) -> f64 {
    let cp = cp.clamp(-EVAL_CLAMP, EVAL_CLAMP) as f64;
    2.0 / (1.0 + E.powf(-WIN_PROBABILITY_SLOPE * cp)) - 1.0
}

/// Win probability in [0, 100]; 50 at an even position.
pub fn cp_to_win_probability(cp: i32) -> f64 {
    50.0 + 50.0 * winning_chances(cp)
}

/// Win probability of `mover` given a White-frame evaluation.
pub fn win_probability_for_mover(eval_ref: i32, mover_is_first: bool) -> f64 {
    cp_to_win_probability(crate::normalize::to_mover_perspective(eval_ref, mover_is_first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn even_position_is_fifty() {
        assert!((cp_to_win_probability(0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_large_and_mate_values() {
        assert_eq!(cp_to_win_probability(1000), cp_to_win_probability(9_999));
        assert_eq!(cp_to_win_probability(-1000), cp_to_win_probability(-25_000));
        assert!(cp_to_win_probability(1000) > 97.0);
        assert!(cp_to_win_probability(-1000) < 3.0);
    }

    #[test]
    fn mover_frame() {
        let white = win_probability_for_mover(200, true);
        let black = win_probability_for_mover(200, false);
        assert!((white + black - 100.0).abs() < 1e-9);
        assert!(white > 50.0);
    }

    proptest! {
        #[test]
        fn bounded(cp in any::<i32>()) {
            let wp = cp_to_win_probability(cp);
            prop_assert!((0.0..=100.0).contains(&wp));
        }

        #[test]
        fn monotonic(a in -2000i32..2000, b in -2000i32..2000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(cp_to_win_probability(lo) <= cp_to_win_probability(hi));
        }

        #[test]
        fn symmetric(cp in -1000i32..=1000) {
            let sum = cp_to_win_probability(cp) + cp_to_win_probability(-cp);
            prop_assert!((sum - 100.0).abs() < 1e-9);
        }
    }
}
