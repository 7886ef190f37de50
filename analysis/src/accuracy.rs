//! Per-move and per-game accuracy from win probabilities.

use cozy_chess::Color;

/// Accuracy of a single move in [0, 100] from the mover's win probability
/// before and after it.
pub fn move_accuracy(wp_before: f64, wp_after: f64) -> f64 {
    let drop = wp_before - wp_after;
    if drop <= 0.0 {
        return 100.0;
    }
    (103.1668 * (-0.04354 * drop).exp() - 3.1669).clamp(0.0, 100.0)
}

/// Accuracy for `side` over a whole game.
///
/// `white_win_probs` holds White's win probability for every position in
/// order, starting with the position before the first move. Each move's
/// accuracy is weighted by the volatility of the surrounding window, and the
/// weighted mean is averaged with the harmonic mean so one collapse is not
/// hidden by many easy moves.
pub fn game_accuracy(white_win_probs: &[f64], side: Color, first_to_move: Color) -> Option<f64> {
    let n = white_win_probs.len();
    if n < 2 {
        return None;
    }

    let window_size = (n / 10).clamp(2, 8);
    let weights = volatility_weights(white_win_probs, window_size);

    let mut weighted = Vec::new();
    for (i, pair) in white_win_probs.windows(2).enumerate() {
        let mover = if i % 2 == 0 {
            first_to_move
        } else {
            !first_to_move
        };
        if mover != side {
            continue;
        }
        let (before, after) = match mover {
            Color::White => (pair[0], pair[1]),
            Color::Black => (100.0 - pair[0], 100.0 - pair[1]),
        };
        let weight = weights.get(i).copied().unwrap_or(0.5);
        weighted.push((move_accuracy(before, after), weight));
    }

    if weighted.is_empty() {
        return None;
    }

    let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
    let weighted_mean = weighted.iter().map(|(a, w)| a * w).sum::<f64>() / total_weight;
    let harmonic_mean =
        weighted.len() as f64 / weighted.iter().map(|(a, _)| 1.0 / a.max(1.0)).sum::<f64>();

    Some((weighted_mean + harmonic_mean) / 2.0)
}

/// One weight per move: the standard deviation of the win probabilities in the
/// window around it, clamped to [0.5, 12].
fn volatility_weights(probs: &[f64], window_size: usize) -> Vec<f64> {
    let moves = probs.len() - 1;
    let size = window_size.min(probs.len());
    let head = &probs[..size];

    let mut windows: Vec<&[f64]> = std::iter::repeat(head)
        .take(size.saturating_sub(2))
        .collect();
    windows.extend(probs.windows(size));
    windows.truncate(moves);

    windows
        .into_iter()
        .map(|w| std_dev(w).clamp(0.5, 12.0))
        .collect()
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_or_improved_is_perfect() {
        assert_eq!(move_accuracy(50.0, 50.0), 100.0);
        assert_eq!(move_accuracy(40.0, 60.0), 100.0);
    }

    #[test]
    fn accuracy_falls_with_drop() {
        let small = move_accuracy(60.0, 55.0);
        let large = move_accuracy(60.0, 20.0);
        assert!(small > large);
        assert!((0.0..=100.0).contains(&large));
        assert_eq!(move_accuracy(100.0, 0.0), 0.0);
    }

    #[test]
    fn too_short_game_has_no_accuracy() {
        assert_eq!(game_accuracy(&[50.0], Color::White, Color::White), None);
        // one White move only, Black never moved
        assert_eq!(game_accuracy(&[50.0, 52.0], Color::Black, Color::White), None);
    }

    #[test]
    fn steady_game_is_near_perfect_for_both() {
        let probs = vec![50.0; 21];
        let white = game_accuracy(&probs, Color::White, Color::White).unwrap();
        let black = game_accuracy(&probs, Color::Black, Color::White).unwrap();
        assert!((white - 100.0).abs() < 1e-9);
        assert!((black - 100.0).abs() < 1e-9);
    }

    #[test]
    fn collapse_hurts_the_side_that_collapsed() {
        // White holds, then throws the game away on its 5th move
        let mut probs = vec![50.0; 9];
        probs.extend([10.0; 8]);
        let white = game_accuracy(&probs, Color::White, Color::White).unwrap();
        let black = game_accuracy(&probs, Color::Black, Color::White).unwrap();
        assert!(white < black);
        assert!(white < 90.0);
    }

    #[test]
    fn weights_cover_every_move() {
        let probs: Vec<f64> = (0..30).map(|i| 50.0 + (i % 5) as f64).collect();
        let weights = volatility_weights(&probs, 3);
        assert_eq!(weights.len(), probs.len() - 1);
        assert!(weights.iter().all(|w| (0.5..=12.0).contains(w)));
    }
}
