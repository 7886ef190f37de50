//! Learning paths: which themes to practise, which puzzles are due for
//! review, and the rating band to draw new puzzles from.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::matcher::{find_matches, normalize_theme};
use crate::records::{ProgressRecord, PuzzleIndexEntry};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct LearningConfig {
    /// Centre of the rating window before adaptation.
    pub base_rating: u32,
    /// Half-width of the rating window before adaptation.
    pub base_half_width: u32,
    /// Bound on each of shift and width change.
    pub max_adjustment: i32,
    /// Solve time at or under which time efficiency is 100.
    pub target_solve_ms: u64,
    /// Attempts considered for the recent success rate.
    pub recent_window: usize,
    pub max_themes: usize,
    pub puzzles_per_theme: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            base_rating: 1500,
            base_half_width: 200,
            max_adjustment: 100,
            target_solve_ms: 30_000,
            recent_window: 10,
            max_themes: 5,
            puzzles_per_theme: 3,
        }
    }
}

/// Mastery of one attempted puzzle in [0, 100].
pub fn mastery_score(progress: &ProgressRecord, target_solve_ms: u64) -> f64 {
    let solved = if progress.solved { 100.0 } else { 0.0 };
    let first_try = if progress.first_attempt_correct { 100.0 } else { 0.0 };
    let time_efficiency = match progress.average_time_ms() {
        None => 0.0,
        Some(0) => 100.0,
        Some(avg) => (target_solve_ms as f64 / avg as f64 * 100.0).min(100.0),
    };
    0.6 * solved + 0.25 * time_efficiency + 0.15 * first_try
}

/// Priority of a theme from how often it shows up in errors and how well the
/// user has mastered it.
pub fn theme_priority(frequency: u32, mastery: f64) -> f64 {
    0.6 * (f64::from(frequency) * 10.0).min(100.0) + 0.4 * (100.0 - mastery.clamp(0.0, 100.0))
}

/// When the puzzle should come back: unsolved after a day, solved after three,
/// solved on a streak of three or more after a week.
pub fn next_review_at(progress: &ProgressRecord) -> i64 {
    let days = match (progress.solved, progress.streak) {
        (false, _) => 1,
        (true, s) if s >= 3 => 7,
        (true, _) => 3,
    };
    progress.last_attempt_at + days * DAY_MS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingWindow {
    pub min: u32,
    pub max: u32,
}

impl RatingWindow {
    pub fn contains(&self, rating: u32) -> bool {
        (self.min..=self.max).contains(&rating)
    }
}

/// Shift the window up when the user succeeds, down when they struggle; widen
/// it for low mastery, narrow it for high. Each adjustment is bounded.
pub fn adaptive_rating_window(
    recent_results: &[bool],
    average_mastery: f64,
    config: &LearningConfig,
) -> RatingWindow {
    let bound = f64::from(config.max_adjustment);
    let shift = if recent_results.is_empty() {
        0.0
    } else {
        let success =
            recent_results.iter().filter(|s| **s).count() as f64 / recent_results.len() as f64;
        ((success - 0.5) * 2.0 * bound).clamp(-bound, bound)
    };
    let width_change = ((50.0 - average_mastery) / 50.0 * bound).clamp(-bound, bound);

    let centre = f64::from(config.base_rating) + shift;
    let half = (f64::from(config.base_half_width) + width_change).max(0.0);
    RatingWindow {
        min: (centre - half).max(0.0).round() as u32,
        max: (centre + half).max(0.0).round() as u32,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemePriority {
    pub theme: String,
    pub frequency: u32,
    pub mastery: f64,
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningPath {
    pub themes: Vec<ThemePriority>,
    pub rating_window: RatingWindow,
    /// Attempted puzzles whose review time has come, oldest first.
    pub due_reviews: Vec<String>,
    /// New puzzles for the top themes inside the rating window.
    pub recommended: Vec<String>,
}

/// Build a learning path.
///
/// `error_themes` holds one theme per categorized error of the user;
/// `progress` their attempts; `pool` the puzzles available for matching.
pub fn generate_learning_path(
    error_themes: &[String],
    progress: &[ProgressRecord],
    pool: &[PuzzleIndexEntry],
    now: i64,
    config: &LearningConfig,
) -> LearningPath {
    let mut frequency: BTreeMap<String, u32> = BTreeMap::new();
    for theme in error_themes {
        *frequency.entry(normalize_theme(theme)).or_default() += 1;
    }

    let puzzle_themes: HashMap<&str, Vec<String>> = pool
        .iter()
        .map(|p| {
            let themes = p.themes.iter().flat_map(|t| t.split_whitespace()).map(normalize_theme);
            (p.id.as_str(), themes.collect())
        })
        .collect();

    let mut mastery_by_theme: HashMap<String, Vec<f64>> = HashMap::new();
    for record in progress {
        let mastery = mastery_score(record, config.target_solve_ms);
        for theme in puzzle_themes.get(record.puzzle_id.as_str()).into_iter().flatten() {
            mastery_by_theme.entry(theme.clone()).or_default().push(mastery);
        }
    }

    let mut themes: Vec<ThemePriority> = frequency
        .into_iter()
        .map(|(theme, frequency)| {
            let mastery = mastery_by_theme
                .get(&theme)
                .map_or(0.0, |m| m.iter().sum::<f64>() / m.len() as f64);
            ThemePriority {
                priority: theme_priority(frequency, mastery),
                theme,
                frequency,
                mastery,
            }
        })
        .collect();
    themes.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then_with(|| a.theme.cmp(&b.theme))
    });
    themes.truncate(config.max_themes);

    let mut recent: Vec<&ProgressRecord> = progress.iter().collect();
    recent.sort_by_key(|r| std::cmp::Reverse(r.last_attempt_at));
    let recent_results: Vec<bool> = recent
        .iter()
        .take(config.recent_window)
        .map(|r| r.streak > 0)
        .collect();
    let average_mastery = if progress.is_empty() {
        50.0
    } else {
        progress
            .iter()
            .map(|r| mastery_score(r, config.target_solve_ms))
            .sum::<f64>()
            / progress.len() as f64
    };
    let rating_window = adaptive_rating_window(&recent_results, average_mastery, config);

    let mut due: Vec<&ProgressRecord> = progress
        .iter()
        .filter(|r| next_review_at(r) <= now)
        .collect();
    due.sort_by_key(|r| (next_review_at(r), r.puzzle_id.clone()));
    let due_reviews = due.into_iter().map(|r| r.puzzle_id.clone()).collect();

    let attempted: std::collections::HashSet<&str> =
        progress.iter().map(|r| r.puzzle_id.as_str()).collect();
    let candidates: Vec<PuzzleIndexEntry> = pool
        .iter()
        .filter(|p| rating_window.contains(p.rating) && !attempted.contains(p.id.as_str()))
        .cloned()
        .collect();
    let mut recommended: Vec<String> = Vec::new();
    for theme in &themes {
        for found in find_matches(std::slice::from_ref(&theme.theme), &candidates, config.puzzles_per_theme) {
            if found.overlap > 0 && !recommended.contains(&found.puzzle.id) {
                recommended.push(found.puzzle.id);
            }
        }
    }

    LearningPath {
        themes,
        rating_window,
        due_reviews,
        recommended,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn progress(id: &str, solved: bool, first: bool, streak: u32, avg_ms: u64, at: i64) -> ProgressRecord {
        ProgressRecord {
            puzzle_id: id.to_string(),
            user_id: "u".to_string(),
            attempts: 1,
            solved,
            first_attempt_correct: first,
            total_time_ms: avg_ms,
            streak,
            last_attempt_at: at,
        }
    }

    fn entry(id: &str, themes: &[&str], rating: u32) -> PuzzleIndexEntry {
        PuzzleIndexEntry {
            id: id.to_string(),
            themes: themes.iter().map(|t| t.to_string()).collect(),
            rating,
            popularity: 80,
        }
    }

    #[test]
    fn mastery_weights_components() {
        assert_eq!(mastery_score(&progress("p", true, true, 1, 10_000, 0), 30_000), 100.0);
        assert_eq!(mastery_score(&progress("p", false, false, 0, 60_000, 0), 30_000), 12.5);
        let fresh = ProgressRecord::new("p", "u");
        assert_eq!(mastery_score(&fresh, 30_000), 0.0);
    }

    #[test]
    fn priority_formula() {
        assert_eq!(theme_priority(0, 100.0), 0.0);
        assert_eq!(theme_priority(3, 50.0), 0.6 * 30.0 + 0.4 * 50.0);
        // frequency saturates at ten occurrences
        assert!((theme_priority(25, 0.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn review_intervals() {
        assert_eq!(next_review_at(&progress("p", false, false, 0, 1, 0)), DAY_MS);
        assert_eq!(next_review_at(&progress("p", true, true, 1, 1, 0)), 3 * DAY_MS);
        assert_eq!(next_review_at(&progress("p", true, true, 3, 1, 5)), 5 + 7 * DAY_MS);
    }

    #[test]
    fn strong_recent_form_raises_window() {
        let config = LearningConfig::default();
        let window = adaptive_rating_window(&[true; 10], 50.0, &config);
        assert_eq!(window, RatingWindow { min: 1400, max: 1800 });

        let struggling = adaptive_rating_window(&[false; 10], 0.0, &config);
        assert_eq!(struggling, RatingWindow { min: 1100, max: 1700 });
    }

    #[test]
    fn learning_path_prioritises_frequent_unmastered_themes() {
        let pool = vec![
            entry("f1", &["fork middlegame"], 1500),
            entry("f2", &["fork"], 1550),
            entry("p1", &["pin"], 1500),
            entry("far", &["fork"], 2600),
        ];
        let errors: Vec<String> = ["missed_fork", "missed_fork", "missed_fork", "missed_pin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let attempts = vec![progress("p1", true, true, 1, 20_000, 0)];

        let path = generate_learning_path(&errors, &attempts, &pool, 4 * DAY_MS, &LearningConfig::default());

        assert_eq!(path.themes[0].theme, "fork");
        assert_eq!(path.themes[0].frequency, 3);
        assert_eq!(path.themes[1].theme, "pin");
        assert!(path.themes[1].mastery > 90.0);
        assert_eq!(path.due_reviews, vec!["p1"]);
        assert!(path.recommended.contains(&"f1".to_string()));
        assert!(path.recommended.contains(&"f2".to_string()));
        assert!(!path.recommended.contains(&"far".to_string()));
        assert!(!path.recommended.contains(&"p1".to_string()));
    }

    proptest! {
        #[test]
        fn window_adjustments_are_bounded(
            results in proptest::collection::vec(any::<bool>(), 0..20),
            mastery in 0.0f64..=100.0,
        ) {
            let config = LearningConfig::default();
            let window = adaptive_rating_window(&results, mastery, &config);
            let centre = (window.min + window.max) as i64 / 2;
            let half = (window.max - window.min) as i64 / 2;
            // integer rounding of the bounds can move either by one
            prop_assert!((centre - 1500).abs() <= 101);
            prop_assert!((half - 200).abs() <= 101);
        }

        #[test]
        fn priority_stays_in_range(freq in 0u32..1000, mastery in -50.0f64..150.0) {
            let p = theme_priority(freq, mastery);
            prop_assert!(p >= 0.0 && p <= 100.0 + 1e-9);
        }
    }
}
