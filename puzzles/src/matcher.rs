//! Theme-overlap scoring of candidate puzzles.

use std::collections::HashSet;

use serde::Serialize;

use crate::records::PuzzleIndexEntry;

/// Categorizer themes mapped onto upstream puzzle theme tags, both normalized.
const THEME_ALIASES: &[(&str, &str)] = &[
    ("missedfork", "fork"),
    ("missedpin", "pin"),
    ("missedskewer", "skewer"),
    ("misseddiscovery", "discoveredattack"),
    ("discovery", "discoveredattack"),
    ("kingsafety", "exposedking"),
    ("badpieceplacement", "trappedpiece"),
    ("wrongcapture", "capturingdefender"),
];

/// Lower-case, drop `_`, `-` and spaces, then apply category aliases.
pub fn normalize_theme(theme: &str) -> String {
    let flat: String = theme
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    THEME_ALIASES
        .iter()
        .find(|(from, _)| *from == flat)
        .map_or(flat, |(_, to)| (*to).to_string())
}

/// Normalized theme set. Entries may hold several space-separated tags.
fn theme_set<'a>(themes: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
    themes
        .into_iter()
        .flat_map(|t| t.split_whitespace())
        .map(normalize_theme)
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PuzzleMatch {
    pub puzzle: PuzzleIndexEntry,
    pub overlap: usize,
    pub score: f64,
}

pub fn match_score(overlap: usize, rating: u32, popularity: i32) -> f64 {
    100.0 * overlap as f64 + f64::from(rating) / 10.0 + f64::from(popularity) / 10.0
}

/// Rank `pool` against `themes`, best first, at most `limit` results.
///
/// Only puzzles sharing a theme are returned, so the result may be empty.
/// With no usable themes the top-rated and most popular puzzles are returned.
pub fn find_matches(themes: &[String], pool: &[PuzzleIndexEntry], limit: usize) -> Vec<PuzzleMatch> {
    let wanted = theme_set(themes);

    let mut matches: Vec<PuzzleMatch> = pool
        .iter()
        .map(|puzzle| {
            let overlap = theme_set(&puzzle.themes).intersection(&wanted).count();
            PuzzleMatch {
                puzzle: puzzle.clone(),
                overlap,
                score: match_score(overlap, puzzle.rating, puzzle.popularity),
            }
        })
        .collect();

    if !wanted.is_empty() {
        matches.retain(|m| m.overlap > 0);
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.puzzle.id.cmp(&b.puzzle.id))
        });
    } else {
        tracing::debug!(pool = pool.len(), "No themes given, falling back to top rated");
        matches.sort_by(|a, b| {
            b.puzzle
                .rating
                .cmp(&a.puzzle.rating)
                .then_with(|| b.puzzle.popularity.cmp(&a.puzzle.popularity))
                .then_with(|| a.puzzle.id.cmp(&b.puzzle.id))
        });
    }

    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, themes: &[&str], rating: u32, popularity: i32) -> PuzzleIndexEntry {
        PuzzleIndexEntry {
            id: id.to_string(),
            themes: themes.iter().map(|t| t.to_string()).collect(),
            rating,
            popularity,
        }
    }

    fn themes(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn normalization_ignores_case_and_separators() {
        assert_eq!(normalize_theme("hanging_piece"), "hangingpiece");
        assert_eq!(normalize_theme("hangingPiece"), "hangingpiece");
        assert_eq!(normalize_theme("Hanging-Piece"), "hangingpiece");
        assert_eq!(normalize_theme("missed_fork"), "fork");
        assert_eq!(normalize_theme("missed_discovery"), "discoveredattack");
    }

    #[test]
    fn hanging_piece_blunder_finds_hanging_piece_puzzle() {
        let pool = vec![
            entry("end", &["endgame"], 1500, 90),
            entry("hang", &["hangingPiece middlegame"], 1500, 90),
        ];
        let found = find_matches(&themes(&["hanging_piece"]), &pool, 5);
        assert_eq!(found[0].puzzle.id, "hang");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn two_shared_themes_outrank_one() {
        let pool = vec![
            entry("one", &["fork"], 2000, 100),
            entry("two", &["fork", "middlegame"], 1200, 50),
        ];
        let found = find_matches(&themes(&["missed_fork", "middlegame"]), &pool, 5);
        assert_eq!(found[0].puzzle.id, "two");
        assert_eq!(found[0].overlap, 2);
        assert_eq!(found[0].score, 200.0 + 120.0 + 5.0);
    }

    #[test]
    fn no_themes_falls_back_to_top_rated() {
        let pool = vec![
            entry("low", &["fork"], 1200, 100),
            entry("high", &["pin"], 2100, 10),
            entry("mid", &["skewer"], 1800, 95),
        ];
        let found = find_matches(&[], &pool, 2);
        let ids: Vec<&str> = found.iter().map(|m| m.puzzle.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);
    }

    #[test]
    fn themes_without_overlap_match_nothing() {
        let pool = vec![entry("end", &["endgame"], 2000, 90)];
        assert!(find_matches(&themes(&["king_safety"]), &pool, 3).is_empty());
    }

    #[test]
    fn limit_caps_results() {
        let pool: Vec<_> = (0..10)
            .map(|i| entry(&format!("p{i}"), &["fork"], 1000 + i * 10, 0))
            .collect();
        let found = find_matches(&themes(&["fork"]), &pool, 3);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].puzzle.id, "p9");
    }
}
