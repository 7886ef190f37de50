//! Puzzle recommendation: a bounded, time-expiring cache in front of the
//! Lichess puzzle API, theme matching, and spaced-repetition learning paths.

pub mod cache;
pub mod learning;
pub mod matcher;
pub mod records;
pub mod upstream;

pub use cache::{CacheConfig, CacheError, MemoryPuzzleStore, PuzzleCacheManager, PuzzleCacheStore};
pub use learning::{generate_learning_path, LearningConfig, LearningPath, RatingWindow, ThemePriority};
pub use matcher::{find_matches, normalize_theme, PuzzleMatch};
pub use records::{now_millis, BlunderPuzzleLink, CachedPuzzle, ProgressRecord, PuzzleIndexEntry};
pub use upstream::{LichessClient, PuzzleSource, UpstreamConfig, UpstreamError};
