//! Configuration for the chess-coach binary.
//!
//! Every setting follows the same precedence:
//! 1. command-line flag
//! 2. environment variable
//! 3. built-in default
//!
//! The data directory defaults to `~/.config/chess-coach/data`, falling back to
//! `./data` when `HOME` is unset.

use std::path::PathBuf;
use std::time::Duration;

use puzzles::CacheConfig;

const DEFAULT_CONFIG_DIR: &str = ".config/chess-coach/data";
const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "coach.db";

pub const DEFAULT_DEPTH: u32 = 15;
pub const MAX_DEPTH: u32 = 25;

pub const DATA_DIR_ENV: &str = "CHESS_COACH_DATA_DIR";
pub const STOCKFISH_PATH_ENV: &str = "STOCKFISH_PATH";
pub const DEPTH_ENV: &str = "CHESS_COACH_DEPTH";
pub const CACHE_MAX_ENV: &str = "CHESS_COACH_CACHE_MAX";
pub const CACHE_TTL_ENV: &str = "CHESS_COACH_CACHE_TTL_SECS";
pub const LOG_DIR_ENV: &str = "CHESS_COACH_LOG_DIR";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub stockfish_path: Option<PathBuf>,
    pub depth: u32,
    pub cache: CacheConfig,
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve with an explicit variable lookup.
    pub fn resolve(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_DIR)))
            .unwrap_or_else(|| PathBuf::from(DEV_DATA_DIR));

        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            max_entries: parse_var(&var, CACHE_MAX_ENV).unwrap_or(defaults.max_entries),
            ttl: parse_var(&var, CACHE_TTL_ENV)
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
        };

        Self {
            data_dir,
            stockfish_path: var(STOCKFISH_PATH_ENV)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            depth: clamp_depth(parse_var(&var, DEPTH_ENV).unwrap_or(DEFAULT_DEPTH)),
            cache,
            log_dir: var(LOG_DIR_ENV).filter(|p| !p.is_empty()).map(PathBuf::from),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Depth is kept within 1..=25.
pub fn clamp_depth(depth: u32) -> u32 {
    depth.clamp(1, MAX_DEPTH)
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn data_dir_precedence() {
        let explicit = Settings::resolve(env(&[(DATA_DIR_ENV, "/srv/coach"), ("HOME", "/home/a")]));
        assert_eq!(explicit.data_dir, PathBuf::from("/srv/coach"));
        assert_eq!(explicit.database_path(), PathBuf::from("/srv/coach/coach.db"));

        let home = Settings::resolve(env(&[("HOME", "/home/a")]));
        assert_eq!(home.data_dir, PathBuf::from("/home/a/.config/chess-coach/data"));

        let fallback = Settings::resolve(env(&[]));
        assert_eq!(fallback.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::resolve(env(&[]));
        assert_eq!(settings.depth, DEFAULT_DEPTH);
        assert_eq!(settings.cache, CacheConfig::default());
        assert!(settings.stockfish_path.is_none());
        assert!(settings.log_dir.is_none());
    }

    #[test]
    fn depth_is_clamped_and_garbage_ignored() {
        assert_eq!(Settings::resolve(env(&[(DEPTH_ENV, "40")])).depth, MAX_DEPTH);
        assert_eq!(Settings::resolve(env(&[(DEPTH_ENV, "0")])).depth, 1);
        assert_eq!(Settings::resolve(env(&[(DEPTH_ENV, "deep")])).depth, DEFAULT_DEPTH);
        assert_eq!(Settings::resolve(env(&[(DEPTH_ENV, " 12 ")])).depth, 12);
    }

    #[test]
    fn cache_and_paths_from_environment() {
        let settings = Settings::resolve(env(&[
            (CACHE_MAX_ENV, "50"),
            (CACHE_TTL_ENV, "3600"),
            (STOCKFISH_PATH_ENV, "/opt/sf"),
            (LOG_DIR_ENV, ""),
        ]));
        assert_eq!(settings.cache.max_entries, 50);
        assert_eq!(settings.cache.ttl, Duration::from_secs(3600));
        assert_eq!(settings.stockfish_path, Some(PathBuf::from("/opt/sf")));
        assert!(settings.log_dir.is_none());
    }
}
