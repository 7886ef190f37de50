//! Lichess puzzle API client.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cozy_chess::Board;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::records::{now_millis, CachedPuzzle};

const USER_AGENT: &str = concat!("chess-coach/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(String),
    #[error("puzzle not found: {0}")]
    NotFound(String),
    #[error("still throttled after {attempts} attempts")]
    Throttled { attempts: u32 },
    #[error("upstream returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Anything that can produce a puzzle by id.
pub trait PuzzleSource: Send + Sync {
    fn fetch_puzzle(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<CachedPuzzle, UpstreamError>> + Send;
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Minimum spacing between requests.
    pub min_interval: Duration,
    /// First cool-down after a 429; doubles on each further 429.
    pub initial_backoff: Duration,
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lichess.org".to_string(),
            min_interval: Duration::from_secs(1),
            initial_backoff: Duration::from_secs(60),
            max_attempts: 3,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Spaces requests at least `min_interval` apart.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Cool-down before retry number `attempt` (0-based) after a 429.
pub fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(attempt))
}

#[derive(Debug, Deserialize)]
struct PuzzleResponse {
    game: GamePart,
    puzzle: PuzzlePart,
}

#[derive(Debug, Deserialize)]
struct GamePart {
    id: String,
    pgn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PuzzlePart {
    id: String,
    rating: u32,
    #[serde(default)]
    plays: u32,
    #[serde(default)]
    popularity: Option<i32>,
    solution: Vec<String>,
    themes: Vec<String>,
    initial_ply: u32,
}

/// Build a cache record from a `GET /api/puzzle/{id}` body. The puzzle
/// position is reached by replaying `initialPly + 1` moves of the game.
pub fn parse_puzzle_response(body: &str, now: i64) -> Result<CachedPuzzle, UpstreamError> {
    let response: PuzzleResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    let ply = response.puzzle.initial_ply as usize + 1;
    let moves: Vec<&str> = response
        .game
        .pgn
        .split_whitespace()
        .filter(|token| !token.ends_with('.'))
        .take(ply)
        .collect();
    if moves.len() < ply {
        return Err(UpstreamError::Parse(format!(
            "game has {} moves, puzzle starts after {}",
            moves.len(),
            ply
        )));
    }
    let board = chess::san::play_san_moves(&Board::default(), moves)
        .map_err(|e| UpstreamError::Parse(e.to_string()))?;

    Ok(CachedPuzzle {
        id: response.puzzle.id,
        fen: board.to_string(),
        solution_moves: response.puzzle.solution,
        themes: response.puzzle.themes,
        rating: response.puzzle.rating,
        popularity: response
            .puzzle
            .popularity
            .unwrap_or_else(|| i32::try_from(response.puzzle.plays / 100).unwrap_or(i32::MAX).min(100)),
        game_url: format!("https://lichess.org/{}#{}", response.game.id, ply),
        cached_at: now,
        last_accessed: now,
    })
}

pub struct LichessClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    config: UpstreamConfig,
}

impl LichessClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(config.min_interval)),
            config,
        })
    }

    async fn fetch(&self, id: &str) -> Result<CachedPuzzle, UpstreamError> {
        let url = format!("{}/api/puzzle/{}", self.config.base_url, id);
        let attempts = self.config.max_attempts.max(1);

        for attempt in 0..attempts {
            self.rate_limiter.wait().await;
            tracing::debug!(puzzle_id = %id, url = %url, attempt, "Fetching puzzle");

            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .map_err(|e| UpstreamError::Network(e.to_string()))?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt + 1 < attempts {
                    let delay = backoff_delay(self.config.initial_backoff, attempt);
                    tracing::warn!(puzzle_id = %id, ?delay, "Throttled by upstream, cooling down");
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(UpstreamError::NotFound(id.to_string()));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(UpstreamError::Service {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| UpstreamError::Network(e.to_string()))?;
            let puzzle = parse_puzzle_response(&body, now_millis())?;
            tracing::info!(puzzle_id = %id, rating = puzzle.rating, "Fetched puzzle from upstream");
            return Ok(puzzle);
        }

        Err(UpstreamError::Throttled { attempts })
    }
}

impl PuzzleSource for LichessClient {
    fn fetch_puzzle(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<CachedPuzzle, UpstreamError>> + Send {
        self.fetch(id)
    }
}
