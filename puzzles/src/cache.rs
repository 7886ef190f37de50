//! Bounded LRU cache with independent TTL expiry over a pluggable store.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::records::{now_millis, CachedPuzzle};
use crate::upstream::PuzzleSource;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(String),
}

/// Row-level storage behind [`PuzzleCacheManager`].
///
/// Methods return `impl Future + Send` so stores can be driven from spawned
/// tasks.
pub trait PuzzleCacheStore: Send + Sync {
    fn load(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<CachedPuzzle>, CacheError>> + Send;
    fn upsert(&self, puzzle: &CachedPuzzle) -> impl Future<Output = Result<(), CacheError>> + Send;
    fn touch(&self, id: &str, at: i64) -> impl Future<Output = Result<(), CacheError>> + Send;
    fn count(&self) -> impl Future<Output = Result<usize, CacheError>> + Send;
    /// Id of the least recently accessed row; ties go to the oldest
    /// `cached_at`, then the smallest id.
    fn least_recently_accessed(
        &self,
    ) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), CacheError>> + Send;
    /// Remove rows cached at or before `cutoff`; returns how many went.
    fn delete_cached_before(
        &self,
        cutoff: i64,
    ) -> impl Future<Output = Result<usize, CacheError>> + Send;
    fn all(&self) -> impl Future<Output = Result<Vec<CachedPuzzle>, CacheError>> + Send;
}

/// Store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryPuzzleStore {
    rows: RwLock<HashMap<String, CachedPuzzle>>,
}

impl MemoryPuzzleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PuzzleCacheStore for MemoryPuzzleStore {
    async fn load(&self, id: &str) -> Result<Option<CachedPuzzle>, CacheError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, puzzle: &CachedPuzzle) -> Result<(), CacheError> {
        self.rows
            .write()
            .await
            .insert(puzzle.id.clone(), puzzle.clone());
        Ok(())
    }

    async fn touch(&self, id: &str, at: i64) -> Result<(), CacheError> {
        if let Some(row) = self.rows.write().await.get_mut(id) {
            row.last_accessed = at;
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(self.rows.read().await.len())
    }

    async fn least_recently_accessed(&self) -> Result<Option<String>, CacheError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .min_by(|a, b| {
                (a.last_accessed, a.cached_at, &a.id).cmp(&(b.last_accessed, b.cached_at, &b.id))
            })
            .map(|row| row.id.clone()))
    }

    async fn delete(&self, id: &str) -> Result<(), CacheError> {
        self.rows.write().await.remove(id);
        Ok(())
    }

    async fn delete_cached_before(&self, cutoff: i64) -> Result<usize, CacheError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| row.cached_at > cutoff);
        Ok(before - rows.len())
    }

    async fn all(&self) -> Result<Vec<CachedPuzzle>, CacheError> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

pub struct PuzzleCacheManager<S> {
    store: S,
    config: CacheConfig,
    /// Serializes the count/evict/insert sequence so the size bound holds
    /// under concurrent writers.
    write_lock: Mutex<()>,
}

impl<S: PuzzleCacheStore> PuzzleCacheManager<S> {
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.config.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub async fn get(&self, id: &str) -> Result<Option<CachedPuzzle>, CacheError> {
        self.get_at(id, now_millis()).await
    }

    /// Hit only when present and younger than the TTL. A hit refreshes
    /// `last_accessed`.
    pub async fn get_at(&self, id: &str, now: i64) -> Result<Option<CachedPuzzle>, CacheError> {
        let Some(mut puzzle) = self.store.load(id).await? else {
            tracing::debug!(puzzle_id = %id, "Puzzle cache miss");
            return Ok(None);
        };
        if now.saturating_sub(puzzle.cached_at) >= self.ttl_ms() {
            tracing::debug!(puzzle_id = %id, "Puzzle cache entry expired");
            return Ok(None);
        }
        self.store.touch(id, now).await?;
        puzzle.last_accessed = now;
        Ok(Some(puzzle))
    }

    pub async fn set(&self, puzzle: CachedPuzzle) -> Result<(), CacheError> {
        self.set_at(puzzle, now_millis()).await
    }

    /// Upsert. A new id at capacity first evicts the least recently accessed row.
    pub async fn set_at(&self, mut puzzle: CachedPuzzle, now: i64) -> Result<(), CacheError> {
        if self.config.max_entries == 0 {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        if self.store.load(&puzzle.id).await?.is_none() {
            while self.store.count().await? >= self.config.max_entries {
                let Some(victim) = self.store.least_recently_accessed().await? else {
                    break;
                };
                tracing::debug!(puzzle_id = %victim, "Evicting least recently used puzzle");
                self.store.delete(&victim).await?;
            }
        }
        puzzle.cached_at = now;
        puzzle.last_accessed = now;
        self.store.upsert(&puzzle).await
    }

    /// Remove every expired row regardless of capacity.
    pub async fn cleanup(&self) -> Result<usize, CacheError> {
        self.cleanup_at(now_millis()).await
    }

    pub async fn cleanup_at(&self, now: i64) -> Result<usize, CacheError> {
        let _guard = self.write_lock.lock().await;
        let removed = self
            .store
            .delete_cached_before(now.saturating_sub(self.ttl_ms()))
            .await?;
        tracing::info!(removed, "Puzzle cache cleanup finished");
        Ok(removed)
    }

    /// Cached puzzle, or a fresh upstream fetch that is then cached. An
    /// upstream failure yields an uncached stub.
    pub async fn get_or_fetch<U: PuzzleSource>(
        &self,
        id: &str,
        upstream: &U,
    ) -> Result<CachedPuzzle, CacheError> {
        if let Some(hit) = self.get(id).await? {
            return Ok(hit);
        }
        match upstream.fetch_puzzle(id).await {
            Ok(puzzle) => {
                self.set(puzzle.clone()).await?;
                Ok(puzzle)
            }
            Err(e) => {
                tracing::warn!(puzzle_id = %id, error = %e, "Upstream fetch failed, using stub");
                Ok(CachedPuzzle::stub(id, now_millis()))
            }
        }
    }

    /// All rows that are still fresh, for matching.
    pub async fn fresh_pool(&self) -> Result<Vec<CachedPuzzle>, CacheError> {
        let cutoff = now_millis().saturating_sub(self.ttl_ms());
        let mut rows = self.store.all().await?;
        rows.retain(|row| row.cached_at > cutoff && !row.is_stub());
        Ok(rows)
    }
}
