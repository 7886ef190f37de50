//! Low-priority background linking of analyzed errors to cached puzzles.
//!
//! Games are queued by id. The worker reads their categorized errors back
//! from storage, ranks the fresh puzzle pool against each error's theme and
//! persists the best matches as [`BlunderPuzzleLink`] rows. It works in fixed
//! size batches with a pause between them and can be paused entirely, e.g.
//! for the duration of a bulk import.

use std::sync::Arc;
use std::time::Duration;

use puzzles::{find_matches, BlunderPuzzleLink, PuzzleCacheManager, PuzzleCacheStore, PuzzleIndexEntry};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::persistence::{AnalysisRepository, LinkRepository};

#[derive(Debug, Clone)]
pub struct LinkQueueConfig {
    /// Games handled per batch.
    pub batch_size: usize,
    /// Pause after each batch.
    pub batch_delay: Duration,
    /// Puzzles linked per error.
    pub matches_per_error: usize,
}

impl Default for LinkQueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(500),
            matches_per_error: 3,
        }
    }
}

pub struct PuzzleLinkQueue {
    tx: mpsc::UnboundedSender<String>,
    paused: watch::Sender<bool>,
    worker: JoinHandle<usize>,
}

impl PuzzleLinkQueue {
    pub fn new<A, L, S>(
        analyses: A,
        links: L,
        cache: Arc<PuzzleCacheManager<S>>,
        config: LinkQueueConfig,
    ) -> Self
    where
        A: AnalysisRepository + 'static,
        L: LinkRepository + 'static,
        S: PuzzleCacheStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (paused, paused_rx) = watch::channel(false);
        let worker = tokio::spawn(run_link_worker(analyses, links, cache, rx, paused_rx, config));
        Self { tx, paused, worker }
    }

    pub fn enqueue(&self, game_id: impl Into<String>) {
        let game_id = game_id.into();
        tracing::debug!(game_id = %game_id, "Queued for puzzle linking");
        if self.tx.send(game_id).is_err() {
            tracing::warn!("Puzzle link worker is gone, dropping request");
        }
    }

    pub fn pause(&self) {
        tracing::info!("Puzzle linking paused");
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        tracing::info!("Puzzle linking resumed");
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Resume if paused, work off everything queued, then stop. Returns the
    /// number of links written over the queue's lifetime.
    pub async fn finish(self) -> usize {
        let Self { tx, paused, worker } = self;
        drop(tx);
        paused.send_replace(false);
        let written = match worker.await {
            Ok(written) => written,
            Err(e) => {
                tracing::error!("Puzzle link worker failed: {}", e);
                0
            }
        };
        drop(paused);
        written
    }
}

async fn run_link_worker<A, L, S>(
    analyses: A,
    links: L,
    cache: Arc<PuzzleCacheManager<S>>,
    mut rx: mpsc::UnboundedReceiver<String>,
    mut paused: watch::Receiver<bool>,
    config: LinkQueueConfig,
) -> usize
where
    A: AnalysisRepository,
    L: LinkRepository,
    S: PuzzleCacheStore,
{
    let mut written = 0;
    while let Some(first) = rx.recv().await {
        if paused.wait_for(|p| !*p).await.is_err() {
            break;
        }

        let mut batch = vec![first];
        while batch.len() < config.batch_size.max(1) {
            match rx.try_recv() {
                Ok(game_id) => batch.push(game_id),
                Err(_) => break,
            }
        }

        match link_batch(&analyses, &links, &cache, &batch, config.matches_per_error).await {
            Ok(n) => {
                tracing::info!(games = batch.len(), links = n, "Puzzle link batch done");
                written += n;
            }
            Err(e) => tracing::warn!(games = batch.len(), "Puzzle link batch failed: {}", e),
        }

        if !rx.is_empty() {
            tokio::time::sleep(config.batch_delay).await;
        }
    }
    written
}

async fn link_batch<A, L, S>(
    analyses: &A,
    links: &L,
    cache: &PuzzleCacheManager<S>,
    batch: &[String],
    matches_per_error: usize,
) -> anyhow::Result<usize>
where
    A: AnalysisRepository,
    L: LinkRepository,
    S: PuzzleCacheStore,
{
    let pool: Vec<PuzzleIndexEntry> = cache
        .fresh_pool()
        .await?
        .iter()
        .map(|p| p.index_entry())
        .collect();
    if pool.is_empty() {
        tracing::debug!("Puzzle pool is empty, nothing to link");
        return Ok(0);
    }

    let mut new_links = Vec::new();
    for game_id in batch {
        for error in analyses.error_themes(game_id).await? {
            let theme = [error.theme.clone()];
            for m in find_matches(&theme, &pool, matches_per_error) {
                new_links.push(BlunderPuzzleLink {
                    game_id: error.game_id.clone(),
                    ply: error.ply,
                    puzzle_id: m.puzzle.id,
                    match_score: m.score,
                });
            }
        }
    }

    links.save_links(&new_links).await?;
    Ok(new_links.len())
}
