pub mod types;
pub mod worker;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use analysis::GameAnalysisResult;
use engine::AnalysisEngine;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use types::{AnalysisQueueConfig, AnalysisRequest, PlayedMove, QueueError, QueueState};
use worker::Job;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

/// Serializes game analyses through a single engine.
///
/// One worker task owns the engine handle and finishes each request before
/// dequeuing the next, so the engine never sees a second command before the
/// previous one completed. Results come back in submission order.
pub struct AnalysisQueue {
    job_tx: mpsc::Sender<Job>,
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl AnalysisQueue {
    /// Spawn the worker. The engine does not need to be started; it is
    /// (re)started before every game.
    pub fn new<E: AnalysisEngine + 'static>(engine: E, config: AnalysisQueueConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>(config.capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let worker_id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            worker_id,
            depth = config.depth,
            alternatives = config.max_alternatives,
            "Analysis queue initialized"
        );

        let worker = tokio::spawn(worker::run_analysis_worker(
            worker_id,
            engine,
            job_rx,
            pending.clone(),
            config,
            cancel.clone(),
        ));

        Self {
            job_tx,
            pending,
            cancel,
            worker,
        }
    }

    /// Queue a game. Waits only when the submission buffer is full.
    pub async fn submit(&self, request: AnalysisRequest) -> Result<PendingAnalysis, QueueError> {
        let (reply, rx) = oneshot::channel();
        let game_id = request.game_id.clone();
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.job_tx.send(Job { request, reply }).await.is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }
        tracing::debug!(game_id = %game_id, pending = self.pending.load(Ordering::SeqCst), "Analysis enqueued");
        Ok(PendingAnalysis { rx })
    }

    pub fn state(&self) -> QueueState {
        if self.pending.load(Ordering::SeqCst) == 0 {
            QueueState::Idle
        } else {
            QueueState::Draining
        }
    }

    /// Stop the worker and close the engine. Requests still queued resolve
    /// to [`QueueError::Closed`].
    pub async fn shutdown(self) -> Result<(), QueueError> {
        tracing::info!("Shutting down analysis queue");
        self.cancel.cancel();
        self.worker
            .await
            .map_err(|e| QueueError::Worker(e.to_string()))
    }
}

/// Resolves to the analysis of one submitted game.
#[derive(Debug)]
pub struct PendingAnalysis {
    rx: oneshot::Receiver<GameAnalysisResult>,
}

impl Future for PendingAnalysis {
    type Output = Result<GameAnalysisResult, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.map_err(|_| QueueError::Closed))
    }
}
