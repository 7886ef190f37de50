use crate::alternatives::{aggregate_alternatives, best_report};
use crate::uci::{parse_uci_message, UciMessage};
use crate::{AlternativeLine, EngineError, EngineEvent, EngineInfo, EvaluationResult, Perspective};
use chess::format_uci_move;
use cozy_chess::Move;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Install locations probed when no explicit path is configured.
const STOCKFISH_CANDIDATES: &[&str] = &[
    "/opt/homebrew/bin/stockfish",
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/usr/games/stockfish",
];

/// Configuration for the engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit executable; probed from common locations when `None`.
    pub path: Option<PathBuf>,
    pub threads: u32,
    pub hash_mb: u32,
    /// Deadline for `uciok` / `readyok`.
    pub handshake_timeout: Duration,
    pub evaluation_timeout: Duration,
    pub alternatives_timeout: Duration,
    /// How long to wait for `bestmove` after sending `stop`.
    pub stop_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            threads: 1,
            hash_mb: 128,
            handshake_timeout: Duration::from_secs(10),
            evaluation_timeout: Duration::from_secs(10),
            alternatives_timeout: Duration::from_secs(15),
            stop_grace: Duration::from_millis(500),
        }
    }
}

struct RunningEngine {
    child: Child,
    stdin: ChildStdin,
    events: mpsc::Receiver<EngineEvent>,
    reader: JoinHandle<()>,
}

/// Everything a search produced before it ended.
struct SearchOutcome {
    reports: Vec<EngineInfo>,
    best_move: Option<Move>,
    timed_out: bool,
    /// `bestmove` never arrived, so the process may still emit stale output.
    stuck: bool,
}

/// Owns one UCI engine subprocess and issues commands strictly one at a time.
///
/// Single-threaded configuration (`Threads=1`, fixed hash) and a fresh
/// `ucinewgame` per restart keep repeated analyses of the same game stable.
pub struct EngineProcess {
    config: EngineConfig,
    running: Option<RunningEngine>,
    ready: bool,
}

impl EngineProcess {
    /// Create an unstarted manager. Call [`EngineProcess::initialize`] before use.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            running: None,
            ready: false,
        }
    }

    /// Create and initialize in one step.
    pub async fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let mut engine = Self::new(config);
        engine.initialize().await?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.ready && self.running.is_some()
    }

    /// Spawn the process and run the UCI handshake.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn initialize(&mut self) -> Result<(), EngineError> {
        if self.running.is_some() {
            self.close().await;
        }

        let path = match &self.config.path {
            Some(path) => path.clone(),
            None => find_stockfish_path()
                .ok_or_else(|| EngineError::Spawn("Stockfish not found".to_string()))?,
        };
        tracing::info!("Starting engine at {:?}", path);

        let mut engine = RunningEngine::spawn(&path)?;
        let result = engine.handshake(&self.config).await;
        self.running = Some(engine);
        match result {
            Ok(()) => {
                self.ready = true;
                tracing::info!("Engine initialized");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Engine handshake failed: {}", e);
                self.close().await;
                Err(e)
            }
        }
    }

    /// Reset hash tables and search history between games.
    pub async fn new_game(&mut self) -> Result<(), EngineError> {
        let timeout = self.config.handshake_timeout;
        let engine = self.ready_engine()?;
        let result = async {
            engine.send("ucinewgame").await?;
            engine.send("isready").await?;
            engine.wait_for_ready_ok(timeout).await
        }
        .await;
        self.track(result)
    }

    /// Search `fen` to `depth` and return the deepest exact report.
    ///
    /// When the wall-clock deadline expires the search is stopped and the best
    /// partial report is returned with `timed_out` set.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvaluationResult, EngineError> {
        let timeout = self.config.evaluation_timeout;
        let grace = self.config.stop_grace;
        let engine = self.ready_engine()?;
        let result = async {
            engine.send(&format!("position fen {}", fen)).await?;
            engine.send(&format!("go depth {}", depth)).await?;
            engine.search(timeout, grace).await
        }
        .await;
        let outcome = self.track_search(result)?;

        let Some(report) = best_report(&outcome.reports) else {
            if outcome.timed_out {
                return Err(EngineError::Timeout(timeout));
            }
            return Err(EngineError::Protocol(format!(
                "search finished without a score for {}",
                fen
            )));
        };

        let best_move = outcome.best_move.or_else(|| report.pv.first().copied());
        Ok(EvaluationResult {
            best_move: best_move.map(format_uci_move),
            score: report.score.ok_or_else(|| {
                EngineError::Protocol("selected report has no score".to_string())
            })?,
            depth: report.depth.unwrap_or(0),
            perspective: Perspective::SideToMove,
            pv: report.pv.iter().map(|m| format_uci_move(*m)).collect(),
            timed_out: outcome.timed_out,
        })
    }

    /// Multi-PV search returning up to `max_lines` ranked candidates.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn evaluate_alternatives(
        &mut self,
        fen: &str,
        depth: u32,
        max_lines: usize,
    ) -> Result<Vec<AlternativeLine>, EngineError> {
        let timeout = self.config.alternatives_timeout;
        let grace = self.config.stop_grace;
        let lines = max_lines.max(1);
        let engine = self.ready_engine()?;
        let result = async {
            engine
                .send(&format!("setoption name MultiPV value {}", lines))
                .await?;
            engine.send(&format!("position fen {}", fen)).await?;
            engine.send(&format!("go depth {}", depth)).await?;
            engine.search(timeout, grace).await
        }
        .await;
        let outcome = self.track_search(result)?;
        if outcome.timed_out {
            tracing::warn!("Alternatives search timed out, returning partial lines");
        }

        // Restore single-line mode for the next evaluate
        if self.is_ready() {
            let engine = self.ready_engine()?;
            let reset = engine.send("setoption name MultiPV value 1").await;
            self.track(reset)?;
        }

        Ok(aggregate_alternatives(&outcome.reports, lines))
    }

    /// Kill and respawn the process, reapplying configuration.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn restart(&mut self) -> Result<(), EngineError> {
        self.close().await;
        self.initialize().await
    }

    /// Send `quit`, wait briefly, then kill the process.
    pub async fn close(&mut self) {
        self.ready = false;
        if let Some(mut engine) = self.running.take() {
            let _ = engine.send("quit").await;
            let _ = tokio::time::timeout(Duration::from_secs(1), engine.child.wait()).await;
            let _ = engine.child.kill().await;
            engine.reader.abort();
            tracing::info!("Engine closed");
        }
    }

    fn ready_engine(&mut self) -> Result<&mut RunningEngine, EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        self.running.as_mut().ok_or(EngineError::NotReady)
    }

    /// Any failure leaves the process in an unknown state.
    fn track<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(e) = &result {
            tracing::warn!("Engine marked not ready: {}", e);
            self.ready = false;
        }
        result
    }

    fn track_search(
        &mut self,
        result: Result<SearchOutcome, EngineError>,
    ) -> Result<SearchOutcome, EngineError> {
        let outcome = self.track(result)?;
        if outcome.stuck {
            tracing::warn!("No bestmove after stop, engine marked not ready");
            self.ready = false;
        }
        Ok(outcome)
    }
}

impl RunningEngine {
    fn spawn(path: &Path) -> Result<Self, EngineError> {
        let mut child = tokio::process::Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                EngineError::Spawn(e.to_string())
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to get stdout".to_string()))?;

        let (event_tx, events) = mpsc::channel::<EngineEvent>(256);
        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::debug!("Engine stdout EOF");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);
                        let event = match parse_uci_message(trimmed) {
                            Ok(UciMessage::UciOk) => EngineEvent::UciOk,
                            Ok(UciMessage::ReadyOk) => EngineEvent::ReadyOk,
                            Ok(UciMessage::BestMove { mv, .. }) => EngineEvent::BestMove(mv),
                            Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                            Ok(UciMessage::Id { .. }) | Err(_) => continue,
                        };
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading engine stdout: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child,
            stdin,
            events,
            reader,
        })
    }

    async fn handshake(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.wait_for(config.handshake_timeout, |e| matches!(e, EngineEvent::UciOk))
            .await?;
        self.send(&format!(
            "setoption name Threads value {}",
            config.threads.clamp(1, 16)
        ))
        .await?;
        self.send(&format!(
            "setoption name Hash value {}",
            config.hash_mb.clamp(1, 2048)
        ))
        .await?;
        self.send("setoption name MultiPV value 1").await?;
        self.send("ucinewgame").await?;
        self.send("isready").await?;
        self.wait_for_ready_ok(config.handshake_timeout).await
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", cmd);
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn wait_for_ready_ok(&mut self, timeout: Duration) -> Result<(), EngineError> {
        self.wait_for(timeout, |e| matches!(e, EngineEvent::ReadyOk))
            .await
    }

    async fn wait_for(
        &mut self,
        timeout: Duration,
        done: impl Fn(&EngineEvent) -> bool,
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) if done(&event) => return Ok(()),
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(EngineError::ProcessFailure(
                        "engine exited during handshake".to_string(),
                    ))
                }
                Err(_) => return Err(EngineError::Timeout(timeout)),
            }
        }
    }

    async fn search(
        &mut self,
        timeout: Duration,
        grace: Duration,
    ) -> Result<SearchOutcome, EngineError> {
        let mut reports = Vec::new();
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(EngineEvent::Info(info))) => {
                    if info.score.is_some() {
                        reports.push(info);
                    }
                }
                Ok(Some(EngineEvent::BestMove(mv))) => {
                    return Ok(SearchOutcome {
                        reports,
                        best_move: mv,
                        timed_out: false,
                        stuck: false,
                    });
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(EngineError::ProcessFailure(
                        "engine output closed during search".to_string(),
                    ))
                }
                Err(_) => break,
            }
        }

        tracing::warn!("Search deadline of {:?} expired, sending stop", timeout);
        self.send("stop").await?;
        let grace_deadline = Instant::now() + grace;
        loop {
            match tokio::time::timeout_at(grace_deadline, self.events.recv()).await {
                Ok(Some(EngineEvent::Info(info))) => {
                    if info.score.is_some() {
                        reports.push(info);
                    }
                }
                Ok(Some(EngineEvent::BestMove(mv))) => {
                    return Ok(SearchOutcome {
                        reports,
                        best_move: mv,
                        timed_out: true,
                        stuck: false,
                    });
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(EngineError::ProcessFailure(
                        "engine output closed after stop".to_string(),
                    ))
                }
                Err(_) => {
                    return Ok(SearchOutcome {
                        reports,
                        best_move: None,
                        timed_out: true,
                        stuck: true,
                    })
                }
            }
        }
    }
}

/// Find Stockfish executable in common locations, then on `PATH`.
pub fn find_stockfish_path() -> Option<PathBuf> {
    for candidate in STOCKFISH_CANDIDATES {
        let path = Path::new(candidate);
        if path.is_file() {
            return Some(path.to_path_buf());
        }
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join("stockfish"))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_single_threaded() {
        let config = EngineConfig::default();
        assert_eq!(config.threads, 1);
        assert_eq!(config.evaluation_timeout, Duration::from_secs(10));
        assert_eq!(config.alternatives_timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn unstarted_engine_is_not_ready() {
        let mut engine = EngineProcess::new(EngineConfig::default());
        assert!(!engine.is_ready());
        let err = engine
            .evaluate(chess::START_FEN, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotReady));
    }

    #[tokio::test]
    async fn missing_executable_fails_to_spawn() {
        let config = EngineConfig {
            path: Some(PathBuf::from("/nonexistent/stockfish-binary")),
            ..Default::default()
        };
        let err = EngineProcess::start(config).await.err().unwrap();
        assert!(matches!(err, EngineError::Spawn(_)));
    }

    /// Requires a Stockfish binary on the machine.
    #[tokio::test]
    #[ignore]
    async fn real_engine_start_position_is_balanced() {
        let mut engine = EngineProcess::start(EngineConfig::default()).await.unwrap();
        let result = engine.evaluate(chess::START_FEN, 8).await.unwrap();

        let best = result.best_move.as_deref().expect("engine proposes a move");
        assert!(chess::Position::startpos().parse_uci(best).is_ok(), "illegal: {best}");
        assert!(result.score.to_cp().abs() <= 50, "score {:?}", result.score);
        engine.close().await;
    }

    /// Requires a Stockfish binary on the machine.
    #[tokio::test]
    #[ignore]
    async fn real_engine_is_deterministic_across_restarts() {
        let mut engine = EngineProcess::start(EngineConfig::default()).await.unwrap();
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
        let first = engine.evaluate(fen, 12).await.unwrap();
        engine.restart().await.unwrap();
        let second = engine.evaluate(fen, 12).await.unwrap();
        assert_eq!(first.score, second.score);
        assert_eq!(first.best_move, second.best_move);

        let lines = engine.evaluate_alternatives(fen, 10, 3).await.unwrap();
        assert!(!lines.is_empty() && lines.len() <= 3);
        engine.close().await;
        assert!(!engine.is_ready());
    }
}
