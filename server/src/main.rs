//! chess-coach: engine-backed game analysis and puzzle recommendations.
//!
//! Every subcommand opens the SQLite database under the data directory (see
//! [`config`]), does its work and prints JSON to stdout. Logs go to stderr and,
//! when `CHESS_COACH_LOG_DIR` is set, to a daily rolling file.

mod config;
mod linking;
mod persistence;
mod review;
#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use analysis::{AnalysisStatus, GameAnalysisResult};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use engine::{EngineConfig, EngineProcess};
use puzzles::{
    generate_learning_path, now_millis, CachedPuzzle, LearningConfig, LichessClient,
    ProgressRecord, PuzzleCacheManager, PuzzleIndexEntry, UpstreamConfig,
};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{clamp_depth, Settings};
use linking::{LinkQueueConfig, PuzzleLinkQueue};
use persistence::{
    AnalysisRepository, Database, LinkRepository, ProgressRepository, SqlitePuzzleCacheStore,
};
use review::{AnalysisQueue, AnalysisQueueConfig, AnalysisRequest};

#[derive(Parser)]
#[command(
    name = "chess-coach",
    version,
    about = "Engine-backed chess game analysis and puzzle recommendations"
)]
struct Cli {
    /// Data directory; overrides CHESS_COACH_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one game and print its per-move rows.
    Analyze(AnalyzeArgs),
    /// Analyze every game in a JSON file (an array of requests).
    ///
    /// Puzzle linking is paused while the games are analyzed and drained
    /// afterwards.
    Import {
        path: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long)]
        user: Option<String>,
    },
    /// Print a stored analysis together with its puzzle links.
    Show { game_id: String },
    /// Remove a stored analysis and its links.
    Delete { game_id: String },
    /// Print a learning path for a user.
    Recommend {
        #[arg(long)]
        user: String,
    },
    /// Print a puzzle, fetching it upstream on a cache miss.
    Puzzle { id: String },
    /// Record one puzzle attempt.
    Attempt {
        #[arg(long)]
        user: String,
        #[arg(long)]
        puzzle: String,
        #[arg(long)]
        solved: bool,
        /// Time spent on the attempt.
        #[arg(long, default_value_t = 0)]
        time_ms: u64,
    },
    /// Delete expired puzzle cache rows.
    CacheCleanup,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Moves in UCI or SAN. Quoted lists are split on whitespace.
    #[arg(required = true)]
    moves: Vec<String>,
    /// Starting position; the standard start when omitted.
    #[arg(long)]
    fen: Option<String>,
    /// Defaults to a random id.
    #[arg(long)]
    game_id: Option<String>,
    /// Owner of the game, used for recommendations.
    #[arg(long)]
    user: Option<String>,
    /// Skip linking errors to cached puzzles.
    #[arg(long)]
    no_link: bool,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args)]
struct EngineArgs {
    /// Search depth per position (1-25); overrides CHESS_COACH_DEPTH.
    #[arg(long)]
    depth: Option<u32>,
    /// Ranked alternatives per position; 0 disables the multi-line search.
    #[arg(long, default_value_t = 3)]
    alternatives: usize,
    /// Engine executable; overrides STOCKFISH_PATH.
    #[arg(long)]
    stockfish: Option<PathBuf>,
}

impl EngineArgs {
    fn queue(&self, settings: &Settings) -> AnalysisQueue {
        let engine = EngineProcess::new(EngineConfig {
            path: self.stockfish.clone().or_else(|| settings.stockfish_path.clone()),
            ..EngineConfig::default()
        });
        AnalysisQueue::new(
            engine,
            AnalysisQueueConfig {
                depth: self.depth.map(clamp_depth).unwrap_or(settings.depth),
                max_alternatives: self.alternatives,
                ..AnalysisQueueConfig::default()
            },
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    let _log_guard = init_tracing(settings.log_dir.as_deref())?;

    tracing::info!(data_dir = %settings.data_dir.display(), "Starting chess-coach");
    let db = Database::open(&settings.database_path())
        .await
        .with_context(|| format!("opening database in {}", settings.data_dir.display()))?;

    match cli.command {
        Commands::Analyze(args) => analyze(&settings, &db, args).await,
        Commands::Import { path, engine, user } => {
            import(&settings, &db, &path, &engine, user.as_deref()).await
        }
        Commands::Show { game_id } => show(&db, &game_id).await,
        Commands::Delete { game_id } => {
            db.analyses().delete_analysis(&game_id).await?;
            print_json(&serde_json::json!({ "deleted": game_id }))
        }
        Commands::Recommend { user } => recommend(&settings, &db, &user).await,
        Commands::Puzzle { id } => {
            let client = LichessClient::new(UpstreamConfig::default())?;
            let puzzle = cache(&settings, &db).get_or_fetch(&id, &client).await?;
            print_json(&puzzle)
        }
        Commands::Attempt {
            user,
            puzzle,
            solved,
            time_ms,
        } => {
            let progress = db.progress();
            let mut record = progress
                .load_progress(&puzzle, &user)
                .await?
                .unwrap_or_else(|| ProgressRecord::new(puzzle.as_str(), user.as_str()));
            record.record_attempt(solved, time_ms, now_millis());
            progress.save_progress(&record).await?;
            print_json(&record)
        }
        Commands::CacheCleanup => {
            let removed = cache(&settings, &db).cleanup().await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}

/// Stderr output always; a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "chess-coach.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(file_layer)
        .init();
    Ok(guard)
}

fn cache(settings: &Settings, db: &Database) -> PuzzleCacheManager<SqlitePuzzleCacheStore> {
    PuzzleCacheManager::new(db.puzzle_cache(), settings.cache.clone())
}

fn link_queue(settings: &Settings, db: &Database) -> PuzzleLinkQueue {
    PuzzleLinkQueue::new(
        db.analyses(),
        db.links(),
        Arc::new(cache(settings, db)),
        LinkQueueConfig::default(),
    )
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    std::io::Write::write_all(&mut out, b"\n")?;
    Ok(())
}

async fn analyze(settings: &Settings, db: &Database, args: AnalyzeArgs) -> anyhow::Result<()> {
    let game_id = args
        .game_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let moves = args.moves.iter().flat_map(|m| m.split_whitespace());
    let request = AnalysisRequest::new(game_id.clone(), args.fen, moves);

    let queue = args.engine.queue(settings);
    let result = queue.submit(request).await?.await?;
    queue.shutdown().await?;

    db.analyses().save_analysis(&result, args.user.as_deref()).await?;

    if result.is_completed() && !args.no_link {
        let links = link_queue(settings, db);
        links.enqueue(game_id.as_str());
        let written = links.finish().await;
        tracing::info!(game_id = %game_id, links = written, "Puzzle links written");
    }

    print_json(&result)?;
    fail_on_status(&result)
}

async fn import(
    settings: &Settings,
    db: &Database,
    path: &Path,
    engine: &EngineArgs,
    user: Option<&str>,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let requests: Vec<AnalysisRequest> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let links = link_queue(settings, db);
    links.pause();

    let queue = engine.queue(settings);
    let mut pending = Vec::with_capacity(requests.len());
    for request in requests {
        pending.push(queue.submit(request).await?);
    }
    tracing::info!(games = pending.len(), state = ?queue.state(), "Import queued");

    let mut summary = Vec::with_capacity(pending.len());
    for analysis in pending {
        let result = analysis.await?;
        db.analyses().save_analysis(&result, user).await?;
        if result.is_completed() {
            links.enqueue(result.game_id.as_str());
        }
        summary.push(serde_json::json!({
            "game_id": result.game_id,
            "status": result.status,
            "white_accuracy": result.white_accuracy,
            "black_accuracy": result.black_accuracy,
            "errors": result.errors().count(),
        }));
    }
    queue.shutdown().await?;

    tracing::debug!(paused = links.is_paused(), "Draining puzzle links");
    links.resume();
    let written = links.finish().await;
    tracing::info!(links = written, "Import finished");

    print_json(&summary)
}

async fn show(db: &Database, game_id: &str) -> anyhow::Result<()> {
    let Some(result) = db.analyses().load_analysis(game_id).await? else {
        anyhow::bail!("no analysis stored for game {game_id}");
    };
    let links = db.links().links_for_game(game_id).await?;
    print_json(&serde_json::json!({ "analysis": result, "puzzle_links": links }))
}

async fn recommend(settings: &Settings, db: &Database, user: &str) -> anyhow::Result<()> {
    let themes: Vec<String> = db
        .analyses()
        .error_themes_for_user(user)
        .await?
        .into_iter()
        .map(|e| e.theme)
        .collect();
    let progress = db.progress().progress_for_user(user).await?;
    let pool: Vec<PuzzleIndexEntry> = cache(settings, db)
        .fresh_pool()
        .await?
        .iter()
        .map(CachedPuzzle::index_entry)
        .collect();

    tracing::info!(
        user,
        errors = themes.len(),
        attempts = progress.len(),
        pool = pool.len(),
        "Generating learning path"
    );
    let path = generate_learning_path(
        &themes,
        &progress,
        &pool,
        now_millis(),
        &LearningConfig::default(),
    );
    print_json(&path)
}

fn fail_on_status(result: &GameAnalysisResult) -> anyhow::Result<()> {
    match &result.status {
        AnalysisStatus::Completed => Ok(()),
        AnalysisStatus::Failed { error } => {
            anyhow::bail!("analysis of {} failed: {error}", result.game_id)
        }
    }
}
