use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use analysis::normalize::{
    centipawn_loss, normalize_alternatives, reference_value, terminal_value,
};
use analysis::{
    assess_move, categorize, classify, move_accuracy, side_accuracies, AnalysisStatus,
    CategorizationInput, GameAnalysisResult, MoveAnalysis, MoveClassification, MoveContext,
    SkippedPly, TacticalFinding,
};
use chess::{Move, Position, PositionError};
use engine::{AlternativeLine, AnalysisEngine, EngineError};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::persistence::now_timestamp;

use super::types::{AnalysisQueueConfig, AnalysisRequest};

/// Stake (centipawns) at which an allowed tactic forces a Blunder label.
const BLUNDER_OVERRIDE_STAKE: u16 = 500;
const BLUNDER_OVERRIDE_LOSS: i32 = 300;
/// Loss at which a passed-up tactic is labelled a missed opportunity.
const MISSED_OPPORTUNITY_LOSS: i32 = 150;

pub(super) struct Job {
    pub request: AnalysisRequest,
    pub reply: oneshot::Sender<GameAnalysisResult>,
}

/// The queue's only consumer. Owns the engine and processes one request at a
/// time, in submission order.
pub(super) async fn run_analysis_worker<E: AnalysisEngine>(
    worker_id: usize,
    mut engine: E,
    mut job_rx: mpsc::Receiver<Job>,
    pending: Arc<AtomicUsize>,
    config: AnalysisQueueConfig,
    cancel: CancellationToken,
) {
    tracing::info!(worker_id, depth = config.depth, "Analysis worker started");

    loop {
        tracing::debug!(worker_id, "Waiting for next job");
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = job_rx.recv() => match job {
                Some(job) => job,
                None => {
                    tracing::info!(worker_id, "Job channel closed, worker exiting");
                    break;
                }
            },
        };

        let game_id = job.request.game_id.clone();
        tracing::info!(worker_id, game_id = %game_id, plies = job.request.moves.len(), "Starting game analysis");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = analyze_game(worker_id, &mut engine, &job.request, &config) => outcome,
        };

        let result = match outcome {
            Ok(result) => {
                tracing::info!(
                    worker_id,
                    game_id = %game_id,
                    white_accuracy = ?result.white_accuracy,
                    black_accuracy = ?result.black_accuracy,
                    skipped = result.skipped.len(),
                    "Game analysis complete"
                );
                result
            }
            Err(e) => {
                tracing::error!(worker_id, game_id = %game_id, "Game analysis failed: {}", e);
                if !engine.is_ready() {
                    tracing::warn!(worker_id, "Engine not ready, it will be restarted before the next game");
                }
                let mut failed = GameAnalysisResult::failed(&game_id, &e);
                failed.total_plies = plies(&job.request);
                failed.analysis_depth = config.depth;
                failed
            }
        };

        pending.fetch_sub(1, Ordering::SeqCst);
        if job.reply.send(result).is_err() {
            tracing::debug!(worker_id, game_id = %game_id, "Requester dropped before completion");
        }
    }

    engine.close().await;
    tracing::info!(worker_id, "Analysis worker stopped");
}

fn plies(request: &AnalysisRequest) -> u32 {
    u32::try_from(request.moves.len()).unwrap_or(u32::MAX)
}

/// One searched (or terminal) position, White frame.
#[derive(Debug, Clone)]
struct Evaluated {
    value: i32,
    best_move: Option<String>,
    depth: u32,
    timed_out: bool,
}

/// Engine results for one ply, White frame.
struct PlyEvaluations {
    before: Evaluated,
    after: Evaluated,
    alternatives: Vec<AlternativeLine>,
}

/// Restart an engine left stuck by an earlier search.
async fn ensure_ready<E: AnalysisEngine>(engine: &mut E) -> Result<(), EngineError> {
    if engine.is_ready() {
        return Ok(());
    }
    tracing::warn!("Engine not ready mid-game, restarting");
    engine.restart().await?;
    engine.new_game().await
}

/// A timed-out alternatives search only costs the alternatives.
async fn evaluate_ply<E: AnalysisEngine>(
    engine: &mut E,
    current: &Position,
    after: &Position,
    cached: Option<Evaluated>,
    config: &AnalysisQueueConfig,
) -> Result<PlyEvaluations, EngineError> {
    let before = match cached {
        Some(eval) => eval,
        None => evaluate_position(engine, current, config.depth).await?,
    };

    let alternatives = if config.max_alternatives > 0 {
        ensure_ready(engine).await?;
        match engine
            .evaluate_alternatives(current.fen(), config.depth, config.max_alternatives)
            .await
        {
            Ok(lines) => normalize_alternatives(lines, current.white_to_move()),
            Err(EngineError::Timeout(limit)) => {
                tracing::warn!("Alternatives search produced nothing within {:?}", limit);
                Vec::new()
            }
            Err(e) => return Err(e),
        }
    } else {
        Vec::new()
    };

    let after = evaluate_position(engine, after, config.depth).await?;
    Ok(PlyEvaluations {
        before,
        after,
        alternatives,
    })
}

/// Positions without legal moves are scored from the rules alone.
async fn evaluate_position<E: AnalysisEngine>(
    engine: &mut E,
    position: &Position,
    depth: u32,
) -> Result<Evaluated, EngineError> {
    if position.is_terminal() {
        return Ok(Evaluated {
            value: terminal_value(position.is_checkmate(), position.white_to_move()),
            best_move: None,
            depth: 0,
            timed_out: false,
        });
    }
    ensure_ready(engine).await?;
    let result = engine.evaluate(position.fen(), depth).await?;
    Ok(Evaluated {
        value: reference_value(&result, position.white_to_move()),
        best_move: result.best_move.clone(),
        depth: result.depth,
        timed_out: result.timed_out,
    })
}

fn resolve_move(position: &Position, notation: &str) -> Result<(Move, Position), PositionError> {
    let mv = if chess::parse_uci_move(notation).is_ok() {
        position.parse_uci(notation)?
    } else {
        position.parse_san(notation)?
    };
    let next = position.play(mv)?;
    Ok((mv, next))
}

/// Tactical findings may only make a label worse.
fn apply_tactical_overrides(
    label: MoveClassification,
    finding: TacticalFinding,
    cp_loss: i32,
) -> MoveClassification {
    match finding {
        TacticalFinding::TacticalBlunder { severity, .. }
            if severity >= BLUNDER_OVERRIDE_STAKE
                && cp_loss >= BLUNDER_OVERRIDE_LOSS
                && label < MoveClassification::Mistake =>
        {
            MoveClassification::Blunder
        }
        TacticalFinding::MissedOpportunity { .. }
            if label <= MoveClassification::Good && cp_loss >= MISSED_OPPORTUNITY_LOSS =>
        {
            MoveClassification::MissedOpportunity
        }
        _ => label,
    }
}

/// Analyze every ply of one game.
///
/// The engine is restarted and reset first, so repeated runs of the same
/// request see identical engine state. Each position is searched once; the
/// evaluation after ply N is reused as the evaluation before ply N+1.
#[tracing::instrument(level = "info", skip(engine, request, config), fields(game_id = %request.game_id))]
pub(super) async fn analyze_game<E: AnalysisEngine>(
    worker_id: usize,
    engine: &mut E,
    request: &AnalysisRequest,
    config: &AnalysisQueueConfig,
) -> Result<GameAnalysisResult, EngineError> {
    let started_at = now_timestamp();
    let total_plies = plies(request);

    let start = match &request.start_fen {
        Some(fen) => match Position::from_fen(fen) {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(worker_id, "Rejecting request with invalid start position: {}", e);
                let mut failed = GameAnalysisResult::failed(&request.game_id, e);
                failed.total_plies = total_plies;
                return Ok(failed);
            }
        },
        None => Position::startpos(),
    };

    engine.restart().await?;
    engine.new_game().await?;

    let mut moves: Vec<MoveAnalysis> = Vec::with_capacity(request.moves.len());
    let mut skipped = Vec::new();
    let mut current = start;
    let mut cached: Option<Evaluated> = None;

    for (i, played) in request.moves.iter().enumerate() {
        let ply = u32::try_from(i + 1).unwrap_or(u32::MAX);

        let (mv, after) = match resolve_move(&current, &played.notation) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(worker_id, ply, notation = %played.notation, "Skipping ply: {}", e);
                skipped.push(SkippedPly {
                    ply,
                    played_move: played.notation.clone(),
                    reason: e.to_string(),
                });
                match played.fen_after.as_deref().map(Position::from_fen) {
                    Some(Ok(next)) => {
                        current = next;
                        cached = None;
                        continue;
                    }
                    _ => {
                        for (j, rest) in request.moves.iter().enumerate().skip(i + 1) {
                            skipped.push(SkippedPly {
                                ply: u32::try_from(j + 1).unwrap_or(u32::MAX),
                                played_move: rest.notation.clone(),
                                reason: format!("unreachable after skipped ply {ply}"),
                            });
                        }
                        break;
                    }
                }
            }
        };

        let PlyEvaluations {
            before: before_eval,
            after: after_eval,
            alternatives,
        } = match evaluate_ply(engine, &current, &after, cached.take(), config).await {
            Ok(evals) => evals,
            Err(EngineError::Timeout(limit)) => {
                tracing::warn!(worker_id, ply, "Engine produced no score within {:?}, skipping ply", limit);
                skipped.push(SkippedPly {
                    ply,
                    played_move: played.notation.clone(),
                    reason: format!("engine timed out after {limit:?}"),
                });
                current = after;
                continue;
            }
            Err(e) => return Err(e),
        };

        let mover_is_white = current.white_to_move();
        let played_uci = current.to_uci(mv);
        let played_san = current.to_san(mv).unwrap_or_else(|_| played_uci.clone());
        let best_mv = before_eval
            .best_move
            .as_deref()
            .and_then(|uci| current.parse_uci(uci).ok());
        let best_move_san = best_mv.and_then(|m| current.to_san(m).ok());
        let played_best = best_mv == Some(mv);

        let cp_loss = centipawn_loss(before_eval.value, after_eval.value, mover_is_white)
            .min(config.classification.max_centipawn_loss);
        let ctx = MoveContext {
            eval_before: before_eval.value,
            eval_after: after_eval.value,
            mover_is_white,
            played_best,
            centipawn_loss: cp_loss,
        };

        let finding = assess_move(current.board(), mv, best_mv);
        let mut classification =
            apply_tactical_overrides(classify(&ctx, &config.classification), finding, cp_loss);
        if current.legal_move_count() == 1 {
            classification = classification.min(MoveClassification::Good);
        }

        let categorization = if classification.is_error() {
            categorize(&CategorizationInput {
                before: current.board(),
                played: mv,
                best: best_mv,
                ply,
                centipawn_loss: cp_loss,
                allows_mate: ctx.allows_mate(),
                finding,
            })
        } else {
            None
        };

        let win_probability_before = ctx.win_probability_before();
        let win_probability_after = ctx.win_probability_after();

        tracing::debug!(
            worker_id,
            ply,
            san = %played_san,
            best = ?before_eval.best_move,
            cp_loss,
            classification = classification.as_str(),
            "Ply analyzed"
        );

        moves.push(MoveAnalysis {
            move_number: ply,
            mover_is_white,
            played_move: played_uci,
            played_san,
            fen_before: current.fen().to_string(),
            best_move: before_eval.best_move.clone(),
            best_move_san,
            evaluation_before: before_eval.value,
            evaluation_after: after_eval.value,
            centipawn_loss: cp_loss,
            win_probability_before,
            win_probability_after,
            accuracy: move_accuracy(win_probability_before, win_probability_after),
            classification,
            alternatives,
            tactical_finding: finding,
            categorization,
            depth: before_eval.depth,
            timed_out: before_eval.timed_out || after_eval.timed_out,
        });

        cached = Some(after_eval);
        current = after;
    }

    let (white_accuracy, black_accuracy) = side_accuracies(&moves);

    Ok(GameAnalysisResult {
        game_id: request.game_id.clone(),
        status: AnalysisStatus::Completed,
        moves,
        skipped,
        white_accuracy,
        black_accuracy,
        total_plies,
        analysis_depth: config.depth,
        started_at: Some(started_at),
        completed_at: Some(now_timestamp()),
    })
}
