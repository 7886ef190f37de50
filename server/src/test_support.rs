//! Fixtures shared by the server's unit tests.

use analysis::{
    AnalysisStatus, BlunderCategorization, GameAnalysisResult, GamePhase, MoveAnalysis,
    MoveClassification, PositionType, Severity, TacticalFinding, TacticalTheme,
};
use engine::{AlternativeLine, EngineError, EvaluationResult, Perspective};

pub fn sample_move(ply: u32) -> MoveAnalysis {
    MoveAnalysis {
        move_number: ply,
        mover_is_white: chess::is_white_ply(ply),
        played_move: "g1f3".into(),
        played_san: "Nf3".into(),
        fen_before: chess::START_FEN.into(),
        best_move: Some("e2e4".into()),
        best_move_san: Some("e4".into()),
        evaluation_before: 30,
        evaluation_after: 20,
        centipawn_loss: 10,
        win_probability_before: 52.76,
        win_probability_after: 51.84,
        accuracy: 96.5,
        classification: MoveClassification::Excellent,
        alternatives: vec![AlternativeLine {
            mv: "e2e4".into(),
            evaluation: chess::AnalysisScore::Centipawns(30),
            search_depth: 12,
            principal_variation: vec!["e2e4".into(), "e7e5".into()],
            rank: 1,
        }],
        tactical_finding: TacticalFinding::None,
        categorization: None,
        depth: 12,
        timed_out: false,
    }
}

pub fn sample_error_move(ply: u32, theme: TacticalTheme) -> MoveAnalysis {
    MoveAnalysis {
        evaluation_before: 20,
        evaluation_after: -650,
        centipawn_loss: 670,
        classification: MoveClassification::Blunder,
        categorization: Some(BlunderCategorization {
            phase: GamePhase::Middlegame,
            tactical_theme: theme,
            position_type: PositionType::Tactical,
            severity: Severity::Critical,
            difficulty_level: 3,
        }),
        ..sample_move(ply)
    }
}

pub fn sample_result(game_id: &str, plies: u32) -> GameAnalysisResult {
    GameAnalysisResult {
        game_id: game_id.into(),
        status: AnalysisStatus::Completed,
        moves: (1..=plies).map(sample_move).collect(),
        skipped: Vec::new(),
        white_accuracy: Some(91.25),
        black_accuracy: None,
        total_plies: plies,
        analysis_depth: 12,
        started_at: Some(1_700_000_000),
        completed_at: Some(1_700_000_042),
    }
}

/// Shared record of the commands a [`MaterialEngine`] received.
#[derive(Debug, Clone, Default)]
pub struct EngineLog(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

impl EngineLog {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Deterministic stand-in for a UCI engine: a one-ply material search.
///
/// Scores are from the side to move, like a real engine. Ties go to the
/// smallest UCI string.
pub struct MaterialEngine {
    ready: bool,
    log: EngineLog,
    scores: std::collections::HashMap<String, i32>,
    fail_on_evaluation: Option<usize>,
    stall_on_evaluation: Option<usize>,
    evaluations: usize,
    delay: std::time::Duration,
}

impl MaterialEngine {
    pub fn new() -> Self {
        Self {
            ready: false,
            log: EngineLog::default(),
            scores: std::collections::HashMap::new(),
            fail_on_evaluation: None,
            stall_on_evaluation: None,
            evaluations: 0,
            delay: std::time::Duration::ZERO,
        }
    }

    /// Fixed side-to-move score for a board placement (first FEN field).
    pub fn with_score(mut self, placement: &str, score: i32) -> Self {
        self.scores.insert(placement.to_string(), score);
        self
    }

    /// The `n`th evaluation (1-based) fails and leaves the engine not ready.
    pub fn failing_on_evaluation(mut self, n: usize) -> Self {
        self.fail_on_evaluation = Some(n);
        self
    }

    /// The `n`th evaluation (1-based) hits its deadline before any score and
    /// never answers `stop`, leaving the engine not ready.
    pub fn stalling_on_evaluation(mut self, n: usize) -> Self {
        self.stall_on_evaluation = Some(n);
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn log(&self) -> EngineLog {
        self.log.clone()
    }

    fn material(board: &cozy_chess::Board, color: cozy_chess::Color) -> i32 {
        use cozy_chess::Piece;
        [
            (Piece::Pawn, 100),
            (Piece::Knight, 300),
            (Piece::Bishop, 300),
            (Piece::Rook, 500),
            (Piece::Queen, 900),
        ]
        .iter()
        .map(|&(piece, value)| board.colored_pieces(color, piece).len() as i32 * value)
        .sum()
    }

    /// Every legal move with its score for the mover, best first.
    fn ranked_moves(board: &cozy_chess::Board) -> Vec<(String, i32)> {
        let mover = board.side_to_move();
        let mut moves = Vec::new();
        board.generate_moves(|piece_moves| {
            moves.extend(piece_moves);
            false
        });
        let mut ranked: Vec<(String, i32)> = moves
            .into_iter()
            .map(|mv| {
                let mut after = board.clone();
                after.play_unchecked(mv);
                let score = Self::material(&after, mover) - Self::material(&after, !mover);
                (chess::format_engine_move(board, mv), score)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    async fn search(&mut self, fen: &str) -> Result<(cozy_chess::Board, Vec<(String, i32)>), EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let board: cozy_chess::Board = fen
            .parse()
            .map_err(|_| EngineError::Protocol(format!("bad fen {fen}")))?;
        let mut ranked = Self::ranked_moves(&board);
        let placement = fen.split_whitespace().next().unwrap_or_default();
        if let Some(&score) = self.scores.get(placement) {
            for entry in &mut ranked {
                entry.1 = score;
            }
        }
        Ok((board, ranked))
    }
}

impl engine::AnalysisEngine for MaterialEngine {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvaluationResult, EngineError> {
        self.log.push(format!("evaluate {fen}"));
        self.evaluations += 1;
        if self.fail_on_evaluation == Some(self.evaluations) {
            self.ready = false;
            return Err(EngineError::ProcessFailure("scripted crash".into()));
        }
        if self.stall_on_evaluation == Some(self.evaluations) {
            self.ready = false;
            return Err(EngineError::Timeout(std::time::Duration::from_secs(10)));
        }
        let (_, ranked) = self.search(fen).await?;
        let best = ranked.first().cloned();
        Ok(EvaluationResult {
            best_move: best.as_ref().map(|(mv, _)| mv.clone()),
            score: chess::AnalysisScore::Centipawns(best.as_ref().map_or(0, |(_, s)| *s)),
            depth,
            perspective: Perspective::SideToMove,
            pv: best.into_iter().map(|(mv, _)| mv).collect(),
            timed_out: false,
        })
    }

    async fn evaluate_alternatives(
        &mut self,
        fen: &str,
        depth: u32,
        max_lines: usize,
    ) -> Result<Vec<AlternativeLine>, EngineError> {
        self.log.push(format!("alternatives {fen}"));
        let (_, ranked) = self.search(fen).await?;
        Ok(ranked
            .into_iter()
            .take(max_lines)
            .enumerate()
            .map(|(i, (mv, score))| AlternativeLine {
                principal_variation: vec![mv.clone()],
                mv,
                evaluation: chess::AnalysisScore::Centipawns(score),
                search_depth: depth,
                rank: i as u32 + 1,
            })
            .collect())
    }

    async fn new_game(&mut self) -> Result<(), EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        self.log.push("ucinewgame".into());
        Ok(())
    }

    async fn restart(&mut self) -> Result<(), EngineError> {
        self.log.push("restart".into());
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn close(&mut self) {
        self.log.push("quit".into());
        self.ready = false;
    }
}
