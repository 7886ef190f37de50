//! Abstraction over a position-search backend.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so the
//! futures can be driven from a `tokio::spawn`ed worker.

use crate::{AlternativeLine, EngineError, EngineProcess, EvaluationResult};
use std::future::Future;

/// A single-stream engine: callers must await each call before issuing the next.
pub trait AnalysisEngine: Send {
    fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<EvaluationResult, EngineError>> + Send;

    fn evaluate_alternatives(
        &mut self,
        fen: &str,
        depth: u32,
        max_lines: usize,
    ) -> impl Future<Output = Result<Vec<AlternativeLine>, EngineError>> + Send;

    fn new_game(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn restart(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn is_ready(&self) -> bool;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

impl AnalysisEngine for EngineProcess {
    fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<EvaluationResult, EngineError>> + Send {
        EngineProcess::evaluate(self, fen, depth)
    }

    fn evaluate_alternatives(
        &mut self,
        fen: &str,
        depth: u32,
        max_lines: usize,
    ) -> impl Future<Output = Result<Vec<AlternativeLine>, EngineError>> + Send {
        EngineProcess::evaluate_alternatives(self, fen, depth, max_lines)
    }

    fn new_game(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send {
        EngineProcess::new_game(self)
    }

    fn restart(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send {
        EngineProcess::restart(self)
    }

    fn is_ready(&self) -> bool {
        EngineProcess::is_ready(self)
    }

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        EngineProcess::close(self)
    }
}
