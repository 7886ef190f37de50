//! Folding incremental `info` reports into final search results.

use crate::{AlternativeLine, EngineInfo, ScoreBound};
use chess::format_uci_move;
use cozy_chess::Move;

/// Principal variations are cut to this many moves.
pub const MAX_PV_MOVES: usize = 5;

/// `new` replaces `old` when it searched deeper, or equally deep with a score
/// that is at least as trustworthy (exact beats a bound).
fn supersedes(new: &EngineInfo, old: &EngineInfo) -> bool {
    let (nd, od) = (new.depth.unwrap_or(0), old.depth.unwrap_or(0));
    if nd != od {
        return nd > od;
    }
    new.bound == ScoreBound::Exact || old.bound != ScoreBound::Exact
}

/// Pick the report that defines a single-line result: the deepest exact
/// score for the primary line, falling back to a bounded one if that is all
/// the search produced.
pub fn best_report(reports: &[EngineInfo]) -> Option<&EngineInfo> {
    let primary = reports
        .iter()
        .filter(|r| r.score.is_some() && r.multipv.unwrap_or(1) == 1);

    let mut best_exact: Option<&EngineInfo> = None;
    let mut best_any: Option<&EngineInfo> = None;
    for report in primary {
        if report.bound == ScoreBound::Exact
            && best_exact.map_or(true, |b| supersedes(report, b))
        {
            best_exact = Some(report);
        }
        if best_any.map_or(true, |b| supersedes(report, b)) {
            best_any = Some(report);
        }
    }
    best_exact.or(best_any)
}

/// Collapse multi-PV reports into ranked alternatives.
///
/// Reports are keyed by their first PV move and the deepest one per move
/// wins. Survivors are ordered by depth (descending) then multipv index,
/// truncated to `max_lines` and ranked from 1.
pub fn aggregate_alternatives(reports: &[EngineInfo], max_lines: usize) -> Vec<AlternativeLine> {
    let mut by_move: Vec<(Move, &EngineInfo)> = Vec::new();
    for report in reports {
        let (Some(first), Some(_)) = (report.pv.first(), report.score) else {
            continue;
        };
        match by_move.iter_mut().find(|(mv, _)| mv == first) {
            Some(entry) => {
                if supersedes(report, entry.1) {
                    entry.1 = report;
                }
            }
            None => by_move.push((*first, report)),
        }
    }

    let mut lines: Vec<&EngineInfo> = by_move.into_iter().map(|(_, r)| r).collect();
    lines.sort_by(|a, b| {
        b.depth
            .unwrap_or(0)
            .cmp(&a.depth.unwrap_or(0))
            .then(a.multipv.unwrap_or(1).cmp(&b.multipv.unwrap_or(1)))
    });
    lines.truncate(max_lines);

    lines
        .into_iter()
        .zip(1u32..)
        .filter_map(|(report, rank)| {
            let first = report.pv.first()?;
            Some(AlternativeLine {
                mv: format_uci_move(*first),
                evaluation: report.score?,
                search_depth: report.depth.unwrap_or(0),
                principal_variation: report
                    .pv
                    .iter()
                    .take(MAX_PV_MOVES)
                    .map(|m| format_uci_move(*m))
                    .collect(),
                rank,
            })
        })
        .collect()
}
