//! Shared encode/decode helpers for SQLite ↔ domain type conversions.
//!
//! These functions bridge the gap between domain enums and the string
//! columns used in the schema's CHECK constraints.

use analysis::{AnalysisStatus, MoveClassification};
use serde::de::DeserializeOwned;

use crate::persistence::PersistenceError;

// ── AnalysisStatus ─────────────────────────────────────────────────────

/// Encode an `AnalysisStatus` into `(status, error)` columns.
pub fn encode_status(status: &AnalysisStatus) -> (&'static str, Option<&str>) {
    match status {
        AnalysisStatus::Completed => ("completed", None),
        AnalysisStatus::Failed { error } => ("failed", Some(error.as_str())),
    }
}

pub fn decode_status(status: &str, error: Option<String>) -> Result<AnalysisStatus, PersistenceError> {
    match status {
        "completed" => Ok(AnalysisStatus::Completed),
        "failed" => Ok(AnalysisStatus::Failed {
            error: error.unwrap_or_default(),
        }),
        other => Err(PersistenceError::Corrupt(format!("unknown status {other:?}"))),
    }
}

// ── MoveClassification ─────────────────────────────────────────────────

pub fn decode_classification(s: &str) -> Result<MoveClassification, PersistenceError> {
    MoveClassification::parse(s)
        .ok_or_else(|| PersistenceError::Corrupt(format!("unknown classification {s:?}")))
}

// ── JSON columns ───────────────────────────────────────────────────────

pub fn decode_json<T: DeserializeOwned>(column: &str, text: &str) -> Result<T, PersistenceError> {
    serde_json::from_str(text)
        .map_err(|e| PersistenceError::Corrupt(format!("{column}: {e}")))
}

/// Seconds or milliseconds stored as INTEGER.
pub fn to_db_u64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub fn from_db_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub fn from_db_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
