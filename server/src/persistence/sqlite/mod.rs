//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer and multiple concurrent readers.
//! - **Foreign keys enabled**: links cascade away with their analysis rows.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/0001_initial_schema.sql`
//!   when [`Database::open`] is called.
//!
//! ## Repository types
//!
//! Each type holds a `SqlitePool` clone and implements the corresponding trait:
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteAnalysisRepository`] | `AnalysisRepository` |
//! | [`SqliteProgressRepository`] | `ProgressRepository` |
//! | [`SqliteLinkRepository`] | `LinkRepository` |
//! | [`SqlitePuzzleCacheStore`] | `puzzles::PuzzleCacheStore` |
//!
//! Every write is an `INSERT ... ON CONFLICT DO UPDATE` keyed on the natural
//! key of the row. Nested values (alternatives, findings, themes) are stored
//! as JSON text.

mod analysis_repo;
mod cache_store;
mod database;
pub(crate) mod helpers;
mod link_repo;
mod progress_repo;

pub use analysis_repo::SqliteAnalysisRepository;
pub use cache_store::SqlitePuzzleCacheStore;
pub use database::Database;
pub use link_repo::SqliteLinkRepository;
pub use progress_repo::SqliteProgressRepository;
