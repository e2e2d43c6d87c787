//! Rating engine and rating storage
//!
//! The ELO engine is a pure function of two ratings; the stores persist
//! items and apply votes atomically using it.

pub mod elo;
pub mod sqlite;
pub mod storage;

// Re-export commonly used types
pub use elo::{EloCalculator, RatingChange, RatingUpdate, DEFAULT_RATING, K_FACTOR};
pub use sqlite::SqliteRatingStore;
pub use storage::{InMemoryRatingStore, RatingStore};
