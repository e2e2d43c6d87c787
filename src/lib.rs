//! Image Arena - pairwise image voting with ELO ratings
//!
//! This crate serves random pairs of images, records which one a voter
//! prefers, updates an ELO rating for both and exposes a sorted
//! leaderboard over HTTP.

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod types;

// Re-export commonly used types and traits
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use rating::{EloCalculator, InMemoryRatingStore, RatingStore, SqliteRatingStore};
pub use service::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
