//! ELO rating engine
//!
//! Pure rating computation for a single pairwise comparison, built on the
//! `elo` module of the skillratings crate. A vote is always a decisive
//! win for one side; draws are not part of the voting model.

use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use skillratings::elo::{elo, expected_score, EloConfig, EloRating};
use skillratings::Outcomes;

/// Sensitivity of a single comparison
pub const K_FACTOR: f64 = 32.0;

/// Rating assigned to newly seeded items
pub const DEFAULT_RATING: f64 = 1200.0;

/// Rating movement of one item caused by a vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub id: ItemId,
    pub old_rating: f64,
    pub new_rating: f64,
}

impl RatingChange {
    pub fn delta(&self) -> f64 {
        self.new_rating - self.old_rating
    }
}

/// Outcome of applying one vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub winner: RatingChange,
    pub loser: RatingChange,
    /// Probability the model assigned to the winner winning, before the vote
    pub expected_winner: f64,
}

/// ELO calculator with a fixed K-factor
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: EloConfig,
}

impl EloCalculator {
    /// K-factor applied to every vote
    pub fn k(&self) -> f64 {
        self.config.k
    }

    /// Expected score of the winner: `1 / (1 + 10^((loser - winner) / 400))`
    pub fn expected_score(&self, winner_rating: f64, loser_rating: f64) -> f64 {
        let (expected_winner, _expected_loser) = expected_score(
            &EloRating {
                rating: winner_rating,
            },
            &EloRating {
                rating: loser_rating,
            },
        );
        expected_winner
    }

    /// New `(winner, loser)` ratings after the winner beat the loser.
    ///
    /// The winner gains `K * (1 - Ew)` and the loser gives up exactly the
    /// same amount, so the sum of both ratings is preserved.
    pub fn rate(&self, winner_rating: f64, loser_rating: f64) -> (f64, f64) {
        let (winner, loser) = elo(
            &EloRating {
                rating: winner_rating,
            },
            &EloRating {
                rating: loser_rating,
            },
            &Outcomes::WIN,
            &self.config,
        );
        (winner.rating, loser.rating)
    }

    /// Rate a vote between two known items
    pub fn rate_items(
        &self,
        winner_id: ItemId,
        winner_rating: f64,
        loser_id: ItemId,
        loser_rating: f64,
    ) -> RatingUpdate {
        let expected_winner = self.expected_score(winner_rating, loser_rating);
        let (new_winner, new_loser) = self.rate(winner_rating, loser_rating);

        RatingUpdate {
            winner: RatingChange {
                id: winner_id,
                old_rating: winner_rating,
                new_rating: new_winner,
            },
            loser: RatingChange {
                id: loser_id,
                old_rating: loser_rating,
                new_rating: new_loser,
            },
            expected_winner,
        }
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            config: EloConfig { k: K_FACTOR },
        }
    }
}
