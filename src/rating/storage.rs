//! Rating storage interface and implementations
//!
//! This module defines the interface for persisting rateable items and
//! their ratings, plus an in-memory implementation used by tests,
//! benchmarks and throwaway runs. The durable backend lives in
//! [`crate::rating::sqlite`].

use crate::error::{ArenaError, Result};
use crate::rating::elo::{EloCalculator, RatingUpdate, DEFAULT_RATING};
use crate::types::{Item, ItemId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Trait for rating storage operations
#[cfg_attr(test, mockall::automock)]
pub trait RatingStore: Send + Sync {
    /// Create the backing schema. Must be called once before any other
    /// operation; calling it again is a no-op.
    fn initialize(&self) -> Result<()>;

    /// Insert an item with the default rating unless one with the same
    /// reference already exists. Returns whether a row was inserted.
    fn seed(&self, reference: &str, label: &str) -> Result<bool>;

    /// Look up the id of the item with the given reference
    fn find_by_reference(&self, reference: &str) -> Result<Option<ItemId>>;

    /// Two distinct items chosen uniformly at random, or `None` when fewer
    /// than two items exist
    fn sample_pair(&self) -> Result<Option<(Item, Item)>>;

    /// Get an item by id
    fn get(&self, id: ItemId) -> Result<Option<Item>>;

    /// Overwrite an item's rating
    fn update_rating(&self, id: ItemId, new_rating: f64) -> Result<()>;

    /// Apply a vote atomically: read both items, rate them, write both.
    /// Nothing is written when either id is unknown or both are equal.
    fn record_vote(
        &self,
        winner_id: ItemId,
        loser_id: ItemId,
        calculator: &EloCalculator,
    ) -> Result<RatingUpdate>;

    /// All items, highest rating first; ties ordered by ascending id
    fn list_by_rating_desc(&self) -> Result<Vec<Item>>;

    /// Number of stored items
    fn count(&self) -> Result<usize>;
}

/// Reject votes that cannot be applied regardless of stored state
pub fn validate_vote(winner_id: ItemId, loser_id: ItemId) -> Result<()> {
    if winner_id == loser_id {
        return Err(ArenaError::invalid(format!(
            "an item cannot win against itself (id {})",
            winner_id
        ))
        .into());
    }
    Ok(())
}

/// Reject ratings that cannot be stored or ranked
pub fn validate_rating(rating: f64) -> Result<()> {
    if !rating.is_finite() {
        return Err(ArenaError::invalid(format!("rating must be finite, got {}", rating)).into());
    }
    Ok(())
}

/// Order items for the leaderboard
pub(crate) fn sort_by_rating_desc(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}

#[derive(Debug, Default)]
struct InMemoryItems {
    items: BTreeMap<ItemId, Item>,
    by_reference: HashMap<String, ItemId>,
    last_id: ItemId,
}

/// In-memory rating store implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    inner: RwLock<InMemoryItems>,
}

impl InMemoryRatingStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, InMemoryItems>> {
        self.inner.read().map_err(|_| {
            ArenaError::Storage {
                message: "Failed to acquire items read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, InMemoryItems>> {
        self.inner.write().map_err(|_| {
            ArenaError::Storage {
                message: "Failed to acquire items write lock".to_string(),
            }
            .into()
        })
    }
}

impl RatingStore for InMemoryRatingStore {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn seed(&self, reference: &str, label: &str) -> Result<bool> {
        let mut inner = self.write()?;

        if inner.by_reference.contains_key(reference) {
            return Ok(false);
        }

        inner.last_id += 1;
        let id = inner.last_id;
        inner.by_reference.insert(reference.to_string(), id);
        inner.items.insert(
            id,
            Item {
                id,
                reference: reference.to_string(),
                label: label.to_string(),
                rating: DEFAULT_RATING,
                matches_played: 0,
            },
        );

        Ok(true)
    }

    fn find_by_reference(&self, reference: &str) -> Result<Option<ItemId>> {
        Ok(self.read()?.by_reference.get(reference).copied())
    }

    fn sample_pair(&self) -> Result<Option<(Item, Item)>> {
        let inner = self.read()?;

        if inner.items.len() < 2 {
            return Ok(None);
        }

        let picked = rand::seq::index::sample(&mut rand::rng(), inner.items.len(), 2);
        let mut chosen = picked
            .iter()
            .filter_map(|index| inner.items.values().nth(index).cloned());

        match (chosen.next(), chosen.next()) {
            (Some(first), Some(second)) => Ok(Some((first, second))),
            _ => Ok(None),
        }
    }

    fn get(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn update_rating(&self, id: ItemId, new_rating: f64) -> Result<()> {
        validate_rating(new_rating)?;
        let mut inner = self.write()?;

        match inner.items.get_mut(&id) {
            Some(item) => {
                item.rating = new_rating;
                Ok(())
            }
            None => Err(ArenaError::NotFound { id }.into()),
        }
    }

    fn record_vote(
        &self,
        winner_id: ItemId,
        loser_id: ItemId,
        calculator: &EloCalculator,
    ) -> Result<RatingUpdate> {
        validate_vote(winner_id, loser_id)?;

        // Held for the whole read-compute-write sequence
        let mut inner = self.write()?;

        let winner_rating = inner
            .items
            .get(&winner_id)
            .map(|item| item.rating)
            .ok_or(ArenaError::NotFound { id: winner_id })?;
        let loser_rating = inner
            .items
            .get(&loser_id)
            .map(|item| item.rating)
            .ok_or(ArenaError::NotFound { id: loser_id })?;

        let update = calculator.rate_items(winner_id, winner_rating, loser_id, loser_rating);

        for change in [update.winner, update.loser] {
            if let Some(item) = inner.items.get_mut(&change.id) {
                item.rating = change.new_rating;
                item.matches_played += 1;
            }
        }

        Ok(update)
    }

    fn list_by_rating_desc(&self) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self.read()?.items.values().cloned().collect();
        sort_by_rating_desc(&mut items);
        Ok(items)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.items.len())
    }
}
