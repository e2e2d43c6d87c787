//! Main application state and service coordination
//!
//! `AppState` is built once at process start and shared with every request
//! handler. It owns the rating store, the rating engine and the metrics
//! collector, and implements the matchup / vote / leaderboard / submit
//! operations on top of them.

use crate::config::{validate_config, AppConfig};
use crate::discovery::{label_from_reference, seed_from_directory, SeedReport};
use crate::error::{ArenaError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::{
    EloCalculator, InMemoryRatingStore, RatingStore, RatingUpdate, SqliteRatingStore,
};
use crate::types::{
    LeaderboardEntry, MatchupItem, SubmitRequest, SubmitResponse, VoteRequest,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage initialization error: {message}")]
    Storage { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Persistent items and ratings
    store: Arc<dyn RatingStore>,

    /// Rating engine applied to every vote
    calculator: EloCalculator,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    started_at: DateTime<Utc>,
}

impl AppState {
    /// Initialize the application with the store described by `config`
    pub fn new(config: AppConfig) -> std::result::Result<Self, ServiceError> {
        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let store = Self::open_store(&config)?;
        Self::with_store(config, store)
    }

    /// Initialize the application around an already constructed store.
    ///
    /// Runs the store's schema initialization and, when enabled, image
    /// discovery before returning.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn RatingStore>,
    ) -> std::result::Result<Self, ServiceError> {
        info!("Initializing {} service", config.service.name);

        store.initialize().map_err(|e| ServiceError::Storage {
            message: format!("Failed to initialize rating store: {}", e),
        })?;

        let metrics = Arc::new(
            MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            })?,
        );

        let state = Self {
            config,
            store,
            calculator: EloCalculator::default(),
            metrics,
            started_at: Utc::now(),
        };

        if state.config.images.auto_discover {
            state
                .discover_images()
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Image discovery failed: {}", e),
                })?;
        }

        state.refresh_item_count();
        Ok(state)
    }

    fn open_store(config: &AppConfig) -> std::result::Result<Arc<dyn RatingStore>, ServiceError> {
        if config.storage.in_memory {
            info!("Using in-memory rating store; ratings will not survive a restart");
            return Ok(Arc::new(InMemoryRatingStore::new()));
        }

        let store = SqliteRatingStore::open(&config.storage.database_path).map_err(|e| {
            ServiceError::Storage {
                message: format!(
                    "Failed to open database {}: {}",
                    config.storage.database_path.display(),
                    e
                ),
            }
        })?;
        Ok(Arc::new(store))
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the rating store
    pub fn store(&self) -> Arc<dyn RatingStore> {
        self.store.clone()
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// When the state was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of stored items
    pub fn item_count(&self) -> Result<usize> {
        self.store.count()
    }

    fn refresh_item_count(&self) {
        match self.store.count() {
            Ok(count) => self.metrics.update_item_count(count),
            Err(e) => warn!("Failed to count items: {}", e),
        }
    }

    /// Seed images from the configured image directory
    pub fn discover_images(&self) -> Result<SeedReport> {
        let directory = self.config.images.directory.clone();
        self.seed_directory(&directory)
    }

    /// Seed images from an arbitrary directory
    pub fn seed_directory(&self, directory: &Path) -> Result<SeedReport> {
        let report = seed_from_directory(
            self.store.as_ref(),
            directory,
            &self.config.images.extensions,
        )?;

        self.metrics
            .record_items_seeded("discovery", report.inserted);
        self.refresh_item_count();
        Ok(report)
    }

    /// A random pair of distinct items, or an empty list when fewer than
    /// two items exist
    pub fn matchup(&self) -> Result<Vec<MatchupItem>> {
        let prefix = &self.config.images.url_prefix;

        match self.store.sample_pair()? {
            Some((first, second)) => {
                debug!("Serving matchup {} vs {}", first.id, second.id);
                self.metrics.record_matchup(true);
                Ok(vec![
                    MatchupItem::from_item(&first, prefix),
                    MatchupItem::from_item(&second, prefix),
                ])
            }
            None => {
                debug!("Not enough items for a matchup");
                self.metrics.record_matchup(false);
                Ok(Vec::new())
            }
        }
    }

    /// Like [`AppState::matchup`], but fails with `InsufficientData` when
    /// no pair can be formed
    pub fn require_matchup(&self) -> Result<(MatchupItem, MatchupItem)> {
        let mut pair = self.matchup()?;

        if pair.len() < 2 {
            let available = self.store.count()?;
            return Err(ArenaError::InsufficientData { available }.into());
        }

        let second = pair.swap_remove(1);
        let first = pair.swap_remove(0);
        Ok((first, second))
    }

    /// Apply a vote. Unknown ids and self-votes are rejected without
    /// touching any rating.
    pub fn vote(&self, request: VoteRequest) -> Result<RatingUpdate> {
        let timer = self.metrics.start_timer();

        match self
            .store
            .record_vote(request.winner_id, request.loser_id, &self.calculator)
        {
            Ok(update) => {
                let elapsed = timer.stop();
                self.metrics.record_vote(elapsed);
                info!(
                    "Vote recorded - winner: {} ({:.1} -> {:.1}), loser: {} ({:.1} -> {:.1}), expected: {:.3}",
                    update.winner.id,
                    update.winner.old_rating,
                    update.winner.new_rating,
                    update.loser.id,
                    update.loser.old_rating,
                    update.loser.new_rating,
                    update.expected_winner
                );
                Ok(update)
            }
            Err(e) => {
                match e.downcast_ref::<ArenaError>() {
                    Some(arena_error) if arena_error.is_client_error() => {
                        warn!(
                            "Vote rejected - winner: {}, loser: {}: {}",
                            request.winner_id, request.loser_id, arena_error
                        );
                        self.metrics.record_vote_rejected(arena_error.reason());
                    }
                    _ => {
                        error!(
                            "Vote failed - winner: {}, loser: {}: {}",
                            request.winner_id, request.loser_id, e
                        );
                        self.metrics.record_vote_rejected("storage");
                    }
                }
                Err(e)
            }
        }
    }

    /// Every item, highest rating first, ratings rounded for display
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let prefix = &self.config.images.url_prefix;
        let items = self.store.list_by_rating_desc()?;

        Ok(items
            .iter()
            .map(|item| LeaderboardEntry::from_item(item, prefix))
            .collect())
    }

    /// Add an image by URL
    pub fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse> {
        if !self.config.images.allow_submissions {
            return Err(ArenaError::invalid("image submissions are disabled").into());
        }

        let url = request.url.trim();
        if url.is_empty() {
            return Err(ArenaError::invalid("url must not be empty").into());
        }

        let label = match request.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => {
                let derived = label_from_reference(url);
                if derived.trim().is_empty() {
                    url.to_string()
                } else {
                    derived
                }
            }
        };

        let created = self.store.seed(url, &label)?;
        let id = self
            .store
            .find_by_reference(url)?
            .ok_or_else(|| ArenaError::Storage {
                message: format!("submitted image '{}' was not stored", url),
            })?;

        if created {
            info!("Image submitted - id: {}, label: '{}', url: {}", id, label, url);
            self.metrics.record_items_seeded("submission", 1);
            self.refresh_item_count();
        } else {
            debug!("Image already present - id: {}, url: {}", id, url);
        }

        Ok(SubmitResponse {
            status: "ok".to_string(),
            id,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::storage::MockRatingStore;
    use crate::rating::DEFAULT_RATING;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.in_memory = true;
        config.images.auto_discover = false;
        config
    }

    fn seeded_state(references: &[&str]) -> AppState {
        let state = AppState::new(test_config()).unwrap();
        for reference in references {
            state.store().seed(reference, reference).unwrap();
        }
        state
    }

    fn arena_error(err: &anyhow::Error) -> Option<&ArenaError> {
        err.downcast_ref::<ArenaError>()
    }

    #[test]
    fn test_matchup_empty_until_two_items() {
        let state = seeded_state(&[]);
        assert!(state.matchup().unwrap().is_empty());

        state.store().seed("one.png", "One").unwrap();
        assert!(state.matchup().unwrap().is_empty());
        assert!(matches!(
            arena_error(&state.require_matchup().unwrap_err()),
            Some(ArenaError::InsufficientData { available: 1 })
        ));

        state.store().seed("two.png", "Two").unwrap();
        let pair = state.matchup().unwrap();
        assert_eq!(pair.len(), 2);
        assert_ne!(pair[0].id, pair[1].id);
        assert!(pair.iter().all(|item| item.url.starts_with("/static/images/")));

        assert_eq!(state.metrics().votes().matchups_insufficient_total.get(), 3);
        assert_eq!(state.metrics().votes().matchups_served_total.get(), 1);
    }

    #[test]
    fn test_vote_updates_ratings() {
        let state = seeded_state(&["a.png", "b.png"]);

        let update = state
            .vote(VoteRequest {
                winner_id: 1,
                loser_id: 2,
            })
            .unwrap();

        assert!((update.winner.new_rating - 1216.0).abs() < 1e-9);
        assert!((update.loser.new_rating - 1184.0).abs() < 1e-9);
        assert_eq!(state.metrics().votes().votes_total.get(), 1);

        let board = state.leaderboard().unwrap();
        assert_eq!(board[0].rating, 1216);
        assert_eq!(board[0].url, "/static/images/a.png");
        assert_eq!(board[1].rating, 1184);
    }

    #[test]
    fn test_vote_with_unknown_id_is_rejected() {
        let state = seeded_state(&["a.png", "b.png"]);

        let err = state
            .vote(VoteRequest {
                winner_id: 1,
                loser_id: 9,
            })
            .unwrap_err();
        assert_eq!(arena_error(&err), Some(&ArenaError::NotFound { id: 9 }));

        let err = state
            .vote(VoteRequest {
                winner_id: 2,
                loser_id: 2,
            })
            .unwrap_err();
        assert!(matches!(
            arena_error(&err),
            Some(ArenaError::InvalidInput { .. })
        ));

        for item in state.store().list_by_rating_desc().unwrap() {
            assert_eq!(item.rating, DEFAULT_RATING);
        }
        let metrics = state.metrics();
        let rejected = &metrics.votes().votes_rejected_total;
        assert_eq!(rejected.with_label_values(&["not_found"]).get(), 1);
        assert_eq!(rejected.with_label_values(&["invalid_input"]).get(), 1);
    }

    #[test]
    fn test_leaderboard_order() {
        let state = seeded_state(&["a.png", "b.png", "c.png"]);
        let store = state.store();
        store.update_rating(1, 1300.0).unwrap();
        store.update_rating(2, 1100.0).unwrap();
        store.update_rating(3, 1200.0).unwrap();

        let ratings: Vec<i64> = state
            .leaderboard()
            .unwrap()
            .iter()
            .map(|entry| entry.rating)
            .collect();
        assert_eq!(ratings, vec![1300, 1200, 1100]);
    }

    #[test]
    fn test_submit() {
        let state = seeded_state(&[]);

        let response = state
            .submit(SubmitRequest {
                url: " https://example.com/pics/snow_leopard.jpg ".to_string(),
                label: None,
            })
            .unwrap();
        assert!(response.created);
        assert_eq!(response.status, "ok");

        let item = state.store().get(response.id).unwrap().unwrap();
        assert_eq!(item.reference, "https://example.com/pics/snow_leopard.jpg");
        assert_eq!(item.label, "Snow Leopard");

        let again = state
            .submit(SubmitRequest {
                url: "https://example.com/pics/snow_leopard.jpg".to_string(),
                label: Some("Different".to_string()),
            })
            .unwrap();
        assert!(!again.created);
        assert_eq!(again.id, response.id);
        assert_eq!(state.item_count().unwrap(), 1);
    }

    #[test]
    fn test_submit_validation() {
        let state = seeded_state(&[]);
        let err = state
            .submit(SubmitRequest {
                url: "   ".to_string(),
                label: Some("Blank".to_string()),
            })
            .unwrap_err();
        assert!(matches!(
            arena_error(&err),
            Some(ArenaError::InvalidInput { .. })
        ));

        let mut config = test_config();
        config.images.allow_submissions = false;
        let state = AppState::new(config).unwrap();
        let err = state
            .submit(SubmitRequest {
                url: "https://example.com/a.png".to_string(),
                label: None,
            })
            .unwrap_err();
        assert!(matches!(
            arena_error(&err),
            Some(ArenaError::InvalidInput { .. })
        ));
        assert_eq!(state.item_count().unwrap(), 0);
    }

    #[test]
    fn test_discovery_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("red_fox.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("owl.png"), b"").unwrap();

        let mut config = test_config();
        config.images.auto_discover = true;
        config.images.directory = dir.path().to_path_buf();

        let state = AppState::new(config).unwrap();
        assert_eq!(state.item_count().unwrap(), 2);
        assert_eq!(state.metrics().items().items_total.get(), 2);

        let labels: Vec<String> = state
            .leaderboard()
            .unwrap()
            .into_iter()
            .map(|entry| entry.label)
            .collect();
        assert!(labels.contains(&"Red Fox".to_string()));
    }

    #[test]
    fn test_store_initialized_once() {
        let mut store = MockRatingStore::new();
        store.expect_initialize().times(1).returning(|| Ok(()));
        store.expect_count().returning(|| Ok(0));

        let state = AppState::with_store(test_config(), Arc::new(store)).unwrap();
        assert_eq!(state.item_count().unwrap(), 0);
    }

    #[test]
    fn test_initialize_failure_is_reported() {
        let mut store = MockRatingStore::new();
        store.expect_initialize().returning(|| {
            Err(ArenaError::Storage {
                message: "read-only filesystem".to_string(),
            }
            .into())
        });

        let result = AppState::with_store(test_config(), Arc::new(store));
        assert!(matches!(result, Err(ServiceError::Storage { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.images.url_prefix = "images/".to_string();

        let result = AppState::new(config);
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[test]
    fn test_storage_failure_during_vote() {
        let mut store = MockRatingStore::new();
        store.expect_initialize().returning(|| Ok(()));
        store.expect_count().returning(|| Ok(2));
        store.expect_record_vote().times(1).returning(|_, _, _| {
            Err(ArenaError::Storage {
                message: "database is locked".to_string(),
            }
            .into())
        });

        let state = AppState::with_store(test_config(), Arc::new(store)).unwrap();
        let err = state
            .vote(VoteRequest {
                winner_id: 1,
                loser_id: 2,
            })
            .unwrap_err();

        assert!(!arena_error(&err).unwrap().is_client_error());
        assert_eq!(
            state
                .metrics()
                .votes()
                .votes_rejected_total
                .with_label_values(&["storage"])
                .get(),
            1
        );
    }
}
