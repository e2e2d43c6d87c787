//! Health checks
//!
//! This module provides health check functionality for the image arena
//! service: a full report for `/health` and a cheap liveness probe.

use crate::error::ArenaError;
use crate::service::app::AppState;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Numeric form used by the health gauge
    pub fn as_gauge(self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional message when not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Items currently stored
    pub items: usize,
    /// Votes applied since the service started
    pub votes_recorded: u64,
    /// Matchups served since the service started
    pub matchups_served: u64,
    /// Seconds since the service started
    pub uptime_seconds: i64,
}

impl HealthCheck {
    /// Perform a health check of the service
    pub fn check(app_state: &AppState) -> Self {
        let store_check = Self::check_rating_store(app_state);
        let status = HealthStatus::Healthy.worst(store_check.status);
        let stats = Self::gather_service_stats(app_state);

        let metrics = app_state.metrics();
        metrics.update_health_status(status.as_gauge());
        metrics.update_component_health("rating_store", store_check.status != HealthStatus::Unhealthy);

        HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![store_check],
            stats,
        }
    }

    /// Liveness check: the store answers queries
    pub fn liveness_check(app_state: &AppState) -> HealthStatus {
        match app_state.item_count() {
            Ok(_) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        }
    }

    /// The store is reachable; fewer than two items means no matchup can
    /// be served yet, which is reported as degraded
    fn check_rating_store(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match app_state.item_count() {
            Ok(available) if available < 2 => (
                HealthStatus::Degraded,
                Some(ArenaError::InsufficientData { available }.to_string()),
            ),
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Rating store health check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Rating store unavailable: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "rating_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let metrics = app_state.metrics();

        ServiceStats {
            items: app_state.item_count().unwrap_or_default(),
            votes_recorded: metrics.votes().votes_total.get(),
            matchups_served: metrics.votes().matchups_served_total.get(),
            uptime_seconds: (chrono::Utc::now() - app_state.started_at()).num_seconds(),
        }
    }

    /// Convert health check to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
