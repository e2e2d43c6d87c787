//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the image arena service
//! using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the arena service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Voting and matchup metrics
    vote_metrics: VoteMetrics,

    /// Item catalogue metrics
    item_metrics: ItemMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Voting and matchup metrics
#[derive(Clone)]
pub struct VoteMetrics {
    /// Votes applied successfully
    pub votes_total: IntCounter,

    /// Votes rejected, by reason
    pub votes_rejected_total: IntCounterVec,

    /// Matchups handed out
    pub matchups_served_total: IntCounter,

    /// Matchup requests that found fewer than two items
    pub matchups_insufficient_total: IntCounter,

    /// Time spent applying a vote
    pub vote_duration: Histogram,
}

/// Item catalogue metrics
#[derive(Clone)]
pub struct ItemMetrics {
    /// Items currently stored
    pub items_total: IntGauge,

    /// Items added, by ingestion path
    pub items_seeded_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let vote_metrics = VoteMetrics::new(&registry)?;
        let item_metrics = ItemMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            vote_metrics,
            item_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn votes(&self) -> &VoteMetrics {
        &self.vote_metrics
    }

    pub fn items(&self) -> &ItemMetrics {
        &self.item_metrics
    }

    /// Record a vote that was applied
    pub fn record_vote(&self, duration: Duration) {
        self.vote_metrics.votes_total.inc();
        self.vote_metrics
            .vote_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a vote that was turned down
    pub fn record_vote_rejected(&self, reason: &str) {
        self.vote_metrics
            .votes_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a matchup request; `served` is false when there were not
    /// enough items to build a pair
    pub fn record_matchup(&self, served: bool) {
        if served {
            self.vote_metrics.matchups_served_total.inc();
        } else {
            self.vote_metrics.matchups_insufficient_total.inc();
        }
    }

    /// Record newly added items
    pub fn record_items_seeded(&self, source: &str, count: usize) {
        self.item_metrics
            .items_seeded_total
            .with_label_values(&[source])
            .inc_by(count as u64);
    }

    /// Update the stored item gauge
    pub fn update_item_count(&self, count: usize) {
        self.item_metrics.items_total.set(count as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let health_status = IntGauge::new(
            "image_arena_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("image_arena_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            health_status,
            component_health,
        })
    }
}

impl VoteMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let votes_total = IntCounter::new("image_arena_votes_total", "Votes applied")?;
        registry.register(Box::new(votes_total.clone()))?;

        let votes_rejected_total = IntCounterVec::new(
            Opts::new("image_arena_votes_rejected_total", "Votes rejected"),
            &["reason"],
        )?;
        registry.register(Box::new(votes_rejected_total.clone()))?;

        let matchups_served_total = IntCounter::new(
            "image_arena_matchups_served_total",
            "Matchups handed out",
        )?;
        registry.register(Box::new(matchups_served_total.clone()))?;

        let matchups_insufficient_total = IntCounter::new(
            "image_arena_matchups_insufficient_total",
            "Matchup requests with fewer than two items",
        )?;
        registry.register(Box::new(matchups_insufficient_total.clone()))?;

        let vote_duration = Histogram::with_opts(
            HistogramOpts::new(
                "image_arena_vote_duration_seconds",
                "Time spent applying a vote",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(vote_duration.clone()))?;

        Ok(Self {
            votes_total,
            votes_rejected_total,
            matchups_served_total,
            matchups_insufficient_total,
            vote_duration,
        })
    }
}

impl ItemMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let items_total = IntGauge::new("image_arena_items_total", "Items currently stored")?;
        registry.register(Box::new(items_total.clone()))?;

        let items_seeded_total = IntCounterVec::new(
            Opts::new("image_arena_items_seeded_total", "Items added"),
            &["source"],
        )?;
        registry.register(Box::new(items_seeded_total.clone()))?;

        Ok(Self {
            items_total,
            items_seeded_total,
        })
    }
}
