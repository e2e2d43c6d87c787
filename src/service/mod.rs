//! Service layer for the image arena
//!
//! This module contains the application state shared by the HTTP handlers
//! and the CLI, and the health checks built on top of it.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
