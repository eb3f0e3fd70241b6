//! Service layer for the standings service
//!
//! This module contains the standings service that coordinates ranking and
//! admin edits, the application state, health checks and the HTTP surface.

pub mod app;
pub mod health;
pub mod http;
pub mod standings;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use http::{create_router, ApiError, HttpServer};
pub use standings::StandingsService;
