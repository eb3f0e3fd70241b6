//! Main application state and service coordination
//!
//! This module contains the AppState that owns the record store, the change
//! notifier, the standings service and the HTTP server task.

use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::notify::BroadcastChangeNotifier;
use crate::service::http::HttpServer;
use crate::service::standings::StandingsService;
use crate::store::{InMemoryRecordStore, RecordStore};
use crate::types::TeamStanding;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Standings storage
    store: Arc<InMemoryRecordStore>,

    /// Per-tournament change channels
    notifier: Arc<BroadcastChangeNotifier>,

    /// Ranking and admin operations
    standings: Arc<StandingsService>,

    /// Metrics shared with the HTTP server
    metrics: Arc<MetricsCollector>,

    /// HTTP server task
    server_task: Mutex<Option<JoinHandle<()>>>,

    /// Stops the HTTP server
    shutdown_tx: broadcast::Sender<()>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: DateTime<Utc>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} service", config.service.name);
        info!(
            "Configuration: mode={}, group_count={}, podium_size={}",
            config.ranking.mode, config.ranking.group_count, config.ranking.podium_size
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics = Arc::new(
            MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            })?,
        );

        let notifier = Arc::new(BroadcastChangeNotifier::default());
        let store = Arc::new(InMemoryRecordStore::with_notifier(notifier.clone()));
        let standings = Arc::new(StandingsService::with_components(
            store.clone(),
            notifier.clone(),
            Arc::new(crate::grouping::RoundRobinGroupAssigner::new()),
            metrics.clone(),
            config.ranking.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            store,
            notifier,
            standings,
            metrics,
            server_task: Mutex::new(None),
            shutdown_tx,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Utc::now(),
        })
    }

    /// Load standings into the store before serving
    pub fn seed(&self, standings: Vec<TeamStanding>) -> Result<usize> {
        let count = standings.len();
        self.store.upsert_standings(standings)?;
        self.metrics.update_standings_stored(self.store.standing_count()?);
        info!("Seeded {} standings", count);
        Ok(count)
    }

    /// Mark the service running and start the HTTP server
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting {} service", self.config.service.name);

        let server = HttpServer::bind(&self.config.http_addr(), Arc::clone(self))
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to bind HTTP server: {}", e),
            })?;
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!("HTTP server failed: {}", e);
            }
        });

        *self.server_task.lock().await = Some(handle);
        *self.is_running.write().await = true;

        info!("✅ {} service started", self.config.service.name);
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of {}", self.config.service.name);
        *self.is_running.write().await = false;

        if self.shutdown_tx.send(()).is_err() {
            warn!("HTTP server was not listening for shutdown");
        }

        // Ends live tables and their event streams
        self.notifier.close_all();

        if let Some(handle) = self.server_task.lock().await.take() {
            match tokio::time::timeout(self.config.shutdown_timeout(), handle).await {
                Ok(Ok(())) => info!("✅ HTTP server stopped"),
                Ok(Err(e)) => warn!("HTTP server task panicked: {}", e),
                Err(_) => warn!("HTTP server did not stop within the shutdown timeout"),
            }
        }

        match self.store.standing_count() {
            Ok(stored) => info!("Final service statistics: {} standings stored", stored),
            Err(e) => warn!("Failed to read final statistics: {}", e),
        }
        info!("✅ {} shutdown completed", self.config.service.name);
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the standings service
    pub fn standings(&self) -> Arc<StandingsService> {
        self.standings.clone()
    }

    /// Get the record store
    pub fn store(&self) -> Arc<InMemoryRecordStore> {
        self.store.clone()
    }

    /// Get the change notifier
    pub fn notifier(&self) -> Arc<BroadcastChangeNotifier> {
        self.notifier.clone()
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// When this state was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Mark running without starting the HTTP server
    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamSize;
    use uuid::Uuid;

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.ranking.group_count = 12;
        assert!(matches!(
            AppState::new(config),
            Err(ServiceError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_seed_and_running_flag() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert!(!state.is_running().await);

        let tournament = Uuid::new_v4();
        let seeded = state
            .seed(vec![
                TeamStanding::new(tournament, "A", TeamSize::Squad),
                TeamStanding::new(tournament, "B", TeamSize::Squad),
            ])
            .unwrap();
        assert_eq!(seeded, 2);
        assert_eq!(state.metrics().admin().standings_stored.get(), 2);

        state.set_running(true).await;
        assert!(state.is_running().await);
    }

    #[tokio::test]
    async fn test_shutdown_closes_live_tables() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let tournament = Uuid::new_v4();
        state
            .standings()
            .register_team(tournament, "A", TeamSize::Duo)
            .unwrap();

        let mut live = state
            .standings()
            .watch(tournament, crate::types::RankOptions::ungrouped())
            .unwrap();

        state.shutdown().await.unwrap();

        let closed = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while live.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
