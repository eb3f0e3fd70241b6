//! Main application configuration
//!
//! This module defines the configuration structures for the standings service,
//! including environment variable loading, TOML files and validation.

use crate::types::{RankMode, RankOptions, MAX_GROUP_COUNT, MIN_GROUP_COUNT};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub ranking: RankingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP server binds to
    pub http_host: String,
    /// Port for the HTTP server
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Points-table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Default ranking mode
    pub mode: RankMode,
    /// Default number of groups for grouped tables and round-robin assignment
    pub group_count: u32,
    /// How many teams a winner announcement lists
    pub podium_size: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "standings-ranker".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            mode: RankMode::Grouped,
            group_count: 4,
            podium_size: 3,
        }
    }
}

impl RankingSettings {
    /// Ranker options derived from these settings
    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            mode: self.mode,
            group_count: self.group_count,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Ranking settings
        if let Ok(mode) = env::var("RANK_MODE") {
            self.ranking.mode = mode
                .parse()
                .map_err(|_| anyhow!("Invalid RANK_MODE value: {}", mode))?;
        }
        if let Ok(group_count) = env::var("GROUP_COUNT") {
            self.ranking.group_count = group_count
                .parse()
                .map_err(|_| anyhow!("Invalid GROUP_COUNT value: {}", group_count))?;
        }
        if let Ok(podium) = env::var("PODIUM_SIZE") {
            self.ranking.podium_size = podium
                .parse()
                .map_err(|_| anyhow!("Invalid PODIUM_SIZE value: {}", podium))?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Address the HTTP server binds to
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.http_host.is_empty() {
        return Err(anyhow!("HTTP host cannot be empty"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if !(MIN_GROUP_COUNT..=MAX_GROUP_COUNT).contains(&config.ranking.group_count) {
        return Err(anyhow!(
            "Group count must be between {} and {}, got {}",
            MIN_GROUP_COUNT,
            MAX_GROUP_COUNT,
            config.ranking.group_count
        ));
    }
    if config.ranking.podium_size == 0 {
        return Err(anyhow!("Podium size must be greater than 0"));
    }

    Ok(())
}
