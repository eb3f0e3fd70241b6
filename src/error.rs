//! Error types for the standings service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to branch on a specific failure
//! can recover the [`RankingError`] with `downcast_ref`.

use crate::types::{StandingId, TournamentId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ranking scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("Invalid standing {standing_id}: {reason}")]
    InvalidInput {
        standing_id: StandingId,
        reason: String,
    },

    #[error("Group count {group_count} is outside the supported range 2..=8")]
    AmbiguousGroupCount { group_count: u32 },

    #[error("Standing not found: {standing_id}")]
    StandingNotFound { standing_id: StandingId },

    #[error("Standing belongs to tournament {found}, expected {expected}")]
    TournamentMismatch {
        expected: TournamentId,
        found: TournamentId,
    },

    #[error("Unrecognised team size: {value}")]
    InvalidTeamSize { value: String },

    #[error("Record store failure: {message}")]
    StoreError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl RankingError {
    /// Short machine-readable name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            RankingError::InvalidInput { .. } => "invalid_input",
            RankingError::AmbiguousGroupCount { .. } => "ambiguous_group_count",
            RankingError::StandingNotFound { .. } => "standing_not_found",
            RankingError::TournamentMismatch { .. } => "tournament_mismatch",
            RankingError::InvalidTeamSize { .. } => "invalid_team_size",
            RankingError::StoreError { .. } => "store_error",
            RankingError::ConfigurationError { .. } => "configuration_error",
        }
    }
}
