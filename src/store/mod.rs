//! Record store interface and implementations
//!
//! This module defines the interface for persisting and retrieving team
//! standings, with an in-memory implementation that publishes change events.

pub mod memory;

pub use memory::InMemoryRecordStore;

use crate::error::Result;
use crate::grouping::GroupAssignment;
use crate::types::{CounterUpdate, StandingId, TeamStanding, TournamentId};

/// Trait for standings storage operations
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Get all standings of a tournament, in registration order
    fn get_standings(&self, tournament_id: TournamentId) -> Result<Vec<TeamStanding>>;

    /// Get a single standing
    fn get_standing(&self, standing_id: StandingId) -> Result<Option<TeamStanding>>;

    /// Insert a newly registered standing
    fn insert_standing(&self, standing: TeamStanding) -> Result<()>;

    /// Insert or replace standings in bulk
    fn upsert_standings(&self, standings: Vec<TeamStanding>) -> Result<()>;

    /// Overwrite the counters set in `update`.
    ///
    /// Fails with `StandingNotFound` unless the standing belongs to `tournament_id`.
    fn update_counters(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
        update: CounterUpdate,
    ) -> Result<TeamStanding>;

    /// Set or clear one standing's group label, scoped like [`Self::update_counters`]
    fn set_group_name(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
        group_name: Option<String>,
    ) -> Result<TeamStanding>;

    /// Write a batch of group labels for one tournament
    fn apply_group_assignments(
        &self,
        tournament_id: TournamentId,
        assignments: Vec<GroupAssignment>,
    ) -> Result<()>;

    /// Persist ranked positions for one tournament
    fn update_positions(&self, tournament_id: TournamentId, ranked: Vec<TeamStanding>)
        -> Result<()>;

    /// Remove a standing, returning whether it existed
    fn remove_standing(&self, standing_id: StandingId) -> Result<bool>;

    /// Remove every standing of a tournament, returning how many were removed
    fn remove_tournament(&self, tournament_id: TournamentId) -> Result<usize>;

    /// All tournaments with at least one standing
    fn tournament_ids(&self) -> Result<Vec<TournamentId>>;

    /// Total number of stored standings
    fn standing_count(&self) -> Result<usize>;
}
