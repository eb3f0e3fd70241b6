//! Standings service
//!
//! Coordinates the record store, the ranker, group assignment and change
//! notification. Admin edits go through here; reads rank a fresh snapshot
//! every time, so concurrent callers never share mutable state.

use crate::config::RankingSettings;
use crate::error::{RankingError, Result};
use crate::grouping::{reassign_group, GroupAssigner, GroupAssignment, RoundRobinGroupAssigner};
use crate::metrics::MetricsCollector;
use crate::notify::{ChangeNotifier, Subscription};
use crate::ranking::{StandingsRanker, StandingsTable};
use crate::store::RecordStore;
use crate::types::{
    CounterUpdate, RankOptions, StandingId, TeamSize, TeamStanding, TournamentId,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// The main standings service
pub struct StandingsService {
    /// Source of standings
    store: Arc<dyn RecordStore>,
    /// Change signals from the store
    notifier: Arc<dyn ChangeNotifier>,
    /// Group assignment strategy
    assigner: Arc<dyn GroupAssigner>,
    /// Metrics collector
    metrics: Arc<MetricsCollector>,
    /// Default ranking behaviour
    settings: RankingSettings,
    ranker: StandingsRanker,
}

impl StandingsService {
    /// Create a service with round-robin assignment and a private metrics registry
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn ChangeNotifier>,
        settings: RankingSettings,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_components(
            store,
            notifier,
            Arc::new(RoundRobinGroupAssigner::new()),
            metrics,
            settings,
        )
    }

    /// Create with a custom assigner and metrics collector
    pub fn with_components(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn ChangeNotifier>,
        assigner: Arc<dyn GroupAssigner>,
        metrics: Arc<MetricsCollector>,
        settings: RankingSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            assigner,
            metrics,
            settings,
            ranker: StandingsRanker::new(),
        }
    }

    /// Ranking options used when a caller does not supply any
    pub fn default_options(&self) -> RankOptions {
        self.settings.rank_options()
    }

    /// Ranking settings of this service
    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    /// Metrics collector of this service
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Record store backing this service
    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Rank a snapshot, recording metrics for the pass
    pub fn rank_standings(
        &self,
        standings: Vec<TeamStanding>,
        options: &RankOptions,
    ) -> Result<StandingsTable> {
        let timer = self.metrics.start_timer();
        let count = standings.len();

        match self.ranker.rank(standings, options) {
            Ok(table) => {
                self.metrics
                    .record_ranking(options.mode, count, timer.stop());
                Ok(table)
            }
            Err(e) => {
                let kind = e
                    .downcast_ref::<RankingError>()
                    .map(RankingError::kind)
                    .unwrap_or("other");
                self.metrics.record_ranking_failure(kind);
                warn!("Ranking pass rejected ({}): {}", kind, e);
                Err(e)
            }
        }
    }

    /// Read and rank the current standings of a tournament
    pub fn current_table(
        &self,
        tournament_id: TournamentId,
        options: &RankOptions,
    ) -> Result<StandingsTable> {
        let standings = self.store.get_standings(tournament_id)?;
        debug!(
            "Ranking {} standings of tournament {}",
            standings.len(),
            tournament_id
        );
        self.rank_standings(standings, options)
    }

    /// Register a team in a tournament with zeroed counters
    pub fn register_team(
        &self,
        tournament_id: TournamentId,
        team_name: &str,
        team_size: TeamSize,
    ) -> Result<TeamStanding> {
        let team_name = team_name.trim();
        if team_name.is_empty() {
            return Err(RankingError::InvalidInput {
                standing_id: uuid::Uuid::nil(),
                reason: "team name cannot be empty".to_string(),
            }
            .into());
        }

        let standing = TeamStanding::new(tournament_id, team_name, team_size);
        self.store.insert_standing(standing.clone())?;

        info!(
            "Registered team '{}' ({}) in tournament {}",
            standing.team_name, standing.team_size, tournament_id
        );
        self.metrics.record_mutation("register_team");
        self.refresh_stored_gauge();
        Ok(standing)
    }

    /// Overwrite the counters of a standing in `tournament_id`.
    ///
    /// Negative values are rejected before any write.
    pub fn update_counters(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
        update: CounterUpdate,
    ) -> Result<TeamStanding> {
        if update.is_empty() {
            return Err(RankingError::InvalidInput {
                standing_id,
                reason: "no counters supplied".to_string(),
            }
            .into());
        }

        for (field, value) in [
            ("points", update.points),
            ("kills", update.kills),
            ("wins", update.wins),
        ] {
            if let Some(value) = value.filter(|v| *v < 0) {
                return Err(RankingError::InvalidInput {
                    standing_id,
                    reason: format!("{} must be non-negative, got {}", field, value),
                }
                .into());
            }
        }

        let updated = self
            .store
            .update_counters(tournament_id, standing_id, update)?;
        info!(
            "Updated team '{}' to {} pts / {} kills / {} wins",
            updated.team_name, updated.points, updated.kills, updated.wins
        );
        self.metrics.record_mutation("update_counters");
        Ok(updated)
    }

    /// Move one team to another group.
    ///
    /// Positions are not recomputed; call [`Self::recalculate`] to persist new ranks.
    pub fn reassign_team(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
        group_name: Option<String>,
    ) -> Result<TeamStanding> {
        let mut standings = self.store.get_standings(tournament_id)?;
        let assignment = reassign_group(&mut standings, standing_id, group_name.clone())?;

        let updated = self
            .store
            .set_group_name(tournament_id, standing_id, group_name)?;
        info!(
            "Moved team '{}' to {} in tournament {}",
            assignment.team_name, assignment.group_name, tournament_id
        );
        self.metrics.record_mutation("reassign_team");
        Ok(updated)
    }

    /// Assign every team of a tournament to groups in registration order
    pub fn assign_groups(
        &self,
        tournament_id: TournamentId,
        group_count: u32,
    ) -> Result<Vec<GroupAssignment>> {
        let mut standings = self.store.get_standings(tournament_id)?;
        let assignments = self.assigner.assign(&mut standings, group_count)?;

        self.store
            .apply_group_assignments(tournament_id, assignments.clone())?;

        info!(
            "Assigned {} teams of tournament {} into {} groups",
            assignments.len(),
            tournament_id,
            group_count
        );
        self.metrics.record_mutation("assign_groups");
        Ok(assignments)
    }

    /// Rank the tournament and persist the resulting positions
    pub fn recalculate(
        &self,
        tournament_id: TournamentId,
        options: &RankOptions,
    ) -> Result<StandingsTable> {
        let table = self.current_table(tournament_id, options)?;
        self.store
            .update_positions(tournament_id, table.overall.clone())?;

        info!(
            "Recalculated positions for {} teams of tournament {}",
            table.len(),
            tournament_id
        );
        self.metrics.record_mutation("recalculate");
        Ok(table)
    }

    /// Look up one standing, requiring it to belong to `tournament_id`
    pub fn find_team(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
    ) -> Result<TeamStanding> {
        match self.store.get_standing(standing_id)? {
            Some(standing) if standing.tournament_id == tournament_id => Ok(standing),
            _ => Err(RankingError::StandingNotFound { standing_id }.into()),
        }
    }

    /// Withdraw a team from a tournament
    pub fn remove_team(&self, tournament_id: TournamentId, standing_id: StandingId) -> Result<()> {
        let standing = self.find_team(tournament_id, standing_id)?;
        if !self.store.remove_standing(standing_id)? {
            return Err(RankingError::StandingNotFound { standing_id }.into());
        }

        info!(
            "Removed team '{}' from tournament {}",
            standing.team_name, tournament_id
        );
        self.metrics.record_mutation("remove_team");
        self.refresh_stored_gauge();
        Ok(())
    }

    /// Drop every standing of a tournament, returning how many were removed
    pub fn remove_tournament(&self, tournament_id: TournamentId) -> Result<usize> {
        let removed = self.store.remove_tournament(tournament_id)?;
        info!("Removed tournament {} ({} standings)", tournament_id, removed);
        self.metrics.record_mutation("remove_tournament");
        self.refresh_stored_gauge();
        Ok(removed)
    }

    /// Top teams overall, for winner announcements
    pub fn announce_winners(&self, tournament_id: TournamentId) -> Result<Vec<TeamStanding>> {
        let table = self.current_table(tournament_id, &RankOptions::ungrouped())?;
        let winners = table.podium(self.settings.podium_size).to_vec();

        if let Some(champion) = winners.first() {
            info!(
                "Tournament {} winner: '{}' with {} pts",
                tournament_id, champion.team_name, champion.points
            );
        }
        Ok(winners)
    }

    /// Subscribe to raw change events of a tournament
    pub fn subscribe(&self, tournament_id: TournamentId) -> Subscription {
        self.notifier.subscribe(tournament_id)
    }

    /// Keep a ranked table of a tournament up to date.
    ///
    /// The returned receiver always holds the most recent table; a background
    /// task re-ranks on every change event and stops once the receiver is
    /// dropped or the notifier closes, releasing its subscription.
    pub fn watch(
        self: &Arc<Self>,
        tournament_id: TournamentId,
        options: RankOptions,
    ) -> Result<watch::Receiver<StandingsTable>> {
        // Subscribe before the first read so no change slips in between
        let mut subscription = self.subscribe(tournament_id);
        let initial = self.current_table(tournament_id, &options)?;
        let (sender, receiver) = watch::channel(initial);

        let service = Arc::clone(self);
        tokio::spawn(async move {
            debug!("Live table started for tournament {}", tournament_id);
            loop {
                tokio::select! {
                    _ = sender.closed() => break,
                    event = subscription.recv() => {
                        let Some(event) = event else { break };
                        debug!(
                            "Refreshing tournament {} after {:?}",
                            tournament_id, event.kind
                        );

                        match service.current_table(tournament_id, &options) {
                            Ok(table) => {
                                service.metrics.record_live_refresh();
                                if sender.send(table).is_err() {
                                    break;
                                }
                            }
                            Err(e) => error!(
                                "Failed to refresh table for tournament {}: {}",
                                tournament_id, e
                            ),
                        }
                    }
                }
            }
            debug!("Live table stopped for tournament {}", tournament_id);
        });

        Ok(receiver)
    }

    fn refresh_stored_gauge(&self) {
        match self.store.standing_count() {
            Ok(count) => self.metrics.update_standings_stored(count),
            Err(e) => warn!("Failed to count stored standings: {}", e),
        }
    }
}
