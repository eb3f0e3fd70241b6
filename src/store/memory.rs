//! In-memory record store

use crate::error::{RankingError, Result};
use crate::grouping::GroupAssignment;
use crate::notify::{ChangeEvent, ChangeKind, ChangeNotifier};
use crate::store::RecordStore;
use crate::types::{CounterUpdate, StandingId, TeamStanding, TournamentId};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct StoreState {
    /// Standings per tournament, in registration order
    tournaments: HashMap<TournamentId, Vec<TeamStanding>>,
    /// Owning tournament of every standing
    index: HashMap<StandingId, TournamentId>,
}

impl StoreState {
    /// Standing `standing_id`, provided it belongs to `tournament_id`
    fn find_mut(
        &mut self,
        tournament_id: TournamentId,
        standing_id: StandingId,
    ) -> Result<&mut TeamStanding> {
        if self.index.get(&standing_id) != Some(&tournament_id) {
            return Err(RankingError::StandingNotFound { standing_id }.into());
        }

        self.tournaments
            .get_mut(&tournament_id)
            .and_then(|standings| standings.iter_mut().find(|s| s.id == standing_id))
            .ok_or_else(|| {
                RankingError::StoreError {
                    message: format!("Index points at missing standing {}", standing_id),
                }
                .into()
            })
    }

    fn remove(&mut self, standing_id: StandingId) -> Option<TeamStanding> {
        let tournament_id = self.index.remove(&standing_id)?;
        let standings = self.tournaments.get_mut(&tournament_id)?;
        let position = standings.iter().position(|s| s.id == standing_id)?;
        let removed = standings.remove(position);
        if standings.is_empty() {
            self.tournaments.remove(&tournament_id);
        }
        Some(removed)
    }
}

/// Record store keeping every standing in memory.
///
/// Every mutation publishes a [`ChangeEvent`] to the attached notifier after
/// the write lock is released.
pub struct InMemoryRecordStore {
    state: RwLock<StoreState>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
}

impl InMemoryRecordStore {
    /// Create an empty store without change notification
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            notifier: None,
        }
    }

    /// Create an empty store publishing changes to `notifier`
    pub fn with_notifier(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            notifier: Some(notifier),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| {
            RankingError::StoreError {
                message: "Failed to acquire standings read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| {
            RankingError::StoreError {
                message: "Failed to acquire standings write lock".to_string(),
            }
            .into()
        })
    }

    fn publish(&self, tournament_id: TournamentId, kind: ChangeKind, standing_ids: Vec<StandingId>) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(ChangeEvent::new(tournament_id, kind, standing_ids));
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get_standings(&self, tournament_id: TournamentId) -> Result<Vec<TeamStanding>> {
        let state = self.read()?;
        Ok(state
            .tournaments
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_standing(&self, standing_id: StandingId) -> Result<Option<TeamStanding>> {
        let state = self.read()?;
        Ok(state.index.get(&standing_id).and_then(|tournament_id| {
            state
                .tournaments
                .get(tournament_id)
                .and_then(|standings| standings.iter().find(|s| s.id == standing_id))
                .cloned()
        }))
    }

    fn insert_standing(&self, standing: TeamStanding) -> Result<()> {
        let tournament_id = standing.tournament_id;
        let standing_id = standing.id;

        {
            let mut state = self.write()?;
            if state.index.contains_key(&standing_id) {
                return Err(RankingError::StoreError {
                    message: format!("Standing {} already exists", standing_id),
                }
                .into());
            }
            state.index.insert(standing_id, tournament_id);
            state
                .tournaments
                .entry(tournament_id)
                .or_default()
                .push(standing);
        }

        debug!("Inserted standing {} into tournament {}", standing_id, tournament_id);
        self.publish(tournament_id, ChangeKind::Registered, vec![standing_id]);
        Ok(())
    }

    fn upsert_standings(&self, standings: Vec<TeamStanding>) -> Result<()> {
        let mut touched: BTreeMap<TournamentId, Vec<StandingId>> = BTreeMap::new();

        {
            let mut state = self.write()?;
            for standing in standings {
                let tournament_id = standing.tournament_id;
                let standing_id = standing.id;
                touched.entry(tournament_id).or_default().push(standing_id);

                let existing = state.index.get(&standing_id).copied();
                match existing {
                    Some(owner) if owner == tournament_id => {
                        if let Some(slot) = state
                            .tournaments
                            .get_mut(&owner)
                            .and_then(|list| list.iter_mut().find(|s| s.id == standing_id))
                        {
                            *slot = standing;
                        }
                    }
                    Some(_) => {
                        state.remove(standing_id);
                        state.index.insert(standing_id, tournament_id);
                        state
                            .tournaments
                            .entry(tournament_id)
                            .or_default()
                            .push(standing);
                    }
                    None => {
                        state.index.insert(standing_id, tournament_id);
                        state
                            .tournaments
                            .entry(tournament_id)
                            .or_default()
                            .push(standing);
                    }
                }
            }
        }

        for (tournament_id, ids) in touched {
            debug!("Upserted {} standings for tournament {}", ids.len(), tournament_id);
            self.publish(tournament_id, ChangeKind::Upserted, ids);
        }
        Ok(())
    }

    fn update_counters(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
        update: CounterUpdate,
    ) -> Result<TeamStanding> {
        let updated = {
            let mut state = self.write()?;
            let standing = state.find_mut(tournament_id, standing_id)?;
            if update.apply(standing) {
                standing.updated_at = Utc::now();
            }
            standing.clone()
        };

        self.publish(
            tournament_id,
            ChangeKind::CountersUpdated,
            vec![standing_id],
        );
        Ok(updated)
    }

    fn set_group_name(
        &self,
        tournament_id: TournamentId,
        standing_id: StandingId,
        group_name: Option<String>,
    ) -> Result<TeamStanding> {
        let updated = {
            let mut state = self.write()?;
            let standing = state.find_mut(tournament_id, standing_id)?;
            standing.group_name = group_name.filter(|name| !name.is_empty());
            standing.updated_at = Utc::now();
            standing.clone()
        };

        self.publish(
            tournament_id,
            ChangeKind::GroupChanged,
            vec![standing_id],
        );
        Ok(updated)
    }

    fn apply_group_assignments(
        &self,
        tournament_id: TournamentId,
        assignments: Vec<GroupAssignment>,
    ) -> Result<()> {
        let ids: Vec<StandingId> = assignments.iter().map(|a| a.standing_id).collect();

        {
            let mut state = self.write()?;
            let standings = state.tournaments.get_mut(&tournament_id);
            let Some(standings) = standings else {
                if let Some(first) = assignments.first() {
                    return Err(RankingError::StandingNotFound {
                        standing_id: first.standing_id,
                    }
                    .into());
                }
                return Ok(());
            };

            // Check every target before writing any label
            if let Some(missing) = assignments
                .iter()
                .find(|a| !standings.iter().any(|s| s.id == a.standing_id))
            {
                return Err(RankingError::StandingNotFound {
                    standing_id: missing.standing_id,
                }
                .into());
            }

            let now = Utc::now();
            for assignment in assignments {
                if let Some(standing) = standings
                    .iter_mut()
                    .find(|s| s.id == assignment.standing_id)
                {
                    standing.group_name = Some(assignment.group_name);
                    standing.updated_at = now;
                }
            }
        }

        info!(
            "Stored {} group assignments for tournament {}",
            ids.len(),
            tournament_id
        );
        self.publish(tournament_id, ChangeKind::GroupsAssigned, ids);
        Ok(())
    }

    fn update_positions(
        &self,
        tournament_id: TournamentId,
        ranked: Vec<TeamStanding>,
    ) -> Result<()> {
        let ids: Vec<StandingId> = ranked.iter().map(|s| s.id).collect();

        {
            let mut state = self.write()?;
            let Some(standings) = state.tournaments.get_mut(&tournament_id) else {
                return match ranked.first() {
                    Some(first) => Err(RankingError::StandingNotFound {
                        standing_id: first.id,
                    }
                    .into()),
                    None => Ok(()),
                };
            };

            if let Some(missing) = ranked
                .iter()
                .find(|r| !standings.iter().any(|s| s.id == r.id))
            {
                return Err(RankingError::StandingNotFound {
                    standing_id: missing.id,
                }
                .into());
            }

            for ranked_standing in &ranked {
                if let Some(standing) = standings.iter_mut().find(|s| s.id == ranked_standing.id) {
                    standing.overall_position = ranked_standing.overall_position;
                    standing.group_position = ranked_standing.group_position;
                }
            }
        }

        self.publish(tournament_id, ChangeKind::PositionsUpdated, ids);
        Ok(())
    }

    fn remove_standing(&self, standing_id: StandingId) -> Result<bool> {
        let removed = {
            let mut state = self.write()?;
            state.remove(standing_id)
        };

        match removed {
            Some(standing) => {
                info!(
                    "Removed team '{}' from tournament {}",
                    standing.team_name, standing.tournament_id
                );
                self.publish(standing.tournament_id, ChangeKind::Removed, vec![standing_id]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_tournament(&self, tournament_id: TournamentId) -> Result<usize> {
        let removed = {
            let mut state = self.write()?;
            let removed = state.tournaments.remove(&tournament_id).unwrap_or_default();
            for standing in &removed {
                state.index.remove(&standing.id);
            }
            removed
        };

        if !removed.is_empty() {
            info!(
                "Removed {} standings of tournament {}",
                removed.len(),
                tournament_id
            );
            self.publish(
                tournament_id,
                ChangeKind::Removed,
                removed.iter().map(|s| s.id).collect(),
            );
        }
        Ok(removed.len())
    }

    fn tournament_ids(&self) -> Result<Vec<TournamentId>> {
        let state = self.read()?;
        let mut ids: Vec<TournamentId> = state.tournaments.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn standing_count(&self) -> Result<usize> {
        let state = self.read()?;
        Ok(state.index.len())
    }
}
