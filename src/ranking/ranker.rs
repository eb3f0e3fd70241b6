//! Standings ranker
//!
//! Turns a flat snapshot of one tournament's standings into a ranked points
//! table. Overall positions and group positions are computed independently
//! from the same snapshot, so moving a team between groups never changes
//! anyone's overall position.

use crate::error::{RankingError, Result};
use crate::ranking::comparator::compare_standings;
use crate::types::{
    RankMode, RankOptions, TeamStanding, TournamentId, MAX_GROUP_COUNT, MIN_GROUP_COUNT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Standings of one group, in group order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStandings {
    pub name: String,
    pub standings: Vec<TeamStanding>,
}

impl GroupStandings {
    /// Number of standings in the group
    pub fn len(&self) -> usize {
        self.standings.len()
    }

    /// Whether the group has no standings
    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }

    /// Group leader, if any
    pub fn leader(&self) -> Option<&TeamStanding> {
        self.standings.first()
    }
}

/// Ranked points table for one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsTable {
    /// Tournament the standings belong to, `None` for an empty table
    pub tournament_id: Option<TournamentId>,
    /// Mode the table was ranked with
    pub mode: RankMode,
    /// Every standing in overall order
    pub overall: Vec<TeamStanding>,
    /// Groups in display order; empty when the table is not grouped
    pub groups: Vec<GroupStandings>,
}

impl StandingsTable {
    fn empty(mode: RankMode) -> Self {
        Self {
            tournament_id: None,
            mode,
            overall: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Number of ranked standings
    pub fn len(&self) -> usize {
        self.overall.len()
    }

    /// Whether the table has no standings
    pub fn is_empty(&self) -> bool {
        self.overall.is_empty()
    }

    /// Whether group positions were assigned
    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }

    /// The top `n` standings overall, for winner announcements
    pub fn podium(&self, n: usize) -> &[TeamStanding] {
        &self.overall[..n.min(self.overall.len())]
    }

    /// Look up a group by its label
    pub fn group(&self, name: &str) -> Option<&GroupStandings> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Consume the table, returning the annotated standings in overall order
    pub fn into_standings(self) -> Vec<TeamStanding> {
        self.overall
    }
}

/// Ranks tournament standings into a points table
#[derive(Debug, Clone, Copy, Default)]
pub struct StandingsRanker;

impl StandingsRanker {
    pub fn new() -> Self {
        Self
    }

    /// Rank a snapshot of standings.
    ///
    /// The batch is rejected as a whole if any counter is negative or the
    /// standings span several tournaments; the input is never partially
    /// ranked. An empty batch yields an empty table.
    pub fn rank(&self, standings: Vec<TeamStanding>, options: &RankOptions) -> Result<StandingsTable> {
        validate_options(options)?;

        if standings.is_empty() {
            debug!("Ranking empty standings batch");
            return Ok(StandingsTable::empty(options.mode));
        }

        validate_batch(&standings)?;

        let tournament_id = standings[0].tournament_id;
        let mut snapshot = standings;

        let mut overall_order: Vec<usize> = (0..snapshot.len()).collect();
        overall_order.sort_by(|&a, &b| compare_standings(&snapshot[a], &snapshot[b]));

        let grouped =
            options.mode == RankMode::Grouped && snapshot.iter().any(TeamStanding::has_group);

        // Indices per group, in input order before sorting
        let mut group_orders: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        if grouped {
            for (index, standing) in snapshot.iter().enumerate() {
                group_orders
                    .entry(standing.group_key().to_string())
                    .or_default()
                    .push(index);
            }
            for members in group_orders.values_mut() {
                members.sort_by(|&a, &b| compare_standings(&snapshot[a], &snapshot[b]));
            }
        }

        for standing in snapshot.iter_mut() {
            standing.group_position = None;
        }
        for (rank, &index) in overall_order.iter().enumerate() {
            snapshot[index].overall_position = Some(rank as u32 + 1);
        }
        for members in group_orders.values() {
            for (rank, &index) in members.iter().enumerate() {
                snapshot[index].group_position = Some(rank as u32 + 1);
            }
        }

        let overall = overall_order
            .iter()
            .map(|&index| snapshot[index].clone())
            .collect();

        let groups: Vec<GroupStandings> = group_orders
            .into_iter()
            .map(|(name, members)| GroupStandings {
                name,
                standings: members
                    .iter()
                    .map(|&index| snapshot[index].clone())
                    .collect(),
            })
            .collect();

        debug!(
            "Ranked {} standings for tournament {} ({} mode, {} groups)",
            snapshot.len(),
            tournament_id,
            options.mode,
            groups.len()
        );

        Ok(StandingsTable {
            tournament_id: Some(tournament_id),
            mode: options.mode,
            overall,
            groups,
        })
    }
}

/// Reject group counts outside the supported range when grouping is requested
pub fn validate_group_count(group_count: u32) -> Result<()> {
    if !(MIN_GROUP_COUNT..=MAX_GROUP_COUNT).contains(&group_count) {
        return Err(RankingError::AmbiguousGroupCount { group_count }.into());
    }
    Ok(())
}

fn validate_options(options: &RankOptions) -> Result<()> {
    if options.mode == RankMode::Grouped {
        validate_group_count(options.group_count)?;
    }
    Ok(())
}

fn validate_batch(standings: &[TeamStanding]) -> Result<()> {
    let expected = standings[0].tournament_id;

    for standing in standings {
        if standing.tournament_id != expected {
            warn!(
                "Rejecting standings batch mixing tournaments {} and {}",
                expected, standing.tournament_id
            );
            return Err(RankingError::TournamentMismatch {
                expected,
                found: standing.tournament_id,
            }
            .into());
        }

        for (field, value) in [
            ("points", standing.points),
            ("kills", standing.kills),
            ("wins", standing.wins),
        ] {
            if value < 0 {
                warn!(
                    "Rejecting standings batch: team '{}' has negative {} ({})",
                    standing.team_name, field, value
                );
                return Err(RankingError::InvalidInput {
                    standing_id: standing.id,
                    reason: format!("{} must be non-negative, got {}", field, value),
                }
                .into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TeamSize, UNGROUPED_LABEL};
    use uuid::Uuid;

    fn standing(tournament: Uuid, name: &str, points: i64, kills: i64, wins: i64) -> TeamStanding {
        TeamStanding::new(tournament, name, TeamSize::Squad).with_counters(points, kills, wins)
    }

    fn names(standings: &[TeamStanding]) -> Vec<&str> {
        standings.iter().map(|s| s.team_name.as_str()).collect()
    }

    #[test]
    fn test_overall_order_by_points_kills_wins() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "A", 10, 2, 1),
            standing(tournament, "B", 10, 3, 0),
            standing(tournament, "C", 5, 9, 9),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::ungrouped())
            .unwrap();

        assert_eq!(names(&table.overall), vec!["B", "A", "C"]);
        let positions: Vec<_> = table.overall.iter().map(|s| s.overall_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
        assert!(!table.is_grouped());
        assert!(table.overall.iter().all(|s| s.group_position.is_none()));
        assert_eq!(table.tournament_id, Some(tournament));
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "first", 4, 4, 4),
            standing(tournament, "leader", 9, 0, 0),
            standing(tournament, "second", 4, 4, 4),
            standing(tournament, "third", 4, 4, 4),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::ungrouped())
            .unwrap();

        assert_eq!(names(&table.overall), vec!["leader", "first", "second", "third"]);
    }

    #[test]
    fn test_grouped_ranking_with_display_order() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "y-low", 1, 0, 0).with_group("Y"),
            standing(tournament, "x-low", 2, 0, 0).with_group("X"),
            standing(tournament, "y-high", 8, 0, 0).with_group("Y"),
            standing(tournament, "x-high", 5, 0, 0).with_group("X"),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::default())
            .unwrap();

        let group_names: Vec<_> = table.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["X", "Y"]);

        let x = table.group("X").unwrap();
        assert_eq!(names(&x.standings), vec!["x-high", "x-low"]);
        assert_eq!(x.standings[0].group_position, Some(1));
        assert_eq!(x.standings[1].group_position, Some(2));

        let y = table.group("Y").unwrap();
        assert_eq!(names(&y.standings), vec!["y-high", "y-low"]);
        assert_eq!(y.leader().unwrap().overall_position, Some(1));

        assert_eq!(names(&table.overall), vec!["y-high", "x-high", "x-low", "y-low"]);
        assert_eq!(table.overall[1].group_position, Some(1));
    }

    #[test]
    fn test_group_keys_are_case_sensitive() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "lower", 1, 0, 0).with_group("alpha"),
            standing(tournament, "upper", 1, 0, 0).with_group("Beta"),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::default())
            .unwrap();

        let group_names: Vec<_> = table.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["Beta", "alpha"]);
    }

    #[test]
    fn test_missing_labels_collect_under_ungrouped() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "grouped", 3, 0, 0).with_group("Group A"),
            standing(tournament, "loose", 5, 0, 0),
            standing(tournament, "blank", 4, 0, 0).with_group(""),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::default())
            .unwrap();

        let ungrouped = table.group(UNGROUPED_LABEL).unwrap();
        assert_eq!(names(&ungrouped.standings), vec!["loose", "blank"]);
        assert_eq!(ungrouped.standings[1].group_position, Some(2));
        assert_eq!(table.group("Group A").unwrap().len(), 1);
    }

    #[test]
    fn test_grouped_mode_without_labels_is_flat() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "A", 1, 0, 0),
            standing(tournament, "B", 2, 0, 0),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::default())
            .unwrap();

        assert!(!table.is_grouped());
        assert!(table.overall.iter().all(|s| s.group_position.is_none()));
    }

    #[test]
    fn test_ungrouped_mode_clears_stale_group_positions() {
        let tournament = Uuid::new_v4();
        let mut stale = standing(tournament, "A", 1, 0, 0).with_group("X");
        stale.group_position = Some(7);

        let table = StandingsRanker::new()
            .rank(vec![stale], &RankOptions::ungrouped())
            .unwrap();

        assert_eq!(table.overall[0].group_position, None);
        assert_eq!(table.overall[0].group_name.as_deref(), Some("X"));
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let table = StandingsRanker::new()
            .rank(Vec::new(), &RankOptions::default())
            .unwrap();
        assert!(table.is_empty());
        assert!(table.groups.is_empty());
        assert_eq!(table.tournament_id, None);
        assert!(table.podium(3).is_empty());
    }

    #[test]
    fn test_negative_counter_rejects_batch() {
        let tournament = Uuid::new_v4();
        let bad = standing(tournament, "bad", 3, -1, 0);
        let bad_id = bad.id;
        let standings = vec![standing(tournament, "good", 1, 1, 1), bad];

        let err = StandingsRanker::new()
            .rank(standings, &RankOptions::ungrouped())
            .unwrap_err();

        match err.downcast_ref::<RankingError>() {
            Some(RankingError::InvalidInput { standing_id, reason }) => {
                assert_eq!(*standing_id, bad_id);
                assert!(reason.contains("kills"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_group_count_outside_range_is_rejected() {
        let tournament = Uuid::new_v4();
        let ranker = StandingsRanker::new();

        for group_count in [0, 1, 9, 32] {
            let err = ranker
                .rank(
                    vec![standing(tournament, "A", 1, 0, 0)],
                    &RankOptions::grouped(group_count),
                )
                .unwrap_err();
            assert_eq!(
                err.downcast_ref::<RankingError>(),
                Some(&RankingError::AmbiguousGroupCount { group_count })
            );
        }

        // Ignored entirely when not grouping
        let options = RankOptions {
            mode: RankMode::Ungrouped,
            group_count: 42,
        };
        assert!(ranker
            .rank(vec![standing(tournament, "A", 1, 0, 0)], &options)
            .is_ok());
    }

    #[test]
    fn test_mixed_tournaments_are_rejected() {
        let standings = vec![
            standing(Uuid::new_v4(), "A", 1, 0, 0),
            standing(Uuid::new_v4(), "B", 1, 0, 0),
        ];

        let err = StandingsRanker::new()
            .rank(standings, &RankOptions::ungrouped())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RankingError>(),
            Some(RankingError::TournamentMismatch { .. })
        ));
    }

    #[test]
    fn test_podium_and_into_standings() {
        let tournament = Uuid::new_v4();
        let standings = vec![
            standing(tournament, "third", 1, 0, 0),
            standing(tournament, "first", 3, 0, 0),
            standing(tournament, "second", 2, 0, 0),
        ];

        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::ungrouped())
            .unwrap();

        assert_eq!(names(table.podium(2)), vec!["first", "second"]);
        assert_eq!(table.podium(10).len(), 3);

        let flattened = table.into_standings();
        assert_eq!(flattened[2].team_name, "third");
        assert_eq!(flattened[2].overall_position, Some(3));
    }
}
