//! Group assignment for grouped points tables
//!
//! Groups are labelled `Group A`, `Group B`, ... and filled round-robin by list
//! position. Assignment only sets labels; positions change on the next rank.

use crate::error::{RankingError, Result};
use crate::ranking::validate_group_count;
use crate::types::{StandingId, TeamStanding};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Label given to a standing by an assignment pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub standing_id: StandingId,
    pub team_name: String,
    pub group_name: String,
}

/// Trait for strategies that label standings with groups
pub trait GroupAssigner: Send + Sync {
    /// Label every standing with one of `group_count` groups.
    ///
    /// Prior labels are overwritten. Returns the assignment made for each
    /// standing, in input order.
    fn assign(
        &self,
        standings: &mut [TeamStanding],
        group_count: u32,
    ) -> Result<Vec<GroupAssignment>>;
}

/// Round-robin assignment by list index modulo the group count
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinGroupAssigner;

impl RoundRobinGroupAssigner {
    pub fn new() -> Self {
        Self
    }
}

impl GroupAssigner for RoundRobinGroupAssigner {
    fn assign(
        &self,
        standings: &mut [TeamStanding],
        group_count: u32,
    ) -> Result<Vec<GroupAssignment>> {
        assign_round_robin(standings, group_count)
    }
}

/// Label for the group at `index` (0 = `Group A`)
pub fn group_label(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    format!("Group {}", letter)
}

/// Assign `Group A`, `Group B`, ... by index modulo `group_count`.
///
/// The same input order and group count always give the same labels.
pub fn assign_round_robin(
    standings: &mut [TeamStanding],
    group_count: u32,
) -> Result<Vec<GroupAssignment>> {
    validate_group_count(group_count)?;

    let now = Utc::now();
    let assignments: Vec<GroupAssignment> = standings
        .iter_mut()
        .enumerate()
        .map(|(index, standing)| {
            let group_name = group_label(index % group_count as usize);
            standing.group_name = Some(group_name.clone());
            standing.updated_at = now;

            GroupAssignment {
                standing_id: standing.id,
                team_name: standing.team_name.clone(),
                group_name,
            }
        })
        .collect();

    info!(
        "Assigned {} standings round-robin into {} groups",
        assignments.len(),
        group_count
    );

    Ok(assignments)
}

/// Move one standing to another group.
///
/// No other standing is touched and no positions are recomputed. An empty
/// or absent label clears the group.
pub fn reassign_group(
    standings: &mut [TeamStanding],
    standing_id: StandingId,
    group_name: Option<String>,
) -> Result<GroupAssignment> {
    let standing = standings
        .iter_mut()
        .find(|standing| standing.id == standing_id)
        .ok_or(RankingError::StandingNotFound { standing_id })?;

    let group_name = group_name.filter(|name| !name.is_empty());
    debug!(
        "Reassigning team '{}' from {:?} to {:?}",
        standing.team_name, standing.group_name, group_name
    );

    standing.group_name = group_name;
    standing.updated_at = Utc::now();

    Ok(GroupAssignment {
        standing_id,
        team_name: standing.team_name.clone(),
        group_name: standing.group_key().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TeamSize, UNGROUPED_LABEL};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn teams(count: usize) -> Vec<TeamStanding> {
        let tournament = Uuid::new_v4();
        (0..count)
            .map(|i| TeamStanding::new(tournament, format!("team_{}", i), TeamSize::Squad))
            .collect()
    }

    #[test]
    fn test_group_labels() {
        assert_eq!(group_label(0), "Group A");
        assert_eq!(group_label(1), "Group B");
        assert_eq!(group_label(7), "Group H");
    }

    #[test]
    fn test_round_robin_three_groups_over_seven() {
        let mut standings = teams(7);
        let assignments = RoundRobinGroupAssigner::new()
            .assign(&mut standings, 3)
            .unwrap();

        let labels: Vec<_> = assignments.iter().map(|a| a.group_name.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Group A", "Group B", "Group C", "Group A", "Group B", "Group C", "Group A"
            ]
        );

        let mut sizes: HashMap<&str, usize> = HashMap::new();
        for standing in &standings {
            *sizes.entry(standing.group_key()).or_default() += 1;
        }
        assert_eq!(sizes["Group A"], 3);
        assert_eq!(sizes["Group B"], 2);
        assert_eq!(sizes["Group C"], 2);
    }

    #[test]
    fn test_round_robin_overwrites_prior_labels() {
        let mut standings = teams(4);
        standings[0].group_name = Some("Legacy".to_string());

        assign_round_robin(&mut standings, 2).unwrap();
        assert_eq!(standings[0].group_name.as_deref(), Some("Group A"));
        assert_eq!(standings[3].group_name.as_deref(), Some("Group B"));
    }

    #[test]
    fn test_round_robin_is_repeatable() {
        let mut standings = teams(5);
        let first = assign_round_robin(&mut standings, 4).unwrap();
        let second = assign_round_robin(&mut standings, 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_robin_rejects_bad_group_count() {
        let mut standings = teams(3);
        for group_count in [0, 1, 9] {
            let err = assign_round_robin(&mut standings, group_count).unwrap_err();
            assert_eq!(
                err.downcast_ref::<RankingError>(),
                Some(&RankingError::AmbiguousGroupCount { group_count })
            );
        }
        assert!(standings.iter().all(|s| s.group_name.is_none()));
    }

    #[test]
    fn test_round_robin_on_empty_list() {
        let mut standings: Vec<TeamStanding> = Vec::new();
        assert!(assign_round_robin(&mut standings, 2).unwrap().is_empty());
    }

    #[test]
    fn test_reassign_touches_only_target() {
        let mut standings = teams(3);
        assign_round_robin(&mut standings, 3).unwrap();
        let target = standings[1].id;

        let assignment =
            reassign_group(&mut standings, target, Some("Finals".to_string())).unwrap();

        assert_eq!(assignment.group_name, "Finals");
        assert_eq!(standings[0].group_name.as_deref(), Some("Group A"));
        assert_eq!(standings[1].group_name.as_deref(), Some("Finals"));
        assert_eq!(standings[2].group_name.as_deref(), Some("Group C"));
    }

    #[test]
    fn test_reassign_to_empty_label_clears_group() {
        let mut standings = teams(1);
        standings[0].group_name = Some("Group A".to_string());
        let id = standings[0].id;

        let assignment = reassign_group(&mut standings, id, Some(String::new())).unwrap();
        assert_eq!(assignment.group_name, UNGROUPED_LABEL);
        assert!(standings[0].group_name.is_none());
    }

    #[test]
    fn test_reassign_unknown_standing() {
        let mut standings = teams(2);
        let missing = Uuid::new_v4();
        let err = reassign_group(&mut standings, missing, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RankingError>(),
            Some(&RankingError::StandingNotFound {
                standing_id: missing
            })
        );
    }
}
