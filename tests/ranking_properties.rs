//! Property tests for ranking and group assignment

mod fixtures;

use fixtures::standing;
use proptest::prelude::*;
use standings_ranker::grouping::{assign_round_robin, group_label, reassign_group};
use standings_ranker::ranking::{compare_standings, StandingsRanker};
use standings_ranker::types::{RankOptions, TeamStanding, UNGROUPED_LABEL};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// Small counter ranges so ties are common
fn counters_strategy() -> impl Strategy<Value = Vec<(i64, i64, i64, Option<u8>)>> {
    prop::collection::vec(
        (0i64..6, 0i64..6, 0i64..4, prop::option::of(0u8..4)),
        0..40,
    )
}

fn build(rows: &[(i64, i64, i64, Option<u8>)]) -> Vec<TeamStanding> {
    let tournament = Uuid::new_v4();
    rows.iter()
        .enumerate()
        .map(|(i, &(points, kills, wins, group))| {
            let team = standing(tournament, &format!("team_{}", i), points, kills, wins);
            match group {
                Some(g) => team.with_group(group_label(g as usize)),
                None => team,
            }
        })
        .collect()
}

fn input_index(name: &str) -> usize {
    name.trim_start_matches("team_").parse().unwrap()
}

proptest! {
    #[test]
    fn overall_positions_are_contiguous_and_sorted(rows in counters_strategy()) {
        let standings = build(&rows);
        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::grouped(4))
            .unwrap();

        for (i, s) in table.overall.iter().enumerate() {
            prop_assert_eq!(s.overall_position, Some(i as u32 + 1));
        }
        for pair in table.overall.windows(2) {
            prop_assert_ne!(compare_standings(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn ties_keep_input_order(rows in counters_strategy()) {
        let table = StandingsRanker::new()
            .rank(build(&rows), &RankOptions::ungrouped())
            .unwrap();

        for pair in table.overall.windows(2) {
            if compare_standings(&pair[0], &pair[1]) == Ordering::Equal {
                prop_assert!(input_index(&pair[0].team_name) < input_index(&pair[1].team_name));
            }
        }
    }

    #[test]
    fn group_positions_are_contiguous_per_group(rows in counters_strategy()) {
        let standings = build(&rows);
        let any_grouped = standings.iter().any(TeamStanding::has_group);
        let table = StandingsRanker::new()
            .rank(standings, &RankOptions::grouped(4))
            .unwrap();

        prop_assert_eq!(table.is_grouped(), any_grouped);

        let mut names: Vec<&str> = Vec::new();
        for group in &table.groups {
            names.push(&group.name);
            for (i, s) in group.standings.iter().enumerate() {
                prop_assert_eq!(s.group_position, Some(i as u32 + 1));
                prop_assert_eq!(s.group_key(), group.name.as_str());
            }
        }
        let mut sorted = names.clone();
        sorted.sort();
        prop_assert_eq!(names, sorted);

        let grouped_total: usize = table.groups.iter().map(|g| g.len()).sum();
        if any_grouped {
            prop_assert_eq!(grouped_total, table.len());
        } else {
            prop_assert!(table.overall.iter().all(|s| s.group_position.is_none()));
        }
    }

    #[test]
    fn ranking_is_idempotent(rows in counters_strategy()) {
        let ranker = StandingsRanker::new();
        let options = RankOptions::grouped(3);
        let first = ranker.rank(build(&rows), &options).unwrap();
        let second = ranker.rank(first.clone().into_standings(), &options).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn moving_a_team_never_changes_overall_positions(
        rows in counters_strategy(),
        pick in any::<prop::sample::Index>(),
        target in prop::option::of(0u8..4),
    ) {
        prop_assume!(!rows.is_empty());
        let mut standings = build(&rows);
        let ranker = StandingsRanker::new();
        let options = RankOptions::grouped(4);
        let before = ranker.rank(standings.clone(), &options).unwrap();

        let id = standings[pick.index(standings.len())].id;
        reassign_group(&mut standings, id, target.map(|g| group_label(g as usize))).unwrap();
        let after = ranker.rank(standings, &options).unwrap();

        let positions = |table: &standings_ranker::StandingsTable| -> HashMap<Uuid, Option<u32>> {
            table.overall.iter().map(|s| (s.id, s.overall_position)).collect()
        };
        prop_assert_eq!(positions(&before), positions(&after));
    }

    #[test]
    fn round_robin_balances_groups(count in 0usize..50, groups in 2u32..=8) {
        let mut standings = build(&vec![(0, 0, 0, None); count]);
        let assignments = assign_round_robin(&mut standings, groups).unwrap();
        prop_assert_eq!(assignments.len(), count);

        let mut sizes: HashMap<String, usize> = HashMap::new();
        for (i, s) in standings.iter().enumerate() {
            let label = s.group_name.clone().unwrap();
            prop_assert_eq!(&label, &group_label(i % groups as usize));
            *sizes.entry(label).or_default() += 1;
        }
        if let (Some(max), Some(min)) = (sizes.values().max(), sizes.values().min()) {
            prop_assert!(max - min <= 1);
        }
        prop_assert!(!sizes.contains_key(UNGROUPED_LABEL));
    }

    #[test]
    fn out_of_range_group_counts_are_rejected(groups in prop_oneof![0u32..2, 9u32..1000]) {
        let mut standings = build(&[(1, 1, 1, None)]);
        prop_assert!(assign_round_robin(&mut standings, groups).is_err());
        prop_assert!(standings[0].group_name.is_none());
        prop_assert!(StandingsRanker::new()
            .rank(standings, &RankOptions::grouped(groups))
            .is_err());
    }
}
