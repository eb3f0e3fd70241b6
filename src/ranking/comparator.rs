//! Ordering of standings on the points table

use crate::types::TeamStanding;
use std::cmp::Ordering;

/// Compare two standings for the points table.
///
/// Higher points rank first, then higher kills, then higher wins. Standings
/// with identical tuples compare `Equal`, so a stable sort keeps their input
/// order.
pub fn compare_standings(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.kills.cmp(&a.kills))
        .then_with(|| b.wins.cmp(&a.wins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamSize;
    use uuid::Uuid;

    fn standing(name: &str, points: i64, kills: i64, wins: i64) -> TeamStanding {
        TeamStanding::new(Uuid::nil(), name, TeamSize::Squad).with_counters(points, kills, wins)
    }

    #[test]
    fn test_points_take_priority() {
        let a = standing("A", 11, 0, 0);
        let b = standing("B", 10, 50, 50);
        assert_eq!(compare_standings(&a, &b), Ordering::Less);
        assert_eq!(compare_standings(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_kills_break_points_tie() {
        let a = standing("A", 10, 2, 1);
        let b = standing("B", 10, 3, 0);
        assert_eq!(compare_standings(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_wins_break_kills_tie() {
        let a = standing("A", 10, 3, 2);
        let b = standing("B", 10, 3, 1);
        assert_eq!(compare_standings(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_full_tie_is_equal() {
        let a = standing("A", 7, 7, 7);
        let b = standing("B", 7, 7, 7);
        assert_eq!(compare_standings(&a, &b), Ordering::Equal);
        assert_eq!(compare_standings(&b, &a), Ordering::Equal);
    }
}
