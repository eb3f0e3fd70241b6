//! Points-table ranking
//!
//! This module holds the comparator that orders standings and the ranker that
//! assigns overall and group positions from a tournament snapshot.

pub mod comparator;
pub mod ranker;

// Re-export commonly used types
pub use comparator::compare_standings;
pub use ranker::{validate_group_count, GroupStandings, StandingsRanker, StandingsTable};
