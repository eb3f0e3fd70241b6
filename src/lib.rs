//! Standings Ranker - points tables for team esports tournaments
//!
//! This crate ranks team standings by points, kills and wins, splits them
//! into groups, assigns groups round-robin and keeps live tables up to date
//! as admins edit results.

pub mod config;
pub mod error;
pub mod grouping;
pub mod metrics;
pub mod notify;
pub mod ranking;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types and traits
pub use error::{RankingError, Result};
pub use types::*;

// Re-export key components
pub use grouping::{assign_round_robin, reassign_group, GroupAssigner, RoundRobinGroupAssigner};
pub use notify::{BroadcastChangeNotifier, ChangeNotifier, Subscription};
pub use ranking::{compare_standings, StandingsRanker, StandingsTable};
pub use service::StandingsService;
pub use store::{InMemoryRecordStore, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
