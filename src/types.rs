//! Common types used throughout the standings service

use crate::error::RankingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a team's standing within one tournament
pub type StandingId = Uuid;

/// Unique identifier for tournaments
pub type TournamentId = Uuid;

/// Label used for standings without a group when grouping is requested
pub const UNGROUPED_LABEL: &str = "Ungrouped";

/// Smallest group count accepted for grouped ranking and assignment
pub const MIN_GROUP_COUNT: u32 = 2;

/// Largest group count accepted for grouped ranking and assignment
pub const MAX_GROUP_COUNT: u32 = 8;

/// Number of players fielded by a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", rename_all = "snake_case")]
pub enum TeamSize {
    Solo,
    Duo,
    Squad,
    FiveMan,
}

impl TeamSize {
    /// Number of players on the roster
    pub fn players(&self) -> u8 {
        match self {
            TeamSize::Solo => 1,
            TeamSize::Duo => 2,
            TeamSize::Squad => 4,
            TeamSize::FiveMan => 5,
        }
    }

    /// Resolve a roster size from a player count
    pub fn from_players(players: u64) -> Option<Self> {
        match players {
            1 => Some(TeamSize::Solo),
            2 => Some(TeamSize::Duo),
            4 => Some(TeamSize::Squad),
            5 => Some(TeamSize::FiveMan),
            _ => None,
        }
    }
}

impl Default for TeamSize {
    fn default() -> Self {
        TeamSize::Squad
    }
}

impl std::fmt::Display for TeamSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSize::Solo => write!(f, "Solo"),
            TeamSize::Duo => write!(f, "Duo"),
            TeamSize::Squad => write!(f, "Squad"),
            TeamSize::FiveMan => write!(f, "5-Man"),
        }
    }
}

impl FromStr for TeamSize {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let size = match normalized.as_str() {
            "solo" => Some(TeamSize::Solo),
            "duo" => Some(TeamSize::Duo),
            "squad" => Some(TeamSize::Squad),
            "5-man" | "five-man" | "five_man" | "fiveman" | "5v5" => Some(TeamSize::FiveMan),
            other => other.parse::<u64>().ok().and_then(TeamSize::from_players),
        };

        size.ok_or_else(|| RankingError::InvalidTeamSize {
            value: s.to_string(),
        })
    }
}

impl TryFrom<serde_json::Value> for TeamSize {
    type Error = RankingError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match &value {
            serde_json::Value::String(s) => s.parse(),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(TeamSize::from_players)
                .ok_or_else(|| RankingError::InvalidTeamSize {
                    value: n.to_string(),
                }),
            other => Err(RankingError::InvalidTeamSize {
                value: other.to_string(),
            }),
        }
    }
}

/// Whether standings are ranked as one table or split into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    #[default]
    Grouped,
    Ungrouped,
}

impl RankMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankMode::Grouped => "grouped",
            RankMode::Ungrouped => "ungrouped",
        }
    }
}

impl std::fmt::Display for RankMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankMode {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grouped" => Ok(RankMode::Grouped),
            "ungrouped" => Ok(RankMode::Ungrouped),
            other => Err(RankingError::ConfigurationError {
                message: format!("Invalid rank mode: {}", other),
            }),
        }
    }
}

/// Options recognised by the ranker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankOptions {
    pub mode: RankMode,
    pub group_count: u32,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            mode: RankMode::Grouped,
            group_count: 4,
        }
    }
}

impl RankOptions {
    /// Options for a single, ungrouped table
    pub fn ungrouped() -> Self {
        Self {
            mode: RankMode::Ungrouped,
            ..Self::default()
        }
    }

    /// Options for a grouped table with the given group count
    pub fn grouped(group_count: u32) -> Self {
        Self {
            mode: RankMode::Grouped,
            group_count,
        }
    }
}

/// One team's record within a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub id: StandingId,
    pub tournament_id: TournamentId,
    pub team_name: String,
    #[serde(default)]
    pub team_size: TeamSize,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub kills: i64,
    #[serde(default)]
    pub wins: i64,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub overall_position: Option<u32>,
    #[serde(default)]
    pub group_position: Option<u32>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TeamStanding {
    /// Create the standing for a team entering a tournament, with zeroed counters
    pub fn new(tournament_id: TournamentId, team_name: impl Into<String>, team_size: TeamSize) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            team_name: team_name.into(),
            team_size,
            points: 0,
            kills: 0,
            wins: 0,
            group_name: None,
            overall_position: None,
            group_position: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the counters, consuming and returning self
    pub fn with_counters(mut self, points: i64, kills: i64, wins: i64) -> Self {
        self.points = points;
        self.kills = kills;
        self.wins = wins;
        self
    }

    /// Set the group label, consuming and returning self
    pub fn with_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    /// Whether the standing carries a non-empty group label
    pub fn has_group(&self) -> bool {
        self.group_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }

    /// Partition key used by grouped ranking
    pub fn group_key(&self) -> &str {
        match self.group_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNGROUPED_LABEL,
        }
    }

    /// Ranking tuple, in comparison priority order
    pub fn score(&self) -> (i64, i64, i64) {
        (self.points, self.kills, self.wins)
    }
}

/// Partial update of a standing's counters; absent fields are left unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterUpdate {
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub kills: Option<i64>,
    #[serde(default)]
    pub wins: Option<i64>,
}

impl CounterUpdate {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.points.is_none() && self.kills.is_none() && self.wins.is_none()
    }

    /// Apply to a standing, returning whether anything changed
    pub fn apply(&self, standing: &mut TeamStanding) -> bool {
        let before = standing.score();
        if let Some(points) = self.points {
            standing.points = points;
        }
        if let Some(kills) = self.kills {
            standing.kills = kills;
        }
        if let Some(wins) = self.wins {
            standing.wins = wins;
        }
        before != standing.score()
    }
}
