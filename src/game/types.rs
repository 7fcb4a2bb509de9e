use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::models::Player;

/// A team's leaderboard row, taken from its captain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standing {
    pub rank: i32,
    pub team_id: String,
    pub name: String,
    pub score: f64,
    pub time_ms: i64,
    pub correct_count: i32,
    pub partial_count: i32,
}

impl From<&Player> for Standing {
    fn from(captain: &Player) -> Self {
        Self {
            rank: captain.rank,
            team_id: captain.team_id.clone(),
            name: captain.approved_name.clone(),
            score: captain.score,
            time_ms: captain.time_ms,
            correct_count: captain.correct_count,
            partial_count: captain.partial_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReRankResponse {
    pub game_id: String,
    pub players_ranked: usize,
}

/// Session capacity of a game at one point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionForecast {
    pub time: DateTime<Utc>,
    /// Manager sessions still running at `time`
    pub reserved: i64,
    /// Negative when the limit is 0 (unlimited) or already exceeded
    pub available: i64,
}
