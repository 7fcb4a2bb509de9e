use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::player::types::PlayerView;

/// A team as seen from outside: the captain's session and score plus every member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamView {
    pub team_id: String,
    pub game_id: String,
    pub name: String,
    pub captain: PlayerView,
    pub members: Vec<PlayerView>,
    pub session_begin: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
    pub score: f64,
    pub rank: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResetSessionQuery {
    /// Remove the team's players instead of only clearing the session
    #[serde(default)]
    pub unenroll: bool,
}
