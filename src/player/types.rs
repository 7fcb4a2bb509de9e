use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::models::{Player, PlayerMode, PlayerRole};

/// Outward-facing projection of a player row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub id: String,
    pub game_id: String,
    pub team_id: String,
    pub user_id: String,
    pub name: String,
    pub approved_name: String,
    pub role: PlayerRole,
    pub mode: PlayerMode,
    pub session_begin: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
    pub session_minutes: f64,
    pub score: f64,
    pub rank: i32,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            game_id: player.game_id.clone(),
            team_id: player.team_id.clone(),
            user_id: player.user_id.clone(),
            name: player.name.clone(),
            approved_name: player.approved_name.clone(),
            role: player.role,
            mode: player.mode,
            session_begin: player.session_begin,
            session_end: player.session_end,
            session_minutes: player.session_minutes,
            score: player.score,
            rank: player.rank,
        }
    }
}

impl From<Player> for PlayerView {
    fn from(player: Player) -> Self {
        PlayerView::from(&player)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollRequest {
    pub user_id: String,
    pub game_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnlistRequest {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StartSessionRequest {
    /// Skip the live-window, team-size and session-limit rules. Elevated actors only.
    #[serde(default)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvitationResponse {
    pub team_id: String,
    pub code: String,
}
