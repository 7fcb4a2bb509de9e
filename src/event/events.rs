use serde::{Deserialize, Serialize};

use crate::{auth::Actor, player::types::PlayerView};

/// Notifications published when a team's membership or session changes.
///
/// Events represent facts that already happened; every one carries the
/// affected player (or the team's captain) and the actor responsible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TeamEvent {
    PlayerRoleChanged { player: PlayerView, actor: Actor },
    TeamSessionStarted { player: PlayerView, actor: Actor },
    TeamSessionReset { player: PlayerView, actor: Actor },
    PlayerEnrolled { player: PlayerView, actor: Actor },
    PlayerLeft { player: PlayerView, actor: Actor },
}

impl TeamEvent {
    pub fn player(&self) -> &PlayerView {
        match self {
            TeamEvent::PlayerRoleChanged { player, .. }
            | TeamEvent::TeamSessionStarted { player, .. }
            | TeamEvent::TeamSessionReset { player, .. }
            | TeamEvent::PlayerEnrolled { player, .. }
            | TeamEvent::PlayerLeft { player, .. } => player,
        }
    }

    pub fn team_id(&self) -> &str {
        &self.player().team_id
    }

    pub fn game_id(&self) -> &str {
        &self.player().game_id
    }

    pub fn name(&self) -> &'static str {
        match self {
            TeamEvent::PlayerRoleChanged { .. } => "PlayerRoleChanged",
            TeamEvent::TeamSessionStarted { .. } => "TeamSessionStarted",
            TeamEvent::TeamSessionReset { .. } => "TeamSessionReset",
            TeamEvent::PlayerEnrolled { .. } => "PlayerEnrolled",
            TeamEvent::PlayerLeft { .. } => "PlayerLeft",
        }
    }
}
