use async_trait::async_trait;

use super::{bus::EventBus, events::TeamEvent};
use crate::{auth::Actor, player::types::PlayerView};

/// Outbound team notifications. Delivery is best effort and never fails the
/// operation that triggered it.
#[async_trait]
pub trait TeamNotifier: Send + Sync {
    async fn send_player_role_changed(&self, player: PlayerView, actor: &Actor);
    async fn send_team_session_started(&self, captain: PlayerView, actor: &Actor);
    async fn send_team_session_reset(&self, captain: PlayerView, actor: &Actor);
    async fn send_player_enrolled(&self, player: PlayerView, actor: &Actor);
    async fn send_player_left(&self, player: PlayerView, actor: &Actor);
}

#[async_trait]
impl TeamNotifier for EventBus {
    async fn send_player_role_changed(&self, player: PlayerView, actor: &Actor) {
        self.emit(TeamEvent::PlayerRoleChanged {
            player,
            actor: actor.clone(),
        })
        .await;
    }

    async fn send_team_session_started(&self, captain: PlayerView, actor: &Actor) {
        self.emit(TeamEvent::TeamSessionStarted {
            player: captain,
            actor: actor.clone(),
        })
        .await;
    }

    async fn send_team_session_reset(&self, captain: PlayerView, actor: &Actor) {
        self.emit(TeamEvent::TeamSessionReset {
            player: captain,
            actor: actor.clone(),
        })
        .await;
    }

    async fn send_player_enrolled(&self, player: PlayerView, actor: &Actor) {
        self.emit(TeamEvent::PlayerEnrolled {
            player,
            actor: actor.clone(),
        })
        .await;
    }

    async fn send_player_left(&self, player: PlayerView, actor: &Actor) {
        self.emit(TeamEvent::PlayerLeft {
            player,
            actor: actor.clone(),
        })
        .await;
    }
}
