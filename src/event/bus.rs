use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::TeamEvent;

type Channels = Arc<RwLock<HashMap<String, broadcast::Sender<TeamEvent>>>>;

/// Event bus for distributing team events throughout the application
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Team-specific event channels: team_id -> sender
    team_channels: Channels,
    /// Game-wide event channels: game_id -> sender
    game_channels: Channels,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventBus {
    /// Creates a new event bus; `capacity` bounds each channel's backlog
    pub fn new(capacity: usize) -> Self {
        Self {
            team_channels: Arc::new(RwLock::new(HashMap::new())),
            game_channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Emits an event to the subscribers of its team and of its game
    pub async fn emit(&self, event: TeamEvent) {
        let team_id = event.team_id().to_string();
        let game_id = event.game_id().to_string();

        Self::send(&self.team_channels, &team_id, event.clone()).await;
        Self::send(&self.game_channels, &game_id, event).await;
    }

    async fn send(channels: &Channels, key: &str, event: TeamEvent) {
        let channels = channels.read().await;

        // Channels only exist once someone subscribed
        match channels.get(key) {
            Some(sender) => match sender.send(event) {
                Ok(receiver_count) => {
                    debug!(key = %key, receivers = receiver_count, "Team event emitted");
                }
                Err(_) => {
                    debug!(key = %key, "Team event emitted with no receivers");
                }
            },
            None => debug!(key = %key, "No subscribers for team event"),
        }
    }

    /// Subscribe to events for a specific team
    pub async fn subscribe_to_team(&self, team_id: &str) -> broadcast::Receiver<TeamEvent> {
        self.subscribe(&self.team_channels, team_id).await
    }

    /// Subscribe to events of every team in a game
    pub async fn subscribe_to_game(&self, game_id: &str) -> broadcast::Receiver<TeamEvent> {
        self.subscribe(&self.game_channels, game_id).await
    }

    async fn subscribe(&self, channels: &Channels, key: &str) -> broadcast::Receiver<TeamEvent> {
        if let Some(sender) = channels.read().await.get(key) {
            return sender.subscribe();
        }

        debug!(key = %key, "Creating new event channel for subscription");
        let mut channels = channels.write().await;
        channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}
