use std::sync::Arc;

use gameboard::{
    auth::{Actor, TokenConfig},
    generators::{ManualClock, SequentialIdGenerator},
    store::models::{ChallengeSpec, Game, Player, UserRole},
    AppState, AppStateBuilder, InMemoryStore, Store,
};

use super::builders::{now, GameBuilder, PlayerBuilder};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub game: Game,
}

pub struct TestSetupBuilder {
    game: Game,
    teams: Vec<(String, Vec<String>)>,
    specs: Vec<ChallengeSpec>,
    players: Vec<Player>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            game: GameBuilder::new("game-1").build(),
            teams: vec![],
            specs: vec![],
            players: vec![],
        }
    }

    pub fn with_game(mut self, game: Game) -> Self {
        self.game = game;
        self
    }

    /// Adds a team whose first player is the captain
    pub fn with_team(mut self, team_id: &str, players: &[&str]) -> Self {
        self.teams.push((
            team_id.to_string(),
            players.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    pub fn with_player(mut self, player: Player) -> Self {
        self.players.push(player);
        self
    }

    pub fn with_spec(mut self, spec: ChallengeSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub async fn build(self) -> TestSetup {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(now()));

        let state = AppStateBuilder::new()
            .with_store(store.clone())
            .with_clock(clock.clone())
            .with_ids(Arc::new(SequentialIdGenerator::new("gen")))
            .with_token_config(TokenConfig::with_secret("integration-secret", 1))
            .build();

        store.create_game(self.game.clone()).await.unwrap();
        for spec in self.specs {
            store.create_spec(spec).await.unwrap();
        }

        for (team_id, players) in &self.teams {
            for (i, id) in players.iter().enumerate() {
                let builder = PlayerBuilder::new(id, team_id, &self.game.id);
                let player = if i == 0 { builder.manager() } else { builder };
                store.create_player(player.build()).await.unwrap();
            }
        }
        for player in self.players {
            store.create_player(player).await.unwrap();
        }

        TestSetup {
            state,
            store,
            clock,
            game: self.game,
        }
    }
}

impl TestSetup {
    pub fn admin(&self) -> Actor {
        Actor::new("admin", "Admin", UserRole::Admin)
    }

    pub fn member(&self, user_id: &str) -> Actor {
        Actor::new(user_id, user_id, UserRole::Member)
    }
}
