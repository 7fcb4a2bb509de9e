use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{
    models::{
        AwardedChallengeBonus, Challenge, ChallengeSpec, Game, ManualChallengeBonus, Player, User,
    },
    query::{ChallengeQuery, PlayerQuery},
    repository::Store,
    unit_of_work::{StoreCommand, UnitOfWork},
    StoreError,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    games: BTreeMap<String, Game>,
    users: BTreeMap<String, User>,
    specs: BTreeMap<String, ChallengeSpec>,
    players: BTreeMap<String, Player>,
    challenges: BTreeMap<String, Challenge>,
    archived_challenges: BTreeMap<String, Challenge>,
    awarded_bonuses: BTreeMap<String, AwardedChallengeBonus>,
    manual_bonuses: BTreeMap<String, ManualChallengeBonus>,
}

fn insert_new<T>(
    table: &mut BTreeMap<String, T>,
    id: &str,
    row: T,
    entity: &str,
) -> Result<u64, StoreError> {
    if table.contains_key(id) {
        return Err(StoreError::Conflict(format!("{} {} already exists", entity, id)));
    }
    table.insert(id.to_string(), row);
    Ok(1)
}

fn replace_existing<T>(table: &mut BTreeMap<String, T>, id: &str, row: T) -> u64 {
    match table.get_mut(id) {
        Some(existing) => {
            *existing = row;
            1
        }
        None => 0,
    }
}

impl Tables {
    fn apply(&mut self, command: &StoreCommand) -> Result<u64, StoreError> {
        match command {
            StoreCommand::CreateGame(game) => {
                insert_new(&mut self.games, &game.id, game.clone(), "game")
            }
            StoreCommand::CreateUser(user) => {
                insert_new(&mut self.users, &user.id, user.clone(), "user")
            }
            StoreCommand::CreateSpec(spec) => {
                insert_new(&mut self.specs, &spec.id, spec.clone(), "spec")
            }
            StoreCommand::CreatePlayer(player) => {
                insert_new(&mut self.players, &player.id, player.clone(), "player")
            }
            StoreCommand::UpdatePlayer(player) => Ok(replace_existing(
                &mut self.players,
                &player.id,
                player.clone(),
            )),
            StoreCommand::UpdatePlayersWhere { query, patch } => {
                let mut affected = 0;
                for player in self.players.values_mut().filter(|p| query.matches(p)) {
                    patch.apply(player);
                    affected += 1;
                }
                Ok(affected)
            }
            StoreCommand::DeletePlayersWhere(query) => {
                let before = self.players.len();
                self.players.retain(|_, player| !query.matches(player));
                Ok((before - self.players.len()) as u64)
            }
            StoreCommand::CreateChallenge(challenge) => insert_new(
                &mut self.challenges,
                &challenge.id,
                challenge.clone(),
                "challenge",
            ),
            StoreCommand::UpdateChallenge(challenge) => Ok(replace_existing(
                &mut self.challenges,
                &challenge.id,
                challenge.clone(),
            )),
            StoreCommand::SetChallengeScore {
                challenge_id,
                score,
                scored_at,
            } => match self.challenges.get_mut(challenge_id) {
                Some(challenge) => {
                    challenge.score = *score;
                    challenge.last_score_time = Some(*scored_at);
                    Ok(1)
                }
                None => Ok(0),
            },
            StoreCommand::ArchiveChallenges(query) => {
                let archived: Vec<String> = self
                    .challenges
                    .values()
                    .filter(|c| query.matches(c))
                    .map(|c| c.id.clone())
                    .collect();
                for id in &archived {
                    if let Some(challenge) = self.challenges.remove(id) {
                        self.archived_challenges.insert(id.clone(), challenge);
                    }
                }
                // bonuses don't follow their challenge into the archive
                self.awarded_bonuses
                    .retain(|_, award| !archived.contains(&award.challenge_id));
                self.manual_bonuses
                    .retain(|_, bonus| !archived.contains(&bonus.challenge_id));
                Ok(archived.len() as u64)
            }
            StoreCommand::AwardBonus(award) => {
                let duplicate = self.awarded_bonuses.values().any(|existing| {
                    existing.challenge_id == award.challenge_id
                        && existing.challenge_bonus_id == award.challenge_bonus_id
                });
                if duplicate {
                    return Err(StoreError::Conflict(format!(
                        "bonus {} already awarded to challenge {}",
                        award.challenge_bonus_id, award.challenge_id
                    )));
                }
                insert_new(
                    &mut self.awarded_bonuses,
                    &award.id,
                    award.clone(),
                    "awarded bonus",
                )
            }
            StoreCommand::CreateManualBonus(bonus) => insert_new(
                &mut self.manual_bonuses,
                &bonus.id,
                bonus.clone(),
                "manual bonus",
            ),
            StoreCommand::DeleteManualBonus(id) => {
                Ok(self.manual_bonuses.remove(id).map_or(0, |_| 1))
            }
        }
    }
}

/// In-memory implementation of [`Store`] for development and testing.
///
/// Rows live in id-ordered maps, so every list comes back sorted by id. A unit
/// of work runs under the write lock against a snapshot that is restored when
/// any step fails.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of live players, handy when asserting rollbacks
    pub async fn player_count(&self) -> usize {
        self.tables.read().await.players.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, StoreError> {
        Ok(self.tables.read().await.games.get(game_id).cloned())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn get_spec(&self, spec_id: &str) -> Result<Option<ChallengeSpec>, StoreError> {
        Ok(self.tables.read().await.specs.get(spec_id).cloned())
    }

    async fn get_player(&self, player_id: &str) -> Result<Option<Player>, StoreError> {
        Ok(self.tables.read().await.players.get(player_id).cloned())
    }

    async fn list_players(&self, query: &PlayerQuery) -> Result<Vec<Player>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .players
            .values()
            .filter(|player| query.matches(player))
            .cloned()
            .collect())
    }

    async fn count_players(&self, query: &PlayerQuery) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.players.values().filter(|p| query.matches(p)).count() as u64)
    }

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, StoreError> {
        Ok(self.tables.read().await.challenges.get(challenge_id).cloned())
    }

    async fn list_challenges(&self, query: &ChallengeQuery) -> Result<Vec<Challenge>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .challenges
            .values()
            .filter(|challenge| query.matches(challenge))
            .cloned()
            .collect())
    }

    async fn count_challenges(&self, query: &ChallengeQuery) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.challenges.values().filter(|c| query.matches(c)).count() as u64)
    }

    async fn list_archived_challenges(
        &self,
        query: &ChallengeQuery,
    ) -> Result<Vec<Challenge>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .archived_challenges
            .values()
            .filter(|challenge| query.matches(challenge))
            .cloned()
            .collect())
    }

    async fn list_awarded_bonuses(
        &self,
        challenge_ids: &[String],
    ) -> Result<Vec<AwardedChallengeBonus>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .awarded_bonuses
            .values()
            .filter(|award| challenge_ids.contains(&award.challenge_id))
            .cloned()
            .collect())
    }

    async fn list_manual_bonuses(
        &self,
        challenge_ids: &[String],
    ) -> Result<Vec<ManualChallengeBonus>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .manual_bonuses
            .values()
            .filter(|bonus| challenge_ids.contains(&bonus.challenge_id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, unit), fields(steps = unit.len()))]
    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<u64>, StoreError> {
        let mut tables = self.tables.write().await;
        let snapshot = tables.clone();

        let mut affected = Vec::with_capacity(unit.len());
        for step in unit.steps() {
            let result = tables
                .apply(&step.command)
                .and_then(|rows| step.verify(rows).map(|_| rows));
            match result {
                Ok(rows) => affected.push(rows),
                Err(e) => {
                    warn!(error = %e, operation = %step.command.describe(), "Rolling back unit of work");
                    *tables = snapshot;
                    return Err(e);
                }
            }
        }

        debug!(affected = ?affected, "Unit of work committed in memory");
        Ok(affected)
    }
}
