use async_trait::async_trait;

use super::{
    models::{
        AwardedChallengeBonus, Challenge, ChallengeSpec, Game, ManualChallengeBonus, Player, User,
    },
    query::{ChallengeQuery, PlayerPatch, PlayerQuery},
    unit_of_work::{StoreCommand, UnitOfWork},
    StoreError,
};

/// Persistence gateway for every entity the service touches.
///
/// Reads return owned rows. All writes go through [`Store::commit`], which runs
/// a [`UnitOfWork`] atomically; the single-command helpers below are thin
/// wrappers around it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, StoreError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;
    async fn get_spec(&self, spec_id: &str) -> Result<Option<ChallengeSpec>, StoreError>;
    async fn get_player(&self, player_id: &str) -> Result<Option<Player>, StoreError>;
    async fn list_players(&self, query: &PlayerQuery) -> Result<Vec<Player>, StoreError>;
    async fn count_players(&self, query: &PlayerQuery) -> Result<u64, StoreError>;
    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, StoreError>;
    async fn list_challenges(&self, query: &ChallengeQuery) -> Result<Vec<Challenge>, StoreError>;
    async fn count_challenges(&self, query: &ChallengeQuery) -> Result<u64, StoreError>;
    async fn list_archived_challenges(
        &self,
        query: &ChallengeQuery,
    ) -> Result<Vec<Challenge>, StoreError>;
    async fn list_awarded_bonuses(
        &self,
        challenge_ids: &[String],
    ) -> Result<Vec<AwardedChallengeBonus>, StoreError>;
    async fn list_manual_bonuses(
        &self,
        challenge_ids: &[String],
    ) -> Result<Vec<ManualChallengeBonus>, StoreError>;

    /// Applies every step of the unit in one transaction and returns the
    /// affected row count of each step, in order.
    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<u64>, StoreError>;

    async fn player_exists(&self, query: &PlayerQuery) -> Result<bool, StoreError> {
        Ok(self.count_players(query).await? > 0)
    }

    async fn spec_exists(&self, spec_id: &str) -> Result<bool, StoreError> {
        Ok(self.get_spec(spec_id).await?.is_some())
    }

    async fn create_game(&self, game: Game) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::CreateGame(game), Some(1))
            .await
            .map(|_| ())
    }

    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::CreateUser(user), Some(1))
            .await
            .map(|_| ())
    }

    async fn create_spec(&self, spec: ChallengeSpec) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::CreateSpec(spec), Some(1))
            .await
            .map(|_| ())
    }

    async fn create_player(&self, player: Player) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::CreatePlayer(player), Some(1))
            .await
            .map(|_| ())
    }

    /// Batch full-row update; every player must exist
    async fn update_players(&self, players: Vec<Player>) -> Result<(), StoreError> {
        let unit = players.into_iter().fold(UnitOfWork::new(), |unit, player| {
            unit.then_expecting(StoreCommand::UpdatePlayer(player), 1)
        });
        if unit.is_empty() {
            return Ok(());
        }
        self.commit(unit).await.map(|_| ())
    }

    /// Deletes one player; any other affected row count is a consistency failure
    async fn delete_player(&self, player_id: &str) -> Result<(), StoreError> {
        self.execute_one(
            StoreCommand::DeletePlayersWhere(PlayerQuery::by_id(player_id)),
            Some(1),
        )
        .await
        .map(|_| ())
    }

    async fn update_players_where(
        &self,
        query: PlayerQuery,
        patch: PlayerPatch,
    ) -> Result<u64, StoreError> {
        self.execute_one(StoreCommand::UpdatePlayersWhere { query, patch }, None)
            .await
    }

    async fn delete_players_where(&self, query: PlayerQuery) -> Result<u64, StoreError> {
        self.execute_one(StoreCommand::DeletePlayersWhere(query), None)
            .await
    }

    async fn create_challenge(&self, challenge: Challenge) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::CreateChallenge(challenge), Some(1))
            .await
            .map(|_| ())
    }

    async fn update_challenge(&self, challenge: Challenge) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::UpdateChallenge(challenge), Some(1))
            .await
            .map(|_| ())
    }

    async fn archive_challenges(&self, query: ChallengeQuery) -> Result<u64, StoreError> {
        self.execute_one(StoreCommand::ArchiveChallenges(query), None)
            .await
    }

    async fn create_manual_bonus(&self, bonus: ManualChallengeBonus) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::CreateManualBonus(bonus), Some(1))
            .await
            .map(|_| ())
    }

    async fn delete_manual_bonus(&self, bonus_id: &str) -> Result<(), StoreError> {
        self.execute_one(StoreCommand::DeleteManualBonus(bonus_id.to_string()), Some(1))
            .await
            .map(|_| ())
    }

    async fn execute_one(
        &self,
        command: StoreCommand,
        expected_rows: Option<u64>,
    ) -> Result<u64, StoreError> {
        let unit = match expected_rows {
            Some(rows) => UnitOfWork::new().then_expecting(command, rows),
            None => UnitOfWork::new().then(command),
        };
        let affected = self.commit(unit).await?;
        Ok(affected.first().copied().unwrap_or_default())
    }
}
