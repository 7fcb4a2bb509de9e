use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::types::TeamView;
use crate::{
    auth::Actor,
    errors::GameboardError,
    event::TeamNotifier,
    player::types::PlayerView,
    shared::cancellable,
    store::{
        models::{Challenge, Player, PlayerRole},
        ChallengeQuery, PlayerPatch, PlayerQuery, Store, StoreCommand, StoreError, UnitOfWork,
    },
};

/// Derives teams from players sharing a team id and manages their captaincy
pub struct TeamService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn TeamNotifier>,
}

impl TeamService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn TeamNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Picks the captain of an already loaded team.
    ///
    /// A single Manager wins outright. Several Managers are narrowed to the one
    /// with the alphabetically earliest approved name, and with no Manager at all
    /// the same rule applies to every player.
    pub fn resolve_captain_from(
        team_id: &str,
        players: &[Player],
    ) -> Result<Player, GameboardError> {
        let managers: Vec<&Player> = players.iter().filter(|p| p.is_manager()).collect();

        let candidates = match managers.len() {
            1 => return Ok(managers[0].clone()),
            0 => players.iter().collect::<Vec<_>>(),
            _ => managers,
        };

        candidates
            .into_iter()
            .min_by(|a, b| {
                a.approved_name
                    .cmp(&b.approved_name)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
            .ok_or_else(|| GameboardError::CaptainResolutionFailure(team_id.to_string()))
    }

    #[instrument(skip(self, cancel))]
    pub async fn resolve_captain(
        &self,
        team_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Player, GameboardError> {
        let players = self.players(team_id, cancel).await?;
        Self::resolve_captain_from(team_id, &players)
    }

    pub async fn players(
        &self,
        team_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Player>, GameboardError> {
        cancellable(cancel, self.store.list_players(&PlayerQuery::by_team(team_id))).await
    }

    /// Makes `player_id` the sole Manager of the team.
    ///
    /// Demotion and promotion commit together; if the promotion does not touch
    /// exactly one row of this team, nothing changes.
    #[instrument(skip(self, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn promote_captain(
        &self,
        team_id: &str,
        player_id: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<PlayerView, GameboardError> {
        let unit = UnitOfWork::new()
            .then(StoreCommand::UpdatePlayersWhere {
                query: PlayerQuery::by_team(team_id),
                patch: PlayerPatch::role(PlayerRole::Member),
            })
            .then_expecting(
                StoreCommand::UpdatePlayersWhere {
                    query: PlayerQuery::by_id(player_id).with_team(team_id),
                    patch: PlayerPatch::role(PlayerRole::Manager),
                },
                1,
            );

        match cancellable(cancel, self.store.commit(unit)).await {
            Ok(_) => {}
            Err(GameboardError::Store(StoreError::RowCountMismatch { actual, .. })) => {
                warn!(team_id = %team_id, player_id = %player_id, affected = actual, "Captain promotion rolled back");
                return Err(GameboardError::PromotionFailed {
                    team_id: team_id.to_string(),
                    player_id: player_id.to_string(),
                    affected: actual,
                });
            }
            Err(e) => return Err(e),
        }

        let captain = cancellable(cancel, self.store.get_player(player_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("player", player_id))?;
        let view = PlayerView::from(&captain);

        info!(team_id = %team_id, player_id = %player_id, "Captain promoted");
        self.notifier
            .send_player_role_changed(view.clone(), actor)
            .await;
        Ok(view)
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_team(
        &self,
        team_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TeamView, GameboardError> {
        let mut players = self.players(team_id, cancel).await?;
        if players.is_empty() {
            return Err(GameboardError::not_found("team", team_id));
        }

        let captain = Self::resolve_captain_from(team_id, &players)?;
        players.sort_by(|a, b| a.approved_name.cmp(&b.approved_name));

        Ok(TeamView {
            team_id: team_id.to_string(),
            game_id: captain.game_id.clone(),
            name: captain.approved_name.clone(),
            session_begin: captain.session_begin,
            session_end: captain.session_end,
            score: captain.score,
            rank: captain.rank,
            members: players.iter().map(PlayerView::from).collect(),
            captain: PlayerView::from(captain),
        })
    }

    pub async fn exists(
        &self,
        team_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, GameboardError> {
        cancellable(cancel, self.store.player_exists(&PlayerQuery::by_team(team_id))).await
    }

    pub async fn is_on_team(
        &self,
        team_id: &str,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, GameboardError> {
        let query = PlayerQuery::by_team(team_id).with_user(user_id);
        cancellable(cancel, self.store.player_exists(&query)).await
    }

    pub async fn get_game_id(
        &self,
        team_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GameboardError> {
        self.players(team_id, cancel)
            .await?
            .into_iter()
            .next()
            .map(|player| player.game_id)
            .ok_or_else(|| GameboardError::not_found("team", team_id))
    }

    pub async fn get_challenges_with_active_gamespace(
        &self,
        team_id: &str,
        game_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Challenge>, GameboardError> {
        let query = ChallengeQuery::by_team(team_id)
            .with_game(game_id)
            .with_deployed_gamespace(true);
        cancellable(cancel, self.store.list_challenges(&query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{player, TestContext};
    use rstest::rstest;

    fn named(id: &str, name: &str, role: PlayerRole) -> Player {
        let mut p = player(id, "team-1", "game-1");
        p.approved_name = name.to_string();
        p.role = role;
        p
    }

    #[rstest]
    #[case::single_manager(
        vec![("a", "Zed", PlayerRole::Manager), ("b", "Amy", PlayerRole::Member)],
        "a"
    )]
    #[case::several_managers(
        vec![
            ("a", "Zed", PlayerRole::Manager),
            ("b", "Bob", PlayerRole::Manager),
            ("c", "Amy", PlayerRole::Member),
        ],
        "b"
    )]
    #[case::no_manager(
        vec![
            ("a", "Zed", PlayerRole::Member),
            ("b", "Bob", PlayerRole::Member),
            ("c", "Amy", PlayerRole::Member),
        ],
        "c"
    )]
    fn test_resolve_captain_from(
        #[case] roster: Vec<(&str, &str, PlayerRole)>,
        #[case] expected: &str,
    ) {
        let players: Vec<Player> = roster
            .into_iter()
            .map(|(id, name, role)| named(id, name, role))
            .collect();

        let captain = TeamService::resolve_captain_from("team-1", &players).unwrap();
        assert_eq!(captain.id, expected);
    }

    #[test]
    fn test_resolve_captain_of_empty_team_fails() {
        let result = TeamService::resolve_captain_from("team-1", &[]);
        assert!(matches!(
            result,
            Err(GameboardError::CaptainResolutionFailure(team)) if team == "team-1"
        ));
    }

    #[tokio::test]
    async fn test_promote_captain_leaves_exactly_one_manager() {
        let ctx = TestContext::new().await;
        ctx.insert_player(named("a", "Amy", PlayerRole::Manager)).await;
        ctx.insert_player(named("b", "Bob", PlayerRole::Member)).await;

        let view = ctx
            .state
            .team_service
            .promote_captain("team-1", "b", &Actor::system(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(view.role, PlayerRole::Manager);

        let captain = ctx
            .state
            .team_service
            .resolve_captain("team-1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(captain.id, "b");

        let managers = ctx
            .state
            .store
            .count_players(&PlayerQuery::by_team("team-1").with_role(PlayerRole::Manager))
            .await
            .unwrap();
        assert_eq!(managers, 1);
    }

    #[tokio::test]
    async fn test_promote_player_of_other_team_rolls_back() {
        let ctx = TestContext::new().await;
        ctx.insert_player(named("a", "Amy", PlayerRole::Manager)).await;
        let mut outsider = named("x", "Xan", PlayerRole::Member);
        outsider.team_id = "team-2".to_string();
        ctx.insert_player(outsider).await;

        let result = ctx
            .state
            .team_service
            .promote_captain("team-1", "x", &Actor::system(), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(GameboardError::PromotionFailed { affected: 0, .. })
        ));

        let amy = ctx.state.store.get_player("a").await.unwrap().unwrap();
        assert_eq!(amy.role, PlayerRole::Manager);
    }

    #[tokio::test]
    async fn test_get_team_lists_members_by_name() {
        let ctx = TestContext::new().await;
        ctx.insert_player(named("a", "Zed", PlayerRole::Member)).await;
        ctx.insert_player(named("b", "Amy", PlayerRole::Manager)).await;

        let team = ctx
            .state
            .team_service
            .get_team("team-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(team.captain.id, "b");
        assert_eq!(team.name, "Amy");
        let names: Vec<&str> = team.members.iter().map(|m| m.approved_name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);

        let missing = ctx
            .state
            .team_service
            .get_team("nope", &CancellationToken::new())
            .await;
        assert!(matches!(missing, Err(GameboardError::ResourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_membership_queries() {
        let ctx = TestContext::new().await;
        ctx.insert_player(named("a", "Amy", PlayerRole::Manager)).await;
        let cancel = CancellationToken::new();
        let teams = &ctx.state.team_service;

        assert!(teams.exists("team-1", &cancel).await.unwrap());
        assert!(!teams.exists("team-9", &cancel).await.unwrap());
        assert!(teams.is_on_team("team-1", "user-a", &cancel).await.unwrap());
        assert!(!teams.is_on_team("team-1", "user-z", &cancel).await.unwrap());
        assert_eq!(teams.get_game_id("team-1", &cancel).await.unwrap(), "game-1");
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_before_writing() {
        let ctx = TestContext::new().await;
        ctx.insert_player(named("a", "Amy", PlayerRole::Manager)).await;
        ctx.insert_player(named("b", "Bob", PlayerRole::Member)).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = ctx
            .state
            .team_service
            .promote_captain("team-1", "b", &Actor::system(), &cancel)
            .await;
        assert!(matches!(result, Err(GameboardError::Cancelled)));

        let bob = ctx.state.store.get_player("b").await.unwrap().unwrap();
        assert_eq!(bob.role, PlayerRole::Member);
    }
}
