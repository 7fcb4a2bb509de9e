use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::types::{InvitationResponse, PlayerView};
use crate::{
    auth::Actor,
    errors::GameboardError,
    event::TeamNotifier,
    generators::{Clock, InviteCodeGenerator},
    session::SessionService,
    shared::cancellable,
    store::{
        models::{Game, Player, PlayerMode, PlayerRole, User},
        ChallengeQuery, PlayerQuery, Store, StoreCommand, UnitOfWork,
    },
};

/// Enrollment, withdrawal and team invitations
pub struct PlayerService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn TeamNotifier>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn InviteCodeGenerator>,
    sessions: Arc<SessionService>,
}

impl PlayerService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn TeamNotifier>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn InviteCodeGenerator>,
        sessions: Arc<SessionService>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            codes,
            sessions,
        }
    }

    /// Registers a user in a game as the captain of a new team.
    ///
    /// Practice games hand out a running practice session instead.
    #[instrument(skip(self, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn enroll(
        &self,
        user_id: &str,
        game_id: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<PlayerView, GameboardError> {
        if actor.user_id != user_id && !actor.is_registrar() {
            return Err(GameboardError::ActionForbidden(format!(
                "{} can't enroll other users",
                actor.user_id
            )));
        }

        let user = self.user(user_id, cancel).await?;
        let game = self.game(game_id, cancel).await?;

        if game.is_practice_mode() {
            return self
                .sessions
                .register_practice_session(&user, &game, cancel)
                .await;
        }

        if !actor.is_elevated() && !game.registration_active(self.clock.now()) {
            return Err(GameboardError::RegistrationIsClosed(game.id));
        }

        let existing = PlayerQuery::by_game(&game.id)
            .with_user(&user.id)
            .with_mode(PlayerMode::Competition);
        if cancellable(cancel, self.store.player_exists(&existing)).await? {
            return Err(GameboardError::AlreadyRegistered {
                user_id: user.id,
                game_id: game.id,
            });
        }

        if user.sponsor_id.is_none() {
            return Err(GameboardError::NoPlayerSponsor {
                user_id: user.id,
                game_id: game.id,
            });
        }

        let player = self
            .sessions
            .new_manager(&user, &game, game.session_minutes);
        cancellable(cancel, self.store.create_player(player.clone())).await?;

        info!(player_id = %player.id, team_id = %player.team_id, "Player enrolled");
        let view = PlayerView::from(player);
        self.notifier.send_player_enrolled(view.clone(), actor).await;
        Ok(view)
    }

    /// Removes a player and archives the challenges they launched
    #[instrument(skip(self, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn unenroll(
        &self,
        player_id: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<(), GameboardError> {
        let player = self.player(player_id, cancel).await?;

        if !actor.is_registrar() {
            if player.user_id != actor.user_id {
                return Err(GameboardError::ActionForbidden(format!(
                    "{} can't unenroll player {}",
                    actor.user_id, player.id
                )));
            }
            if player.has_started_session() && !actor.is_elevated() {
                return Err(GameboardError::ActionForbidden(format!(
                    "Player {} has already started a session",
                    player.id
                )));
            }
        }

        let unit = UnitOfWork::new()
            .then(StoreCommand::ArchiveChallenges(ChallengeQuery::by_player(
                &player.id,
            )))
            .then_expecting(
                StoreCommand::DeletePlayersWhere(PlayerQuery::by_id(&player.id)),
                1,
            );
        cancellable(cancel, self.store.commit(unit)).await?;

        info!(player_id = %player.id, team_id = %player.team_id, "Player unenrolled");
        self.notifier
            .send_player_left(PlayerView::from(player), actor)
            .await;
        Ok(())
    }

    /// Issues a fresh invitation code for the captain's team
    #[instrument(skip(self, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn generate_invitation(
        &self,
        player_id: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<InvitationResponse, GameboardError> {
        let mut player = self.player(player_id, cancel).await?;

        if player.user_id != actor.user_id && !actor.is_elevated() {
            return Err(GameboardError::ActionForbidden(format!(
                "{} can't invite on behalf of player {}",
                actor.user_id, player.id
            )));
        }
        if !player.is_manager() {
            return Err(GameboardError::ActionForbidden(format!(
                "Player {} isn't the team captain",
                player.id
            )));
        }

        let code = self.codes.generate();
        player.invite_code = Some(code.clone());
        let team_id = player.team_id.clone();
        cancellable(cancel, self.store.update_players(vec![player])).await?;

        info!(team_id = %team_id, "Invitation generated");
        Ok(InvitationResponse { team_id, code })
    }

    /// Moves a player onto the team an invitation code belongs to
    #[instrument(skip(self, code, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn enlist(
        &self,
        player_id: &str,
        code: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<PlayerView, GameboardError> {
        let mut player = self.player(player_id, cancel).await?;

        if player.user_id != actor.user_id && !actor.is_elevated() {
            return Err(GameboardError::ActionForbidden(format!(
                "{} can't enlist player {}",
                actor.user_id, player.id
            )));
        }

        let holders = cancellable(
            cancel,
            self.store
                .list_players(&PlayerQuery::new().with_invite_code(code)),
        )
        .await?;
        let team_ids: BTreeSet<&str> = holders.iter().map(|p| p.team_id.as_str()).collect();
        let host = match (team_ids.len(), holders.first()) {
            (1, Some(host)) => host,
            _ => {
                warn!(teams = team_ids.len(), "Invitation code didn't resolve to one team");
                return Err(GameboardError::CantResolveTeamFromCode(code.to_string()));
            }
        };

        if host.game_id != player.game_id {
            return Err(GameboardError::NotYetRegistered(player.id));
        }
        if host.team_id == player.team_id {
            return Ok(PlayerView::from(player));
        }

        let game = self.game(&host.game_id, cancel).await?;
        if !actor.is_elevated() {
            if !game.registration_active(self.clock.now()) {
                return Err(GameboardError::RegistrationIsClosed(game.id));
            }
            if host.has_started_session() {
                return Err(GameboardError::ActionForbidden(format!(
                    "Team {} has already started its session",
                    host.team_id
                )));
            }
        }

        let size = cancellable(
            cancel,
            self.store.count_players(&PlayerQuery::by_team(&host.team_id)),
        )
        .await?;
        if size >= game.max_team_size.max(0) as u64 {
            return Err(GameboardError::TeamIsFull {
                team_id: host.team_id.clone(),
                size,
                max_size: game.max_team_size,
            });
        }

        player.team_id = host.team_id.clone();
        player.role = PlayerRole::Member;
        player.invite_code = None;
        cancellable(cancel, self.store.update_players(vec![player.clone()])).await?;

        info!(player_id = %player.id, team_id = %player.team_id, "Player joined team");
        let view = PlayerView::from(player);
        self.notifier.send_player_enrolled(view.clone(), actor).await;
        Ok(view)
    }

    async fn player(
        &self,
        player_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Player, GameboardError> {
        cancellable(cancel, self.store.get_player(player_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("player", player_id))
    }

    async fn user(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<User, GameboardError> {
        cancellable(cancel, self.store.get_user(user_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("user", user_id))
    }

    async fn game(
        &self,
        game_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Game, GameboardError> {
        cancellable(cancel, self.store.get_game(game_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("game", game_id))
    }
}
