use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::types::SessionWindow;
use crate::{
    auth::Actor,
    config::PracticeSettings,
    errors::GameboardError,
    event::TeamNotifier,
    generators::{Clock, IdGenerator},
    player::types::PlayerView,
    shared::cancellable,
    store::{
        models::{
            minutes, Challenge, ChallengeResult, Game, Player, PlayerMode, PlayerRole, User,
            INITIAL_SCORE_SPEC_ID,
        },
        ChallengeQuery, PlayerPatch, PlayerQuery, Store, StoreCommand, UnitOfWork,
    },
    team::TeamService,
};

/// Starts, limits and resets team sessions
pub struct SessionService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn TeamNotifier>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    teams: Arc<TeamService>,
    practice: PracticeSettings,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn TeamNotifier>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        teams: Arc<TeamService>,
        practice: PracticeSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            ids,
            teams,
            practice,
        }
    }

    pub fn calculate_session_window(game: &Game, start: DateTime<Utc>) -> SessionWindow {
        SessionWindow {
            begin: start,
            end: start + game.session_length(),
            minutes: game.session_minutes,
        }
    }

    /// Starts the session of the player's whole team.
    ///
    /// Unless `sudo` is set the game must be live, the team must meet the
    /// minimum size of team games, sync-start games are refused, and the game's
    /// session limit must have room.
    #[instrument(skip(self, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn start_session(
        &self,
        player_id: &str,
        actor: &Actor,
        sudo: bool,
        cancel: &CancellationToken,
    ) -> Result<PlayerView, GameboardError> {
        let player = cancellable(cancel, self.store.get_player(player_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("player", player_id))?;
        let game = self.game(&player.game_id, cancel).await?;
        let team = self.teams.players(&player.team_id, cancel).await?;
        let now = self.clock.now();

        if !sudo {
            if !game.is_live(now) {
                return Err(GameboardError::GameNotActive(game.id));
            }

            if game.require_team() && (team.len() as i64) < i64::from(game.min_team_size) {
                return Err(GameboardError::InvalidTeamSize {
                    team_id: player.team_id,
                    game_id: game.id,
                    size: team.len() as u64,
                    min: game.min_team_size,
                    max: game.max_team_size,
                });
            }

            if game.require_synchronized_start {
                return Err(GameboardError::SyncStartNotSupported(game.id));
            }

            if game.session_limit > 0 {
                let session_count = self
                    .get_session_count(&player.team_id, &game.id, cancel)
                    .await?;
                if session_count >= game.session_limit as u64 {
                    warn!(
                        team_id = %player.team_id,
                        session_count,
                        session_limit = game.session_limit,
                        "Session limit reached"
                    );
                    return Err(GameboardError::SessionLimitReached {
                        team_id: player.team_id,
                        game_id: game.id,
                        session_count,
                        session_limit: game.session_limit,
                    });
                }
            }
        }

        let window = Self::calculate_session_window(&game, now);
        let mut unit = UnitOfWork::new();
        let mut started = Vec::with_capacity(team.len());
        for mut member in team {
            member.session_begin = Some(window.begin);
            member.session_end = Some(window.end);
            member.session_minutes = window.minutes;
            unit = unit.then_expecting(StoreCommand::UpdatePlayer(member.clone()), 1);
            started.push(member);
        }

        let captain = TeamService::resolve_captain_from(&player.team_id, &started)?;
        if captain.score > 0.0 {
            debug!(player_id = %captain.id, score = captain.score, "Carrying initial score into session");
            unit.push(StoreCommand::CreateChallenge(
                self.initial_score_challenge(&captain),
            ));
        }

        cancellable(cancel, self.store.commit(unit)).await?;

        let view = PlayerView::from(&captain);
        info!(team_id = %captain.team_id, session_end = %window.end, "Team session started");
        self.notifier
            .send_team_session_started(view.clone(), actor)
            .await;
        Ok(view)
    }

    fn initial_score_challenge(&self, player: &Player) -> Challenge {
        Challenge {
            id: self.ids.next_id(),
            spec_id: INITIAL_SCORE_SPEC_ID.to_string(),
            name: INITIAL_SCORE_SPEC_ID.to_string(),
            game_id: player.game_id.clone(),
            team_id: player.team_id.clone(),
            player_id: player.id.clone(),
            start_time: None,
            end_time: None,
            last_score_time: None,
            points: player.score,
            score: player.score,
            result: ChallengeResult::None,
            has_deployed_gamespace: false,
            state: String::new(),
        }
    }

    /// Whether the team already has as many deployed gamespaces as the game allows
    pub async fn is_at_gamespace_limit(
        &self,
        team_id: &str,
        game: &Game,
        cancel: &CancellationToken,
    ) -> Result<bool, GameboardError> {
        let active = self
            .teams
            .get_challenges_with_active_gamespace(team_id, &game.id, cancel)
            .await?;
        Ok(active.len() as i64 >= i64::from(game.gamespace_limit()))
    }

    /// Running sessions in the game, counted by their captains
    pub async fn get_session_count(
        &self,
        team_id: &str,
        game_id: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, GameboardError> {
        let query = PlayerQuery::by_game(game_id)
            .with_role(PlayerRole::Manager)
            .with_session_ending_after(self.clock.now());
        let count = cancellable(cancel, self.store.count_players(&query)).await?;
        debug!(team_id = %team_id, game_id = %game_id, count, "Counted running sessions");
        Ok(count)
    }

    /// Running practice sessions across every game
    pub async fn get_practice_session_count(
        &self,
        cancel: &CancellationToken,
    ) -> Result<u64, GameboardError> {
        let query = PlayerQuery::new()
            .with_role(PlayerRole::Manager)
            .with_mode(PlayerMode::Practice)
            .with_session_ending_after(self.clock.now());
        cancellable(cancel, self.store.count_players(&query)).await
    }

    /// Grants the user a running practice session in `game`.
    ///
    /// An active practice session in the same game is returned as is. Otherwise
    /// every team the user practices on must be below its gamespace limit and
    /// the global practice cap must have room.
    #[instrument(skip(self, user, game, cancel), fields(user_id = %user.id, game_id = %game.id))]
    pub async fn register_practice_session(
        &self,
        user: &User,
        game: &Game,
        cancel: &CancellationToken,
    ) -> Result<PlayerView, GameboardError> {
        let now = self.clock.now();
        let active = cancellable(
            cancel,
            self.store.list_players(
                &PlayerQuery::new()
                    .with_user(&user.id)
                    .with_mode(PlayerMode::Practice)
                    .with_session_ending_after(now),
            ),
        )
        .await?;

        if let Some(existing) = active.iter().find(|p| p.game_id == game.id) {
            debug!(player_id = %existing.id, "Reusing active practice session");
            return Ok(PlayerView::from(existing));
        }

        let team_ids: Vec<String> = active.iter().map(|p| p.team_id.clone()).collect();
        for session in &active {
            let session_game = self.game(&session.game_id, cancel).await?;
            if self
                .is_at_gamespace_limit(&session.team_id, &session_game, cancel)
                .await?
            {
                warn!(team_id = %session.team_id, "Practice gamespace limit reached");
                return Err(GameboardError::UserLevelPracticeGamespaceLimitReached {
                    user_id: user.id.clone(),
                    game_id: game.id.clone(),
                    team_ids,
                });
            }
        }

        let max_sessions = self.practice.max_concurrent_sessions;
        if max_sessions > 0 {
            let session_count = self.get_practice_session_count(cancel).await?;
            if session_count >= u64::from(max_sessions) {
                return Err(GameboardError::PracticeSessionLimitReached {
                    user_id: user.id.clone(),
                    session_count,
                    max_sessions,
                });
            }
        }

        let session_minutes = self.practice.default_session_minutes;
        let mut player = self.new_manager(user, game, session_minutes);
        player.mode = PlayerMode::Practice;
        player.session_begin = Some(now);
        player.session_end = Some(now + minutes(session_minutes));

        cancellable(cancel, self.store.create_player(player.clone())).await?;
        info!(player_id = %player.id, team_id = %player.team_id, "Practice session registered");
        Ok(PlayerView::from(player))
    }

    /// A fresh player who captains a new single-member team
    pub(crate) fn new_manager(&self, user: &User, game: &Game, session_minutes: f64) -> Player {
        Player {
            id: self.ids.next_id(),
            game_id: game.id.clone(),
            user_id: user.id.clone(),
            team_id: self.ids.next_id(),
            name: user.approved_name.clone(),
            approved_name: user.approved_name.clone(),
            name_status: String::new(),
            role: PlayerRole::Manager,
            mode: game.player_mode,
            session_begin: None,
            session_end: None,
            session_minutes,
            score: 0.0,
            time_ms: 0,
            rank: 0,
            correct_count: 0,
            partial_count: 0,
            sponsor_id: user.sponsor_id.clone(),
            advanced: false,
            invite_code: None,
            is_ready: false,
            created_at: self.clock.now(),
        }
    }

    /// Archives the team's challenges, then either removes the team or clears
    /// everything its session accumulated.
    #[instrument(skip(self, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn reset_team_session(
        &self,
        team_id: &str,
        unenroll_team: bool,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<(), GameboardError> {
        let players = self.teams.players(team_id, cancel).await?;
        if players.is_empty() {
            return Err(GameboardError::not_found("team", team_id));
        }

        let archived = cancellable(
            cancel,
            self.store.archive_challenges(ChallengeQuery::by_team(team_id)),
        )
        .await?;
        debug!(team_id = %team_id, archived, "Archived team challenges");

        if unenroll_team {
            cancellable(
                cancel,
                self.store.delete_players_where(PlayerQuery::by_team(team_id)),
            )
            .await?;
            for player in &players {
                self.notifier
                    .send_player_left(PlayerView::from(player), actor)
                    .await;
            }
            info!(team_id = %team_id, players = players.len(), "Team unenrolled");
            return Ok(());
        }

        cancellable(
            cancel,
            self.store
                .update_players_where(PlayerQuery::by_team(team_id), PlayerPatch::session_reset()),
        )
        .await?;

        let captain = self.teams.resolve_captain(team_id, cancel).await?;
        info!(team_id = %team_id, "Team session reset");
        self.notifier
            .send_team_session_reset(PlayerView::from(captain), actor)
            .await;
        Ok(())
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
