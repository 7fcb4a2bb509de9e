use chrono::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{
    ranking::{assign_ranks, ranking_order},
    types::{SessionForecast, Standing},
};
use crate::{
    errors::GameboardError,
    generators::Clock,
    shared::cancellable,
    store::{
        models::{Game, Player, PlayerMode, PlayerRole},
        PlayerQuery, Store,
    },
    team::TeamService,
};

/// Forecast rows cover this many minutes ahead of now
const FORECAST_HORIZON_MINUTES: i64 = 8 * 60;
const FORECAST_STEP_MINUTES: i64 = 30;

pub struct GameService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl GameService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Recomputes and stores the rank of every competition player of a game.
    /// Returns the players in their new order.
    #[instrument(skip(self, cancel))]
    pub async fn re_rank(
        &self,
        game_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Player>, GameboardError> {
        if cancellable(cancel, self.store.get_game(game_id)).await?.is_none() {
            return Err(GameboardError::not_found("game", game_id));
        }

        let players = cancellable(
            cancel,
            self.store
                .list_players(&PlayerQuery::by_game(game_id).with_mode(PlayerMode::Competition)),
        )
        .await?;

        let ranked = assign_ranks(players);
        cancellable(cancel, self.store.update_players(ranked.clone())).await?;

        info!(game_id = %game_id, players = ranked.len(), "Game re-ranked");
        Ok(ranked)
    }

    /// One row per competition team that has started a session, led by the
    /// team's captain, in leaderboard order.
    #[instrument(skip(self, cancel))]
    pub async fn standings(
        &self,
        game_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Standing>, GameboardError> {
        if cancellable(cancel, self.store.get_game(game_id)).await?.is_none() {
            return Err(GameboardError::not_found("game", game_id));
        }

        let players = cancellable(
            cancel,
            self.store
                .list_players(&PlayerQuery::by_game(game_id).with_mode(PlayerMode::Competition)),
        )
        .await?;

        let mut teams: BTreeMap<String, Vec<Player>> = BTreeMap::new();
        for player in players {
            teams.entry(player.team_id.clone()).or_default().push(player);
        }

        let mut captains = Vec::with_capacity(teams.len());
        for (team_id, roster) in &teams {
            let captain = TeamService::resolve_captain_from(team_id, roster)?;
            if captain.has_started_session() {
                captains.push(captain);
            }
        }

        captains.sort_by(|a, b| {
            ranking_order(a, b)
                .then_with(|| a.rank.cmp(&b.rank))
                .then_with(|| a.approved_name.cmp(&b.approved_name))
        });

        Ok(captains.iter().map(Standing::from).collect())
    }

    /// How much of the game's session limit is taken over the coming hours,
    /// in half-hour steps starting now.
    #[instrument(skip(self, cancel))]
    pub async fn session_forecast(
        &self,
        game_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SessionForecast>, GameboardError> {
        let game = self.game(game_id, cancel).await?;
        let now = self.clock.now();

        let running = cancellable(
            cancel,
            self.store.list_players(
                &PlayerQuery::by_game(game_id)
                    .with_role(PlayerRole::Manager)
                    .with_session_ending_after(now),
            ),
        )
        .await?;
        let expirations: Vec<_> = running.iter().filter_map(|p| p.session_end).collect();

        let forecast = (0..FORECAST_HORIZON_MINUTES)
            .step_by(FORECAST_STEP_MINUTES as usize)
            .map(|offset| {
                let time = now + Duration::minutes(offset);
                let reserved = expirations.iter().filter(|end| **end > time).count() as i64;
                SessionForecast {
                    time,
                    reserved,
                    available: i64::from(game.session_limit) - reserved,
                }
            })
            .collect();

        debug!(game_id = %game_id, running = expirations.len(), "Built session forecast");
        Ok(forecast)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{game, player, TestContext};

    fn competitor(id: &str, team: &str, score: f64, time_ms: i64, ctx: &TestContext) -> Player {
        let mut p = player(id, team, "game-1");
        p.score = score;
        p.time_ms = time_ms;
        p.session_begin = Some(ctx.now());
        p
    }

    #[tokio::test]
    async fn test_re_rank_persists_ranks() {
        let ctx = TestContext::new().await;
        ctx.insert_game(game("game-1")).await;
        ctx.insert_player(competitor("a1", "A", 50.0, 10, &ctx)).await;
        ctx.insert_player(competitor("a2", "A", 50.0, 20, &ctx)).await;
        ctx.insert_player(competitor("b1", "B", 30.0, 5, &ctx)).await;
        let mut practice = competitor("p1", "P", 99.0, 1, &ctx);
        practice.mode = PlayerMode::Practice;
        ctx.insert_player(practice).await;

        ctx.state
            .game_service
            .re_rank("game-1", &CancellationToken::new())
            .await
            .unwrap();

        let rank = |id: &'static str| {
            let store = ctx.state.store.clone();
            async move { store.get_player(id).await.unwrap().unwrap().rank }
        };
        assert_eq!(rank("a1").await, 1);
        assert_eq!(rank("a2").await, 1);
        assert_eq!(rank("b1").await, 2);
        assert_eq!(rank("p1").await, 0);
    }

    #[tokio::test]
    async fn test_standings_list_started_captains() {
        let ctx = TestContext::new().await;
        ctx.insert_game(game("game-1")).await;
        ctx.insert_player(competitor("a1", "A", 20.0, 10, &ctx)).await;
        ctx.insert_player(competitor("b1", "B", 30.0, 5, &ctx)).await;
        ctx.insert_player(player("c1", "C", "game-1")).await;

        let standings = ctx
            .state
            .game_service
            .standings("game-1", &CancellationToken::new())
            .await
            .unwrap();

        let teams: Vec<&str> = standings.iter().map(|s| s.team_id.as_str()).collect();
        assert_eq!(teams, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_session_forecast_releases_seats_as_sessions_expire() {
        let ctx = TestContext::new().await;
        let mut limited = game("game-1");
        limited.session_limit = 3;
        ctx.insert_game(limited).await;

        for (id, minutes) in [("a", 45), ("b", 100), ("c", 300)] {
            let mut captain = player(id, &format!("team-{}", id), "game-1");
            captain.role = PlayerRole::Manager;
            captain.session_begin = Some(ctx.now());
            captain.session_end = Some(ctx.now() + Duration::minutes(minutes));
            ctx.insert_player(captain).await;
        }
        // members and expired captains hold no seat
        let mut member = player("a2", "team-a", "game-1");
        member.session_end = Some(ctx.now() + Duration::minutes(45));
        ctx.insert_player(member).await;
        let mut expired = player("d", "team-d", "game-1");
        expired.role = PlayerRole::Manager;
        expired.session_end = Some(ctx.now() - Duration::minutes(5));
        ctx.insert_player(expired).await;

        let forecast = ctx
            .state
            .game_service
            .session_forecast("game-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(forecast.len(), 16);
        assert_eq!(forecast[0].time, ctx.now());
        assert_eq!(forecast[15].time, ctx.now() + Duration::minutes(450));

        let reserved: Vec<i64> = forecast.iter().map(|f| f.reserved).collect();
        assert_eq!(reserved, vec![3, 3, 2, 2, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(forecast[0].available, 0);
        assert_eq!(forecast[2].available, 1);
        assert_eq!(forecast[15].available, 3);
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        let ctx = TestContext::new().await;
        let result = ctx
            .state
            .game_service
            .re_rank("nope", &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(GameboardError::ResourceNotFound { entity: "game", .. })
        ));
    }
}
