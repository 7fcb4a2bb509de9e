use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::instrument;

use super::types::{ReRankResponse, SessionForecast, Standing};
use crate::{
    auth::Actor,
    shared::{AppError, AppState},
};

/// HTTP handler for re-ranking a game
///
/// POST /api/games/:id/rerank
#[instrument(name = "re_rank", skip(state, actor), fields(actor = %actor.user_id))]
pub async fn re_rank(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(game_id): Path<String>,
) -> Result<Json<ReRankResponse>, AppError> {
    if !actor.is_elevated() {
        return Err(AppError::Forbidden("Only elevated users can re-rank games".to_string()));
    }

    let ranked = state
        .game_service
        .re_rank(&game_id, &state.request_token())
        .await?;

    Ok(Json(ReRankResponse {
        game_id,
        players_ranked: ranked.len(),
    }))
}

/// HTTP handler for the game leaderboard
///
/// GET /api/games/:id/standings
pub async fn standings(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<Vec<Standing>>, AppError> {
    let standings = state
        .game_service
        .standings(&game_id, &state.request_token())
        .await?;
    Ok(Json(standings))
}

/// HTTP handler for the session availability forecast
///
/// GET /api/games/:id/forecast
pub async fn session_forecast(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<Vec<SessionForecast>>, AppError> {
    let forecast = state
        .game_service
        .session_forecast(&game_id, &state.request_token())
        .await?;
    Ok(Json(forecast))
}
