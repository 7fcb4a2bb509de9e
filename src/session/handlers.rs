use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use crate::{
    auth::Actor,
    errors::GameboardError,
    player::types::{PlayerView, StartSessionRequest},
    shared::{AppError, AppState},
    store::Store,
    team::types::ResetSessionQuery,
};

/// HTTP handler for starting a team session
///
/// PUT /api/players/:id/session
/// Starts the session of the player's whole team and returns the captain
#[instrument(name = "start_session", skip(state, actor, request), fields(actor = %actor.user_id))]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(player_id): Path<String>,
    request: Option<Json<StartSessionRequest>>,
) -> Result<Json<PlayerView>, AppError> {
    let cancel = state.request_token();
    let sudo = request.map(|Json(r)| r.sudo).unwrap_or_default();

    if !actor.is_elevated() {
        if sudo {
            return Err(AppError::Forbidden(
                "Only elevated users can force a session start".to_string(),
            ));
        }
        let player = state
            .store
            .get_player(&player_id)
            .await
            .map_err(GameboardError::from)?
            .ok_or_else(|| GameboardError::not_found("player", &player_id))?;
        if player.user_id != actor.user_id
            && !state
                .team_service
                .is_on_team(&player.team_id, &actor.user_id, &cancel)
                .await?
        {
            return Err(AppError::Forbidden("Not a member of this team".to_string()));
        }
    }

    let captain = state
        .session_service
        .start_session(&player_id, &actor, sudo, &cancel)
        .await?;

    info!(team_id = %captain.team_id, "Session started");
    Ok(Json(captain))
}

/// HTTP handler for resetting a team's session
///
/// DELETE /api/teams/:id/session?unenroll=true
#[instrument(name = "reset_team_session", skip(state, actor), fields(actor = %actor.user_id))]
pub async fn reset_team_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(team_id): Path<String>,
    Query(query): Query<ResetSessionQuery>,
) -> Result<StatusCode, AppError> {
    if !actor.is_elevated() {
        return Err(AppError::Forbidden("Only elevated users can reset sessions".to_string()));
    }

    state
        .session_service
        .reset_team_session(&team_id, query.unenroll, &actor, &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
