use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::types::TeamView;
use crate::{
    auth::Actor,
    player::types::PlayerView,
    shared::{AppError, AppState},
};

/// HTTP handler for reading a team
///
/// GET /api/teams/:id
pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<TeamView>, AppError> {
    let team = state
        .team_service
        .get_team(&team_id, &state.request_token())
        .await?;
    Ok(Json(team))
}

/// HTTP handler for handing the captaincy to another player
///
/// PUT /api/teams/:id/captain/:player_id
/// Allowed for elevated users and the current captain. Returns the new captain
#[instrument(name = "promote_captain", skip(state, actor), fields(actor = %actor.user_id))]
pub async fn promote_captain(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((team_id, player_id)): Path<(String, String)>,
) -> Result<Json<PlayerView>, AppError> {
    let cancel = state.request_token();

    if !actor.is_elevated() {
        let captain = state.team_service.resolve_captain(&team_id, &cancel).await?;
        if captain.user_id != actor.user_id {
            return Err(AppError::Forbidden(
                "Only the captain can hand over the captaincy".to_string(),
            ));
        }
    }

    let captain = state
        .team_service
        .promote_captain(&team_id, &player_id, &actor, &cancel)
        .await?;

    info!(team_id = %team_id, player_id = %player_id, "Captaincy handed over");
    Ok(Json(captain))
}
