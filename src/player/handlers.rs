use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::types::{EnlistRequest, EnrollRequest, InvitationResponse, PlayerView};
use crate::{
    auth::Actor,
    shared::{AppError, AppState},
};

/// HTTP handler for enrolling a user in a game
///
/// POST /api/players
/// Returns 201 with the new player
#[instrument(name = "enroll", skip(state, actor, request), fields(actor = %actor.user_id))]
pub async fn enroll(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<PlayerView>), AppError> {
    let player = state
        .player_service
        .enroll(&request.user_id, &request.game_id, &actor, &state.request_token())
        .await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// HTTP handler for withdrawing a player
///
/// DELETE /api/players/:id
pub async fn unenroll(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(player_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .player_service
        .unenroll(&player_id, &actor, &state.request_token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// HTTP handler for creating a team invitation
///
/// POST /api/players/:id/invitation
pub async fn generate_invitation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(player_id): Path<String>,
) -> Result<Json<InvitationResponse>, AppError> {
    let invitation = state
        .player_service
        .generate_invitation(&player_id, &actor, &state.request_token())
        .await?;
    Ok(Json(invitation))
}

/// HTTP handler for joining a team by invitation code
///
/// POST /api/players/:id/enlist
pub async fn enlist(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(player_id): Path<String>,
    Json(request): Json<EnlistRequest>,
) -> Result<Json<PlayerView>, AppError> {
    let player = state
        .player_service
        .enlist(&player_id, &request.code, &actor, &state.request_token())
        .await?;
    Ok(Json(player))
}

#[cfg(test)]
mod tests {
    use crate::{
        shared::test_utils::{game, user, TestContext},
        store::models::UserRole,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    #[tokio::test]
    async fn test_enroll_handler() {
        let ctx = TestContext::new().await;
        ctx.insert_game(game("game-1")).await;
        ctx.insert_user(user("alice")).await;

        let request = || {
            Request::builder()
                .method("POST")
                .uri("/api/players")
                .header("authorization", ctx.bearer("alice", UserRole::Member))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"user_id": "alice", "game_id": "game-1"}"#))
                .unwrap()
        };

        let created = ctx.router().oneshot(request()).await.unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let duplicate = ctx.router().oneshot(request()).await.unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let ctx = TestContext::new().await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/players/a")
            .body(Body::empty())
            .unwrap();

        let response = ctx.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
