use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use super::types::{ManualBonusRequest, TeamChallengeScore, TeamScore, UpdateScoreRequest};
use crate::{
    auth::Actor,
    shared::{AppError, AppState},
    store::models::ManualChallengeBonus,
};

fn require_elevated(actor: &Actor, action: &str) -> Result<(), AppError> {
    if actor.is_elevated() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Only elevated users can {}", action)))
    }
}

/// HTTP handler for reading one challenge's score
///
/// GET /api/challenges/:id/score
#[instrument(name = "get_challenge_score", skip(state, actor), fields(actor = %actor.user_id))]
pub async fn get_challenge_score(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(challenge_id): Path<String>,
) -> Result<Json<TeamChallengeScore>, AppError> {
    let cancel = state.request_token();
    let score = state
        .scoring_service
        .get_team_challenge_score(&challenge_id, &cancel)
        .await?;

    if !actor.is_elevated()
        && !state
            .team_service
            .is_on_team(&score.team_id, &actor.user_id, &cancel)
            .await?
    {
        return Err(AppError::Forbidden("Not a member of this team".to_string()));
    }

    Ok(Json(score))
}

/// HTTP handler for setting a challenge's base score
///
/// PUT /api/challenges/:id/score
/// Returns the recomputed challenge score, including any solve-rank bonus
#[instrument(name = "update_challenge_score", skip(state, actor, request), fields(actor = %actor.user_id))]
pub async fn update_challenge_score(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(challenge_id): Path<String>,
    Json(request): Json<UpdateScoreRequest>,
) -> Result<Json<TeamChallengeScore>, AppError> {
    require_elevated(&actor, "score challenges")?;

    let score = state
        .scoring_service
        .update_team_challenge_base_score(&challenge_id, request.score, &state.request_token())
        .await?;

    info!(challenge_id = %challenge_id, total = score.score.total_score, "Challenge scored");
    Ok(Json(score))
}

/// HTTP handler for listing manual bonuses of a challenge
///
/// GET /api/challenges/:id/bonuses
pub async fn list_manual_bonuses(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(challenge_id): Path<String>,
) -> Result<Json<Vec<ManualChallengeBonus>>, AppError> {
    require_elevated(&actor, "list manual bonuses")?;

    let bonuses = state
        .scoring_service
        .list_manual_bonuses(&challenge_id, &state.request_token())
        .await?;
    Ok(Json(bonuses))
}

/// HTTP handler for awarding a manual bonus
///
/// POST /api/challenges/:id/bonuses
/// Returns 201 with the created bonus
#[instrument(name = "award_manual_bonus", skip(state, actor, request), fields(actor = %actor.user_id))]
pub async fn award_manual_bonus(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(challenge_id): Path<String>,
    Json(request): Json<ManualBonusRequest>,
) -> Result<(StatusCode, Json<ManualChallengeBonus>), AppError> {
    require_elevated(&actor, "award manual bonuses")?;

    let bonus = state
        .scoring_service
        .award_manual_bonus(
            &challenge_id,
            request.point_value,
            &request.description,
            &actor,
            &state.request_token(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(bonus)))
}

/// HTTP handler for deleting a manual bonus
///
/// DELETE /api/bonuses/:id
pub async fn delete_manual_bonus(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bonus_id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_elevated(&actor, "delete manual bonuses")?;

    state
        .scoring_service
        .delete_manual_bonus(&bonus_id, &state.request_token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// HTTP handler for a team's total score
///
/// GET /api/teams/:id/score
pub async fn get_team_score(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(team_id): Path<String>,
) -> Result<Json<TeamScore>, AppError> {
    let score = state
        .scoring_service
        .get_team_score_for(&team_id, &actor, &state.request_token())
        .await?;
    Ok(Json(score))
}

#[cfg(test)]
mod tests {
    use crate::{
        shared::test_utils::{challenge, game, player, TestContext},
        store::models::UserRole,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    async fn seeded() -> TestContext {
        let ctx = TestContext::new().await;
        ctx.insert_game(game("game-1")).await;
        ctx.insert_player(player("a", "team-1", "game-1")).await;
        let mut c = challenge("c1", "team-1", "game-1", "spec-1");
        c.score = 40.0;
        ctx.insert_challenge(c).await;
        ctx
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_negative_score_is_bad_request() {
        let ctx = seeded().await;
        ctx.insert_spec(crate::shared::test_utils::spec_with_ranks("spec-1", "game-1", &[]))
            .await;

        let request = Request::builder()
            .method("PUT")
            .uri("/api/challenges/c1/score")
            .header("authorization", ctx.bearer("admin", UserRole::Admin))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"score": -1}"#))
            .unwrap();

        let response = ctx.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await["code"],
            "CantAwardNegativePointValue"
        );
    }

    #[tokio::test]
    async fn test_members_cannot_score() {
        let ctx = seeded().await;

        let request = Request::builder()
            .method("PUT")
            .uri("/api/challenges/c1/score")
            .header("authorization", ctx.bearer("user-a", UserRole::Member))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"score": 10}"#))
            .unwrap();

        let response = ctx.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_manual_bonus_then_team_score() {
        let ctx = seeded().await;

        let award = Request::builder()
            .method("POST")
            .uri("/api/challenges/c1/bonuses")
            .header("authorization", ctx.bearer("admin", UserRole::Admin))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"description": "Nice", "point_value": 10}"#))
            .unwrap();
        let response = ctx.router().oneshot(award).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let score = Request::builder()
            .uri("/api/teams/team-1/score")
            .header("authorization", ctx.bearer("user-a", UserRole::Member))
            .body(Body::empty())
            .unwrap();
        let response = ctx.router().oneshot(score).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["score"]["total_score"], 50.0);
    }

    #[tokio::test]
    async fn test_other_team_score_is_forbidden() {
        let ctx = seeded().await;

        let request = Request::builder()
            .uri("/api/teams/team-1/score")
            .header("authorization", ctx.bearer("stranger", UserRole::Member))
            .body(Body::empty())
            .unwrap();
        let response = ctx.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
