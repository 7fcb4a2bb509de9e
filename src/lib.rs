// Library crate for the Gameboard team, session and scoring service
// This file exposes the public API for integration tests

pub mod auth;
pub mod config;
pub mod errors;
pub mod event;
pub mod game;
pub mod generators;
pub mod player;
pub mod scoring;
pub mod session;
pub mod shared;
pub mod store;
pub mod team;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use auth::{Actor, TokenConfig};
pub use config::AppConfig;
pub use errors::GameboardError;
pub use event::{EventBus, TeamEvent, TeamNotifier};
pub use shared::{AppError, AppState, AppStateBuilder};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError};

/// Builds the HTTP router. Everything under `/api` requires a bearer token.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/players", post(player::enroll))
        .route("/players/:id", delete(player::unenroll))
        .route("/players/:id/session", put(session::start_session))
        .route("/players/:id/invitation", post(player::generate_invitation))
        .route("/players/:id/enlist", post(player::enlist))
        .route("/teams/:id", get(team::get_team))
        .route("/teams/:id/captain/:player_id", put(team::promote_captain))
        .route("/teams/:id/session", delete(session::reset_team_session))
        .route("/teams/:id/score", get(scoring::get_team_score))
        .route(
            "/challenges/:id/score",
            get(scoring::get_challenge_score).put(scoring::update_challenge_score),
        )
        .route(
            "/challenges/:id/bonuses",
            get(scoring::list_manual_bonuses).post(scoring::award_manual_bonus),
        )
        .route("/bonuses/:id", delete(scoring::delete_manual_bonus))
        .route("/games/:id/rerank", post(game::re_rank))
        .route("/games/:id/standings", get(game::standings))
        .route("/games/:id/forecast", get(game::session_forecast))
        .layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
