use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::{future::Future, sync::Arc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    auth::TokenConfig,
    config::AppConfig,
    errors::GameboardError,
    event::{EventBus, TeamNotifier},
    game::GameService,
    generators::{
        Clock, IdGenerator, InviteCodeGenerator, RandomInviteCodeGenerator, SystemClock,
        UuidIdGenerator,
    },
    player::PlayerService,
    scoring::ScoringService,
    session::SessionService,
    store::{InMemoryStore, Store},
    team::TeamService,
};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub event_bus: EventBus,
    pub clock: Arc<dyn Clock>,
    pub token_config: TokenConfig,
    pub config: AppConfig,
    /// Cancelled on shutdown; every request works on a child of it
    pub shutdown: CancellationToken,
    pub team_service: Arc<TeamService>,
    pub session_service: Arc<SessionService>,
    pub scoring_service: Arc<ScoringService>,
    pub game_service: Arc<GameService>,
    pub player_service: Arc<PlayerService>,
}

impl AppState {
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

/// Builder for wiring AppState, with overrides for tests
pub struct AppStateBuilder {
    store: Option<Arc<dyn Store>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    codes: Option<Arc<dyn InviteCodeGenerator>>,
    token_config: Option<TokenConfig>,
    config: AppConfig,
    shutdown: CancellationToken,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
            ids: None,
            codes: None,
            token_config: None,
            config: AppConfig::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_invite_codes(mut self, codes: Arc<dyn InviteCodeGenerator>) -> Self {
        self.codes = Some(codes);
        self
    }

    pub fn with_token_config(mut self, token_config: TokenConfig) -> Self {
        self.token_config = Some(token_config);
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn build(self) -> AppState {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self.ids.unwrap_or_else(|| Arc::new(UuidIdGenerator));
        let codes = self
            .codes
            .unwrap_or_else(|| Arc::new(RandomInviteCodeGenerator::default()));

        let event_bus = EventBus::new(self.config.event_capacity);
        let notifier: Arc<dyn TeamNotifier> = Arc::new(event_bus.clone());

        let team_service = Arc::new(TeamService::new(store.clone(), notifier.clone()));
        let session_service = Arc::new(SessionService::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            ids.clone(),
            team_service.clone(),
            self.config.practice.clone(),
        ));
        let scoring_service = Arc::new(ScoringService::new(
            store.clone(),
            clock.clone(),
            ids,
            team_service.clone(),
        ));
        let game_service = Arc::new(GameService::new(store.clone(), clock.clone()));
        let player_service = Arc::new(PlayerService::new(
            store.clone(),
            notifier,
            clock.clone(),
            codes,
            session_service.clone(),
        ));

        AppState {
            store,
            event_bus,
            clock,
            token_config: self.token_config.unwrap_or_else(TokenConfig::new),
            config: self.config,
            shutdown: self.shutdown,
            team_service,
            session_service,
            scoring_service,
            game_service,
            player_service,
        }
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Races a store call against cancellation
pub async fn cancellable<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, GameboardError>
where
    F: Future<Output = Result<T, E>>,
    GameboardError: From<E>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GameboardError::Cancelled),
        result = fut => result.map_err(GameboardError::from),
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Domain(#[from] GameboardError),
}

fn domain_status(error: &GameboardError) -> StatusCode {
    match error {
        GameboardError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
        GameboardError::CantAwardNegativePointValue { .. }
        | GameboardError::CantAwardScoreAbovePoints { .. }
        | GameboardError::CantRescoreChallengeWithANonZeroBonus { .. }
        | GameboardError::GameNotActive(_)
        | GameboardError::SyncStartNotSupported(_)
        | GameboardError::InvalidTeamSize { .. }
        | GameboardError::RegistrationIsClosed(_)
        | GameboardError::NoPlayerSponsor { .. }
        | GameboardError::NotYetRegistered(_)
        | GameboardError::CantResolveTeamFromCode(_) => StatusCode::BAD_REQUEST,
        GameboardError::AlreadyRegistered { .. }
        | GameboardError::TeamIsFull { .. }
        | GameboardError::SessionLimitReached { .. }
        | GameboardError::PracticeSessionLimitReached { .. }
        | GameboardError::UserLevelPracticeGamespaceLimitReached { .. } => StatusCode::CONFLICT,
        GameboardError::ActionForbidden(_) | GameboardError::CantAccessThisScore { .. } => {
            StatusCode::FORBIDDEN
        }
        GameboardError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        GameboardError::CaptainResolutionFailure(_)
        | GameboardError::PromotionFailed { .. }
        | GameboardError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, "JwtError", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", msg),
            AppError::Domain(GameboardError::Store(e)) => {
                error!(error = %e, "Store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "StoreFailure",
                    "Internal server error".to_string(),
                )
            }
            AppError::Domain(e) => (domain_status(&e), e.code(), e.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::{
        auth::Actor,
        generators::{ManualClock, SequentialIdGenerator},
        store::models::{
            Challenge, ChallengeBonus, ChallengeBonusKind, ChallengeResult, ChallengeSpec, Game,
            Player, PlayerMode, PlayerRole, User, UserRole,
        },
    };
    use axum::Router;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Competition member of `team_id`, owned by `user-{id}`
    pub fn player(id: &str, team_id: &str, game_id: &str) -> Player {
        Player {
            id: id.to_string(),
            game_id: game_id.to_string(),
            user_id: format!("user-{}", id),
            team_id: team_id.to_string(),
            name: id.to_string(),
            approved_name: id.to_string(),
            name_status: String::new(),
            role: PlayerRole::Member,
            mode: PlayerMode::Competition,
            session_begin: None,
            session_end: None,
            session_minutes: 0.0,
            score: 0.0,
            time_ms: 0,
            rank: 0,
            correct_count: 0,
            partial_count: 0,
            sponsor_id: Some("sponsor".to_string()),
            advanced: false,
            invite_code: None,
            is_ready: false,
            created_at: fixed_now() - Duration::days(2),
        }
    }

    /// Single-player competition game that is live and open for registration
    pub fn game(id: &str) -> Game {
        let now = fixed_now();
        Game {
            id: id.to_string(),
            name: format!("Game {}", id),
            game_start: Some(now - Duration::days(1)),
            game_end: Some(now + Duration::days(1)),
            registration_open: Some(now - Duration::days(7)),
            registration_close: Some(now + Duration::days(1)),
            session_minutes: 60.0,
            session_limit: 0,
            min_team_size: 1,
            max_team_size: 1,
            require_synchronized_start: false,
            gamespace_limit_per_session: 3,
            player_mode: PlayerMode::Competition,
        }
    }

    pub fn challenge(id: &str, team_id: &str, game_id: &str, spec_id: &str) -> Challenge {
        Challenge {
            id: id.to_string(),
            spec_id: spec_id.to_string(),
            name: format!("Challenge {}", id),
            game_id: game_id.to_string(),
            team_id: team_id.to_string(),
            player_id: String::new(),
            start_time: Some(fixed_now() - Duration::hours(1)),
            end_time: None,
            last_score_time: None,
            points: 100.0,
            score: 0.0,
            result: ChallengeResult::None,
            has_deployed_gamespace: false,
            state: String::new(),
        }
    }

    pub fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            approved_name: id.to_string(),
            sponsor_id: Some("sponsor".to_string()),
            role: UserRole::Member,
        }
    }

    /// Spec with one solve-rank bonus per `(rank, points)` pair
    pub fn spec_with_ranks(id: &str, game_id: &str, ranks: &[(i32, f64)]) -> ChallengeSpec {
        ChallengeSpec {
            id: id.to_string(),
            game_id: game_id.to_string(),
            name: format!("Spec {}", id),
            points: 100.0,
            bonuses: ranks
                .iter()
                .map(|&(rank, point_value)| ChallengeBonus {
                    id: format!("{}-rank-{}", id, rank),
                    spec_id: id.to_string(),
                    description: format!("Solve rank {}", rank),
                    point_value,
                    kind: ChallengeBonusKind::CompleteSolveRank { solve_rank: rank },
                })
                .collect(),
        }
    }

    /// In-memory state on a frozen clock
    pub struct TestContext {
        pub state: AppState,
        pub clock: Arc<ManualClock>,
    }

    impl TestContext {
        pub async fn new() -> Self {
            Self::with_config(AppConfig::default()).await
        }

        pub async fn with_config(config: AppConfig) -> Self {
            let clock = Arc::new(ManualClock::new(fixed_now()));
            let state = AppStateBuilder::new()
                .with_clock(clock.clone())
                .with_ids(Arc::new(SequentialIdGenerator::new("id")))
                .with_token_config(TokenConfig::with_secret("test-secret", 1))
                .with_config(config)
                .build();
            Self { state, clock }
        }

        pub fn now(&self) -> DateTime<Utc> {
            self.clock.now()
        }

        pub fn actor(&self, user_id: &str, role: UserRole) -> Actor {
            Actor::new(user_id, user_id, role)
        }

        pub fn bearer(&self, user_id: &str, role: UserRole) -> String {
            let token = self
                .state
                .token_config
                .create_token(&self.actor(user_id, role))
                .unwrap();
            format!("Bearer {}", token)
        }

        pub fn router(&self) -> Router {
            crate::router(self.state.clone())
        }

        pub async fn insert_game(&self, game: Game) {
            self.state.store.create_game(game).await.unwrap();
        }

        pub async fn insert_user(&self, user: User) {
            self.state.store.create_user(user).await.unwrap();
        }

        pub async fn insert_spec(&self, spec: ChallengeSpec) {
            self.state.store.create_spec(spec).await.unwrap();
        }

        pub async fn insert_player(&self, player: Player) {
            self.state.store.create_player(player).await.unwrap();
        }

        pub async fn insert_challenge(&self, challenge: Challenge) {
            self.state.store.create_challenge(challenge).await.unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cancellable(&cancel, async { Ok::<_, StoreError>(1) }).await;
        assert!(matches!(result, Err(GameboardError::Cancelled)));

        let live = CancellationToken::new();
        let result = cancellable(&live, async { Ok::<_, StoreError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (GameboardError::not_found("team", "t"), StatusCode::NOT_FOUND),
            (GameboardError::GameNotActive("g".to_string()), StatusCode::BAD_REQUEST),
            (
                GameboardError::CantAwardScoreAbovePoints {
                    challenge_id: "c".to_string(),
                    score: 150.0,
                    points: 100.0,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                GameboardError::TeamIsFull {
                    team_id: "t".to_string(),
                    size: 4,
                    max_size: 4,
                },
                StatusCode::CONFLICT,
            ),
            (GameboardError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).into_response().status(), status);
        }
    }
}
