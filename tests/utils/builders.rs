use chrono::{DateTime, Duration, TimeZone, Utc};

use gameboard::store::models::{
    Challenge, ChallengeBonus, ChallengeBonusKind, ChallengeResult, ChallengeSpec, Game, Player,
    PlayerMode, PlayerRole,
};

// ============================================================================
// Fixed Time
// ============================================================================

/// The frozen "now" every setup starts from
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// The game start of every built game
pub fn game_start() -> DateTime<Utc> {
    now() - Duration::hours(6)
}

// ============================================================================
// Game Builder
// ============================================================================

pub struct GameBuilder {
    game: Game,
}

impl GameBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            game: Game {
                id: id.to_string(),
                name: format!("Game {}", id),
                game_start: Some(game_start()),
                game_end: Some(now() + Duration::days(1)),
                registration_open: Some(now() - Duration::days(7)),
                registration_close: Some(now() + Duration::days(1)),
                session_minutes: 60.0,
                session_limit: 0,
                min_team_size: 1,
                max_team_size: 4,
                require_synchronized_start: false,
                gamespace_limit_per_session: 3,
                player_mode: PlayerMode::Competition,
            },
        }
    }

    pub fn with_session_limit(mut self, limit: i32) -> Self {
        self.game.session_limit = limit;
        self
    }

    pub fn with_team_size(mut self, min: i32, max: i32) -> Self {
        self.game.min_team_size = min;
        self.game.max_team_size = max;
        self
    }

    pub fn practice(mut self) -> Self {
        self.game.player_mode = PlayerMode::Practice;
        self
    }

    pub fn build(self) -> Game {
        self.game
    }
}

// ============================================================================
// Player Builder
// ============================================================================

pub struct PlayerBuilder {
    player: Player,
}

impl PlayerBuilder {
    pub fn new(id: &str, team_id: &str, game_id: &str) -> Self {
        Self {
            player: Player {
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
                created_at: now() - Duration::days(1),
            },
        }
    }

    pub fn manager(mut self) -> Self {
        self.player.role = PlayerRole::Manager;
        self
    }

    pub fn with_score(mut self, score: f64, time_ms: i64) -> Self {
        self.player.score = score;
        self.player.time_ms = time_ms;
        self
    }

    /// Session that began at `now` and runs for an hour
    pub fn in_session(mut self) -> Self {
        self.player.session_begin = Some(now());
        self.player.session_end = Some(now() + Duration::hours(1));
        self.player.session_minutes = 60.0;
        self
    }

    pub fn build(self) -> Player {
        self.player
    }
}

// ============================================================================
// Challenge and Spec Builders
// ============================================================================

pub struct ChallengeBuilder {
    challenge: Challenge,
}

impl ChallengeBuilder {
    pub fn new(id: &str, team_id: &str, game_id: &str, spec_id: &str) -> Self {
        Self {
            challenge: Challenge {
                id: id.to_string(),
                spec_id: spec_id.to_string(),
                name: format!("Challenge {}", id),
                game_id: game_id.to_string(),
                team_id: team_id.to_string(),
                player_id: String::new(),
                start_time: Some(game_start()),
                end_time: None,
                last_score_time: None,
                points: 100.0,
                score: 0.0,
                result: ChallengeResult::None,
                has_deployed_gamespace: true,
                state: String::new(),
            },
        }
    }

    /// Fully solved `minutes` after game start
    pub fn solved_after(mut self, minutes: i64) -> Self {
        self.challenge.result = ChallengeResult::Success;
        self.challenge.end_time = Some(game_start() + Duration::minutes(minutes));
        self
    }

    pub fn partial(mut self) -> Self {
        self.challenge.result = ChallengeResult::Partial;
        self.challenge.end_time = Some(now());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.challenge.score = score;
        self
    }

    pub fn build(self) -> Challenge {
        self.challenge
    }
}

/// Spec with one solve-rank bonus per `(rank, points)` pair
pub fn spec(id: &str, game_id: &str, ranks: &[(i32, f64)]) -> ChallengeSpec {
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
