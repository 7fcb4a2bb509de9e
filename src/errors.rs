use thiserror::Error;

use crate::store::StoreError;

/// Domain failures raised by the team, session, scoring and player services
#[derive(Debug, Error)]
pub enum GameboardError {
    #[error("{entity} {id} was not found")]
    ResourceNotFound { entity: &'static str, id: String },

    #[error("Can't award a negative point value ({score}) to challenge {challenge_id}")]
    CantAwardNegativePointValue { challenge_id: String, score: f64 },

    #[error("Can't award {score} to challenge {challenge_id}: it is worth {points} points")]
    CantAwardScoreAbovePoints {
        challenge_id: String,
        score: f64,
        points: f64,
    },

    #[error(
        "Can't rescore challenge {challenge_id} of team {team_id}: it holds bonus {awarded_bonus_id} worth {point_value} points"
    )]
    CantRescoreChallengeWithANonZeroBonus {
        challenge_id: String,
        team_id: String,
        awarded_bonus_id: String,
        point_value: f64,
    },

    #[error("Game {0} is not active")]
    GameNotActive(String),

    #[error("Game {0} requires a synchronized start")]
    SyncStartNotSupported(String),

    #[error("Team {team_id} has {size} players but game {game_id} requires {min} to {max}")]
    InvalidTeamSize {
        team_id: String,
        game_id: String,
        size: u64,
        min: i32,
        max: i32,
    },

    #[error("Team {team_id} can't start: game {game_id} already has {session_count} of {session_limit} sessions running")]
    SessionLimitReached {
        team_id: String,
        game_id: String,
        session_count: u64,
        session_limit: i32,
    },

    #[error("User {user_id} can't start a practice session: {session_count} of {max_sessions} practice sessions are running")]
    PracticeSessionLimitReached {
        user_id: String,
        session_count: u64,
        max_sessions: u32,
    },

    #[error("User {user_id} can't start practice in game {game_id}: gamespace limit reached on teams {team_ids:?}")]
    UserLevelPracticeGamespaceLimitReached {
        user_id: String,
        game_id: String,
        team_ids: Vec<String>,
    },

    #[error("Team {team_id} is full ({size} of {max_size} players)")]
    TeamIsFull {
        team_id: String,
        size: u64,
        max_size: i32,
    },

    #[error("Couldn't resolve a captain for team {0}")]
    CaptainResolutionFailure(String),

    #[error("Promoting player {player_id} on team {team_id} affected {affected} rows")]
    PromotionFailed {
        team_id: String,
        player_id: String,
        affected: u64,
    },

    #[error("Registration for game {0} is closed")]
    RegistrationIsClosed(String),

    #[error("User {user_id} is already registered for game {game_id}")]
    AlreadyRegistered { user_id: String, game_id: String },

    #[error("User {user_id} has no sponsor and can't enroll in game {game_id}")]
    NoPlayerSponsor { user_id: String, game_id: String },

    #[error("Player {0} isn't registered for this game")]
    NotYetRegistered(String),

    #[error("Invitation code {0} doesn't resolve to a team")]
    CantResolveTeamFromCode(String),

    #[error("Action forbidden: {0}")]
    ActionForbidden(String),

    #[error("User {user_id} can't access the score of team {team_id}")]
    CantAccessThisScore { user_id: String, team_id: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameboardError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        GameboardError::ResourceNotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            GameboardError::ResourceNotFound { .. } => "ResourceNotFound",
            GameboardError::CantAwardNegativePointValue { .. } => "CantAwardNegativePointValue",
            GameboardError::CantAwardScoreAbovePoints { .. } => "CantAwardScoreAbovePoints",
            GameboardError::CantRescoreChallengeWithANonZeroBonus { .. } => {
                "CantRescoreChallengeWithANonZeroBonus"
            }
            GameboardError::GameNotActive(_) => "GameNotActive",
            GameboardError::SyncStartNotSupported(_) => "SyncStartNotSupported",
            GameboardError::InvalidTeamSize { .. } => "InvalidTeamSize",
            GameboardError::SessionLimitReached { .. } => "SessionLimitReached",
            GameboardError::PracticeSessionLimitReached { .. } => "PracticeSessionLimitReached",
            GameboardError::UserLevelPracticeGamespaceLimitReached { .. } => {
                "UserLevelPracticeGamespaceLimitReached"
            }
            GameboardError::TeamIsFull { .. } => "TeamIsFull",
            GameboardError::CaptainResolutionFailure(_) => "CaptainResolutionFailure",
            GameboardError::PromotionFailed { .. } => "PromotionFailed",
            GameboardError::RegistrationIsClosed(_) => "RegistrationIsClosed",
            GameboardError::AlreadyRegistered { .. } => "AlreadyRegistered",
            GameboardError::NoPlayerSponsor { .. } => "NoPlayerSponsor",
            GameboardError::NotYetRegistered(_) => "NotYetRegistered",
            GameboardError::CantResolveTeamFromCode(_) => "CantResolveTeamFromCode",
            GameboardError::ActionForbidden(_) => "ActionForbidden",
            GameboardError::CantAccessThisScore { .. } => "CantAccessThisScore",
            GameboardError::Cancelled => "Cancelled",
            GameboardError::Store(_) => "StoreFailure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_limit_message_carries_counts() {
        let error = GameboardError::SessionLimitReached {
            team_id: "team".to_string(),
            game_id: "game".to_string(),
            session_count: 2,
            session_limit: 2,
        };
        assert_eq!(
            error.to_string(),
            "Team team can't start: game game already has 2 of 2 sessions running"
        );
        assert_eq!(error.code(), "SessionLimitReached");
    }

    #[test]
    fn test_store_errors_convert() {
        let error: GameboardError = StoreError::Conflict("dup".to_string()).into();
        assert!(matches!(error, GameboardError::Store(StoreError::Conflict(_))));
        assert_eq!(error.code(), "StoreFailure");
    }
}
