use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Spec id used for the placeholder challenge that carries a pre-existing score
/// into a newly started session.
pub const INITIAL_SCORE_SPEC_ID: &str = "_initialscore_";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum PlayerRole {
    Manager,
    #[default]
    Member,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum PlayerMode {
    #[default]
    Competition,
    Practice,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum ChallengeResult {
    #[default]
    None,
    Partial,
    Success,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum UserRole {
    #[default]
    Member,
    Tester,
    Support,
    Designer,
    Registrar,
    Admin,
}

/// Competition or training event definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub game_start: Option<DateTime<Utc>>,
    pub game_end: Option<DateTime<Utc>>,
    pub registration_open: Option<DateTime<Utc>>,
    pub registration_close: Option<DateTime<Utc>>,
    pub session_minutes: f64,
    /// Maximum number of concurrently running team sessions, 0 for no limit
    pub session_limit: i32,
    pub min_team_size: i32,
    pub max_team_size: i32,
    pub require_synchronized_start: bool,
    pub gamespace_limit_per_session: i32,
    pub player_mode: PlayerMode,
}

impl Game {
    /// The execution window is open: started and not yet ended
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.game_start.is_some_and(|start| start <= now)
            && self.game_end.map_or(true, |end| now < end)
    }

    pub fn registration_active(&self, now: DateTime<Utc>) -> bool {
        self.registration_open.is_some_and(|open| open <= now)
            && self.registration_close.map_or(true, |close| now < close)
    }

    pub fn require_team(&self) -> bool {
        self.min_team_size > 1
    }

    pub fn allow_team(&self) -> bool {
        self.max_team_size > 1
    }

    pub fn is_practice_mode(&self) -> bool {
        self.player_mode == PlayerMode::Practice
    }

    /// Practice sessions are limited to a single gamespace regardless of configuration
    pub fn gamespace_limit(&self) -> i32 {
        if self.is_practice_mode() {
            1
        } else {
            self.gamespace_limit_per_session
        }
    }

    pub fn session_length(&self) -> Duration {
        minutes(self.session_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub approved_name: String,
    pub sponsor_id: Option<String>,
    pub role: UserRole,
}

/// A user's enrollment in one game. Players sharing `team_id` form a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub game_id: String,
    pub user_id: String,
    pub team_id: String,
    pub name: String,
    pub approved_name: String,
    pub name_status: String,
    pub role: PlayerRole,
    pub mode: PlayerMode,
    pub session_begin: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
    pub session_minutes: f64,
    pub score: f64,
    /// Elapsed session time in milliseconds, used as the ranking tie-breaker
    pub time_ms: i64,
    pub rank: i32,
    pub correct_count: i32,
    pub partial_count: i32,
    pub sponsor_id: Option<String>,
    pub advanced: bool,
    pub invite_code: Option<String>,
    pub is_ready: bool,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn is_manager(&self) -> bool {
        self.role == PlayerRole::Manager
    }

    pub fn has_started_session(&self) -> bool {
        self.session_begin.is_some()
    }

    pub fn is_session_active(&self, now: DateTime<Utc>) -> bool {
        self.session_end.is_some_and(|end| now < end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub spec_id: String,
    pub name: String,
    pub game_id: String,
    pub team_id: String,
    pub player_id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_score_time: Option<DateTime<Utc>>,
    pub points: f64,
    pub score: f64,
    pub result: ChallengeResult,
    pub has_deployed_gamespace: bool,
    /// Serialized game engine state, opaque to this service
    pub state: String,
}

impl Challenge {
    pub fn is_fully_solved(&self) -> bool {
        self.result == ChallengeResult::Success
    }

    /// Time from the game's start to this challenge's completion
    pub fn elapsed_since(&self, game_start: Option<DateTime<Utc>>) -> Option<Duration> {
        match (self.end_time, game_start) {
            (Some(end), Some(start)) => Some(end - start),
            (Some(end), None) => Some(end - DateTime::<Utc>::default()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    pub id: String,
    pub game_id: String,
    pub name: String,
    pub points: f64,
    pub bonuses: Vec<ChallengeBonus>,
}

impl ChallengeSpec {
    /// Complete-solve-rank bonuses ordered by ascending solve rank
    pub fn solve_rank_bonuses(&self) -> Vec<&ChallengeBonus> {
        let mut bonuses: Vec<&ChallengeBonus> = self
            .bonuses
            .iter()
            .filter(|bonus| bonus.solve_rank().is_some())
            .collect();
        bonuses.sort_by_key(|bonus| bonus.solve_rank());
        bonuses
    }

    pub fn bonus(&self, bonus_id: &str) -> Option<&ChallengeBonus> {
        self.bonuses.iter().find(|bonus| bonus.id == bonus_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChallengeBonusKind {
    CompleteSolveRank { solve_rank: i32 },
}

impl ChallengeBonusKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChallengeBonusKind::CompleteSolveRank { .. } => "CompleteSolveRank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeBonus {
    pub id: String,
    pub spec_id: String,
    pub description: String,
    pub point_value: f64,
    pub kind: ChallengeBonusKind,
}

impl ChallengeBonus {
    pub fn solve_rank(&self) -> Option<i32> {
        match self.kind {
            ChallengeBonusKind::CompleteSolveRank { solve_rank } => Some(solve_rank),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardedChallengeBonus {
    pub id: String,
    pub challenge_id: String,
    pub challenge_bonus_id: String,
    pub entered_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualChallengeBonus {
    pub id: String,
    pub challenge_id: String,
    pub description: String,
    pub point_value: f64,
    pub entered_by_user_id: String,
    pub entered_on: DateTime<Utc>,
}

pub(crate) fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game() -> Game {
        Game {
            id: "game".to_string(),
            name: "Game".to_string(),
            game_start: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
            game_end: Some(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()),
            registration_open: None,
            registration_close: None,
            session_minutes: 60.0,
            session_limit: 0,
            min_team_size: 1,
            max_team_size: 1,
            require_synchronized_start: false,
            gamespace_limit_per_session: 3,
            player_mode: PlayerMode::Competition,
        }
    }

    #[test]
    fn test_game_is_live_only_inside_window() {
        let game = game();
        assert!(!game.is_live(Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap()));
        assert!(game.is_live(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()));
        assert!(!game.is_live(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_practice_games_allow_one_gamespace() {
        let mut game = game();
        assert_eq!(game.gamespace_limit(), 3);

        game.player_mode = PlayerMode::Practice;
        assert_eq!(game.gamespace_limit(), 1);
    }

    #[test]
    fn test_enums_round_trip_through_strings() {
        assert_eq!(PlayerRole::Manager.to_string(), "Manager");
        assert_eq!("Success".parse::<ChallengeResult>().unwrap(), ChallengeResult::Success);
        assert!("Captain".parse::<PlayerRole>().is_err());
    }

    #[test]
    fn test_solve_rank_bonuses_are_ordered() {
        let bonus = |id: &str, rank: i32| ChallengeBonus {
            id: id.to_string(),
            spec_id: "spec".to_string(),
            description: String::new(),
            point_value: 10.0,
            kind: ChallengeBonusKind::CompleteSolveRank { solve_rank: rank },
        };
        let spec = ChallengeSpec {
            id: "spec".to_string(),
            game_id: "game".to_string(),
            name: "Spec".to_string(),
            points: 100.0,
            bonuses: vec![bonus("third", 3), bonus("first", 1), bonus("second", 2)],
        };

        let ids: Vec<&str> = spec
            .solve_rank_bonuses()
            .iter()
            .map(|bonus| bonus.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
