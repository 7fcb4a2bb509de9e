use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::models::{ChallengeResult, ManualChallengeBonus};

/// Point breakdown shared by challenge and team scores
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Score {
    pub completion_score: f64,
    pub bonus_score: f64,
    pub manual_bonus_score: f64,
    pub total_score: f64,
}

impl Score {
    pub fn new(completion_score: f64, bonus_score: f64, manual_bonus_score: f64) -> Self {
        Self {
            completion_score,
            bonus_score,
            manual_bonus_score,
            total_score: completion_score + bonus_score + manual_bonus_score,
        }
    }

    pub fn add(self, other: Score) -> Score {
        Score::new(
            self.completion_score + other.completion_score,
            self.bonus_score + other.bonus_score,
            self.manual_bonus_score + other.manual_bonus_score,
        )
    }
}

/// An automatically awarded bonus with the tier it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwardedBonusView {
    pub id: String,
    pub challenge_bonus_id: String,
    pub description: String,
    pub point_value: f64,
    pub solve_rank: Option<i32>,
    pub entered_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamChallengeScore {
    pub challenge_id: String,
    pub challenge_name: String,
    pub spec_id: String,
    pub team_id: String,
    pub result: ChallengeResult,
    pub score: Score,
    pub awarded_bonuses: Vec<AwardedBonusView>,
    pub manual_bonuses: Vec<ManualChallengeBonus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamScore {
    pub team_id: String,
    pub game_id: Option<String>,
    pub score: Score,
    pub challenges: Vec<TeamChallengeScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateScoreRequest {
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualBonusRequest {
    pub description: String,
    pub point_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_totals_every_source() {
        let score = Score::new(40.0, 15.0, 10.0);
        assert_eq!(score.total_score, 65.0);

        let sum = score.add(Score::new(5.0, 0.0, -2.0));
        assert_eq!(sum, Score::new(45.0, 15.0, 8.0));
        assert_eq!(sum.total_score, 68.0);
    }
}
