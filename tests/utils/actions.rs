use tokio_util::sync::CancellationToken;

use gameboard::{
    errors::GameboardError,
    player::PlayerView,
    scoring::types::{TeamChallengeScore, TeamScore},
    store::models::Challenge,
    Store,
};

use super::setup::TestSetup;

// ============================================================================
// Test Actions
// ============================================================================

impl TestSetup {
    pub async fn add_challenge(&self, challenge: Challenge) {
        self.store.create_challenge(challenge).await.unwrap();
    }

    pub async fn score(
        &self,
        challenge_id: &str,
        score: f64,
    ) -> Result<TeamChallengeScore, GameboardError> {
        self.state
            .scoring_service
            .update_team_challenge_base_score(challenge_id, score, &CancellationToken::new())
            .await
    }

    pub async fn team_score(&self, team_id: &str) -> TeamScore {
        self.state
            .scoring_service
            .get_team_score(team_id, &CancellationToken::new())
            .await
            .unwrap()
    }

    pub async fn award_manual_bonus(&self, challenge_id: &str, points: f64) {
        self.state
            .scoring_service
            .award_manual_bonus(
                challenge_id,
                points,
                "Judged bonus",
                &self.admin(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    pub async fn start_session(&self, player_id: &str) -> Result<PlayerView, GameboardError> {
        self.state
            .session_service
            .start_session(player_id, &self.admin(), false, &CancellationToken::new())
            .await
    }

    pub async fn challenge(&self, challenge_id: &str) -> Challenge {
        self.store
            .get_challenge(challenge_id)
            .await
            .unwrap()
            .unwrap()
    }
}
