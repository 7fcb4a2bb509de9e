use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::types::{AwardedBonusView, Score, TeamChallengeScore, TeamScore};
use crate::{
    auth::Actor,
    errors::GameboardError,
    generators::{Clock, IdGenerator},
    shared::cancellable,
    store::{
        models::{
            AwardedChallengeBonus, Challenge, ChallengeResult, ChallengeSpec,
            ManualChallengeBonus,
        },
        ChallengeQuery, PlayerQuery, Store, StoreCommand, StoreError, UnitOfWork,
    },
    team::TeamService,
};

/// Challenge scoring, solve-rank bonus awards and score aggregation
pub struct ScoringService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    teams: Arc<TeamService>,
}

impl ScoringService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        teams: Arc<TeamService>,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            teams,
        }
    }

    /// Sets a challenge's base score and, for a full solve, awards the next
    /// solve-rank bonus tier when the team's elapsed-time rank matches it.
    ///
    /// Every check runs before anything is written; the score and the bonus
    /// commit together.
    #[instrument(skip(self, cancel))]
    pub async fn update_team_challenge_base_score(
        &self,
        challenge_id: &str,
        score: f64,
        cancel: &CancellationToken,
    ) -> Result<TeamChallengeScore, GameboardError> {
        let challenge = self.challenge(challenge_id, cancel).await?;

        if score < 0.0 {
            return Err(GameboardError::CantAwardNegativePointValue {
                challenge_id: challenge.id,
                score,
            });
        }
        if score > challenge.points {
            return Err(GameboardError::CantAwardScoreAbovePoints {
                challenge_id: challenge.id,
                score,
                points: challenge.points,
            });
        }

        let spec = cancellable(cancel, self.store.get_spec(&challenge.spec_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("challenge spec", &challenge.spec_id))?;

        let held = cancellable(
            cancel,
            self.store.list_awarded_bonuses(std::slice::from_ref(&challenge.id)),
        )
        .await?;

        if challenge.score > 0.0 {
            let locking = held.iter().find_map(|award| {
                spec.bonus(&award.challenge_bonus_id)
                    .filter(|bonus| bonus.point_value > 0.0)
                    .map(|bonus| (award, bonus.point_value))
            });
            if let Some((award, point_value)) = locking {
                warn!(challenge_id = %challenge.id, awarded_bonus_id = %award.id, "Rescore blocked by awarded bonus");
                return Err(GameboardError::CantRescoreChallengeWithANonZeroBonus {
                    challenge_id: challenge.id.clone(),
                    team_id: challenge.team_id.clone(),
                    awarded_bonus_id: award.id.clone(),
                    point_value,
                });
            }
        }

        let now = self.clock.now();
        let mut unit = UnitOfWork::new().then_expecting(
            StoreCommand::SetChallengeScore {
                challenge_id: challenge.id.clone(),
                score,
                scored_at: now,
            },
            1,
        );

        if challenge.is_fully_solved() {
            if let Some(award) = self
                .next_solve_rank_award(&challenge, &spec, &held, cancel)
                .await?
            {
                info!(challenge_id = %challenge.id, bonus_id = %award.challenge_bonus_id, "Awarding solve-rank bonus");
                unit.push(StoreCommand::AwardBonus(award));
            }
        }

        cancellable(cancel, self.store.commit(unit)).await?;
        self.get_team_challenge_score(&challenge.id, cancel).await
    }

    /// The bonus this fully solved challenge earns, if any.
    ///
    /// The team's rank is one more than the number of other teams whose full
    /// solve of the spec took strictly less time since game start. Tiers other
    /// teams already hold are skipped; the first remaining tier is awarded only
    /// if its rank equals the team's rank.
    async fn next_solve_rank_award(
        &self,
        challenge: &Challenge,
        spec: &ChallengeSpec,
        held: &[AwardedChallengeBonus],
        cancel: &CancellationToken,
    ) -> Result<Option<AwardedChallengeBonus>, GameboardError> {
        let game_start = cancellable(cancel, self.store.get_game(&challenge.game_id))
            .await?
            .and_then(|game| game.game_start);

        let others = cancellable(
            cancel,
            self.store.list_challenges(
                &ChallengeQuery::new()
                    .with_spec(&spec.id)
                    .excluding_team(&challenge.team_id)
                    .with_result(ChallengeResult::Success),
            ),
        )
        .await?;

        let rank = match challenge.elapsed_since(game_start) {
            Some(elapsed) => {
                1 + others
                    .iter()
                    .filter(|other| {
                        other
                            .elapsed_since(game_start)
                            .is_some_and(|theirs| theirs < elapsed)
                    })
                    .count() as i32
            }
            None => 1 + others.len() as i32,
        };

        let other_ids: Vec<String> = others.iter().map(|c| c.id.clone()).collect();
        let claimed: HashSet<String> =
            cancellable(cancel, self.store.list_awarded_bonuses(&other_ids))
                .await?
                .into_iter()
                .map(|award| award.challenge_bonus_id)
                .collect();

        let next = spec
            .solve_rank_bonuses()
            .into_iter()
            .find(|bonus| !claimed.contains(&bonus.id));
        debug!(challenge_id = %challenge.id, rank, next_tier = ?next.and_then(|b| b.solve_rank()), "Computed solve rank");

        let Some(bonus) = next else {
            return Ok(None);
        };
        if bonus.solve_rank() != Some(rank)
            || held.iter().any(|award| award.challenge_bonus_id == bonus.id)
        {
            return Ok(None);
        }

        Ok(Some(AwardedChallengeBonus {
            id: self.ids.next_id(),
            challenge_id: challenge.id.clone(),
            challenge_bonus_id: bonus.id.clone(),
            entered_on: self.clock.now(),
        }))
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_team_challenge_score(
        &self,
        challenge_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TeamChallengeScore, GameboardError> {
        let challenge = self.challenge(challenge_id, cancel).await?;
        let mut scores = self.score_challenges(vec![challenge], cancel).await?;
        scores
            .pop()
            .ok_or_else(|| GameboardError::not_found("challenge", challenge_id))
    }

    /// Sum of every challenge score of the team. Reads only, so repeated calls
    /// agree until something is written.
    #[instrument(skip(self, cancel))]
    pub async fn get_team_score(
        &self,
        team_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TeamScore, GameboardError> {
        if !self.teams.exists(team_id, cancel).await? {
            return Err(GameboardError::not_found("team", team_id));
        }

        let game_id = cancellable(cancel, self.store.list_players(&PlayerQuery::by_team(team_id)))
            .await?
            .into_iter()
            .next()
            .map(|player| player.game_id);
        let challenges = cancellable(
            cancel,
            self.store.list_challenges(&ChallengeQuery::by_team(team_id)),
        )
        .await?;

        let challenges = self.score_challenges(challenges, cancel).await?;
        let score = challenges
            .iter()
            .fold(Score::default(), |total, challenge| total.add(challenge.score));

        Ok(TeamScore {
            team_id: team_id.to_string(),
            game_id,
            score,
            challenges,
        })
    }

    /// Team score for a specific caller. Elevated users see any team; everyone
    /// else only their own.
    pub async fn get_team_score_for(
        &self,
        team_id: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<TeamScore, GameboardError> {
        if !actor.is_elevated() && !self.teams.is_on_team(team_id, &actor.user_id, cancel).await? {
            return Err(GameboardError::CantAccessThisScore {
                user_id: actor.user_id.clone(),
                team_id: team_id.to_string(),
            });
        }
        self.get_team_score(team_id, cancel).await
    }

    #[instrument(skip(self, description, actor, cancel), fields(actor = %actor.user_id))]
    pub async fn award_manual_bonus(
        &self,
        challenge_id: &str,
        point_value: f64,
        description: &str,
        actor: &Actor,
        cancel: &CancellationToken,
    ) -> Result<ManualChallengeBonus, GameboardError> {
        let challenge = self.challenge(challenge_id, cancel).await?;
        if point_value < 0.0 {
            return Err(GameboardError::CantAwardNegativePointValue {
                challenge_id: challenge.id,
                score: point_value,
            });
        }

        let bonus = ManualChallengeBonus {
            id: self.ids.next_id(),
            challenge_id: challenge.id,
            description: description.to_string(),
            point_value,
            entered_by_user_id: actor.user_id.clone(),
            entered_on: self.clock.now(),
        };
        cancellable(cancel, self.store.create_manual_bonus(bonus.clone())).await?;

        info!(challenge_id = %challenge_id, bonus_id = %bonus.id, point_value, "Manual bonus awarded");
        Ok(bonus)
    }

    pub async fn list_manual_bonuses(
        &self,
        challenge_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ManualChallengeBonus>, GameboardError> {
        let challenge = self.challenge(challenge_id, cancel).await?;
        cancellable(
            cancel,
            self.store.list_manual_bonuses(std::slice::from_ref(&challenge.id)),
        )
        .await
    }

    pub async fn delete_manual_bonus(
        &self,
        bonus_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GameboardError> {
        match cancellable(cancel, self.store.delete_manual_bonus(bonus_id)).await {
            Err(GameboardError::Store(StoreError::RowCountMismatch { actual: 0, .. })) => {
                Err(GameboardError::not_found("manual bonus", bonus_id))
            }
            other => other,
        }
    }

    async fn challenge(
        &self,
        challenge_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Challenge, GameboardError> {
        cancellable(cancel, self.store.get_challenge(challenge_id))
            .await?
            .ok_or_else(|| GameboardError::not_found("challenge", challenge_id))
    }

    /// Builds the score of each challenge with batched bonus lookups
    async fn score_challenges(
        &self,
        challenges: Vec<Challenge>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TeamChallengeScore>, GameboardError> {
        if challenges.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = challenges.iter().map(|c| c.id.clone()).collect();
        let awarded = cancellable(cancel, self.store.list_awarded_bonuses(&ids)).await?;
        let manual = cancellable(cancel, self.store.list_manual_bonuses(&ids)).await?;

        let spec_ids: Vec<&str> = challenges
            .iter()
            .map(|c| c.spec_id.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let specs: HashMap<String, ChallengeSpec> = try_join_all(
            spec_ids
                .iter()
                .map(|spec_id| cancellable(cancel, self.store.get_spec(spec_id))),
        )
        .await?
        .into_iter()
        .flatten()
        .map(|spec| (spec.id.clone(), spec))
        .collect();

        Ok(challenges
            .into_iter()
            .map(|challenge| {
                let spec = specs.get(&challenge.spec_id);
                let awarded_bonuses: Vec<AwardedBonusView> = awarded
                    .iter()
                    .filter(|award| award.challenge_id == challenge.id)
                    .map(|award| {
                        let bonus = spec.and_then(|s| s.bonus(&award.challenge_bonus_id));
                        AwardedBonusView {
                            id: award.id.clone(),
                            challenge_bonus_id: award.challenge_bonus_id.clone(),
                            description: bonus.map(|b| b.description.clone()).unwrap_or_default(),
                            point_value: bonus.map_or(0.0, |b| b.point_value),
                            solve_rank: bonus.and_then(|b| b.solve_rank()),
                            entered_on: award.entered_on,
                        }
                    })
                    .collect();
                let manual_bonuses: Vec<ManualChallengeBonus> = manual
                    .iter()
                    .filter(|bonus| bonus.challenge_id == challenge.id)
                    .cloned()
                    .collect();

                let score = Score::new(
                    challenge.score,
                    awarded_bonuses.iter().map(|b| b.point_value).sum(),
                    manual_bonuses.iter().map(|b| b.point_value).sum(),
                );

                TeamChallengeScore {
                    challenge_id: challenge.id,
                    challenge_name: challenge.name,
                    spec_id: challenge.spec_id,
                    team_id: challenge.team_id,
                    result: challenge.result,
                    score,
                    awarded_bonuses,
                    manual_bonuses,
                }
            })
            .collect())
    }
}
