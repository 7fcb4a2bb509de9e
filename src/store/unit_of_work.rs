use super::{
    models::{
        AwardedChallengeBonus, Challenge, ChallengeSpec, Game, ManualChallengeBonus, Player, User,
    },
    query::{ChallengeQuery, PlayerPatch, PlayerQuery},
};

/// A single write the store can apply
#[derive(Debug, Clone)]
pub enum StoreCommand {
    CreateGame(Game),
    CreateUser(User),
    CreateSpec(ChallengeSpec),
    CreatePlayer(Player),
    /// Full-row replacement keyed by id
    UpdatePlayer(Player),
    UpdatePlayersWhere {
        query: PlayerQuery,
        patch: PlayerPatch,
    },
    DeletePlayersWhere(PlayerQuery),
    CreateChallenge(Challenge),
    UpdateChallenge(Challenge),
    SetChallengeScore {
        challenge_id: String,
        score: f64,
        scored_at: chrono::DateTime<chrono::Utc>,
    },
    /// Moves matching challenges into the archive
    ArchiveChallenges(ChallengeQuery),
    AwardBonus(AwardedChallengeBonus),
    CreateManualBonus(ManualChallengeBonus),
    DeleteManualBonus(String),
}

impl StoreCommand {
    /// Short name used in logs and row-count errors
    pub fn describe(&self) -> String {
        match self {
            StoreCommand::CreateGame(game) => format!("create game {}", game.id),
            StoreCommand::CreateUser(user) => format!("create user {}", user.id),
            StoreCommand::CreateSpec(spec) => format!("create spec {}", spec.id),
            StoreCommand::CreatePlayer(player) => format!("create player {}", player.id),
            StoreCommand::UpdatePlayer(player) => format!("update player {}", player.id),
            StoreCommand::UpdatePlayersWhere { query, .. } => {
                format!("update players where {:?}", query)
            }
            StoreCommand::DeletePlayersWhere(query) => format!("delete players where {:?}", query),
            StoreCommand::CreateChallenge(challenge) => {
                format!("create challenge {}", challenge.id)
            }
            StoreCommand::UpdateChallenge(challenge) => {
                format!("update challenge {}", challenge.id)
            }
            StoreCommand::SetChallengeScore { challenge_id, .. } => {
                format!("set score of challenge {}", challenge_id)
            }
            StoreCommand::ArchiveChallenges(query) => {
                format!("archive challenges where {:?}", query)
            }
            StoreCommand::AwardBonus(award) => format!(
                "award bonus {} to challenge {}",
                award.challenge_bonus_id, award.challenge_id
            ),
            StoreCommand::CreateManualBonus(bonus) => format!("create manual bonus {}", bonus.id),
            StoreCommand::DeleteManualBonus(id) => format!("delete manual bonus {}", id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub command: StoreCommand,
    pub expected_rows: Option<u64>,
}

impl Step {
    /// Fails the step when the affected row count differs from the expectation
    pub fn verify(&self, actual: u64) -> Result<(), super::StoreError> {
        match self.expected_rows {
            Some(expected) if expected != actual => Err(super::StoreError::RowCountMismatch {
                operation: self.command.describe(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }
}

/// Ordered set of commands committed in one transaction.
///
/// Steps carrying an expected row count are verified as they run; the first
/// mismatch rolls back every step of the unit.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    steps: Vec<Step>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, command: StoreCommand) -> Self {
        self.steps.push(Step {
            command,
            expected_rows: None,
        });
        self
    }

    pub fn then_expecting(mut self, command: StoreCommand, rows: u64) -> Self {
        self.steps.push(Step {
            command,
            expected_rows: Some(rows),
        });
        self
    }

    pub fn push(&mut self, command: StoreCommand) {
        self.steps.push(Step {
            command,
            expected_rows: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}
