use chrono::{DateTime, Utc};

use super::models::{Challenge, ChallengeResult, Player, PlayerMode, PlayerRole};

/// Filter over the players table. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerQuery {
    pub id: Option<String>,
    pub game_id: Option<String>,
    pub team_id: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<PlayerRole>,
    pub mode: Option<PlayerMode>,
    pub invite_code: Option<String>,
    /// Only players whose session ends strictly after this instant
    pub session_ends_after: Option<DateTime<Utc>>,
}

impl PlayerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().with_id(id)
    }

    pub fn by_team(team_id: impl Into<String>) -> Self {
        Self::new().with_team(team_id)
    }

    pub fn by_game(game_id: impl Into<String>) -> Self {
        Self::new().with_game(game_id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_role(mut self, role: PlayerRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_mode(mut self, mode: PlayerMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_invite_code(mut self, code: impl Into<String>) -> Self {
        self.invite_code = Some(code.into());
        self
    }

    pub fn with_session_ending_after(mut self, instant: DateTime<Utc>) -> Self {
        self.session_ends_after = Some(instant);
        self
    }

    pub fn matches(&self, player: &Player) -> bool {
        self.id.as_ref().map_or(true, |id| &player.id == id)
            && self.game_id.as_ref().map_or(true, |id| &player.game_id == id)
            && self.team_id.as_ref().map_or(true, |id| &player.team_id == id)
            && self.user_id.as_ref().map_or(true, |id| &player.user_id == id)
            && self.role.map_or(true, |role| player.role == role)
            && self.mode.map_or(true, |mode| player.mode == mode)
            && self
                .invite_code
                .as_ref()
                .map_or(true, |code| player.invite_code.as_ref() == Some(code))
            && self
                .session_ends_after
                .map_or(true, |instant| player.session_end.is_some_and(|end| end > instant))
    }
}

/// Filter over the live (non-archived) challenges table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeQuery {
    pub id: Option<String>,
    pub game_id: Option<String>,
    pub team_id: Option<String>,
    pub exclude_team_id: Option<String>,
    pub player_id: Option<String>,
    pub spec_id: Option<String>,
    pub result: Option<ChallengeResult>,
    pub has_deployed_gamespace: Option<bool>,
}

impl ChallengeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_team(team_id: impl Into<String>) -> Self {
        Self::new().with_team(team_id)
    }

    pub fn by_player(player_id: impl Into<String>) -> Self {
        Self {
            player_id: Some(player_id.into()),
            ..Self::default()
        }
    }

    pub fn with_game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn excluding_team(mut self, team_id: impl Into<String>) -> Self {
        self.exclude_team_id = Some(team_id.into());
        self
    }

    pub fn with_spec(mut self, spec_id: impl Into<String>) -> Self {
        self.spec_id = Some(spec_id.into());
        self
    }

    pub fn with_result(mut self, result: ChallengeResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_deployed_gamespace(mut self, deployed: bool) -> Self {
        self.has_deployed_gamespace = Some(deployed);
        self
    }

    pub fn matches(&self, challenge: &Challenge) -> bool {
        self.id.as_ref().map_or(true, |id| &challenge.id == id)
            && self.game_id.as_ref().map_or(true, |id| &challenge.game_id == id)
            && self.team_id.as_ref().map_or(true, |id| &challenge.team_id == id)
            && self
                .exclude_team_id
                .as_ref()
                .map_or(true, |id| &challenge.team_id != id)
            && self.player_id.as_ref().map_or(true, |id| &challenge.player_id == id)
            && self.spec_id.as_ref().map_or(true, |id| &challenge.spec_id == id)
            && self.result.map_or(true, |result| challenge.result == result)
            && self
                .has_deployed_gamespace
                .map_or(true, |deployed| challenge.has_deployed_gamespace == deployed)
    }
}

/// Partial column assignment applied directly by the store without loading rows.
/// `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPatch {
    pub role: Option<PlayerRole>,
    pub session_begin: Option<Option<DateTime<Utc>>>,
    pub session_end: Option<Option<DateTime<Utc>>>,
    pub session_minutes: Option<f64>,
    pub score: Option<f64>,
    pub rank: Option<i32>,
    pub correct_count: Option<i32>,
    pub partial_count: Option<i32>,
    pub is_ready: Option<bool>,
}

impl PlayerPatch {
    pub fn role(role: PlayerRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    /// Clears everything a started session accumulates
    pub fn session_reset() -> Self {
        Self {
            role: None,
            session_begin: Some(None),
            session_end: Some(None),
            session_minutes: Some(0.0),
            score: Some(0.0),
            rank: Some(0),
            correct_count: Some(0),
            partial_count: Some(0),
            is_ready: Some(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, player: &mut Player) {
        if let Some(role) = self.role {
            player.role = role;
        }
        if let Some(begin) = self.session_begin {
            player.session_begin = begin;
        }
        if let Some(end) = self.session_end {
            player.session_end = end;
        }
        if let Some(minutes) = self.session_minutes {
            player.session_minutes = minutes;
        }
        if let Some(score) = self.score {
            player.score = score;
        }
        if let Some(rank) = self.rank {
            player.rank = rank;
        }
        if let Some(correct) = self.correct_count {
            player.correct_count = correct;
        }
        if let Some(partial) = self.partial_count {
            player.partial_count = partial;
        }
        if let Some(ready) = self.is_ready {
            player.is_ready = ready;
        }
    }
}
