use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgConnection, PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use super::{
    models::{
        AwardedChallengeBonus, Challenge, ChallengeBonus, ChallengeBonusKind, ChallengeSpec, Game,
        ManualChallengeBonus, Player, User,
    },
    query::{ChallengeQuery, PlayerPatch, PlayerQuery},
    repository::Store,
    unit_of_work::{StoreCommand, UnitOfWork},
    StoreError,
};

const PLAYER_COLUMNS: &str = "id, game_id, user_id, team_id, name, approved_name, name_status, \
     role, mode, session_begin, session_end, session_minutes, score, time_ms, rank, \
     correct_count, partial_count, sponsor_id, advanced, invite_code, is_ready, created_at";

const CHALLENGE_COLUMNS: &str = "id, spec_id, name, game_id, team_id, player_id, start_time, \
     end_time, last_score_time, points, score, result, has_deployed_gamespace, state";

/// PostgreSQL implementation of [`Store`]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Database schema is up to date");
        Ok(Self::new(pool))
    }
}

fn parse_enum<T: FromStr>(entity: &'static str, value: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| StoreError::Decode {
        entity,
        message: format!("{}: {}", value, e),
    })
}

fn game_from_row(row: &PgRow) -> Result<Game, StoreError> {
    Ok(Game {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        game_start: row.try_get("game_start")?,
        game_end: row.try_get("game_end")?,
        registration_open: row.try_get("registration_open")?,
        registration_close: row.try_get("registration_close")?,
        session_minutes: row.try_get("session_minutes")?,
        session_limit: row.try_get("session_limit")?,
        min_team_size: row.try_get("min_team_size")?,
        max_team_size: row.try_get("max_team_size")?,
        require_synchronized_start: row.try_get("require_synchronized_start")?,
        gamespace_limit_per_session: row.try_get("gamespace_limit_per_session")?,
        player_mode: parse_enum("game", row.try_get::<&str, _>("player_mode")?)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        approved_name: row.try_get("approved_name")?,
        sponsor_id: row.try_get("sponsor_id")?,
        role: parse_enum("user", row.try_get::<&str, _>("role")?)?,
    })
}

fn player_from_row(row: &PgRow) -> Result<Player, StoreError> {
    Ok(Player {
        id: row.try_get("id")?,
        game_id: row.try_get("game_id")?,
        user_id: row.try_get("user_id")?,
        team_id: row.try_get("team_id")?,
        name: row.try_get("name")?,
        approved_name: row.try_get("approved_name")?,
        name_status: row.try_get("name_status")?,
        role: parse_enum("player", row.try_get::<&str, _>("role")?)?,
        mode: parse_enum("player", row.try_get::<&str, _>("mode")?)?,
        session_begin: row.try_get("session_begin")?,
        session_end: row.try_get("session_end")?,
        session_minutes: row.try_get("session_minutes")?,
        score: row.try_get("score")?,
        time_ms: row.try_get("time_ms")?,
        rank: row.try_get("rank")?,
        correct_count: row.try_get("correct_count")?,
        partial_count: row.try_get("partial_count")?,
        sponsor_id: row.try_get("sponsor_id")?,
        advanced: row.try_get("advanced")?,
        invite_code: row.try_get("invite_code")?,
        is_ready: row.try_get("is_ready")?,
        created_at: row.try_get("created_at")?,
    })
}

fn challenge_from_row(row: &PgRow) -> Result<Challenge, StoreError> {
    Ok(Challenge {
        id: row.try_get("id")?,
        spec_id: row.try_get("spec_id")?,
        name: row.try_get("name")?,
        game_id: row.try_get("game_id")?,
        team_id: row.try_get("team_id")?,
        player_id: row.try_get("player_id")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        last_score_time: row.try_get("last_score_time")?,
        points: row.try_get("points")?,
        score: row.try_get("score")?,
        result: parse_enum("challenge", row.try_get::<&str, _>("result")?)?,
        has_deployed_gamespace: row.try_get("has_deployed_gamespace")?,
        state: row.try_get("state")?,
    })
}

fn bonus_from_row(row: &PgRow) -> Result<ChallengeBonus, StoreError> {
    let kind: String = row.try_get("kind")?;
    let solve_rank: Option<i32> = row.try_get("solve_rank")?;
    let kind = match (kind.as_str(), solve_rank) {
        ("CompleteSolveRank", Some(solve_rank)) => {
            ChallengeBonusKind::CompleteSolveRank { solve_rank }
        }
        (other, _) => {
            return Err(StoreError::Decode {
                entity: "challenge bonus",
                message: format!("unsupported bonus kind {}", other),
            })
        }
    };

    Ok(ChallengeBonus {
        id: row.try_get("id")?,
        spec_id: row.try_get("spec_id")?,
        description: row.try_get("description")?,
        point_value: row.try_get("point_value")?,
        kind,
    })
}

fn awarded_bonus_from_row(row: &PgRow) -> Result<AwardedChallengeBonus, StoreError> {
    Ok(AwardedChallengeBonus {
        id: row.try_get("id")?,
        challenge_id: row.try_get("challenge_id")?,
        challenge_bonus_id: row.try_get("challenge_bonus_id")?,
        entered_on: row.try_get("entered_on")?,
    })
}

fn manual_bonus_from_row(row: &PgRow) -> Result<ManualChallengeBonus, StoreError> {
    Ok(ManualChallengeBonus {
        id: row.try_get("id")?,
        challenge_id: row.try_get("challenge_id")?,
        description: row.try_get("description")?,
        point_value: row.try_get("point_value")?,
        entered_by_user_id: row.try_get("entered_by_user_id")?,
        entered_on: row.try_get("entered_on")?,
    })
}

/// Appends `AND column = value` for every set field. Expects a preceding `WHERE TRUE`.
fn push_player_filter(builder: &mut QueryBuilder<'_, Postgres>, query: &PlayerQuery) {
    if let Some(id) = &query.id {
        builder.push(" AND id = ").push_bind(id.clone());
    }
    if let Some(game_id) = &query.game_id {
        builder.push(" AND game_id = ").push_bind(game_id.clone());
    }
    if let Some(team_id) = &query.team_id {
        builder.push(" AND team_id = ").push_bind(team_id.clone());
    }
    if let Some(user_id) = &query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role.to_string());
    }
    if let Some(mode) = query.mode {
        builder.push(" AND mode = ").push_bind(mode.to_string());
    }
    if let Some(code) = &query.invite_code {
        builder.push(" AND invite_code = ").push_bind(code.clone());
    }
    if let Some(instant) = query.session_ends_after {
        builder.push(" AND session_end > ").push_bind(instant);
    }
}

fn push_challenge_filter(builder: &mut QueryBuilder<'_, Postgres>, query: &ChallengeQuery) {
    if let Some(id) = &query.id {
        builder.push(" AND id = ").push_bind(id.clone());
    }
    if let Some(game_id) = &query.game_id {
        builder.push(" AND game_id = ").push_bind(game_id.clone());
    }
    if let Some(team_id) = &query.team_id {
        builder.push(" AND team_id = ").push_bind(team_id.clone());
    }
    if let Some(team_id) = &query.exclude_team_id {
        builder.push(" AND team_id <> ").push_bind(team_id.clone());
    }
    if let Some(player_id) = &query.player_id {
        builder.push(" AND player_id = ").push_bind(player_id.clone());
    }
    if let Some(spec_id) = &query.spec_id {
        builder.push(" AND spec_id = ").push_bind(spec_id.clone());
    }
    if let Some(result) = query.result {
        builder.push(" AND result = ").push_bind(result.to_string());
    }
    if let Some(deployed) = query.has_deployed_gamespace {
        builder.push(" AND has_deployed_gamespace = ").push_bind(deployed);
    }
}

fn player_patch_update<'a>(query: &PlayerQuery, patch: &PlayerPatch) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE players SET ");
    let mut assignments = builder.separated(", ");
    if let Some(role) = patch.role {
        assignments.push("role = ").push_bind_unseparated(role.to_string());
    }
    if let Some(begin) = patch.session_begin {
        assignments.push("session_begin = ").push_bind_unseparated(begin);
    }
    if let Some(end) = patch.session_end {
        assignments.push("session_end = ").push_bind_unseparated(end);
    }
    if let Some(minutes) = patch.session_minutes {
        assignments.push("session_minutes = ").push_bind_unseparated(minutes);
    }
    if let Some(score) = patch.score {
        assignments.push("score = ").push_bind_unseparated(score);
    }
    if let Some(rank) = patch.rank {
        assignments.push("rank = ").push_bind_unseparated(rank);
    }
    if let Some(correct) = patch.correct_count {
        assignments.push("correct_count = ").push_bind_unseparated(correct);
    }
    if let Some(partial) = patch.partial_count {
        assignments.push("partial_count = ").push_bind_unseparated(partial);
    }
    if let Some(ready) = patch.is_ready {
        assignments.push("is_ready = ").push_bind_unseparated(ready);
    }
    builder.push(" WHERE TRUE");
    push_player_filter(&mut builder, query);
    builder
}

async fn insert_player(conn: &mut PgConnection, player: &Player) -> Result<u64, StoreError> {
    let result = sqlx::query(&format!(
        "INSERT INTO players ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
         $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
        PLAYER_COLUMNS
    ))
    .bind(&player.id)
    .bind(&player.game_id)
    .bind(&player.user_id)
    .bind(&player.team_id)
    .bind(&player.name)
    .bind(&player.approved_name)
    .bind(&player.name_status)
    .bind(player.role.to_string())
    .bind(player.mode.to_string())
    .bind(player.session_begin)
    .bind(player.session_end)
    .bind(player.session_minutes)
    .bind(player.score)
    .bind(player.time_ms)
    .bind(player.rank)
    .bind(player.correct_count)
    .bind(player.partial_count)
    .bind(&player.sponsor_id)
    .bind(player.advanced)
    .bind(&player.invite_code)
    .bind(player.is_ready)
    .bind(player.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

async fn update_player(conn: &mut PgConnection, player: &Player) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE players SET game_id = $2, user_id = $3, team_id = $4, name = $5, \
         approved_name = $6, name_status = $7, role = $8, mode = $9, session_begin = $10, \
         session_end = $11, session_minutes = $12, score = $13, time_ms = $14, rank = $15, \
         correct_count = $16, partial_count = $17, sponsor_id = $18, advanced = $19, \
         invite_code = $20, is_ready = $21 WHERE id = $1",
    )
    .bind(&player.id)
    .bind(&player.game_id)
    .bind(&player.user_id)
    .bind(&player.team_id)
    .bind(&player.name)
    .bind(&player.approved_name)
    .bind(&player.name_status)
    .bind(player.role.to_string())
    .bind(player.mode.to_string())
    .bind(player.session_begin)
    .bind(player.session_end)
    .bind(player.session_minutes)
    .bind(player.score)
    .bind(player.time_ms)
    .bind(player.rank)
    .bind(player.correct_count)
    .bind(player.partial_count)
    .bind(&player.sponsor_id)
    .bind(player.advanced)
    .bind(&player.invite_code)
    .bind(player.is_ready)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

async fn write_challenge(
    conn: &mut PgConnection,
    challenge: &Challenge,
    insert: bool,
) -> Result<u64, StoreError> {
    let sql = if insert {
        format!(
            "INSERT INTO challenges ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, \
             $12, $13, $14)",
            CHALLENGE_COLUMNS
        )
    } else {
        "UPDATE challenges SET spec_id = $2, name = $3, game_id = $4, team_id = $5, \
         player_id = $6, start_time = $7, end_time = $8, last_score_time = $9, points = $10, \
         score = $11, result = $12, has_deployed_gamespace = $13, state = $14 WHERE id = $1"
            .to_string()
    };

    let result = sqlx::query(&sql)
        .bind(&challenge.id)
        .bind(&challenge.spec_id)
        .bind(&challenge.name)
        .bind(&challenge.game_id)
        .bind(&challenge.team_id)
        .bind(&challenge.player_id)
        .bind(challenge.start_time)
        .bind(challenge.end_time)
        .bind(challenge.last_score_time)
        .bind(challenge.points)
        .bind(challenge.score)
        .bind(challenge.result.to_string())
        .bind(challenge.has_deployed_gamespace)
        .bind(&challenge.state)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn apply(conn: &mut PgConnection, command: &StoreCommand) -> Result<u64, StoreError> {
    let affected = match command {
        StoreCommand::CreateGame(game) => sqlx::query(
            "INSERT INTO games (id, name, game_start, game_end, registration_open, \
             registration_close, session_minutes, session_limit, min_team_size, max_team_size, \
             require_synchronized_start, gamespace_limit_per_session, player_mode) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&game.id)
        .bind(&game.name)
        .bind(game.game_start)
        .bind(game.game_end)
        .bind(game.registration_open)
        .bind(game.registration_close)
        .bind(game.session_minutes)
        .bind(game.session_limit)
        .bind(game.min_team_size)
        .bind(game.max_team_size)
        .bind(game.require_synchronized_start)
        .bind(game.gamespace_limit_per_session)
        .bind(game.player_mode.to_string())
        .execute(&mut *conn)
        .await?
        .rows_affected(),
        StoreCommand::CreateUser(user) => sqlx::query(
            "INSERT INTO users (id, approved_name, sponsor_id, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(&user.id)
        .bind(&user.approved_name)
        .bind(&user.sponsor_id)
        .bind(user.role.to_string())
        .execute(&mut *conn)
        .await?
        .rows_affected(),
        StoreCommand::CreateSpec(spec) => {
            let inserted = sqlx::query(
                "INSERT INTO challenge_specs (id, game_id, name, points) VALUES ($1, $2, $3, $4)",
            )
            .bind(&spec.id)
            .bind(&spec.game_id)
            .bind(&spec.name)
            .bind(spec.points)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            for bonus in &spec.bonuses {
                sqlx::query(
                    "INSERT INTO challenge_bonuses (id, spec_id, description, point_value, kind, \
                     solve_rank) VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(&bonus.id)
                .bind(&spec.id)
                .bind(&bonus.description)
                .bind(bonus.point_value)
                .bind(bonus.kind.name())
                .bind(bonus.solve_rank())
                .execute(&mut *conn)
                .await?;
            }
            inserted
        }
        StoreCommand::CreatePlayer(player) => insert_player(conn, player).await?,
        StoreCommand::UpdatePlayer(player) => update_player(conn, player).await?,
        StoreCommand::UpdatePlayersWhere { query, patch } => {
            if patch.is_empty() {
                return Ok(0);
            }
            player_patch_update(query, patch)
                .build()
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }
        StoreCommand::DeletePlayersWhere(query) => {
            let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM players WHERE TRUE");
            push_player_filter(&mut builder, query);
            builder.build().execute(&mut *conn).await?.rows_affected()
        }
        StoreCommand::CreateChallenge(challenge) => write_challenge(conn, challenge, true).await?,
        StoreCommand::UpdateChallenge(challenge) => write_challenge(conn, challenge, false).await?,
        StoreCommand::SetChallengeScore {
            challenge_id,
            score,
            scored_at,
        } => sqlx::query("UPDATE challenges SET score = $2, last_score_time = $3 WHERE id = $1")
            .bind(challenge_id)
            .bind(score)
            .bind(scored_at)
            .execute(&mut *conn)
            .await?
            .rows_affected(),
        StoreCommand::ArchiveChallenges(query) => {
            let mut builder = QueryBuilder::<Postgres>::new(
                "WITH moved AS (DELETE FROM challenges WHERE TRUE",
            );
            push_challenge_filter(&mut builder, query);
            builder.push(format!(
                " RETURNING {cols}) INSERT INTO archived_challenges ({cols}) SELECT {cols} FROM moved",
                cols = CHALLENGE_COLUMNS
            ));
            builder.build().execute(&mut *conn).await?.rows_affected()
        }
        StoreCommand::AwardBonus(award) => sqlx::query(
            "INSERT INTO awarded_challenge_bonuses (id, challenge_id, challenge_bonus_id, \
             entered_on) VALUES ($1, $2, $3, $4)",
        )
        .bind(&award.id)
        .bind(&award.challenge_id)
        .bind(&award.challenge_bonus_id)
        .bind(award.entered_on)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
        StoreCommand::CreateManualBonus(bonus) => sqlx::query(
            "INSERT INTO manual_challenge_bonuses (id, challenge_id, description, point_value, \
             entered_by_user_id, entered_on) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&bonus.id)
        .bind(&bonus.challenge_id)
        .bind(&bonus.description)
        .bind(bonus.point_value)
        .bind(&bonus.entered_by_user_id)
        .bind(bonus.entered_on)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
        StoreCommand::DeleteManualBonus(id) => {
            sqlx::query("DELETE FROM manual_challenge_bonuses WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }
    };
    Ok(affected)
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self))]
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, StoreError> {
        let row = sqlx::query("SELECT * FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(game_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn get_spec(&self, spec_id: &str) -> Result<Option<ChallengeSpec>, StoreError> {
        let Some(row) = sqlx::query("SELECT * FROM challenge_specs WHERE id = $1")
            .bind(spec_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let bonuses = sqlx::query(
            "SELECT * FROM challenge_bonuses WHERE spec_id = $1 ORDER BY solve_rank, id",
        )
        .bind(spec_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(bonus_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ChallengeSpec {
            id: row.try_get("id")?,
            game_id: row.try_get("game_id")?,
            name: row.try_get("name")?,
            points: row.try_get("points")?,
            bonuses,
        }))
    }

    #[instrument(skip(self))]
    async fn get_player(&self, player_id: &str) -> Result<Option<Player>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM players WHERE id = $1", PLAYER_COLUMNS))
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(player_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_players(&self, query: &PlayerQuery) -> Result<Vec<Player>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM players WHERE TRUE",
            PLAYER_COLUMNS
        ));
        push_player_filter(&mut builder, query);
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(player_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn count_players(&self, query: &PlayerQuery) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM players WHERE TRUE");
        push_player_filter(&mut builder, query);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM challenges WHERE id = $1",
            CHALLENGE_COLUMNS
        ))
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(challenge_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_challenges(&self, query: &ChallengeQuery) -> Result<Vec<Challenge>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM challenges WHERE TRUE",
            CHALLENGE_COLUMNS
        ));
        push_challenge_filter(&mut builder, query);
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(challenge_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn count_challenges(&self, query: &ChallengeQuery) -> Result<u64, StoreError> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM challenges WHERE TRUE");
        push_challenge_filter(&mut builder, query);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn list_archived_challenges(
        &self,
        query: &ChallengeQuery,
    ) -> Result<Vec<Challenge>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM archived_challenges WHERE TRUE",
            CHALLENGE_COLUMNS
        ));
        push_challenge_filter(&mut builder, query);
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(challenge_from_row).collect()
    }

    #[instrument(skip(self, challenge_ids), fields(challenges = challenge_ids.len()))]
    async fn list_awarded_bonuses(
        &self,
        challenge_ids: &[String],
    ) -> Result<Vec<AwardedChallengeBonus>, StoreError> {
        if challenge_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT * FROM awarded_challenge_bonuses WHERE challenge_id = ANY($1) ORDER BY id",
        )
        .bind(challenge_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(awarded_bonus_from_row).collect()
    }

    #[instrument(skip(self, challenge_ids), fields(challenges = challenge_ids.len()))]
    async fn list_manual_bonuses(
        &self,
        challenge_ids: &[String],
    ) -> Result<Vec<ManualChallengeBonus>, StoreError> {
        if challenge_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT * FROM manual_challenge_bonuses WHERE challenge_id = ANY($1) ORDER BY id",
        )
        .bind(challenge_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(manual_bonus_from_row).collect()
    }

    #[instrument(skip(self, unit), fields(steps = unit.len()))]
    async fn commit(&self, unit: UnitOfWork) -> Result<Vec<u64>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut affected = Vec::with_capacity(unit.len());
        for step in unit.steps() {
            let result = match apply(&mut *tx, &step.command).await {
                Ok(rows) => step.verify(rows).map(|_| rows),
                Err(e) => Err(e),
            };
            match result {
                Ok(rows) => affected.push(rows),
                Err(e) => {
                    warn!(error = %e, operation = %step.command.describe(), "Rolling back transaction");
                    tx.rollback().await?;
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        debug!(affected = ?affected, "Transaction committed");
        Ok(affected)
    }
}
