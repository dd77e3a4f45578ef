//! Repository trait definitions for the bracket stores.
//!
//! The bracket core only talks to these traits. PostgreSQL implementations
//! live here; an in-memory implementation lives in [`super::memory`].

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

use crate::bracket::{
    Block, BlockFilter, BlockId, BlockUpdate, Bracket, BracketId, BracketResult, BracketUpdate,
    NewBlock, NewBracket, ParticipantId,
};
use crate::tournament::{
    NewTournament, Tournament, TournamentConfig, TournamentFilter, TournamentId,
    TournamentResult, TournamentUpdate,
};

/// Storage for individual match slots
#[async_trait]
pub trait BlockRepository: Send + Sync {
    /// Create a block with default occupant, score, state and result
    async fn create_block(&self, block: &NewBlock) -> BracketResult<BlockId>;

    /// Find block by ID
    async fn get_block(&self, block_id: BlockId) -> BracketResult<Option<Block>>;

    /// Find blocks matching a filter
    async fn find_blocks(&self, filter: &BlockFilter) -> BracketResult<Vec<Block>>;

    /// Merge an update into a block; `false` if no block matched
    async fn update_block(&self, block_id: BlockId, update: &BlockUpdate) -> BracketResult<bool>;

    /// Delete a block; `false` if no block matched
    async fn delete_block(&self, block_id: BlockId) -> BracketResult<bool>;
}

/// Storage for bracket aggregates
#[async_trait]
pub trait BracketRepository: Send + Sync {
    async fn create_bracket(&self, bracket: &NewBracket) -> BracketResult<BracketId>;

    async fn get_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>>;

    /// Merge an update into a bracket; `false` if the write was not acknowledged
    async fn update_bracket(
        &self,
        bracket_id: BracketId,
        update: &BracketUpdate,
    ) -> BracketResult<bool>;

    async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<bool>;
}

/// Lookup into the external account system
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Display name of a participant, `None` if unknown
    async fn display_name(&self, participant: ParticipantId) -> BracketResult<Option<String>>;
}

/// Storage for tournaments
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    async fn create_tournament(&self, tournament: &NewTournament)
    -> TournamentResult<TournamentId>;

    async fn get_tournament(&self, tournament_id: TournamentId)
    -> TournamentResult<Option<Tournament>>;

    /// Tournaments matching a filter, oldest first
    async fn list_tournaments(&self, filter: TournamentFilter) -> TournamentResult<Vec<Tournament>>;

    async fn update_tournament(
        &self,
        tournament_id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<bool>;

    async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<bool>;
}

const BLOCK_COLUMNS: &str =
    "id, next_id, depth, participant_id, participant_name, score, state, result";

fn block_from_row(row: &PgRow) -> BracketResult<Block> {
    Ok(Block {
        id: row.get("id"),
        next: row.get("next_id"),
        depth: row.get::<i32, _>("depth") as u32,
        participant: row.get("participant_id"),
        participant_name: row.get("participant_name"),
        score: row.get("score"),
        state: row.get::<String, _>("state").parse()?,
        result: row.get::<String, _>("result").parse()?,
    })
}

/// PostgreSQL implementation of the block and bracket stores
#[derive(Clone)]
pub struct PgBracketStore {
    pool: PgPool,
}

impl PgBracketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockRepository for PgBracketStore {
    async fn create_block(&self, block: &NewBlock) -> BracketResult<BlockId> {
        let row = sqlx::query("INSERT INTO blocks (next_id, depth) VALUES ($1, $2) RETURNING id")
            .bind(block.next)
            .bind(block.depth as i32)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("id"))
    }

    async fn get_block(&self, block_id: BlockId) -> BracketResult<Option<Block>> {
        let row = sqlx::query(&format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE id = $1"))
            .bind(block_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(block_from_row).transpose()
    }

    async fn find_blocks(&self, filter: &BlockFilter) -> BracketResult<Vec<Block>> {
        match filter {
            BlockFilter::Ids(ids) => {
                let rows = sqlx::query(&format!(
                    "SELECT {BLOCK_COLUMNS} FROM blocks WHERE id = ANY($1)"
                ))
                .bind(ids.as_slice())
                .fetch_all(&self.pool)
                .await?;

                let mut by_id = HashMap::with_capacity(rows.len());
                for row in &rows {
                    let block = block_from_row(row)?;
                    by_id.insert(block.id, block);
                }

                // Keep the caller's enumeration order
                Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
            }
            BlockFilter::ParticipantAtDepth { participant, depth } => {
                let rows = sqlx::query(&format!(
                    "SELECT {BLOCK_COLUMNS} FROM blocks
                     WHERE participant_id = $1 AND depth = $2
                     ORDER BY id"
                ))
                .bind(participant)
                .bind(*depth as i32)
                .fetch_all(&self.pool)
                .await?;

                rows.iter().map(block_from_row).collect()
            }
            BlockFilter::Parent(parent) => {
                let rows = sqlx::query(&format!(
                    "SELECT {BLOCK_COLUMNS} FROM blocks WHERE next_id = $1 ORDER BY id"
                ))
                .bind(parent)
                .fetch_all(&self.pool)
                .await?;

                rows.iter().map(block_from_row).collect()
            }
        }
    }

    async fn update_block(&self, block_id: BlockId, update: &BlockUpdate) -> BracketResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE blocks SET
                participant_id = COALESCE($2, participant_id),
                participant_name = COALESCE($3, participant_name),
                score = COALESCE($4, score),
                state = COALESCE($5, state),
                result = COALESCE($6, result)
            WHERE id = $1
            "#,
        )
        .bind(block_id)
        .bind(update.participant)
        .bind(update.participant_name.as_deref())
        .bind(update.score)
        .bind(update.state.map(|s| s.as_str()))
        .bind(update.result.map(|r| r.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_block(&self, block_id: BlockId) -> BracketResult<bool> {
        let result = sqlx::query("DELETE FROM blocks WHERE id = $1")
            .bind(block_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BracketRepository for PgBracketStore {
    async fn create_bracket(&self, bracket: &NewBracket) -> BracketResult<BracketId> {
        let row = sqlx::query(
            r#"
            INSERT INTO brackets (total_participants, participants_per_match, blocks, current_depth)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(bracket.total_participants as i32)
        .bind(bracket.participants_per_match as i32)
        .bind(bracket.blocks.as_slice())
        .bind(bracket.current_depth as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn get_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        let row = sqlx::query(
            r#"
            SELECT id, total_participants, participants_per_match, blocks, current_depth
            FROM brackets
            WHERE id = $1
            "#,
        )
        .bind(bracket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Bracket {
            id: r.get("id"),
            total_participants: r.get::<i32, _>("total_participants") as u32,
            participants_per_match: r.get::<i32, _>("participants_per_match") as u32,
            blocks: r.get("blocks"),
            current_depth: r.get::<i32, _>("current_depth") as u32,
        }))
    }

    async fn update_bracket(
        &self,
        bracket_id: BracketId,
        update: &BracketUpdate,
    ) -> BracketResult<bool> {
        let result = sqlx::query(
            "UPDATE brackets SET current_depth = COALESCE($2, current_depth) WHERE id = $1",
        )
        .bind(bracket_id)
        .bind(update.current_depth.map(|d| d as i32))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<bool> {
        let result = sqlx::query("DELETE FROM brackets WHERE id = $1")
            .bind(bracket_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ParticipantDirectory for PgBracketStore {
    async fn display_name(&self, participant: ParticipantId) -> BracketResult<Option<String>> {
        let row = sqlx::query("SELECT display_name FROM users WHERE id = $1")
            .bind(participant)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("display_name")))
    }
}

/// PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
        let config: TournamentConfig = serde_json::from_value(row.get("config"))?;
        let state: String = row.get("state");

        Ok(Tournament {
            id: row.get("id"),
            config,
            state: state.parse()?,
            admins: row.get("admins"),
            participants: row.get("participants"),
            bracket_id: row.get("bracket_id"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        })
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_tournament(
        &self,
        tournament: &NewTournament,
    ) -> TournamentResult<TournamentId> {
        let config_json = serde_json::to_value(&tournament.config)?;

        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (config, admins, bracket_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(config_json)
        .bind(tournament.admins.as_slice())
        .bind(tournament.bracket_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(
            r#"
            SELECT id, config, state, admins, participants, bracket_id, created_at
            FROM tournaments
            WHERE id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::tournament_from_row).transpose()
    }

    async fn list_tournaments(&self, filter: TournamentFilter) -> TournamentResult<Vec<Tournament>> {
        let select = "SELECT id, config, state, admins, participants, bracket_id, created_at
                      FROM tournaments";

        let rows = match filter {
            TournamentFilter::Public => {
                sqlx::query(&format!(
                    "{select} WHERE (config->>'public')::boolean ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            TournamentFilter::Admin(user_id) => {
                sqlx::query(&format!("{select} WHERE $1 = ANY(admins) ORDER BY id"))
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TournamentFilter::Participant(user_id) => {
                sqlx::query(&format!(
                    "{select} WHERE $1 = ANY(participants) ORDER BY id"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::tournament_from_row).collect()
    }

    async fn update_tournament(
        &self,
        tournament_id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<bool> {
        let Some(mut tournament) = self.get_tournament(tournament_id).await? else {
            return Ok(false);
        };
        update.apply(&mut tournament);

        let config_json = serde_json::to_value(&tournament.config)?;
        let result = sqlx::query(
            r#"
            UPDATE tournaments
            SET config = $2, state = $3, admins = $4, participants = $5
            WHERE id = $1
            "#,
        )
        .bind(tournament_id)
        .bind(config_json)
        .bind(tournament.state.as_str())
        .bind(tournament.admins.as_slice())
        .bind(tournament.participants.as_slice())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<bool> {
        let result = sqlx::query("DELETE FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
