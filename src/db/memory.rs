//! In-memory implementation of every repository.
//!
//! Ids are handed out sequentially per record type and enumeration follows
//! id order, so results are deterministic. Used by the test suites and by
//! embedders that do not need PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::repository::{
    BlockRepository, BracketRepository, ParticipantDirectory, TournamentRepository,
};
use crate::bracket::{
    Block, BlockFilter, BlockId, BlockResult, BlockState, BlockUpdate, Bracket, BracketError,
    BracketId, BracketResult, BracketUpdate, NewBlock, NewBracket, ParticipantId,
};
use crate::tournament::{
    NewTournament, Tournament, TournamentError, TournamentFilter, TournamentId, TournamentResult,
    TournamentState, TournamentUpdate,
};

#[derive(Default)]
struct Tables {
    blocks: BTreeMap<BlockId, Block>,
    brackets: BTreeMap<BracketId, Bracket>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    participants: HashMap<ParticipantId, String>,
    next_block_id: BlockId,
    next_bracket_id: BracketId,
    next_tournament_id: TournamentId,
}

#[derive(Default)]
struct Faults {
    /// Remaining block creations before `create_block` fails
    block_create_budget: Option<usize>,
    reject_block_updates: bool,
    reject_bracket_updates: bool,
    reject_tournament_creations: bool,
}

/// Mutex-guarded in-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant known to the directory
    pub async fn register_participant(&self, participant: ParticipantId, name: &str) {
        self.tables
            .lock()
            .await
            .participants
            .insert(participant, name.to_string());
    }

    /// Builder-style variant of [`Self::register_participant`] for tests
    pub fn with_participants<'a>(
        mut self,
        participants: impl IntoIterator<Item = (ParticipantId, &'a str)>,
    ) -> Self {
        {
            let tables = self.tables.get_mut();
            for (id, name) in participants {
                tables.participants.insert(id, name.to_string());
            }
        }
        self
    }

    /// Let only the next `budget` block creations succeed
    pub async fn limit_block_creations(&self, budget: Option<usize>) {
        self.faults.lock().await.block_create_budget = budget;
    }

    /// Make block updates report "no block matched"
    pub async fn reject_block_updates(&self, reject: bool) {
        self.faults.lock().await.reject_block_updates = reject;
    }

    /// Make bracket updates report "not acknowledged"
    pub async fn reject_bracket_updates(&self, reject: bool) {
        self.faults.lock().await.reject_bracket_updates = reject;
    }

    /// Make `create_tournament` fail
    pub async fn reject_tournament_creations(&self, reject: bool) {
        self.faults.lock().await.reject_tournament_creations = reject;
    }

    pub async fn block_count(&self) -> usize {
        self.tables.lock().await.blocks.len()
    }

    pub async fn bracket_count(&self) -> usize {
        self.tables.lock().await.brackets.len()
    }
}

#[async_trait]
impl BlockRepository for MemoryStore {
    async fn create_block(&self, block: &NewBlock) -> BracketResult<BlockId> {
        {
            let mut faults = self.faults.lock().await;
            if let Some(budget) = faults.block_create_budget.as_mut() {
                if *budget == 0 {
                    return Err(BracketError::Unacknowledged(
                        "block creation rejected".to_string(),
                    ));
                }
                *budget -= 1;
            }
        }

        let mut tables = self.tables.lock().await;
        tables.next_block_id += 1;
        let id = tables.next_block_id;
        tables.blocks.insert(
            id,
            Block {
                id,
                next: block.next,
                depth: block.depth,
                participant: None,
                participant_name: None,
                score: 0,
                state: BlockState::Scheduled,
                result: BlockResult::NotDecided,
            },
        );
        Ok(id)
    }

    async fn get_block(&self, block_id: BlockId) -> BracketResult<Option<Block>> {
        Ok(self.tables.lock().await.blocks.get(&block_id).cloned())
    }

    async fn find_blocks(&self, filter: &BlockFilter) -> BracketResult<Vec<Block>> {
        let tables = self.tables.lock().await;
        let blocks = match filter {
            BlockFilter::Ids(ids) => ids
                .iter()
                .filter_map(|id| tables.blocks.get(id).cloned())
                .collect(),
            BlockFilter::ParticipantAtDepth { participant, depth } => tables
                .blocks
                .values()
                .filter(|b| b.participant == Some(*participant) && b.depth == *depth)
                .cloned()
                .collect(),
            BlockFilter::Parent(parent) => tables
                .blocks
                .values()
                .filter(|b| b.next == Some(*parent))
                .cloned()
                .collect(),
        };
        Ok(blocks)
    }

    async fn update_block(&self, block_id: BlockId, update: &BlockUpdate) -> BracketResult<bool> {
        if self.faults.lock().await.reject_block_updates {
            return Ok(false);
        }

        let mut tables = self.tables.lock().await;
        match tables.blocks.get_mut(&block_id) {
            Some(block) => {
                update.apply(block);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_block(&self, block_id: BlockId) -> BracketResult<bool> {
        Ok(self.tables.lock().await.blocks.remove(&block_id).is_some())
    }
}

#[async_trait]
impl BracketRepository for MemoryStore {
    async fn create_bracket(&self, bracket: &NewBracket) -> BracketResult<BracketId> {
        let mut tables = self.tables.lock().await;
        tables.next_bracket_id += 1;
        let id = tables.next_bracket_id;
        tables.brackets.insert(
            id,
            Bracket {
                id,
                total_participants: bracket.total_participants,
                participants_per_match: bracket.participants_per_match,
                blocks: bracket.blocks.clone(),
                current_depth: bracket.current_depth,
            },
        );
        Ok(id)
    }

    async fn get_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        Ok(self.tables.lock().await.brackets.get(&bracket_id).cloned())
    }

    async fn update_bracket(
        &self,
        bracket_id: BracketId,
        update: &BracketUpdate,
    ) -> BracketResult<bool> {
        if self.faults.lock().await.reject_bracket_updates {
            return Ok(false);
        }

        let mut tables = self.tables.lock().await;
        match tables.brackets.get_mut(&bracket_id) {
            Some(bracket) => {
                if let Some(depth) = update.current_depth {
                    bracket.current_depth = depth;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<bool> {
        Ok(self.tables.lock().await.brackets.remove(&bracket_id).is_some())
    }
}

#[async_trait]
impl ParticipantDirectory for MemoryStore {
    async fn display_name(&self, participant: ParticipantId) -> BracketResult<Option<String>> {
        Ok(self
            .tables
            .lock()
            .await
            .participants
            .get(&participant)
            .cloned())
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn create_tournament(
        &self,
        tournament: &NewTournament,
    ) -> TournamentResult<TournamentId> {
        if self.faults.lock().await.reject_tournament_creations {
            return Err(TournamentError::Unacknowledged(
                "tournament creation rejected".to_string(),
            ));
        }

        let mut tables = self.tables.lock().await;
        tables.next_tournament_id += 1;
        let id = tables.next_tournament_id;
        tables.tournaments.insert(
            id,
            Tournament {
                id,
                config: tournament.config.clone(),
                state: TournamentState::SignUpPhase,
                admins: tournament.admins.clone(),
                participants: Vec::new(),
                bracket_id: tournament.bracket_id,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Tournament>> {
        Ok(self
            .tables
            .lock()
            .await
            .tournaments
            .get(&tournament_id)
            .cloned())
    }

    async fn list_tournaments(&self, filter: TournamentFilter) -> TournamentResult<Vec<Tournament>> {
        Ok(self
            .tables
            .lock()
            .await
            .tournaments
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn update_tournament(
        &self,
        tournament_id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.tournaments.get_mut(&tournament_id) {
            Some(tournament) => {
                update.apply(tournament);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .tournaments
            .remove(&tournament_id)
            .is_some())
    }
}
