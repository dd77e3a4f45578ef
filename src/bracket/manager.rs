//! Bracket manager: the operations the outer layer calls.

use super::advance::RoundAdvancer;
use super::errors::BracketResult;
use super::lifecycle::BracketLifecycle;
use super::models::{Block, BlockId, Bracket, BracketId, BracketView, ParticipantId};
use super::scoring::ScoreRecorder;
use super::seeder::{Seeder, shuffle_participants};
use super::topology::TopologyBuilder;
use crate::db::{BlockRepository, BracketRepository, ParticipantDirectory, PgBracketStore};
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;

/// Bracket manager
///
/// Holds no state of its own besides the stores. Mutating calls on the same
/// bracket must be serialized by the caller; nothing here locks.
#[derive(Clone)]
pub struct BracketManager {
    blocks: Arc<dyn BlockRepository>,
    brackets: Arc<dyn BracketRepository>,
    directory: Arc<dyn ParticipantDirectory>,
}

impl BracketManager {
    /// Create a bracket manager over separate stores
    pub fn new(
        blocks: Arc<dyn BlockRepository>,
        brackets: Arc<dyn BracketRepository>,
        directory: Arc<dyn ParticipantDirectory>,
    ) -> Self {
        Self {
            blocks,
            brackets,
            directory,
        }
    }

    /// Create a bracket manager over one store implementing every repository
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: BlockRepository + BracketRepository + ParticipantDirectory + 'static,
    {
        let blocks: Arc<dyn BlockRepository> = store.clone();
        let brackets: Arc<dyn BracketRepository> = store.clone();
        let directory: Arc<dyn ParticipantDirectory> = store;
        Self::new(blocks, brackets, directory)
    }

    /// Create a bracket manager backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        Self::with_store(Arc::new(PgBracketStore::new(pool)))
    }

    fn lifecycle(&self) -> BracketLifecycle<'_> {
        BracketLifecycle::new(self.blocks.as_ref(), self.brackets.as_ref())
    }

    fn seeder(&self) -> Seeder<'_> {
        Seeder::new(
            self.blocks.as_ref(),
            self.brackets.as_ref(),
            self.directory.as_ref(),
        )
    }

    fn recorder(&self) -> ScoreRecorder<'_> {
        ScoreRecorder::new(self.blocks.as_ref(), self.brackets.as_ref())
    }

    fn advancer(&self) -> RoundAdvancer<'_> {
        RoundAdvancer::new(self.blocks.as_ref(), self.brackets.as_ref())
    }

    /// Create a bracket and its full block tree
    ///
    /// # Arguments
    ///
    /// * `total_participants` - Must be `participants_per_match^k`, `k >= 1`
    /// * `participants_per_match` - Branching factor of the tree
    ///
    /// # Returns
    ///
    /// * `BracketResult<Bracket>` - The stored bracket, leaves as current round
    pub async fn create_bracket(
        &self,
        total_participants: u32,
        participants_per_match: u32,
    ) -> BracketResult<Bracket> {
        TopologyBuilder::new(self.blocks.as_ref(), self.brackets.as_ref())
            .build(total_participants, participants_per_match)
            .await
    }

    pub async fn get_bracket(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        self.lifecycle().get(bracket_id).await
    }

    /// Get a bracket with all of its blocks
    pub async fn get_bracket_view(&self, bracket_id: BracketId) -> BracketResult<BracketView> {
        self.lifecycle().view(bracket_id).await
    }

    /// Delete a bracket and its still-scheduled blocks
    pub async fn delete_bracket(&self, bracket_id: BracketId) -> BracketResult<()> {
        self.lifecycle().delete(bracket_id).await
    }

    /// Shuffle the participants and seed them into the leaves
    pub async fn seed_bracket(
        &self,
        bracket_id: BracketId,
        participants: &[ParticipantId],
    ) -> BracketResult<Bracket> {
        // Thread-local RNG must not live across an await
        let shuffled = {
            let mut rng = rand::rng();
            shuffle_participants(participants, &mut rng)
        };
        self.seeder().assign(bracket_id, &shuffled).await
    }

    /// Same as [`Self::seed_bracket`] with a caller-supplied RNG
    pub async fn seed_bracket_with_rng<R: Rng + ?Sized>(
        &self,
        bracket_id: BracketId,
        participants: &[ParticipantId],
        rng: &mut R,
    ) -> BracketResult<Bracket> {
        self.seeder().seed(bracket_id, participants, rng).await
    }

    /// Overwrite a participant's score in the current round
    pub async fn record_score(
        &self,
        bracket_id: BracketId,
        participant: ParticipantId,
        score: i64,
    ) -> BracketResult<Bracket> {
        self.recorder()
            .record_for_participant(bracket_id, participant, score)
            .await
    }

    /// Set the score of an `OnGoing` block
    pub async fn record_block_score(&self, block_id: BlockId, score: i64) -> BracketResult<Block> {
        self.recorder().record_for_block(block_id, score).await
    }

    /// Resolve the current round and move winners up one level
    pub async fn advance_round(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        self.advancer().advance(bracket_id).await
    }

    /// Root occupant of a decided bracket
    pub async fn champion(&self, bracket_id: BracketId) -> BracketResult<Option<ParticipantId>> {
        let view = self.get_bracket_view(bracket_id).await?;
        Ok(view.champion())
    }

    pub async fn get_block(&self, block_id: BlockId) -> BracketResult<Block> {
        self.lifecycle().get_block(block_id).await
    }

    pub async fn delete_block(&self, block_id: BlockId) -> BracketResult<()> {
        self.lifecycle().delete_block(block_id).await
    }

    /// Resolve the single match `block_id` belongs to
    #[deprecated(note = "use `BracketManager::advance_round`")]
    #[allow(deprecated)]
    pub async fn compare_score(&self, block_id: BlockId) -> BracketResult<Block> {
        self.advancer().compare_score(block_id).await
    }
}
