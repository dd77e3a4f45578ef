//! Score writes into single blocks.
//!
//! There are two entry points with different preconditions:
//! [`ScoreRecorder::record_for_block`] requires the block to be `OnGoing`,
//! while [`ScoreRecorder::record_for_participant`] overwrites the score of
//! the participant's current block without looking at its state.

use super::errors::{BracketError, BracketResult};
use super::models::{
    Block, BlockFilter, BlockId, BlockState, BlockUpdate, Bracket, BracketId, ParticipantId,
};
use crate::db::{BlockRepository, BracketRepository};

pub struct ScoreRecorder<'a> {
    blocks: &'a dyn BlockRepository,
    brackets: &'a dyn BracketRepository,
}

impl<'a> ScoreRecorder<'a> {
    pub fn new(blocks: &'a dyn BlockRepository, brackets: &'a dyn BracketRepository) -> Self {
        Self { blocks, brackets }
    }

    /// Set the score of an `OnGoing` block
    pub async fn record_for_block(&self, block_id: BlockId, score: i64) -> BracketResult<Block> {
        let mut block = self
            .blocks
            .get_block(block_id)
            .await?
            .ok_or(BracketError::BlockNotFound(block_id))?;

        if block.state != BlockState::OnGoing {
            return Err(BracketError::InvalidBlockState {
                block: block_id,
                expected: BlockState::OnGoing,
                actual: block.state,
            });
        }

        let update = BlockUpdate::score(score);
        if !self.blocks.update_block(block_id, &update).await? {
            return Err(BracketError::BlockNotFound(block_id));
        }
        update.apply(&mut block);

        log::debug!("Block {} scored {}", block_id, score);
        Ok(block)
    }

    /// Overwrite the score of the block `participant` occupies in the
    /// bracket's current round.
    ///
    /// No state check. If the participant holds no block at the current
    /// depth the call is a no-op.
    pub async fn record_for_participant(
        &self,
        bracket_id: BracketId,
        participant: ParticipantId,
        score: i64,
    ) -> BracketResult<Bracket> {
        let bracket = self
            .brackets
            .get_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))?;

        let candidates = self
            .blocks
            .find_blocks(&BlockFilter::ParticipantAtDepth {
                participant,
                depth: bracket.current_depth,
            })
            .await?;

        // The filter spans every bracket the participant plays in
        match candidates
            .into_iter()
            .find(|b| bracket.contains_block(b.id))
        {
            Some(block) => {
                if !self
                    .blocks
                    .update_block(block.id, &BlockUpdate::score(score))
                    .await?
                {
                    return Err(BracketError::BlockNotFound(block.id));
                }
                log::debug!(
                    "Participant {} scored {} in block {}",
                    participant,
                    score,
                    block.id
                );
            }
            None => {
                log::warn!(
                    "Participant {} holds no block at depth {} of bracket {}, score ignored",
                    participant,
                    bracket.current_depth,
                    bracket_id
                );
            }
        }

        Ok(bracket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{Seeder, TopologyBuilder};
    use crate::db::MemoryStore;

    async fn seeded_bracket(store: &MemoryStore) -> Bracket {
        let bracket = TopologyBuilder::new(store, store)
            .build(4, 2)
            .await
            .unwrap();
        Seeder::new(store, store, store)
            .assign(bracket.id, &[1, 2, 3])
            .await
            .unwrap();
        bracket
    }

    #[tokio::test]
    async fn test_record_for_block_requires_on_going() {
        let store = MemoryStore::new();
        let bracket = seeded_bracket(&store).await;
        let recorder = ScoreRecorder::new(&store, &store);

        // Leaves: [1, 2, 3, empty]
        let leaves = &bracket.blocks[3..];
        let block = recorder.record_for_block(leaves[0], 21).await.unwrap();
        assert_eq!(block.score, 21);
        assert_eq!(store.get_block(leaves[0]).await.unwrap().unwrap().score, 21);

        let err = recorder.record_for_block(leaves[3], 5).await.unwrap_err();
        assert!(matches!(
            err,
            BracketError::InvalidBlockState {
                expected: BlockState::OnGoing,
                actual: BlockState::Scheduled,
                ..
            }
        ));

        let err = recorder.record_for_block(bracket.blocks[0], 5).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidBlockState { .. }));
    }

    #[tokio::test]
    async fn test_record_for_block_unknown() {
        let store = MemoryStore::new();
        let recorder = ScoreRecorder::new(&store, &store);
        assert!(matches!(
            recorder.record_for_block(404, 1).await,
            Err(BracketError::BlockNotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_record_for_participant_skips_state_check() {
        let store = MemoryStore::new();
        let bracket = seeded_bracket(&store).await;
        let leaf = bracket.blocks[3];

        // Complete the block by hand; the participant path still writes
        store
            .update_block(leaf, &BlockUpdate::state(BlockState::Completed))
            .await
            .unwrap();

        let recorder = ScoreRecorder::new(&store, &store);
        let returned = recorder
            .record_for_participant(bracket.id, 1, 9)
            .await
            .unwrap();
        assert_eq!(returned.id, bracket.id);
        assert_eq!(store.get_block(leaf).await.unwrap().unwrap().score, 9);
    }

    #[tokio::test]
    async fn test_record_for_participant_without_block_is_noop() {
        let store = MemoryStore::new();
        let bracket = seeded_bracket(&store).await;
        let recorder = ScoreRecorder::new(&store, &store);

        recorder
            .record_for_participant(bracket.id, 77, 9)
            .await
            .unwrap();

        let blocks = store
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await
            .unwrap();
        assert!(blocks.iter().all(|b| b.score == 0));
    }

    #[tokio::test]
    async fn test_record_for_participant_stays_inside_bracket() {
        let store = MemoryStore::new();
        let first = seeded_bracket(&store).await;
        let second = seeded_bracket(&store).await;

        ScoreRecorder::new(&store, &store)
            .record_for_participant(second.id, 1, 4)
            .await
            .unwrap();

        let untouched = store
            .find_blocks(&BlockFilter::Ids(first.blocks.clone()))
            .await
            .unwrap();
        assert!(untouched.iter().all(|b| b.score == 0));

        let scored = store
            .find_blocks(&BlockFilter::ParticipantAtDepth {
                participant: 1,
                depth: 2,
            })
            .await
            .unwrap();
        assert!(
            scored
                .iter()
                .any(|b| second.contains_block(b.id) && b.score == 4)
        );
    }

    #[tokio::test]
    async fn test_record_for_participant_unmatched_write() {
        let store = MemoryStore::new();
        let bracket = seeded_bracket(&store).await;
        let leaf = bracket.blocks[3];
        store.reject_block_updates(true).await;

        let recorder = ScoreRecorder::new(&store, &store);
        let err = recorder
            .record_for_participant(bracket.id, 1, 6)
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::BlockNotFound(id) if id == leaf));

        store.reject_block_updates(false).await;
        assert_eq!(store.get_block(leaf).await.unwrap().unwrap().score, 0);
    }
}
