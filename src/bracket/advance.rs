//! Round advancement: resolves every match of the current depth and moves
//! the winners one level up.
//!
//! An advance runs in three phases:
//!
//! 1. **Gather**: load the blocks at the bracket's current depth and group
//!    siblings (same parent) into matches, in first-encounter order.
//! 2. **Validate**: every match needs a unique highest score. A single tie
//!    aborts the whole advance before anything is written. A match that was
//!    never played (all scores 0) counts as a tie.
//! 3. **Resolve & commit**: winners become `Completed/Winner` and their
//!    occupant moves into the parent, which becomes `OnGoing`; everyone else
//!    becomes `Completed/Loser`. Finally the bracket depth drops by one.
//!
//! Phase 3 is not atomic. If the depth write is not acknowledged, the block
//! writes of the round stay in place and the error is surfaced; re-running
//! the advance would then process the decided round again.

use super::errors::{BracketError, BracketResult};
use super::models::{
    Block, BlockFilter, BlockId, BlockResult, BlockState, BlockUpdate, Bracket, BracketId,
    BracketUpdate,
};
use crate::db::{BlockRepository, BracketRepository};

/// Sibling blocks sharing one parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub parent: Option<BlockId>,
    pub blocks: Vec<Block>,
}

impl Match {
    /// Highest score in the match, 0 for an empty match
    pub fn highest_score(&self) -> i64 {
        self.blocks.iter().map(|b| b.score).max().unwrap_or(0)
    }

    /// The single block holding the highest score
    ///
    /// # Errors
    ///
    /// `TiedMatch` if two or more blocks share the highest score.
    pub fn winner(&self) -> BracketResult<&Block> {
        let highest = self.highest_score();
        let mut leaders = self.blocks.iter().filter(|b| b.score == highest);

        match (leaders.next(), leaders.next()) {
            (Some(winner), None) => Ok(winner),
            _ => Err(BracketError::TiedMatch {
                parent: self.parent,
                score: highest,
            }),
        }
    }
}

/// Group blocks into matches by parent, keeping first-encounter order
pub fn group_matches(blocks: Vec<Block>) -> Vec<Match> {
    let mut matches: Vec<Match> = Vec::new();
    for block in blocks {
        match matches.iter_mut().find(|m| m.parent == block.next) {
            Some(existing) => existing.blocks.push(block),
            None => matches.push(Match {
                parent: block.next,
                blocks: vec![block],
            }),
        }
    }
    matches
}

pub struct RoundAdvancer<'a> {
    blocks: &'a dyn BlockRepository,
    brackets: &'a dyn BracketRepository,
}

impl<'a> RoundAdvancer<'a> {
    pub fn new(blocks: &'a dyn BlockRepository, brackets: &'a dyn BracketRepository) -> Self {
        Self { blocks, brackets }
    }

    /// Resolve the current round of a bracket
    pub async fn advance(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        let mut bracket = self
            .brackets
            .get_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))?;

        if bracket.is_decided() {
            return Err(BracketError::BracketDecided(bracket_id));
        }

        let round: Vec<Block> = self
            .blocks
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await?
            .into_iter()
            .filter(|b| b.depth == bracket.current_depth)
            .collect();
        let matches = group_matches(round);

        let winners = matches
            .iter()
            .map(|m| m.winner().map(|w| w.id))
            .collect::<BracketResult<Vec<_>>>()?;

        for (m, winner) in matches.iter().zip(winners) {
            self.resolve(m, winner).await?;
        }

        let next_depth = bracket.current_depth - 1;
        let update = BracketUpdate {
            current_depth: Some(next_depth),
        };
        if !self.brackets.update_bracket(bracket_id, &update).await? {
            log::error!(
                "Bracket {}: round {} resolved but depth update not acknowledged",
                bracket_id,
                bracket.current_depth
            );
            return Err(BracketError::Unacknowledged(format!(
                "depth update of bracket {bracket_id}"
            )));
        }
        bracket.current_depth = next_depth;

        log::info!(
            "Bracket {} advanced: {} matches resolved, now at depth {}",
            bracket_id,
            matches.len(),
            next_depth
        );

        Ok(bracket)
    }

    async fn resolve(&self, m: &Match, winner: BlockId) -> BracketResult<()> {
        for block in &m.blocks {
            if block.id == winner {
                self.write(block.id, &BlockUpdate::decided(BlockResult::Winner))
                    .await?;
                if let Some(parent) = block.next {
                    let promote =
                        BlockUpdate::occupant(block.participant, block.participant_name.clone())
                            .with_state(BlockState::OnGoing);
                    self.write(parent, &promote).await?;
                }
                log::debug!(
                    "Block {} wins with {} (participant {:?})",
                    block.id,
                    block.score,
                    block.participant
                );
            } else {
                self.write(block.id, &BlockUpdate::decided(BlockResult::Loser))
                    .await?;
            }
        }
        Ok(())
    }

    async fn write(&self, block_id: BlockId, update: &BlockUpdate) -> BracketResult<()> {
        if self.blocks.update_block(block_id, update).await? {
            Ok(())
        } else {
            Err(BracketError::BlockNotFound(block_id))
        }
    }

    /// Single-match resolution kept for its remaining caller.
    ///
    /// Every sibling of `block_id` (same parent) must already be
    /// `Completed`. The occupant of the highest-scoring sibling (first one
    /// on equal scores) is written onto `block_id` itself, which is reset to
    /// `Scheduled` with score 0. Unlike [`Self::advance`] this reopens a
    /// completed block.
    #[deprecated(note = "use `RoundAdvancer::advance`, which resolves a whole round")]
    pub async fn compare_score(&self, block_id: BlockId) -> BracketResult<Block> {
        let mut block = self
            .blocks
            .get_block(block_id)
            .await?
            .ok_or(BracketError::BlockNotFound(block_id))?;
        let parent = block.next.ok_or(BracketError::NotInMatch(block_id))?;

        let siblings = self.blocks.find_blocks(&BlockFilter::Parent(parent)).await?;
        if siblings.iter().any(|b| b.state != BlockState::Completed) {
            return Err(BracketError::MatchIncomplete(block_id));
        }

        let best = siblings
            .iter()
            .reduce(|best, current| if current.score > best.score { current } else { best })
            .ok_or(BracketError::NotInMatch(block_id))?;

        let update = BlockUpdate {
            participant: best.participant,
            score: Some(0),
            state: Some(BlockState::Scheduled),
            ..Default::default()
        };
        self.write(block_id, &update).await?;
        update.apply(&mut block);

        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{ScoreRecorder, Seeder, TopologyBuilder};
    use crate::db::MemoryStore;

    fn block(id: BlockId, next: Option<BlockId>, score: i64) -> Block {
        Block {
            id,
            next,
            depth: 1,
            participant: Some(id * 10),
            participant_name: None,
            score,
            state: BlockState::OnGoing,
            result: BlockResult::NotDecided,
        }
    }

    async fn round_of_four(store: &MemoryStore) -> Bracket {
        let bracket = TopologyBuilder::new(store, store)
            .build(4, 2)
            .await
            .unwrap();
        Seeder::new(store, store, store)
            .assign(bracket.id, &[1, 2, 3, 4])
            .await
            .unwrap();
        bracket
    }

    #[test]
    fn test_group_matches_first_encounter_order() {
        let blocks = vec![
            block(1, Some(20), 0),
            block(2, Some(10), 0),
            block(3, Some(20), 0),
            block(4, Some(10), 0),
        ];
        let matches = group_matches(blocks);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].parent, Some(20));
        assert_eq!(
            matches[0].blocks.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(matches[1].parent, Some(10));
    }

    #[test]
    fn test_winner_unique_max() {
        let m = Match {
            parent: Some(9),
            blocks: vec![block(1, Some(9), 3), block(2, Some(9), 7), block(3, Some(9), 5)],
        };
        assert_eq!(m.highest_score(), 7);
        assert_eq!(m.winner().unwrap().id, 2);
    }

    #[test]
    fn test_winner_with_negative_scores() {
        // Least negative wins
        let m = Match {
            parent: Some(9),
            blocks: vec![block(1, Some(9), -3), block(2, Some(9), -1)],
        };
        assert_eq!(m.highest_score(), -1);
        assert_eq!(m.winner().unwrap().id, 2);

        let tied = Match {
            parent: Some(9),
            blocks: vec![block(1, Some(9), -2), block(2, Some(9), -2)],
        };
        assert!(matches!(
            tied.winner(),
            Err(BracketError::TiedMatch { score: -2, .. })
        ));
    }

    #[test]
    fn test_winner_tie_and_unplayed() {
        let tied = Match {
            parent: Some(9),
            blocks: vec![block(1, Some(9), 4), block(2, Some(9), 4)],
        };
        assert!(matches!(
            tied.winner(),
            Err(BracketError::TiedMatch { score: 4, .. })
        ));

        let unplayed = Match {
            parent: Some(9),
            blocks: vec![block(1, Some(9), 0), block(2, Some(9), 0)],
        };
        assert!(matches!(
            unplayed.winner(),
            Err(BracketError::TiedMatch { score: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_advance_promotes_winners() {
        let store = MemoryStore::new().with_participants([(3, "Cleo")]);
        let bracket = round_of_four(&store).await;
        let leaves = &bracket.blocks[3..];
        let recorder = ScoreRecorder::new(&store, &store);
        for (&leaf, score) in leaves.iter().zip([5, 2, 8, 9]) {
            recorder.record_for_block(leaf, score).await.unwrap();
        }

        let advanced = RoundAdvancer::new(&store, &store)
            .advance(bracket.id)
            .await
            .unwrap();
        assert_eq!(advanced.current_depth, 1);

        let blocks = store
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await
            .unwrap();
        let results: Vec<_> = blocks[3..].iter().map(|b| b.result).collect();
        assert_eq!(
            results,
            vec![
                BlockResult::Winner,
                BlockResult::Loser,
                BlockResult::Loser,
                BlockResult::Winner
            ]
        );
        assert!(blocks[3..].iter().all(|b| b.state == BlockState::Completed));

        assert_eq!(blocks[1].participant, Some(1));
        assert_eq!(blocks[1].state, BlockState::OnGoing);
        assert_eq!(blocks[2].participant, Some(4));
        assert_eq!(blocks[2].state, BlockState::OnGoing);
        assert_eq!(blocks[0].state, BlockState::Scheduled);
    }

    #[tokio::test]
    async fn test_tie_aborts_without_writes() {
        let store = MemoryStore::new();
        let bracket = round_of_four(&store).await;
        let leaves = &bracket.blocks[3..];
        let recorder = ScoreRecorder::new(&store, &store);
        // First match decided, second tied
        for (&leaf, score) in leaves.iter().zip([3, 1, 6, 6]) {
            recorder.record_for_block(leaf, score).await.unwrap();
        }
        let before = store
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await
            .unwrap();

        let err = RoundAdvancer::new(&store, &store)
            .advance(bracket.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::TiedMatch { score: 6, .. }));

        let after = store
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await
            .unwrap();
        assert_eq!(before, after);
        assert_eq!(
            store
                .get_bracket(bracket.id)
                .await
                .unwrap()
                .unwrap()
                .current_depth,
            2
        );
    }

    #[tokio::test]
    async fn test_advance_decided_bracket() {
        let store = MemoryStore::new();
        let bracket = TopologyBuilder::new(&store, &store)
            .build(2, 2)
            .await
            .unwrap();
        Seeder::new(&store, &store, &store)
            .assign(bracket.id, &[1, 2])
            .await
            .unwrap();
        ScoreRecorder::new(&store, &store)
            .record_for_block(bracket.blocks[1], 1)
            .await
            .unwrap();

        let advancer = RoundAdvancer::new(&store, &store);
        assert_eq!(advancer.advance(bracket.id).await.unwrap().current_depth, 0);
        assert!(matches!(
            advancer.advance(bracket.id).await,
            Err(BracketError::BracketDecided(_))
        ));

        let root = store.get_block(bracket.blocks[0]).await.unwrap().unwrap();
        assert_eq!(root.participant, Some(1));
        assert_eq!(root.state, BlockState::OnGoing);
        assert_eq!(root.result, BlockResult::NotDecided);
    }

    #[tokio::test]
    async fn test_unacknowledged_depth_update_keeps_block_writes() {
        let store = MemoryStore::new();
        let bracket = round_of_four(&store).await;
        let recorder = ScoreRecorder::new(&store, &store);
        for (&leaf, score) in bracket.blocks[3..].iter().zip([1, 0, 0, 1]) {
            recorder.record_for_block(leaf, score).await.unwrap();
        }
        store.reject_bracket_updates(true).await;

        let err = RoundAdvancer::new(&store, &store)
            .advance(bracket.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::Unacknowledged(_)));

        let leaf = store.get_block(bracket.blocks[3]).await.unwrap().unwrap();
        assert_eq!(leaf.result, BlockResult::Winner);
        assert_eq!(
            store
                .get_bracket(bracket.id)
                .await
                .unwrap()
                .unwrap()
                .current_depth,
            2
        );
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_compare_score_requires_completed_match() {
        let store = MemoryStore::new();
        let bracket = round_of_four(&store).await;
        let advancer = RoundAdvancer::new(&store, &store);
        let leaf = bracket.blocks[3];

        assert!(matches!(
            advancer.compare_score(leaf).await,
            Err(BracketError::MatchIncomplete(_))
        ));
        assert!(matches!(
            advancer.compare_score(bracket.blocks[0]).await,
            Err(BracketError::NotInMatch(_))
        ));

        let recorder = ScoreRecorder::new(&store, &store);
        recorder.record_for_block(leaf, 2).await.unwrap();
        recorder.record_for_block(bracket.blocks[4], 7).await.unwrap();
        for id in [leaf, bracket.blocks[4]] {
            store
                .update_block(id, &BlockUpdate::state(BlockState::Completed))
                .await
                .unwrap();
        }

        let reopened = advancer.compare_score(leaf).await.unwrap();
        assert_eq!(reopened.participant, Some(2));
        assert_eq!(reopened.state, BlockState::Scheduled);
        assert_eq!(reopened.score, 0);
    }
}
