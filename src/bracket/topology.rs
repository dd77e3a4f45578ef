//! Construction of the m-ary match tree for a new bracket.

use super::errors::{BracketError, BracketResult};
use super::models::{BlockId, Bracket, BracketId, NewBlock, NewBracket};
use crate::db::{BlockRepository, BracketRepository};

/// Upper bound on divisions while deriving the round count
pub const MAX_REDUCTION_STEPS: u32 = 1000;

/// Number of rounds needed to reduce `total` entrants to one champion with
/// `per_match` entrants per match.
///
/// # Errors
///
/// `MissingInput` if either argument is zero, `NotAValidPower` unless
/// `total == per_match^k` for some `k >= 1`.
pub fn rounds_for(total: u32, per_match: u32) -> BracketResult<u32> {
    if total == 0 {
        return Err(BracketError::MissingInput("total_participants"));
    }
    if per_match == 0 {
        return Err(BracketError::MissingInput("participants_per_match"));
    }

    let not_a_power = || BracketError::NotAValidPower { total, per_match };

    let mut remaining = total;
    let mut rounds = 0;
    while remaining > 1 {
        if remaining % per_match != 0 {
            return Err(not_a_power());
        }
        remaining /= per_match;
        rounds += 1;

        // A branching factor of 1 never shrinks the field
        if rounds > MAX_REDUCTION_STEPS {
            return Err(not_a_power());
        }
    }

    if rounds == 0 {
        return Err(not_a_power());
    }
    Ok(rounds)
}

/// `1 + m + m^2 + ... + m^rounds`
pub fn expected_block_count(per_match: u32, rounds: u32) -> u64 {
    let m = u64::from(per_match);
    let mut level = 1u64;
    let mut total = 1u64;
    for _ in 0..rounds {
        level *= m;
        total += level;
    }
    total
}

/// Builds the block tree and the bracket record on top of the stores.
///
/// Blocks are created level by level from the root; children of the same
/// parent are contiguous. The resulting id list is the bracket's
/// enumeration order.
pub struct TopologyBuilder<'a> {
    blocks: &'a dyn BlockRepository,
    brackets: &'a dyn BracketRepository,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(blocks: &'a dyn BlockRepository, brackets: &'a dyn BracketRepository) -> Self {
        Self { blocks, brackets }
    }

    /// Validate the sizes, create every block, then the bracket record.
    ///
    /// Validation happens before anything is written. If a write fails
    /// midway, the blocks created so far are deleted again.
    pub async fn build(&self, total: u32, per_match: u32) -> BracketResult<Bracket> {
        let rounds = rounds_for(total, per_match)?;

        let mut created = Vec::new();
        let bracket_id = match self.persist(total, per_match, rounds, &mut created).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!(
                    "Bracket construction failed after {} blocks, rolling back: {}",
                    created.len(),
                    e
                );
                self.discard(&created).await;
                return Err(e);
            }
        };

        log::info!(
            "Created bracket {} ({} participants, {} per match, {} rounds, {} blocks)",
            bracket_id,
            total,
            per_match,
            rounds,
            created.len()
        );

        self.brackets
            .get_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))
    }

    async fn persist(
        &self,
        total: u32,
        per_match: u32,
        rounds: u32,
        created: &mut Vec<BlockId>,
    ) -> BracketResult<BracketId> {
        let root = self.blocks.create_block(&NewBlock::root()).await?;
        created.push(root);

        let mut frontier = vec![root];
        for depth in 1..=rounds {
            let mut next_frontier = Vec::with_capacity(frontier.len() * per_match as usize);
            for &parent in &frontier {
                for _ in 0..per_match {
                    let id = self
                        .blocks
                        .create_block(&NewBlock::child_of(parent, depth))
                        .await?;
                    created.push(id);
                    next_frontier.push(id);
                }
            }
            frontier = next_frontier;
        }

        self.brackets
            .create_bracket(&NewBracket {
                total_participants: total,
                participants_per_match: per_match,
                blocks: created.clone(),
                current_depth: rounds,
            })
            .await
    }

    async fn discard(&self, created: &[BlockId]) {
        for &id in created {
            if let Err(e) = self.blocks.delete_block(id).await {
                log::error!("Failed to discard block {} of aborted bracket: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BlockFilter;
    use crate::db::MemoryStore;

    #[test]
    fn test_rounds_for_powers() {
        assert_eq!(rounds_for(8, 2).unwrap(), 3);
        assert_eq!(rounds_for(16, 2).unwrap(), 4);
        assert_eq!(rounds_for(9, 3).unwrap(), 2);
        assert_eq!(rounds_for(3, 3).unwrap(), 1);
        assert_eq!(rounds_for(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_rounds_for_rejects_non_powers() {
        for (total, per_match) in [(5, 2), (6, 2), (12, 3), (1, 2), (4, 1), (1, 1), (2, 4)] {
            assert!(
                matches!(
                    rounds_for(total, per_match),
                    Err(BracketError::NotAValidPower { .. })
                ),
                "{total} / {per_match} should be rejected"
            );
        }
    }

    #[test]
    fn test_rounds_for_rejects_missing_input() {
        assert!(matches!(
            rounds_for(0, 2),
            Err(BracketError::MissingInput("total_participants"))
        ));
        assert!(matches!(
            rounds_for(8, 0),
            Err(BracketError::MissingInput("participants_per_match"))
        ));
    }

    #[test]
    fn test_expected_block_count() {
        assert_eq!(expected_block_count(2, 3), 15);
        assert_eq!(expected_block_count(2, 4), 31);
        assert_eq!(expected_block_count(3, 2), 13);
        assert_eq!(expected_block_count(3, 1), 4);
    }

    #[tokio::test]
    async fn test_build_links_children_to_previous_level() {
        let store = MemoryStore::new();
        let builder = TopologyBuilder::new(&store, &store);

        let bracket = builder.build(9, 3).await.unwrap();
        assert_eq!(bracket.blocks.len(), 13);
        assert_eq!(bracket.current_depth, 2);
        assert_eq!(bracket.participants_per_match, 3);

        let blocks = store
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await
            .unwrap();
        assert!(blocks[0].is_root());
        assert_eq!(blocks[0].depth, 0);

        for block in &blocks[1..] {
            let parent = blocks
                .iter()
                .find(|b| Some(b.id) == block.next)
                .expect("parent must be part of the bracket");
            assert_eq!(parent.depth + 1, block.depth);
        }

        // Level order: depths never decrease along the enumeration
        assert!(blocks.windows(2).all(|w| w[0].depth <= w[1].depth));
    }

    #[tokio::test]
    async fn test_build_validation_writes_nothing() {
        let store = MemoryStore::new();
        let builder = TopologyBuilder::new(&store, &store);

        assert!(builder.build(5, 2).await.is_err());
        assert_eq!(store.block_count().await, 0);
        assert_eq!(store.bracket_count().await, 0);
    }

    #[tokio::test]
    async fn test_build_rolls_back_on_write_failure() {
        let store = MemoryStore::new();
        store.limit_block_creations(Some(5)).await;
        let builder = TopologyBuilder::new(&store, &store);

        let err = builder.build(8, 2).await.unwrap_err();
        assert!(matches!(err, BracketError::Unacknowledged(_)));
        assert_eq!(store.block_count().await, 0);
        assert_eq!(store.bracket_count().await, 0);
    }
}
