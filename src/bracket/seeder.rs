//! Placement of participants into the leaf blocks of a bracket.

use rand::Rng;
use rand::seq::SliceRandom;

use super::errors::{BracketError, BracketResult};
use super::models::{BlockFilter, BlockId, BlockState, BlockUpdate, Bracket, BracketId, ParticipantId};
use crate::db::{BlockRepository, BracketRepository, ParticipantDirectory};

/// Fisher-Yates shuffle of a participant list
pub fn shuffle_participants<R: Rng + ?Sized>(
    participants: &[ParticipantId],
    rng: &mut R,
) -> Vec<ParticipantId> {
    let mut shuffled = participants.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

pub struct Seeder<'a> {
    blocks: &'a dyn BlockRepository,
    brackets: &'a dyn BracketRepository,
    directory: &'a dyn ParticipantDirectory,
}

impl<'a> Seeder<'a> {
    pub fn new(
        blocks: &'a dyn BlockRepository,
        brackets: &'a dyn BracketRepository,
        directory: &'a dyn ParticipantDirectory,
    ) -> Self {
        Self {
            blocks,
            brackets,
            directory,
        }
    }

    /// Shuffle `participants` with `rng`, then place them with [`Self::assign`]
    pub async fn seed<R: Rng + ?Sized>(
        &self,
        bracket_id: BracketId,
        participants: &[ParticipantId],
        rng: &mut R,
    ) -> BracketResult<Bracket> {
        let shuffled = shuffle_participants(participants, rng);
        self.assign(bracket_id, &shuffled).await
    }

    /// Place participants into the blocks of the current depth, positionally.
    ///
    /// Stops when either list runs out. Leaves without a participant stay
    /// `Scheduled`; nothing fills them later. The bracket record itself is
    /// not modified.
    pub async fn assign(
        &self,
        bracket_id: BracketId,
        ordered: &[ParticipantId],
    ) -> BracketResult<Bracket> {
        let bracket = self
            .brackets
            .get_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))?;

        let leaves: Vec<BlockId> = self
            .blocks
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await?
            .into_iter()
            .filter(|b| b.depth == bracket.current_depth)
            .map(|b| b.id)
            .collect();

        if ordered.len() < leaves.len() {
            log::warn!(
                "Bracket {}: {} participants for {} leaves, {} leaves stay empty",
                bracket_id,
                ordered.len(),
                leaves.len(),
                leaves.len() - ordered.len()
            );
        } else if ordered.len() > leaves.len() {
            log::warn!(
                "Bracket {}: {} participants exceed {} leaves, surplus not seeded",
                bracket_id,
                ordered.len(),
                leaves.len()
            );
        }

        let mut assigned = Vec::with_capacity(leaves.len().min(ordered.len()));
        for (&leaf, &participant) in leaves.iter().zip(ordered) {
            let name = self.directory.display_name(participant).await?;
            if name.is_none() {
                log::debug!("Participant {} has no display name", participant);
            }
            let update = BlockUpdate::occupant(Some(participant), name);
            if !self.blocks.update_block(leaf, &update).await? {
                return Err(BracketError::BlockNotFound(leaf));
            }
            assigned.push(leaf);
        }

        for &leaf in &assigned {
            if !self
                .blocks
                .update_block(leaf, &BlockUpdate::state(BlockState::OnGoing))
                .await?
            {
                return Err(BracketError::BlockNotFound(leaf));
            }
        }

        log::info!(
            "Seeded {} participants into bracket {}",
            assigned.len(),
            bracket_id
        );

        Ok(bracket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::TopologyBuilder;
    use crate::db::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    async fn leaves(store: &MemoryStore, bracket: &Bracket) -> Vec<crate::bracket::Block> {
        store
            .find_blocks(&BlockFilter::Ids(bracket.blocks.clone()))
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.depth == bracket.current_depth)
            .collect()
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let participants: Vec<ParticipantId> = (1..=16).collect();

        let mut shuffled = shuffle_participants(&participants, &mut rng);
        assert_eq!(shuffled.len(), 16);
        shuffled.sort_unstable();
        assert_eq!(shuffled, participants);
    }

    #[test]
    fn test_shuffle_is_reproducible_with_seed() {
        let participants: Vec<ParticipantId> = (1..=8).collect();
        let a = shuffle_participants(&participants, &mut StdRng::seed_from_u64(3));
        let b = shuffle_participants(&participants, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_assign_is_positional() {
        let store = MemoryStore::new().with_participants([(11, "Ann"), (12, "Bob")]);
        let bracket = TopologyBuilder::new(&store, &store)
            .build(4, 2)
            .await
            .unwrap();

        let seeder = Seeder::new(&store, &store, &store);
        let returned = seeder.assign(bracket.id, &[12, 11, 13, 14]).await.unwrap();
        assert_eq!(returned, bracket, "seeding leaves the bracket untouched");

        let leaves = leaves(&store, &bracket).await;
        let occupants: Vec<_> = leaves.iter().map(|b| b.participant).collect();
        assert_eq!(occupants, vec![Some(12), Some(11), Some(13), Some(14)]);
        assert_eq!(leaves[0].participant_name.as_deref(), Some("Bob"));
        assert_eq!(leaves[2].participant_name, None, "unknown names stay empty");
        assert!(leaves.iter().all(|b| b.state == BlockState::OnGoing));
    }

    #[tokio::test]
    async fn test_under_seeding_leaves_slots_scheduled() {
        let store = MemoryStore::new();
        let bracket = TopologyBuilder::new(&store, &store)
            .build(8, 2)
            .await
            .unwrap();

        let seeder = Seeder::new(&store, &store, &store);
        let mut rng = StdRng::seed_from_u64(1);
        seeder.seed(bracket.id, &[1, 2, 3], &mut rng).await.unwrap();

        let leaves = leaves(&store, &bracket).await;
        let seeded: Vec<_> = leaves.iter().filter(|b| b.participant.is_some()).collect();
        assert_eq!(seeded.len(), 3);
        assert!(seeded.iter().all(|b| b.state == BlockState::OnGoing));
        assert_eq!(
            leaves
                .iter()
                .filter(|b| b.state == BlockState::Scheduled)
                .count(),
            5
        );
    }

    #[tokio::test]
    async fn test_seed_unknown_bracket() {
        let store = MemoryStore::new();
        let seeder = Seeder::new(&store, &store, &store);
        let err = seeder.assign(99, &[1, 2]).await.unwrap_err();
        assert!(matches!(err, BracketError::BracketNotFound(99)));
    }
}
